/*!
 * Configuration Types
 * Per-plugin-instance parameters loaded from the burst buffer config file
 */

use crate::core::limits::NO_VAL;
use crate::core::types::UserId;

/// One named resource class with availability accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GresClass {
    pub name: String,
    pub avail_cnt: u32,
    pub used_cnt: u32,
}

impl GresClass {
    #[must_use]
    pub fn new(name: impl Into<String>, avail_cnt: u32) -> Self {
        Self {
            name: name.into(),
            avail_cnt,
            used_cnt: 0,
        }
    }
}

/// Configuration parameters for one engine instance.
///
/// Size limits use [`NO_VAL`] for "unlimited". `granularity` is never 0
/// after a load. The `*_users` vectors hold the resolved identifiers for
/// the textual `*_users_str` forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BbConfig {
    pub allow_users: Vec<UserId>,
    pub allow_users_str: Option<String>,
    pub deny_users: Vec<UserId>,
    pub deny_users_str: Option<String>,
    /// Path of the helper program reporting the real system state.
    pub get_sys_state: Option<String>,
    pub granularity: u32,
    pub gres: Vec<GresClass>,
    pub job_size_limit: u32,
    pub user_size_limit: u32,
    pub prio_boost_alloc: u32,
    pub prio_boost_use: u32,
    pub private_data: bool,
    pub stage_in_timeout: u32,
    pub stage_out_timeout: u32,
    pub start_stage_in: Option<String>,
    pub start_stage_out: Option<String>,
    pub stop_stage_in: Option<String>,
    pub stop_stage_out: Option<String>,
    pub debug: bool,
}

impl Default for BbConfig {
    fn default() -> Self {
        Self {
            allow_users: Vec::new(),
            allow_users_str: None,
            deny_users: Vec::new(),
            deny_users_str: None,
            get_sys_state: None,
            granularity: 1,
            gres: Vec::new(),
            job_size_limit: NO_VAL,
            user_size_limit: NO_VAL,
            prio_boost_alloc: 0,
            prio_boost_use: 0,
            private_data: false,
            stage_in_timeout: 0,
            stage_out_timeout: 0,
            start_stage_in: None,
            start_stage_out: None,
            stop_stage_in: None,
            stop_stage_out: None,
            debug: false,
        }
    }
}

impl BbConfig {
    /// Reset to defaults ahead of a reload or at shutdown.
    ///
    /// A non-final clear keeps the resource class names (their availability
    /// is zeroed); the final clear drops the class list entirely.
    pub fn clear(&mut self, fini: bool) {
        self.allow_users.clear();
        self.allow_users_str = None;
        self.deny_users.clear();
        self.deny_users_str = None;
        self.get_sys_state = None;
        self.granularity = 1;
        if fini {
            self.gres.clear();
        } else {
            for gres in &mut self.gres {
                gres.avail_cnt = 0;
            }
        }
        self.job_size_limit = NO_VAL;
        self.user_size_limit = NO_VAL;
        self.prio_boost_alloc = 0;
        self.prio_boost_use = 0;
        self.private_data = false;
        self.stage_in_timeout = 0;
        self.stage_out_timeout = 0;
        self.start_stage_in = None;
        self.start_stage_out = None;
        self.stop_stage_in = None;
        self.stop_stage_out = None;
        self.debug = false;
    }
}
