/*!
 * Config Loader Tests
 * File search order, key handling, clamping, and reload behavior
 */

use burstctl::config::{load_config, BbConfig};
use burstctl::core::errors::ConfigError;
use burstctl::core::limits::{NICE_OFFSET, NO_VAL};
use burstctl::core::types::UserId;
use burstctl::UserResolver;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

struct FixedResolver;

impl UserResolver for FixedResolver {
    fn uid_from_name(&self, name: &str) -> Option<UserId> {
        match name {
            "alice" => Some(1000),
            "bob" => Some(1001),
            _ => None,
        }
    }

    fn name_from_uid(&self, uid: UserId) -> Option<String> {
        match uid {
            1000 => Some("alice".to_string()),
            1001 => Some("bob".to_string()),
            _ => None,
        }
    }
}

fn write_conf(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn load(dir: &TempDir, plugin_type: &str) -> Result<BbConfig, ConfigError> {
    let mut config = BbConfig::default();
    load_config(&mut config, dir.path(), plugin_type, &FixedResolver, false)?;
    Ok(config)
}

#[test]
fn test_full_config() {
    let dir = TempDir::new().unwrap();
    write_conf(
        &dir,
        "burst_buffer.conf",
        r#"
# burst buffer settings
AllowUsers=alice:bob
GetSysState=/usr/bin/bbstat
Granularity=4
Gres=ssd:100,nvme
JobSizeLimit=1TB
UserSizeLimit=4096MB
PrioBoostAlloc=50
PrioBoostUse=10
PrivateData=yes
StageInTimeout=30
StageOutTimeout=60
StartStageIn=/usr/bin/stage-in
StartStageOut=/usr/bin/stage-out
StopStageIn=/usr/bin/stop-in
StopStageOut=/usr/bin/stop-out
SomeFutureKey=ignored
"#,
    );

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.allow_users_str.as_deref(), Some("alice:bob"));
    assert_eq!(config.allow_users, vec![1000, 1001]);
    assert_eq!(config.deny_users_str, None);
    assert_eq!(config.get_sys_state.as_deref(), Some("/usr/bin/bbstat"));
    assert_eq!(config.granularity, 4);
    assert_eq!(config.gres.len(), 2);
    assert_eq!(config.gres[0].name, "ssd");
    assert_eq!(config.gres[0].avail_cnt, 100);
    assert_eq!(config.gres[1].name, "nvme");
    assert_eq!(config.gres[1].avail_cnt, 1);
    assert_eq!(config.job_size_limit, 1024);
    assert_eq!(config.user_size_limit, 4);
    assert_eq!(config.prio_boost_alloc, 50);
    assert_eq!(config.prio_boost_use, 10);
    assert!(config.private_data);
    assert_eq!(config.stage_in_timeout, 30);
    assert_eq!(config.stage_out_timeout, 60);
    assert_eq!(config.start_stage_in.as_deref(), Some("/usr/bin/stage-in"));
    assert_eq!(config.stop_stage_out.as_deref(), Some("/usr/bin/stop-out"));
}

#[test]
fn test_type_qualified_fallback() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer_generic.conf", "Granularity=2\n");

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.granularity, 2);

    // A different plugin type finds neither file
    assert!(matches!(
        load(&dir, "cray"),
        Err(ConfigError::Missing { .. })
    ));
}

#[test]
fn test_canonical_name_wins() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer.conf", "Granularity=8\n");
    write_conf(&dir, "burst_buffer_generic.conf", "Granularity=2\n");

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.granularity, 8);
}

#[test]
fn test_missing_is_fatal() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load(&dir, "generic"),
        Err(ConfigError::Missing { .. })
    ));
}

#[test]
fn test_zero_granularity_forced_to_one() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer.conf", "Granularity=0\n");

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.granularity, 1);
}

#[test]
fn test_prio_boost_clamped() {
    let dir = TempDir::new().unwrap();
    write_conf(
        &dir,
        "burst_buffer.conf",
        "PrioBoostAlloc=99999\nPrioBoostUse=20000\n",
    );

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.prio_boost_alloc, NICE_OFFSET);
    assert_eq!(config.prio_boost_use, NICE_OFFSET);
}

#[test]
fn test_malformed_numeric_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer.conf", "StageInTimeout=soon\n");

    assert!(matches!(
        load(&dir, "generic"),
        Err(ConfigError::Malformed { .. })
    ));
}

#[test]
fn test_unknown_users_skipped() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer.conf", "DenyUsers=alice:mallory\n");

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.deny_users_str.as_deref(), Some("alice:mallory"));
    assert_eq!(config.deny_users, vec![1000]);
}

#[test]
fn test_defaults_without_keys() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer.conf", "# nothing configured\n");

    let config = load(&dir, "generic").unwrap();
    assert_eq!(config.granularity, 1);
    assert_eq!(config.job_size_limit, NO_VAL);
    assert_eq!(config.user_size_limit, NO_VAL);
    assert!(!config.private_data);
    assert!(config.gres.is_empty());
}

#[test]
fn test_reload_keeps_gres_names_zeroes_counts() {
    let dir = TempDir::new().unwrap();
    write_conf(&dir, "burst_buffer.conf", "Gres=ssd:100\n");

    let mut config = BbConfig::default();
    load_config(&mut config, dir.path(), "generic", &FixedResolver, false).unwrap();
    assert_eq!(config.gres[0].avail_cnt, 100);

    // Reload from a file that no longer names the class
    write_conf(&dir, "burst_buffer.conf", "Granularity=2\n");
    load_config(&mut config, dir.path(), "generic", &FixedResolver, false).unwrap();
    assert_eq!(config.gres.len(), 1);
    assert_eq!(config.gres[0].name, "ssd");
    assert_eq!(config.gres[0].avail_cnt, 0);
    assert_eq!(config.granularity, 2);
}
