/*!
 * Pool Importer
 * Imports the real burst buffer topology from the system-state helper
 *
 * The helper prints a document with a single top-level object whose sole
 * mapping value is an array of pool descriptions. Import failures are not
 * fatal: the inventory comes back empty and the raw output is logged.
 */

use crate::core::limits::POOL_IMPORT_TIMEOUT;
use crate::script::run_script;
use crate::state::BbState;
use log::error;
use serde::{Deserialize, Serialize};

const GIB: u64 = 1024 * 1024 * 1024;

/// One pool of burst buffer capacity as reported by the system.
///
/// The `gb_*` fields are derived at import: byte-granular pools are scaled
/// to gibibytes, anything else is copied through so callers can treat all
/// entries uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub granularity: u64,
    #[serde(default)]
    pub quantity: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(skip)]
    pub gb_granularity: u64,
    #[serde(skip)]
    pub gb_quantity: u64,
    #[serde(skip)]
    pub gb_free: u64,
}

impl PoolEntry {
    fn derive_gb(&mut self) {
        if self.units == "bytes" {
            self.gb_granularity = self.granularity / GIB;
            self.gb_quantity = self.quantity * self.gb_granularity;
            self.gb_free = self.free * self.gb_granularity;
        } else {
            self.gb_granularity = self.granularity;
            self.gb_quantity = self.quantity;
            self.gb_free = self.free;
        }
    }
}

/// Parse the helper document into pool entries.
///
/// Unknown fields are ignored and missing fields default, so helper
/// upgrades cannot break the import.
fn parse_pool_document(text: &str) -> Option<Vec<PoolEntry>> {
    let root: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            error!("pool document parse failed on {:?}: {}", text, e);
            return None;
        }
    };

    let object = root.as_object()?;
    let (_key, array) = object.iter().next()?;
    let array = array.as_array()?;

    let mut entries = Vec::with_capacity(array.len());
    for value in array {
        let mut entry: PoolEntry = match serde_json::from_value(value.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                error!("pool entry parse failed on {}: {}", value, e);
                continue;
            }
        };
        entry.derive_gb();
        entries.push(entry);
    }
    Some(entries)
}

/// Run the system-state helper and return the pool inventory.
///
/// Returns an empty inventory when no helper is configured, when it
/// produces no output, or when the document does not parse.
#[must_use]
pub fn get_pool_entries(get_sys_state: Option<&str>) -> Vec<PoolEntry> {
    let path = match get_sys_state {
        Some(path) => path,
        None => {
            error!("no system state helper configured");
            return Vec::new();
        }
    };

    let output = match run_script(
        "jsonpools",
        path,
        &["jsonpools", "pools"],
        Some(POOL_IMPORT_TIMEOUT),
    ) {
        Ok(output) => output,
        Err(e) => {
            error!("{} failed: {}", path, e);
            return Vec::new();
        }
    };

    if output.trim().is_empty() {
        error!("{} did not return any pool", path);
        return Vec::new();
    }

    parse_pool_document(&output).unwrap_or_default()
}

/// Refresh the state's pool inventory from the helper program.
///
/// The helper runs without the state mutex held; the lock is taken only
/// to read the helper path and to store the result.
pub fn refresh_pools(state: &BbState) -> usize {
    let path = state.lock().config.get_sys_state.clone();
    let entries = get_pool_entries(path.as_deref());
    let count = entries.len();
    state.lock().pools = entries;
    count
}
