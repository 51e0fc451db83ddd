/*!
 * Configuration Module
 * Plugin configuration record, value parsers, and the file loader
 */

pub mod loader;
pub mod size;
pub mod types;
pub mod users;

// Re-export public API
pub use loader::load_config;
pub use size::{parse_count, parse_size};
pub use types::{BbConfig, GresClass};
pub use users::{parse_users, print_users};
