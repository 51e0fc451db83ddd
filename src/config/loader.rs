/*!
 * Configuration Loader
 * Locates the burst buffer config file, parses the flat key/value map,
 * and applies it to a configuration record
 */

use super::size::{parse_count, parse_size};
use super::types::{BbConfig, GresClass};
use super::users::{parse_users, print_users};
use crate::core::errors::ConfigError;
use crate::core::limits::NICE_OFFSET;
use crate::core::traits::UserResolver;
use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Locate the configuration file: the canonical name first, then the
/// plugin-type-qualified fallback.
fn locate_conf(conf_dir: &Path, plugin_type: &str) -> Result<PathBuf, ConfigError> {
    let primary = conf_dir.join("burst_buffer.conf");
    if primary.is_file() {
        return Ok(primary);
    }
    let fallback = conf_dir.join(format!("burst_buffer_{}.conf", plugin_type));
    if fallback.is_file() {
        return Ok(fallback);
    }
    Err(ConfigError::Missing {
        primary: primary.display().to_string(),
        fallback: fallback.display().to_string(),
    })
}

/// Parse one `Key = Value` line. Comments and blank lines yield None.
fn parse_kv_line(line: &str) -> Option<(&str, &str)> {
    let line = match line.split_once('#') {
        Some((content, _comment)) => content,
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let value = value.trim().trim_matches('"');
    Some((key.trim(), value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value == "1"
}

/// Load and process configuration parameters for one plugin instance.
///
/// The record is first reset with a non-final clear, so resource class
/// names survive a reload with their availability zeroed. Missing files
/// are fatal; malformed numeric values are fatal; unknown keys are
/// tolerated for forward compatibility.
pub fn load_config(
    config: &mut BbConfig,
    conf_dir: &Path,
    plugin_type: &str,
    resolver: &dyn UserResolver,
    debug_enabled: bool,
) -> Result<(), ConfigError> {
    config.clear(false);
    config.debug = debug_enabled;

    let path = locate_conf(conf_dir, plugin_type)?;
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    for line in contents.lines() {
        let (key, value) = match parse_kv_line(line) {
            Some(pair) => pair,
            None => continue,
        };

        if key.eq_ignore_ascii_case("AllowUsers") {
            config.allow_users_str = Some(value.to_string());
            config.allow_users = parse_users(resolver, value);
        } else if key.eq_ignore_ascii_case("DenyUsers") {
            config.deny_users_str = Some(value.to_string());
            config.deny_users = parse_users(resolver, value);
        } else if key.eq_ignore_ascii_case("GetSysState") {
            config.get_sys_state = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("Granularity") {
            config.granularity = parse_count(value);
            if config.granularity == 0 {
                error!("Granularity=0 is invalid");
                config.granularity = 1;
            }
        } else if key.eq_ignore_ascii_case("Gres") {
            for tok in value.split(',').filter(|t| !t.is_empty()) {
                let (name, avail_cnt) = match tok.split_once(':') {
                    Some((name, count)) => (name, parse_count(count)),
                    None => (tok, 1),
                };
                config.gres.push(GresClass::new(name, avail_cnt));
            }
        } else if key.eq_ignore_ascii_case("JobSizeLimit") {
            config.job_size_limit = parse_size(value, 1);
        } else if key.eq_ignore_ascii_case("UserSizeLimit") {
            config.user_size_limit = parse_size(value, 1);
        } else if key.eq_ignore_ascii_case("PrioBoostAlloc") {
            config.prio_boost_alloc = parse_u32(key, value)?;
            if config.prio_boost_alloc > NICE_OFFSET {
                error!("PrioBoostAlloc can not exceed {}", NICE_OFFSET);
                config.prio_boost_alloc = NICE_OFFSET;
            }
        } else if key.eq_ignore_ascii_case("PrioBoostUse") {
            config.prio_boost_use = parse_u32(key, value)?;
            if config.prio_boost_use > NICE_OFFSET {
                error!("PrioBoostUse can not exceed {}", NICE_OFFSET);
                config.prio_boost_use = NICE_OFFSET;
            }
        } else if key.eq_ignore_ascii_case("PrivateData") {
            config.private_data = parse_bool(value);
        } else if key.eq_ignore_ascii_case("StageInTimeout") {
            config.stage_in_timeout = parse_u32(key, value)?;
        } else if key.eq_ignore_ascii_case("StageOutTimeout") {
            config.stage_out_timeout = parse_u32(key, value)?;
        } else if key.eq_ignore_ascii_case("StartStageIn") {
            config.start_stage_in = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("StartStageOut") {
            config.start_stage_out = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("StopStageIn") {
            config.stop_stage_in = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("StopStageOut") {
            config.stop_stage_out = Some(value.to_string());
        } else {
            debug!("ignoring unrecognized config key {}", key);
        }
    }

    if config.debug {
        dump_config(config, resolver);
    }

    Ok(())
}

/// Log the complete effective configuration, one line per parameter.
fn dump_config(config: &BbConfig, resolver: &dyn UserResolver) {
    info!("AllowUsers:{}", print_users(resolver, &config.allow_users));
    info!("DenyUsers:{}", print_users(resolver, &config.deny_users));
    info!("GetSysState:{}", config.get_sys_state.as_deref().unwrap_or(""));
    info!("Granularity:{}", config.granularity);
    for (i, gres) in config.gres.iter().enumerate() {
        info!("Gres[{}]:{}:{}", i, gres.name, gres.avail_cnt);
    }
    info!("JobSizeLimit:{}", config.job_size_limit);
    info!("PrioBoostAlloc:{}", config.prio_boost_alloc);
    info!("PrioBoostUse:{}", config.prio_boost_use);
    info!("StageInTimeout:{}", config.stage_in_timeout);
    info!("StageOutTimeout:{}", config.stage_out_timeout);
    info!("StartStageIn:{}", config.start_stage_in.as_deref().unwrap_or(""));
    info!("StartStageOut:{}", config.start_stage_out.as_deref().unwrap_or(""));
    info!("StopStageIn:{}", config.stop_stage_in.as_deref().unwrap_or(""));
    info!("StopStageOut:{}", config.stop_stage_out.as_deref().unwrap_or(""));
    info!("UserSizeLimit:{}", config.user_size_limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_line_parsing() {
        assert_eq!(parse_kv_line("Granularity=4"), Some(("Granularity", "4")));
        assert_eq!(
            parse_kv_line("  GetSysState = /usr/bin/bbstat  "),
            Some(("GetSysState", "/usr/bin/bbstat"))
        );
        assert_eq!(
            parse_kv_line("AllowUsers=\"alice:bob\""),
            Some(("AllowUsers", "alice:bob"))
        );
        assert_eq!(parse_kv_line("# all comment"), None);
        assert_eq!(parse_kv_line("Gres=ssd:4 # trailing"), Some(("Gres", "ssd:4")));
        assert_eq!(parse_kv_line(""), None);
        assert_eq!(parse_kv_line("no equals sign"), None);
    }

    #[test]
    fn test_bool_values() {
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("no"));
    }
}
