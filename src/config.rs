//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::print::assets::default_assets_dir;
use crate::print::ReadinessPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_host: String,
    pub port: u16,
    pub assets_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub export_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub print_command: String,
    pub printer_name: Option<String>,
    pub readiness: ReadinessPolicy,
    pub event_channel_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = ReadinessPolicy::default();

        let settle_ms = parse_or(&get, "PRINT_SETTLE_DELAY_MS", defaults.settle_delay.as_millis() as u64)?;
        let interval_ms = parse_or(
            &get,
            "PRINT_STABILITY_INTERVAL_MS",
            defaults.stability_interval.as_millis() as u64,
        )?;
        let timeout_ms = parse_or(
            &get,
            "PRINT_STABILITY_TIMEOUT_MS",
            defaults.stability_timeout.as_millis() as u64,
        )?;

        let event_channel_capacity = parse_or(&get, "EVENT_CHANNEL_CAPACITY", 64usize)?;
        if event_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "EVENT_CHANNEL_CAPACITY",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_host: get("BIND_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&get, "PORT", 8080u16)?,
            assets_dir: get("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| default_assets_dir().to_path_buf()),
            temp_dir: get("PRINT_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            export_dir: get("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./exports")),
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            print_command: get("PRINT_COMMAND").unwrap_or_else(|| "lp".to_string()),
            printer_name: get("PRINTER_NAME"),
            readiness: ReadinessPolicy {
                settle_delay: Duration::from_millis(settle_ms),
                stability_interval: Duration::from_millis(interval_ms),
                stability_timeout: Duration::from_millis(timeout_ms),
            },
            event_channel_capacity,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.print_command, "lp");
        assert_eq!(config.printer_name, None);
        assert_eq!(config.readiness, ReadinessPolicy::default());
        assert_eq!(config.event_channel_capacity, 64);
        assert!(config.assets_dir.ends_with("assets"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "9123"),
            ("PRINTER_NAME", "Front_Desk"),
            ("PRINT_SETTLE_DELAY_MS", "750"),
            ("EXPORT_DIR", "/srv/exports"),
            ("CHROME_PATH", ""),
        ])
        .unwrap();
        assert_eq!(config.port, 9123);
        assert_eq!(config.printer_name.as_deref(), Some("Front_Desk"));
        assert_eq!(config.readiness.settle_delay, Duration::from_millis(750));
        assert_eq!(config.export_dir, PathBuf::from("/srv/exports"));
        assert_eq!(config.chrome_path, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config(&[("PRINT_STABILITY_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("PRINT_STABILITY_TIMEOUT_MS"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_zero_channel_capacity_is_rejected() {
        assert!(config(&[("EVENT_CHANNEL_CAPACITY", "0")]).is_err());
    }
}
