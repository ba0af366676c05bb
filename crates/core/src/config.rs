use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XesError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub flush_every: u64,
    pub progress_every: u64,
    pub channel_capacity: usize,
    pub reset_before_import: bool,
}

impl Default for Config {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_home = env::var("XDG_DATA_HOME").ok();

        let data_root = data_home
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(home).join(".local/share"));

        Self {
            db_path: data_root.join("xesload/xesload.duckdb"),
            flush_every: 100,
            progress_every: 1000,
            channel_capacity: 64,
            reset_before_import: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    db_path: Option<PathBuf>,
    flush_every: Option<u64>,
    progress_every: Option<u64>,
    channel_capacity: Option<usize>,
    reset_before_import: Option<bool>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("XESLOAD_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("xesload/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| XesError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| XesError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        db_path: env::var("XESLOAD_DB_PATH").ok().map(PathBuf::from),
        flush_every: env_number("XESLOAD_FLUSH_EVERY")?,
        progress_every: env_number("XESLOAD_PROGRESS_EVERY")?,
        channel_capacity: env_number("XESLOAD_CHANNEL_CAPACITY")?,
        reset_before_import: None,
    })
}

fn env_number<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| XesError::Config(format!("bad {name} in environment: {e}"))),
        Err(_) => Ok(None),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.db_path {
        cfg.db_path = v;
    }
    if let Some(v) = overrides.flush_every {
        cfg.flush_every = positive(v, "flush_every", source)?;
    }
    if let Some(v) = overrides.progress_every {
        cfg.progress_every = positive(v, "progress_every", source)?;
    }
    if let Some(v) = overrides.channel_capacity {
        cfg.channel_capacity = positive(v as u64, "channel_capacity", source)? as usize;
    }
    if let Some(v) = overrides.reset_before_import {
        cfg.reset_before_import = v;
    }
    Ok(())
}

fn positive(value: u64, field: &str, source: &str) -> Result<u64> {
    if value == 0 {
        return Err(XesError::Config(format!(
            "bad {field} in {source}: must be greater than zero"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_expected_cadence() {
        let cfg = Config::default();
        assert_eq!(cfg.flush_every, 100);
        assert_eq!(cfg.progress_every, 1000);
        assert!(cfg.reset_before_import);
        assert!(cfg.db_path.ends_with("xesload/xesload.duckdb"));
    }

    #[test]
    fn file_overrides_parse_from_toml() {
        let parsed: ConfigOverrides = toml::from_str(
            r#"
            db_path = "/tmp/logs.duckdb"
            flush_every = 10
            reset_before_import = false
            "#,
        )
        .unwrap();

        let mut cfg = Config::default();
        apply_overrides(&mut cfg, parsed, "config file").unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/logs.duckdb"));
        assert_eq!(cfg.flush_every, 10);
        assert_eq!(cfg.progress_every, 1000);
        assert!(!cfg.reset_before_import);
    }

    #[test]
    fn zero_counts_are_rejected() {
        let mut cfg = Config::default();
        let err = apply_overrides(
            &mut cfg,
            ConfigOverrides {
                flush_every: Some(0),
                ..ConfigOverrides::default()
            },
            "environment",
        )
        .unwrap_err();
        assert!(err.to_string().contains("flush_every"));

        let err = apply_overrides(
            &mut cfg,
            ConfigOverrides {
                channel_capacity: Some(0),
                ..ConfigOverrides::default()
            },
            "config file",
        )
        .unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }
}
