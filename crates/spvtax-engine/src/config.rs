//! Engine configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML
//! file, then environment variables:
//!
//! - `SPVTAX_STEP_UNIT_MS`: milliseconds per nominal sub-step unit (default 500)
//! - `SPVTAX_DELIVERY_DELAY_MS`: per-investor delivery delay (default 800)
//! - `SPVTAX_INSTANT`: `true`/`1` to skip all wall-clock waits (default false)
//! - `SPVTAX_DOWNLOAD_BASE_URL`: base for form download references
//!   (default `https://example.com/tax`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime settings for stage execution and the mock collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Milliseconds per nominal sub-step unit.
    pub step_unit_ms: u64,
    /// Milliseconds spent "sending" to each investor.
    pub delivery_delay_ms: u64,
    /// Use a clock that never waits.
    pub instant: bool,
    /// Base URL for generated form downloads.
    pub download_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_unit_ms: 500,
            delivery_delay_ms: 800,
            instant: false,
            download_base_url: "https://example.com/tax".to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults, overlaid with `path` if given, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_overrides(|var| std::env::var(var).ok())
    }

    /// Parse a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parse YAML text. Missing keys take their defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SPVTAX_*` overrides obtained through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("SPVTAX_STEP_UNIT_MS") {
            self.step_unit_ms = parse_millis("SPVTAX_STEP_UNIT_MS", &v)?;
        }
        if let Some(v) = lookup("SPVTAX_DELIVERY_DELAY_MS") {
            self.delivery_delay_ms = parse_millis("SPVTAX_DELIVERY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("SPVTAX_INSTANT") {
            self.instant = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(invalid("SPVTAX_INSTANT", &v, "expected true or false")),
            };
        }
        if let Some(v) = lookup("SPVTAX_DOWNLOAD_BASE_URL") {
            self.download_base_url = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.download_base_url.as_str();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(invalid(
                "download_base_url",
                url,
                "must be an http(s) URL",
            ));
        }
        Ok(())
    }

    /// Wall-clock length of one sub-step unit.
    pub fn step_unit(&self) -> Duration {
        Duration::from_millis(self.step_unit_ms)
    }

    /// Wall-clock length of one investor delivery.
    pub fn delivery_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_delay_ms)
    }
}

fn parse_millis(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(var, raw, "expected a non-negative integer"))
}

fn invalid(key: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_match_source_timings() {
        let c = EngineConfig::default();
        assert_eq!(c.step_unit(), Duration::from_millis(500));
        assert_eq!(c.delivery_delay(), Duration::from_millis(800));
        assert!(!c.instant);
    }

    #[test]
    fn test_yaml_overrides_only_given_keys() {
        let c = EngineConfig::from_yaml_str("step_unit_ms: 10\ninstant: true\n").unwrap();
        assert_eq!(c.step_unit_ms, 10);
        assert!(c.instant);
        assert_eq!(c.delivery_delay_ms, 800);
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_yaml_str("step_unit: 10\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let c = EngineConfig::from_yaml_str("step_unit_ms: 10\n")
            .unwrap()
            .with_overrides(env(&[
                ("SPVTAX_STEP_UNIT_MS", "0"),
                ("SPVTAX_INSTANT", "yes"),
                ("SPVTAX_DOWNLOAD_BASE_URL", "https://files.internal/tax"),
            ]))
            .unwrap();
        assert_eq!(c.step_unit_ms, 0);
        assert!(c.instant);
        assert_eq!(c.download_base_url, "https://files.internal/tax");
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let err = EngineConfig::default()
            .with_overrides(env(&[("SPVTAX_DELIVERY_DELAY_MS", "-5")]))
            .unwrap_err();
        assert!(err.to_string().contains("SPVTAX_DELIVERY_DELAY_MS"));

        assert!(EngineConfig::default()
            .with_overrides(env(&[("SPVTAX_INSTANT", "maybe")]))
            .is_err());
        assert!(EngineConfig::default()
            .with_overrides(env(&[("SPVTAX_DOWNLOAD_BASE_URL", "ftp://x")]))
            .is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/spvtax.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
