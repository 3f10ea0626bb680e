//! TOML configuration for the cost forecasting service.
//!
//! Every section is optional and falls back to compiled-in defaults. The
//! file is located via an explicit path, the `COSTFORECAST_CONFIG`
//! environment variable, or the standard system location.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::forecast::ForecastSettings;

pub const CONFIG_ENV: &str = "COSTFORECAST_CONFIG";
const SYSTEM_CONFIG_PATH: &str = "/etc/costforecast/costforecast.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .forecast
            .validate()
            .with_context(|| format!("invalid [forecast] section in {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. `explicit`, which must load if given.
    /// 2. The path in `COSTFORECAST_CONFIG`.
    /// 3. `/etc/costforecast/costforecast.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "COSTFORECAST_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP API.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding raw cost records.
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/costforecast.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::generator::AnchorMode;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/costforecast.db"));

        assert_eq!(cfg.forecast.horizon_days, 30);
        assert_eq!(cfg.forecast.history_days, 60);
        assert_eq!(cfg.forecast.anomaly_threshold, 2.5);
        assert_eq!(cfg.forecast.anomaly_window, 30);
        assert_eq!(cfg.forecast.anomaly_lead_in, 7);
        assert_eq!(cfg.forecast.anchor, AnchorMode::LastObservation);

        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[server]
bind = "127.0.0.1:9000"

[storage]
db_path = "/var/lib/costforecast/costs.db"

[forecast]
horizon_days = 14
history_days = 90
anomaly_threshold = 3.0
anomaly_window = 21
anomaly_lead_in = 5
anchor = "today"

[logging]
level = "debug"
json = true
"#;

        let cfg: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(
            cfg.storage.db_path,
            PathBuf::from("/var/lib/costforecast/costs.db")
        );
        assert_eq!(cfg.forecast.horizon_days, 14);
        assert_eq!(cfg.forecast.history_days, 90);
        assert_eq!(cfg.forecast.anomaly_threshold, 3.0);
        assert_eq!(cfg.forecast.anomaly_window, 21);
        assert_eq!(cfg.forecast.anomaly_lead_in, 5);
        assert_eq!(cfg.forecast.anchor, AnchorMode::Today);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[forecast]
horizon_days = 7
"#;

        let cfg: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.forecast.horizon_days, 7);
        assert_eq!(cfg.forecast.anomaly_threshold, 2.5);
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costforecast.toml");
        std::fs::write(&path, "[server]\nbind = \"127.0.0.1:1234\"\n").unwrap();

        let cfg = AppConfig::resolve(Some(&path)).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:1234");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::resolve(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_zero_anomaly_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costforecast.toml");
        std::fs::write(&path, "[forecast]\nanomaly_window = 0\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("anomaly_window"));
    }

    #[test]
    fn test_negative_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costforecast.toml");
        std::fs::write(&path, "[forecast]\nanomaly_threshold = -1.0\n").unwrap();

        assert!(AppConfig::resolve(Some(&path)).is_err());
    }
}
