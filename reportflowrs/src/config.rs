//! Configuration system for Reportflow.
//!
//! Supports TOML-based configuration with global defaults and per-warehouse overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::error::{Result, ReportflowError};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportflowConfig {
    pub compiler: CompilerConfig,
    pub limits: LimitConfig,
    pub archive: ArchiveConfig,
    /// Per-warehouse overrides, keyed by dialect.
    pub warehouses: WarehousesConfig,
}

/// Settings that shape every compilation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Language used for captions and translation joins (default: "english").
    pub default_lang: String,
    /// Timezone used when a report carries none or an invalid one (default: "UTC").
    pub default_timezone: String,
    /// Upper bound for each awaited lookup in milliseconds (default: 5000).
    pub lookup_timeout_ms: u64,
}

/// Row limits per output mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Rows returned by a preview (default: 100).
    pub preview_rows: u64,
    /// Hard cap for exports (0 = unlimited).
    pub export_rows: u64,
}

/// Archived-enrollment feature switch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Emit the archived branch for report types that support it (default: false).
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehousesConfig {
    pub athena: Option<WarehouseConfig>,
    pub snowflake: Option<WarehouseConfig>,
}

/// Warehouse-specific options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Schema (or `database.schema`) prefixed to every table.
    pub schema: Option<String>,
    /// Overrides `limits.preview_rows` for this warehouse.
    pub preview_rows: Option<u64>,
    /// Overrides `limits.export_rows` for this warehouse.
    pub export_rows: Option<u64>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_lang: "english".to_string(),
            default_timezone: "UTC".to_string(),
            lookup_timeout_ms: 5_000,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            preview_rows: 100,
            export_rows: 0, // 0 = unlimited
        }
    }
}

impl CompilerConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl ReportflowConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ReportflowError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ReportflowError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `REPORTFLOW_CONFIG` environment variable
    /// 2. `./reportflow.toml` (current directory)
    /// 3. `~/.config/reportflow/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("REPORTFLOW_CONFIG") {
            if let Ok(cfg) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded config from REPORTFLOW_CONFIG");
                return cfg;
            }
        }

        if let Ok(cfg) = Self::from_file("reportflow.toml") {
            tracing::info!("loaded config from ./reportflow.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("reportflow").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    /// Get resolved settings for a warehouse dialect (merges global defaults).
    pub fn for_dialect(&self, dialect: DialectKind) -> ResolvedWarehouseConfig {
        let overrides = match dialect {
            DialectKind::Athena => self.warehouses.athena.as_ref(),
            DialectKind::Snowflake => self.warehouses.snowflake.as_ref(),
        };
        ResolvedWarehouseConfig::merge(&self.limits, overrides)
    }
}

/// Fully resolved warehouse settings (no Option limits).
#[derive(Debug, Clone)]
pub struct ResolvedWarehouseConfig {
    pub schema: Option<String>,
    pub preview_rows: u64,
    pub export_rows: u64,
}

impl ResolvedWarehouseConfig {
    fn merge(limits: &LimitConfig, override_cfg: Option<&WarehouseConfig>) -> Self {
        match override_cfg {
            Some(wh) => Self {
                schema: wh.schema.clone(),
                preview_rows: wh.preview_rows.unwrap_or(limits.preview_rows),
                export_rows: wh.export_rows.unwrap_or(limits.export_rows),
            },
            None => Self {
                schema: None,
                preview_rows: limits.preview_rows,
                export_rows: limits.export_rows,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ReportflowConfig::default();
        assert_eq!(cfg.compiler.default_lang, "english");
        assert_eq!(cfg.compiler.lookup_timeout_ms, 5_000);
        assert_eq!(cfg.limits.preview_rows, 100);
        assert!(!cfg.archive.enabled);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[compiler]
default_lang = "italian"
default_timezone = "Europe/Rome"

[archive]
enabled = true

[warehouses.snowflake]
schema = "ANALYTICS.LMS"
preview_rows = 50
"#;
        let cfg = ReportflowConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.compiler.default_lang, "italian");
        assert!(cfg.archive.enabled);

        let resolved = cfg.for_dialect(DialectKind::Snowflake);
        assert_eq!(resolved.schema.as_deref(), Some("ANALYTICS.LMS"));
        assert_eq!(resolved.preview_rows, 50);
        assert_eq!(resolved.export_rows, 0);
    }

    #[test]
    fn test_warehouse_without_override_uses_globals() {
        let toml = r#"
[limits]
preview_rows = 25
export_rows = 500000
"#;
        let cfg = ReportflowConfig::from_toml(toml).unwrap();
        let athena = cfg.for_dialect(DialectKind::Athena);
        assert_eq!(athena.schema, None);
        assert_eq!(athena.preview_rows, 25);
        assert_eq!(athena.export_rows, 500_000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ReportflowConfig::from_toml("[limits\npreview_rows = ").unwrap_err();
        assert_eq!(err.code(), "config_error");
    }
}
