use std::time::Duration;

use tessel_core::config::{ConfigError, ConfigProperties, TesselConfig};
use tessel_data::{AuditConfig, DEFAULT_COMMAND_TIMEOUT_SECS};

/// Connection and save settings, read from the `tessel.database` section.
///
/// ```yaml
/// tessel:
///   database:
///     url: "sqlite::memory:"
///     max_connections: 5
///     command_timeout_secs: 30
///     audit:
///       exclude_annotations: true
///       display_names: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub audit_exclude_annotations: bool,
    pub audit_display_names: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            audit_exclude_annotations: true,
            audit_display_names: true,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Audit settings with the default (no-op) sink.
    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig::default()
            .exclude_annotations(self.audit_exclude_annotations)
            .display_names(self.audit_display_names)
    }
}

impl ConfigProperties for DatabaseConfig {
    fn prefix() -> &'static str {
        "tessel.database"
    }

    fn from_config(config: &TesselConfig) -> Result<Self, ConfigError> {
        let defaults = Self::new("");
        Ok(Self {
            url: Self::required(config, "url")?,
            max_connections: Self::optional(config, "max_connections", defaults.max_connections)?,
            min_connections: Self::optional(config, "min_connections", defaults.min_connections)?,
            acquire_timeout_secs: Self::optional(
                config,
                "acquire_timeout_secs",
                defaults.acquire_timeout_secs,
            )?,
            command_timeout_secs: Self::optional(
                config,
                "command_timeout_secs",
                defaults.command_timeout_secs,
            )?,
            audit_exclude_annotations: Self::optional(
                config,
                "audit.exclude_annotations",
                defaults.audit_exclude_annotations,
            )?,
            audit_display_names: Self::optional(
                config,
                "audit.display_names",
                defaults.audit_display_names,
            )?,
        })
    }
}
