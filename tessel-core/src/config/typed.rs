use super::{ConfigError, FromConfigValue, TesselConfig};

/// A strongly-typed configuration section rooted at [`prefix`](Self::prefix).
///
/// ```ignore
/// impl ConfigProperties for DatabaseConfig {
///     fn prefix() -> &'static str { "tessel.database" }
///
///     fn from_config(config: &TesselConfig) -> Result<Self, ConfigError> {
///         Ok(Self {
///             url: Self::required(config, "url")?,
///             max_connections: Self::optional(config, "max_connections", 10)?,
///         })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"tessel.database"`).
    fn prefix() -> &'static str;

    fn from_config(config: &TesselConfig) -> Result<Self, ConfigError>;

    /// Absolute key for a property of this section.
    fn key(relative: &str) -> String {
        format!("{}.{relative}", Self::prefix())
    }

    /// Read a property that must be present.
    fn required<V: FromConfigValue>(config: &TesselConfig, relative: &str) -> Result<V, ConfigError> {
        config.get(&Self::key(relative))
    }

    /// Read a property, falling back to `default` when absent.
    fn optional<V: FromConfigValue>(
        config: &TesselConfig,
        relative: &str,
        default: V,
    ) -> Result<V, ConfigError> {
        config.get_or(&Self::key(relative), default)
    }
}
