mod loader;
pub mod placeholders;
pub mod typed;
pub mod value;

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};

pub use typed::ConfigProperties;
pub use value::{ConfigValue, FromConfigValue};

/// Environment variable selecting the active profile.
pub const PROFILE_ENV: &str = "TESSEL_PROFILE";

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A typed section rejected a value.
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration loaded from YAML files, `.env` files, and environment variables.
///
/// `TesselConfig` (= `TesselConfig<()>`) provides raw key-value access only.
/// `TesselConfig<T>` adds typed access to a config section via `Deref<Target = T>`.
///
/// Resolution order (lowest to highest priority):
/// 1. `application.yaml` (base)
/// 2. `application-{profile}.yaml` (profile override)
/// 3. `.env` file (loaded into process environment)
/// 4. `.env.{profile}` file (loaded into process environment)
/// 5. Environment variables. `TESSEL_DATABASE_MAX_CONNECTIONS` overrides an
///    existing `tessel.database.max_connections`; unknown variables land under
///    their lower-cased, dot-separated name (`APP_NAME` -> `app.name`).
///
/// `.env` files never overwrite already-set environment variables.
///
/// Profile is determined by: `TESSEL_PROFILE` env var > argument > default `"dev"`.
#[derive(Debug, Clone)]
pub struct TesselConfig<T = ()> {
    values: HashMap<String, ConfigValue>,
    profile: String,
    typed: T,
}

impl TesselConfig {
    /// Load configuration for the given profile from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."), profile)
    }

    /// Load configuration for the given profile, looking for the YAML and
    /// `.env` files inside `dir`.
    pub fn load_from_dir(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();

        loader::load_yaml_file(&dir.join("application.yaml"), &mut values)?;
        let profile_path: PathBuf = dir.join(format!("application-{active_profile}.yaml"));
        loader::load_yaml_file(&profile_path, &mut values)?;

        // Missing .env files are fine.
        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        resolve_string_values(&mut values)?;
        loader::overlay_env(std::env::vars(), &mut values);

        tracing::debug!(profile = %active_profile, keys = values.len(), "Configuration loaded");

        Ok(TesselConfig {
            values,
            profile: active_profile,
            typed: (),
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(TesselConfig {
            values,
            profile: profile.to_string(),
            typed: (),
        })
    }

    /// Create an empty config (useful for testing).
    pub fn empty() -> Self {
        TesselConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
            typed: (),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Upgrade to a typed config by constructing `C` from the raw values.
    ///
    /// ```ignore
    /// let config = TesselConfig::load("dev")?.with_typed::<DatabaseConfig>()?;
    /// config.url  // typed field access via Deref
    /// ```
    pub fn with_typed<C: ConfigProperties>(self) -> Result<TesselConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(TesselConfig {
            values: self.values,
            profile: self.profile,
            typed,
        })
    }
}

impl<T> TesselConfig<T> {
    /// Get a typed value for the given dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the key does not exist, or
    /// `ConfigError::TypeMismatch` if the value cannot be converted.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning a default if the key is missing.
    ///
    /// A present key with the wrong type is still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.lookup(key) {
            None | Some(ConfigValue::Null) => Ok(default),
            Some(value) => V::from_config_value(value, key),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn typed(&self) -> &T {
        &self.typed
    }

    /// A key missing from the YAML may still have been set through an
    /// environment variable whose underscores were read as separators.
    fn lookup(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key).or_else(|| {
            self.values
                .get(&loader::env_fallback_key(&loader::env_name(key)))
        })
    }
}

impl<T> Deref for TesselConfig<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.typed
    }
}

fn resolve_string_values(values: &mut HashMap<String, ConfigValue>) -> Result<(), ConfigError> {
    for value in values.values_mut() {
        if let ConfigValue::String(s) = value {
            if s.contains("${") {
                *s = placeholders::resolve(s)?;
            }
        }
    }
    Ok(())
}
