use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load and parse a YAML file, flattening it into the values map.
///
/// A missing file is not an error.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        load_yaml_str(&content, values)?;
    }
    Ok(())
}

pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            if !prefix.is_empty() {
                out.insert(
                    prefix.to_string(),
                    ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
                );
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Upper-snake form of a config key: `tessel.database.max_connections` ->
/// `TESSEL_DATABASE_MAX_CONNECTIONS`.
pub(crate) fn env_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Overlay environment variables onto the values map.
///
/// A variable replaces every existing key whose [`env_name`] matches it.
/// Otherwise it is stored under its lower-cased, dot-separated name.
/// Key an unmatched environment variable is stored under.
///
/// `TESSEL_DATABASE_COMMAND_TIMEOUT_SECS` becomes `tessel.database.command.timeout.secs`;
/// lookups of `tessel.database.command_timeout_secs` fall back to it.
pub(crate) fn env_fallback_key(name: &str) -> String {
    name.to_lowercase().replace('_', ".")
}

pub(crate) fn overlay_env(
    vars: impl IntoIterator<Item = (String, String)>,
    values: &mut HashMap<String, ConfigValue>,
) {
    let mut known: HashMap<String, Vec<String>> = HashMap::new();
    for key in values.keys() {
        known.entry(env_name(key)).or_default().push(key.clone());
    }

    for (env_key, env_val) in vars {
        match known.get(&env_key) {
            Some(keys) => {
                for key in keys {
                    values.insert(key.clone(), ConfigValue::String(env_val.clone()));
                }
            }
            None => {
                values.insert(env_fallback_key(&env_key), ConfigValue::String(env_val));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_key_matches_unmatched_env_vars() {
        let mut values = HashMap::new();
        overlay_env(
            vec![("TESSEL_DATABASE_COMMAND_TIMEOUT_SECS".to_string(), "5".to_string())],
            &mut values,
        );
        let key = env_fallback_key(&env_name("tessel.database.command_timeout_secs"));
        assert_eq!(key, "tessel.database.command.timeout.secs");
        assert!(values.contains_key(&key));
    }

    #[test]
    fn env_name_maps_separators() {
        assert_eq!(
            env_name("tessel.database.max_connections"),
            "TESSEL_DATABASE_MAX_CONNECTIONS"
        );
        assert_eq!(env_name("app.log-format"), "APP_LOG_FORMAT");
    }

    #[test]
    fn overlay_prefers_existing_keys() {
        let mut values = HashMap::new();
        values.insert(
            "tessel.database.max_connections".to_string(),
            ConfigValue::Integer(10),
        );

        overlay_env(
            vec![
                ("TESSEL_DATABASE_MAX_CONNECTIONS".to_string(), "25".to_string()),
                ("APP_NAME".to_string(), "billing".to_string()),
            ],
            &mut values,
        );

        assert!(matches!(
            values.get("tessel.database.max_connections"),
            Some(ConfigValue::String(s)) if s == "25"
        ));
        assert!(!values.contains_key("tessel.database.max.connections"));
        assert!(matches!(values.get("app.name"), Some(ConfigValue::String(s)) if s == "billing"));
    }

    #[test]
    fn sequences_are_stored_as_lists() {
        let mut values = HashMap::new();
        load_yaml_str("a:\n  b:\n    - 1\n    - 2\n", &mut values).unwrap();
        assert!(matches!(values.get("a.b"), Some(ConfigValue::List(items)) if items.len() == 2));
    }
}
