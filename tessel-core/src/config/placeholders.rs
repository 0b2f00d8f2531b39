//! `${...}` placeholder resolution for string config values.
//!
//! Supported forms:
//! - `${VAR_NAME}` or `${env:VAR_NAME}`: environment variable
//! - `${file:/path/to/secret}`: file contents, trimmed

use super::ConfigError;

fn resolve_reference(reference: &str) -> Result<String, ConfigError> {
    let reference = reference.trim();
    if let Some(path) = reference.strip_prefix("file:") {
        let path = path.trim();
        std::fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .map_err(|e| ConfigError::Load(format!("Secret file '{path}': {e}")))
    } else {
        let var = reference.strip_prefix("env:").unwrap_or(reference).trim();
        std::env::var(var).map_err(|_| ConfigError::NotFound(format!("env:{var}")))
    }
}

/// Replace every `${...}` placeholder in `value`.
pub fn resolve(value: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("Unclosed placeholder in: {value}")))?;
        out.push_str(&resolve_reference(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
