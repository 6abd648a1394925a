use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load a YAML file into the values map. A missing file is not an error.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
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

/// Flatten a YAML tree into dot-separated keys (`sql.pool.size`).
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}

/// Overlay process environment variables: `SQL_HOST` overrides `sql.host`.
pub(crate) fn overlay_env(values: &mut HashMap<String, ConfigValue>) {
    for (env_key, env_val) in std::env::vars() {
        let config_key = env_key.to_lowercase().replace('_', ".");
        values.insert(config_key, ConfigValue::String(env_val));
    }
}

/// Expand `${VAR}`, `${env:VAR}` and `${file:/path}` placeholders in string values.
pub(crate) fn resolve_placeholders(
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    for value in values.values_mut() {
        if let ConfigValue::String(s) = value {
            if s.contains("${") {
                *s = expand(s)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn expand(raw: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        let end = rest[start..]
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("Unclosed placeholder in: {raw}")))?;
        out.push_str(&rest[..start]);
        out.push_str(&lookup(rest[start + 2..start + end].trim())?);
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup(reference: &str) -> Result<String, ConfigError> {
    if let Some(path) = reference.strip_prefix("file:") {
        return std::fs::read_to_string(path.trim())
            .map(|s| s.trim().to_string())
            .map_err(|e| ConfigError::Load(format!("Secret file '{}': {e}", path.trim())));
    }
    let var = reference.strip_prefix("env:").unwrap_or(reference).trim();
    std::env::var(var).map_err(|_| ConfigError::NotFound(var.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_mappings_flatten_to_dot_keys() {
        let mut values = HashMap::new();
        load_yaml_str("sql:\n  pool:\n    size: 4\n  host: db\n", &mut values).unwrap();
        assert_eq!(values.get("sql.pool.size"), Some(&ConfigValue::Integer(4)));
        assert_eq!(
            values.get("sql.host"),
            Some(&ConfigValue::String("db".into()))
        );
    }

    #[test]
    fn expands_file_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("password");
        std::fs::write(&secret, "s3cret\n").unwrap();

        let raw = format!("user:${{file:{}}}@db", secret.display());
        assert_eq!(expand(&raw).unwrap(), "user:s3cret@db");
    }

    #[test]
    fn unclosed_placeholder_is_an_error() {
        assert!(expand("${SQL_PASSWORD").is_err());
    }

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(expand("sqlite://planner.db").unwrap(), "sqlite://planner.db");
    }
}
