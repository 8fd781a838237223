//! Layered TOML configuration loading (spec §6, "CLI / config" is out
//! of scope, but the ambient config loader the server embeds to read
//! its own startup settings is not).
//!
//! Supports `include = "other.toml"` directives for composition and
//! `${ENV:default}` expansion in string values.

use crate::error::{InterfaceError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CoreConfig {
    pub bind_address: String,
    pub cycle_period_ms: u64,
    pub health_port: u16,
    #[serde(default)]
    pub action_libraries: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            bind_address: "127.0.0.1:9944".to_string(),
            cycle_period_ms: 100,
            health_port: 9945,
            action_libraries: Vec::new(),
        }
    }
}

/// Load `path` as TOML, resolving `include = "..."` into a deep merge
/// and expanding `${VAR:default}` in every string value before
/// deserializing into `T`.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading config");
    let value = load_toml_file(path)?;
    let expanded = expand_variables(value);
    expanded.try_into().map_err(|e: toml::de::Error| {
        tracing::warn!(path = %path.display(), error = %e, "config failed to deserialize");
        InterfaceError::Config(e.to_string())
    })
}

fn load_toml_file(path: &Path) -> Result<toml::Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| InterfaceError::Config(format!("reading {}: {e}", path.display())))?;
    let mut value: toml::Value =
        toml::from_str(&content).map_err(|e| InterfaceError::Config(format!("parsing {}: {e}", path.display())))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_includes(&mut value, base_dir)?;
    Ok(value)
}

fn resolve_includes(value: &mut toml::Value, base_dir: &Path) -> Result<()> {
    if let toml::Value::Table(table) = value {
        if let Some(toml::Value::String(include_path)) = table.remove("include") {
            let included = load_toml_file(&base_dir.join(&include_path))?;
            merge_tables(value, included);
            return Ok(());
        }
        for (_, v) in table.iter_mut() {
            resolve_includes(v, base_dir)?;
        }
    }
    Ok(())
}

/// Deep-merge `overlay` onto `base` in place: `base`'s own keys win,
/// since it represents the including file's explicit overrides.
fn merge_tables(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (k, v) in overlay_table {
                base_table.entry(k).or_insert(v);
            }
        }
        (base, overlay) => {
            if matches!(base, toml::Value::Table(t) if t.is_empty()) {
                *base = overlay;
            }
        }
    }
}

fn expand_variables(value: toml::Value) -> toml::Value {
    match value {
        toml::Value::String(s) => toml::Value::String(expand_env_in_string(&s)),
        toml::Value::Table(table) => {
            toml::Value::Table(table.into_iter().map(|(k, v)| (k, expand_variables(v))).collect())
        }
        toml::Value::Array(arr) => toml::Value::Array(arr.into_iter().map(expand_variables).collect()),
        other => other,
    }
}

fn expand_env_in_string(s: &str) -> String {
    if !s.contains("${") {
        return s.to_string();
    }
    let mut result = String::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };
        let inner = &rest[start + 2..start + end];
        let (name, default) = inner.split_once(':').unwrap_or((inner, ""));
        result.push_str(&env::var(name).unwrap_or_else(|_| default.to_string()));
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

#[derive(Default)]
pub struct ConfigOverrides(HashMap<String, String>);

impl ConfigOverrides {
    pub fn from_env(prefix: &str) -> Self {
        let mut map = HashMap::new();
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(prefix) {
                map.insert(stripped.to_lowercase(), value);
            }
        }
        ConfigOverrides(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn expands_env_var_with_default() {
        std::env::remove_var("PLANRUN_TEST_VAR");
        assert_eq!(expand_env_in_string("port=${PLANRUN_TEST_VAR:9000}"), "port=9000");
        std::env::set_var("PLANRUN_TEST_VAR", "8080");
        assert_eq!(expand_env_in_string("port=${PLANRUN_TEST_VAR:9000}"), "port=8080");
        std::env::remove_var("PLANRUN_TEST_VAR");
    }

    #[test]
    fn include_directive_merges_base_over_included() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.toml");
        let included_path = dir.path().join("included.toml");
        writeln!(fs::File::create(&included_path).unwrap(), "bind_address = \"0.0.0.0:1\"\ncycle_period_ms = 50\nhealth_port = 1").unwrap();
        writeln!(
            fs::File::create(&base_path).unwrap(),
            "include = \"included.toml\"\nbind_address = \"127.0.0.1:9944\""
        )
        .unwrap();

        let cfg: CoreConfig = load_config(&base_path).unwrap();
        assert_eq!(cfg.bind_address, "127.0.0.1:9944");
        assert_eq!(cfg.cycle_period_ms, 50);
    }
}
