//! Configuration management for `issue_tracker`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`ISSUE_TRACKER_*`)
//! 3. YAML config (`--config` path or `./issue-tracker.yaml`)
//! 4. Defaults

use crate::cache::CacheConfig;
use crate::error::{Result, TrackerError};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILENAME: &str = "issue-tracker.yaml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ISSUE_TRACKER_";

const DEFAULT_DB_FILENAME: &str = "issue-tracker.db";
const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_ATTACHMENTS_DIR: &str = "attachments";
const DEFAULT_DOWNLOAD_ENDPOINT: &str = "/issue/attachments/";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

/// A configuration layer split into startup keys (resources opened once at
/// boot) and runtime keys (service behaviour).
///
/// Keys are stored normalized: lower-case with `.` and `_` folded to `-`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub startup: HashMap<String, String>,
    pub runtime: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.startup {
            self.startup.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.runtime {
            self.runtime.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `ISSUE_TRACKER_*` pairs.
    ///
    /// `ISSUE_TRACKER_CACHE_MAX_ENTRIES` lands on the same key as the YAML
    /// `cache.max-entries`.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();

        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                insert_key_value(&mut layer, stripped, value);
            }
        }

        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub bind: Option<String>,
    pub attachments_dir: Option<PathBuf>,
    pub lock_timeout: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            insert_key_value(&mut layer, "db", path.to_string_lossy().to_string());
        }
        if let Some(bind) = &self.bind {
            insert_key_value(&mut layer, "bind", bind.clone());
        }
        if let Some(dir) = &self.attachments_dir {
            insert_key_value(
                &mut layer,
                "attachments-dir",
                dir.to_string_lossy().to_string(),
            );
        }
        if let Some(lock_timeout) = self.lock_timeout {
            insert_key_value(&mut layer, "lock-timeout", lock_timeout.to_string());
        }

        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    insert_key_value(&mut layer, "db", DEFAULT_DB_FILENAME.to_string());
    insert_key_value(&mut layer, "bind", DEFAULT_BIND.to_string());
    insert_key_value(
        &mut layer,
        "attachments-dir",
        DEFAULT_ATTACHMENTS_DIR.to_string(),
    );
    insert_key_value(&mut layer, "lock-timeout", DEFAULT_LOCK_TIMEOUT_MS.to_string());
    insert_key_value(
        &mut layer,
        "download-endpoint",
        DEFAULT_DOWNLOAD_ENDPOINT.to_string(),
    );
    let cache = CacheConfig::default();
    insert_key_value(&mut layer, "cache.max-entries", cache.max_entries.to_string());
    insert_key_value(
        &mut layer,
        "cache.ttl-seconds",
        cache.ttl.as_secs().to_string(),
    );
    layer
}

/// Load configuration with the full precedence chain.
///
/// An explicit `config_path` must exist; the implicit
/// `./issue-tracker.yaml` is optional.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed.
pub fn load_config(config_path: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    load_config_with_env(config_path, cli, ConfigLayer::from_env())
}

/// Same as [`load_config`] with a caller-supplied environment layer.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed.
pub fn load_config_with_env(
    config_path: Option<&Path>,
    cli: &CliOverrides,
    env_layer: ConfigLayer,
) -> Result<ConfigLayer> {
    let yaml = match config_path {
        Some(path) => {
            if !path.is_file() {
                return Err(TrackerError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            ConfigLayer::from_yaml(path)?
        }
        None => ConfigLayer::from_yaml(Path::new(DEFAULT_CONFIG_FILENAME))?,
    };

    Ok(ConfigLayer::merge_layers(&[
        default_config_layer(),
        yaml,
        env_layer,
        cli.as_layer(),
    ]))
}

/// Fully resolved, typed service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub attachments_dir: PathBuf,
    pub download_endpoint: String,
    pub lock_timeout_ms: u64,
    pub cache: CacheConfig,
}

impl ServiceConfig {
    /// Resolve typed settings from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a value is missing or malformed.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let db_path = PathBuf::from(require(layer, "db")?);
        let bind = parse_value::<SocketAddr>(layer, "bind")?;
        let attachments_dir = PathBuf::from(require(layer, "attachments-dir")?);
        let lock_timeout_ms = parse_value::<u64>(layer, "lock-timeout")?;

        let mut download_endpoint = require(layer, "download-endpoint")?.to_string();
        if !download_endpoint.ends_with('/') {
            download_endpoint.push('/');
        }

        let cache = CacheConfig {
            max_entries: parse_value::<usize>(layer, "cache.max-entries")?,
            ttl: Duration::from_secs(parse_value::<u64>(layer, "cache.ttl-seconds")?),
        };

        Ok(Self {
            db_path,
            bind,
            attachments_dir,
            download_endpoint,
            lock_timeout_ms,
            cache,
        })
    }

    /// Load and resolve in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or resolution fails.
    pub fn load(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        Self::from_layer(&load_config(config_path, cli)?)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILENAME),
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            attachments_dir: PathBuf::from(DEFAULT_ATTACHMENTS_DIR),
            download_endpoint: DEFAULT_DOWNLOAD_ENDPOINT.to_string(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            cache: CacheConfig::default(),
        }
    }
}

/// Determine if a key is startup-only.
///
/// Startup keys name resources opened once when the server boots.
#[must_use]
pub fn is_startup_key(key: &str) -> bool {
    matches!(
        normalize_key(key).as_str(),
        "db" | "bind" | "attachments-dir" | "lock-timeout"
    )
}

fn insert_key_value(layer: &mut ConfigLayer, key: &str, value: String) {
    let key = normalize_key(key);
    if is_startup_key(&key) {
        layer.startup.insert(key, value);
    } else {
        layer.runtime.insert(key, value);
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['_', '.'], "-")
}

fn get_value<'a>(layer: &'a ConfigLayer, key: &str) -> Option<&'a String> {
    let key = normalize_key(key);
    if is_startup_key(&key) {
        layer.startup.get(&key)
    } else {
        layer.runtime.get(&key)
    }
}

fn require<'a>(layer: &'a ConfigLayer, key: &str) -> Result<&'a str> {
    get_value(layer, key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TrackerError::Config(format!("missing value for '{key}'")))
}

fn parse_value<T>(layer: &ConfigLayer, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = require(layer, key)?;
    raw.parse::<T>()
        .map_err(|err| TrackerError::Config(format!("invalid value for '{key}': {raw} ({err})")))
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        insert_key_value(&mut layer, &key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_resolve() {
        let config = ServiceConfig::from_layer(&default_config_layer()).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn yaml_nested_keys_flatten_with_dots() {
        let yaml = r"
db: /var/lib/tracker.db
cache:
  max-entries: 10
  ttl-seconds: 5
";
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("parse yaml");
        let layer = layer_from_yaml_value(&value);
        assert_eq!(layer.startup.get("db").unwrap(), "/var/lib/tracker.db");
        assert_eq!(layer.runtime.get("cache-max-entries").unwrap(), "10");
        assert_eq!(layer.runtime.get("cache-ttl-seconds").unwrap(), "5");
    }

    #[test]
    fn yaml_sequence_flattens_to_csv() {
        let yaml = r"
origins:
  - a
  - b
";
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("parse yaml");
        let layer = layer_from_yaml_value(&value);
        assert_eq!(layer.runtime.get("origins").unwrap(), "a,b");
    }

    #[test]
    fn env_vars_are_prefixed_and_normalized() {
        let layer = ConfigLayer::from_env_vars(vars(&[
            ("ISSUE_TRACKER_BIND", "0.0.0.0:9000"),
            ("ISSUE_TRACKER_CACHE_MAX_ENTRIES", "3"),
            ("UNRELATED", "x"),
        ]));
        assert_eq!(layer.startup.get("bind").unwrap(), "0.0.0.0:9000");
        assert_eq!(layer.runtime.get("cache-max-entries").unwrap(), "3");
        assert!(!layer.runtime.contains_key("unrelated"));

        let merged = ConfigLayer::merge_layers(&[default_config_layer(), layer]);
        let config = ServiceConfig::from_layer(&merged).unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.cache.max_entries, 3);
    }

    #[test]
    fn precedence_cli_overrides_env_and_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tracker.yaml");
        fs::write(&path, "db: from-yaml.db\nattachments-dir: yaml-files\n").unwrap();

        let env_layer = ConfigLayer::from_env_vars(vars(&[("ISSUE_TRACKER_DB", "from-env.db")]));
        let cli = CliOverrides {
            attachments_dir: Some(PathBuf::from("cli-files")),
            ..CliOverrides::default()
        };

        let layer = load_config_with_env(Some(&path), &cli, env_layer).unwrap();
        let config = ServiceConfig::from_layer(&layer).unwrap();
        assert_eq!(config.db_path, PathBuf::from("from-env.db"));
        assert_eq!(config.attachments_dir, PathBuf::from("cli-files"));
    }

    #[test]
    fn precedence_default_is_lowest() {
        let mut yaml = ConfigLayer::default();
        yaml.runtime
            .insert("download-endpoint".to_string(), "/files/".to_string());
        let merged = ConfigLayer::merge_layers(&[default_config_layer(), yaml]);
        let config = ServiceConfig::from_layer(&merged).unwrap();
        assert_eq!(config.download_endpoint, "/files/");
        assert_eq!(config.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
    }

    #[test]
    fn download_endpoint_gets_trailing_slash() {
        let mut layer = default_config_layer();
        layer
            .runtime
            .insert("download-endpoint".to_string(), "/dl".to_string());
        let config = ServiceConfig::from_layer(&layer).unwrap();
        assert_eq!(config.download_endpoint, "/dl/");
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        let err =
            load_config_with_env(Some(&missing), &CliOverrides::default(), ConfigLayer::default())
                .unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let mut layer = default_config_layer();
        layer
            .startup
            .insert("bind".to_string(), "not-an-address".to_string());
        let err = ServiceConfig::from_layer(&layer).unwrap_err();
        assert!(err.to_string().contains("bind"));
    }

    #[test]
    fn cli_overrides_as_layer_sets_startup_keys() {
        let cli = CliOverrides {
            db: Some(PathBuf::from("x.db")),
            bind: Some("127.0.0.1:1".to_string()),
            attachments_dir: None,
            lock_timeout: Some(5),
        };
        let layer = cli.as_layer();
        assert_eq!(layer.startup.get("db").unwrap(), "x.db");
        assert_eq!(layer.startup.get("lock-timeout").unwrap(), "5");
        assert!(layer.runtime.is_empty());
        assert!(CliOverrides::default().as_layer().startup.is_empty());
    }

    #[test]
    fn is_startup_key_identifies_keys() {
        assert!(is_startup_key("db"));
        assert!(is_startup_key("attachments_dir"));
        assert!(is_startup_key("LOCK-TIMEOUT"));
        assert!(!is_startup_key("cache.max-entries"));
        assert!(!is_startup_key("download-endpoint"));
    }

    #[test]
    fn normalize_key_handles_various_formats() {
        assert_eq!(normalize_key("Cache.Max_Entries"), "cache-max-entries");
        assert_eq!(normalize_key(" bind "), "bind");
    }
}
