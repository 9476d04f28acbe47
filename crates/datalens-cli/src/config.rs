//! Layered configuration: `datalens.json`, then `DATALENS_*` env vars, then flags

use datalens_core::highlight::DEFAULT_THRESHOLD;
use datalens_core::view::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "datalens.json";
pub const DEFAULT_STORE_DIR: &str = ".datalens";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub page_size: usize,
    pub threshold: f64,
    pub store_dir: PathBuf,
    pub store_read_only: bool,
    pub data_dir: Option<PathBuf>,
    /// Print detailed diagnostics for permission errors
    pub dev: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PartialConfig {
    pub page_size: Option<usize>,
    pub threshold: Option<f64>,
    pub store_dir: Option<PathBuf>,
    pub store_read_only: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub dev: Option<bool>,
}

impl PartialConfig {
    pub fn merge(&mut self, other: PartialConfig) {
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        if other.threshold.is_some() {
            self.threshold = other.threshold;
        }
        if other.store_dir.is_some() {
            self.store_dir = other.store_dir;
        }
        if other.store_read_only.is_some() {
            self.store_read_only = other.store_read_only;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.dev.is_some() {
            self.dev = other.dev;
        }
    }
}

impl Config {
    /// Apply defaults and validate the merged layers
    pub fn from_partial(partial: PartialConfig) -> Result<Self, ConfigError> {
        let page_size = partial.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "page_size".to_string(),
                value: page_size.to_string(),
            });
        }
        let threshold = partial.threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "threshold".to_string(),
                value: threshold.to_string(),
            });
        }
        Ok(Self {
            page_size,
            threshold,
            store_dir: partial
                .store_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
            store_read_only: partial.store_read_only.unwrap_or(false),
            data_dir: partial.data_dir,
            dev: partial.dev.unwrap_or(false),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            threshold: DEFAULT_THRESHOLD,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            store_read_only: false,
            data_dir: None,
            dev: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    #[serde(alias = "pageSize", alias = "page-size")]
    page_size: Option<usize>,
    threshold: Option<f64>,
    #[serde(alias = "storeDir", alias = "store-dir")]
    store_dir: Option<PathBuf>,
    #[serde(alias = "storeReadOnly", alias = "store-read-only")]
    store_read_only: Option<bool>,
    #[serde(alias = "dataDir", alias = "data-dir")]
    data_dir: Option<PathBuf>,
    dev: Option<bool>,
}

impl FileConfig {
    fn into_partial(self) -> PartialConfig {
        PartialConfig {
            page_size: self.page_size,
            threshold: self.threshold,
            store_dir: self.store_dir,
            store_read_only: self.store_read_only,
            data_dir: self.data_dir,
            dev: self.dev,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("config file not found: {path}")]
    MissingConfig { path: PathBuf },
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

fn parse_usize(name: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn parse_f64(name: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

pub fn env_overrides(env: &BTreeMap<String, String>) -> Result<PartialConfig, ConfigError> {
    let mut partial = PartialConfig::default();
    if let Some(value) = env.get("DATALENS_PAGE_SIZE") {
        partial.page_size = Some(parse_usize("DATALENS_PAGE_SIZE", value)?);
    }
    if let Some(value) = env.get("DATALENS_THRESHOLD") {
        partial.threshold = Some(parse_f64("DATALENS_THRESHOLD", value)?);
    }
    if let Some(value) = env.get("DATALENS_STORE_DIR") {
        partial.store_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = env.get("DATALENS_STORE_READ_ONLY") {
        partial.store_read_only = Some(parse_bool("DATALENS_STORE_READ_ONLY", value)?);
    }
    if let Some(value) = env.get("DATALENS_DATA_DIR") {
        partial.data_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = env.get("DATALENS_DEV") {
        partial.dev = Some(parse_bool("DATALENS_DEV", value)?);
    }
    Ok(partial)
}

pub fn load_config_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: FileConfig =
        serde_json::from_str(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parsed.into_partial())
}

pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}

/// Merge file, env and flag layers; later layers win
pub fn resolve_config(
    explicit: Option<&Path>,
    cwd: &Path,
    env: &BTreeMap<String, String>,
    cli: PartialConfig,
) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let mut partial = PartialConfig::default();

    let config_path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::MissingConfig {
                    path: path.to_path_buf(),
                });
            }
            Some(path.to_path_buf())
        }
        None => find_config_path(cwd),
    };

    if let Some(path) = config_path.as_ref() {
        partial.merge(load_config_file(path)?);
    }

    partial.merge(env_overrides(env)?);
    partial.merge(cli);

    Ok((Config::from_partial(partial)?, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.store_dir, PathBuf::from(".datalens"));
        assert!(!config.dev);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_resolves_config_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let child = root.join("nested");
        fs::create_dir_all(&child).expect("create nested dir");
        fs::write(
            root.join(CONFIG_FILE_NAME),
            r#"{"pageSize": 25, "threshold": 0.8, "dataDir": "data", "dev": true}"#,
        )
        .expect("write config");

        let mut env = BTreeMap::new();
        env.insert("DATALENS_THRESHOLD".to_string(), "0.6".to_string());
        env.insert("DATALENS_STORE_DIR".to_string(), "/tmp/store".to_string());

        let cli = PartialConfig {
            page_size: Some(10),
            ..PartialConfig::default()
        };

        let (config, path) = resolve_config(None, &child, &env, cli).expect("resolve");
        assert_eq!(path, Some(root.join(CONFIG_FILE_NAME)));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.data_dir, Some(PathBuf::from("data")));
        assert!(config.dev);
    }

    #[test]
    fn test_missing_explicit_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = temp.path().join("nope.json");

        let result = resolve_config(
            Some(&missing),
            temp.path(),
            &BTreeMap::new(),
            PartialConfig::default(),
        );
        assert!(matches!(result, Err(ConfigError::MissingConfig { .. })));
    }

    #[test]
    fn test_invalid_env_values() {
        let mut env = BTreeMap::new();
        env.insert("DATALENS_PAGE_SIZE".to_string(), "0".to_string());
        assert!(matches!(
            env_overrides(&env),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut env = BTreeMap::new();
        env.insert("DATALENS_DEV".to_string(), "maybe".to_string());
        assert!(env_overrides(&env).is_err());

        let mut env = BTreeMap::new();
        env.insert("DATALENS_STORE_READ_ONLY".to_string(), "yes".to_string());
        assert_eq!(env_overrides(&env).unwrap().store_read_only, Some(true));
    }

    #[test]
    fn test_zero_page_size_rejected_in_every_layer() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(CONFIG_FILE_NAME), r#"{"pageSize": 0}"#)
            .expect("write config");
        let from_file = resolve_config(
            None,
            temp.path(),
            &BTreeMap::new(),
            PartialConfig::default(),
        );
        assert!(matches!(from_file, Err(ConfigError::InvalidValue { .. })));

        let empty = tempfile::tempdir().expect("tempdir");
        let from_flag = resolve_config(
            None,
            empty.path(),
            &BTreeMap::new(),
            PartialConfig {
                page_size: Some(0),
                ..PartialConfig::default()
            },
        );
        assert!(matches!(from_flag, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let result = Config::from_partial(PartialConfig {
            threshold: Some(f64::NAN),
            ..PartialConfig::default()
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let ok = Config::from_partial(PartialConfig {
            threshold: Some(0.7),
            ..PartialConfig::default()
        })
        .expect("valid config");
        assert_eq!(ok.threshold, 0.7);
        assert_eq!(ok.page_size, 50);
    }

    #[test]
    fn test_bad_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{not json").expect("write config");

        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::ParseFile { .. })
        ));
    }
}
