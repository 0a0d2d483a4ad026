use std::path::{Path, PathBuf};

use depot_cache::DEFAULT_CACHE_SPEC;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for a Depot instance, usually read from `depot.toml`.
///
/// Every field is optional in the file. A `cache_spec` of `""` disables
/// the repository cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub root_dir: PathBuf,
    pub cache_spec: Option<String>,
    pub worker_threads: usize,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("data"),
            cache_spec: Some(DEFAULT_CACHE_SPEC.to_string()),
            worker_threads: 4,
        }
    }
}

impl DepotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The cache spec to hand to the manager, `None` when caching is off.
    pub fn cache_spec(&self) -> Option<&str> {
        self.cache_spec.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = DepotConfig::default();
        assert_eq!(c.root_dir, PathBuf::from("data"));
        assert_eq!(c.cache_spec(), Some(DEFAULT_CACHE_SPEC));
        assert_eq!(c.worker_threads, 4);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depot.toml");
        std::fs::write(&path, "root_dir = \"/srv/depot\"\n").unwrap();

        let c = DepotConfig::load(&path).unwrap();
        assert_eq!(c.root_dir, PathBuf::from("/srv/depot"));
        assert_eq!(c.worker_threads, 4);
        assert_eq!(c.cache_spec(), Some(DEFAULT_CACHE_SPEC));
    }

    #[test]
    fn blank_cache_spec_disables_cache() {
        let c: DepotConfig = toml::from_str("cache_spec = \"  \"").unwrap();
        assert_eq!(c.cache_spec(), None);
    }

    #[test]
    fn missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(DepotConfig::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "worker_threads = \"many\"").unwrap();
        assert!(matches!(DepotConfig::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn round_trips_through_toml() {
        let c = DepotConfig {
            root_dir: "/tmp/d".into(),
            cache_spec: Some("maximumSize=10".into()),
            worker_threads: 2,
        };
        let text = toml::to_string(&c).unwrap();
        assert_eq!(toml::from_str::<DepotConfig>(&text).unwrap(), c);
    }
}
