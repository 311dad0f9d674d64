use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use micropod_core::StoreError;

/// Where and how the local backend keeps its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStoreConfig {
    /// Root directory for objects and the episode table.
    pub root: PathBuf,
    /// Object storage bucket name (a directory under `root`).
    pub bucket: String,
    /// Prefix inside the bucket that uploads land under.
    pub public_prefix: String,
    /// `Cache-Control: max-age` recorded for each object, in seconds.
    pub cache_control_secs: u32,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("micropod-data"),
            bucket: "podcasts".into(),
            public_prefix: "public".into(),
            cache_control_secs: 3600,
        }
    }
}

impl LocalStoreConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let json = fs::read_to_string(path)
            .map_err(|e| StoreError::Storage(format!("failed to read config {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| StoreError::Validation(format!("failed to parse config {}: {}", path.display(), e)))?;
        config.validate().map_err(StoreError::Validation)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("root must not be empty".into());
        }
        for (name, value) in [("bucket", &self.bucket), ("public_prefix", &self.public_prefix)] {
            if value.is_empty() {
                return Err(format!("{} must not be empty", name));
            }
            if value.contains(['/', '\\']) || value == "." || value == ".." {
                return Err(format!("{} must be a single path segment, got {:?}", name, value));
            }
        }
        Ok(())
    }

    /// Directory uploaded objects are written to.
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(&self.bucket).join(&self.public_prefix)
    }

    pub fn episodes_path(&self) -> PathBuf {
        self.root.join("episodes.json")
    }

    pub fn cache_control(&self) -> String {
        format!("max-age={}", self.cache_control_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LocalStoreConfig::with_root("/srv/pods");
        assert!(config.validate().is_ok());
        assert_eq!(config.objects_dir(), PathBuf::from("/srv/pods/podcasts/public"));
        assert_eq!(config.episodes_path(), PathBuf::from("/srv/pods/episodes.json"));
        assert_eq!(config.cache_control(), "max-age=3600");
    }

    #[test]
    fn rejects_nested_bucket() {
        let config = LocalStoreConfig {
            bucket: "a/b".into(),
            ..LocalStoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LocalStoreConfig {
            public_prefix: "..".into(),
            ..LocalStoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"root": "/data", "cache_control_secs": 60}"#).unwrap();

        let config = LocalStoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.bucket, "podcasts");
        assert_eq!(config.cache_control_secs, 60);
    }

    #[test]
    fn invalid_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"bucket": ""}"#).unwrap();
        assert!(matches!(
            LocalStoreConfig::from_json_file(&path),
            Err(StoreError::Validation(_))
        ));

        assert!(matches!(
            LocalStoreConfig::from_json_file(&dir.path().join("missing.json")),
            Err(StoreError::Storage(_))
        ));
    }
}
