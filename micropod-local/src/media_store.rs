use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use micropod_core::models::recorded_audio::sha256_hex;
use micropod_core::{MediaStore, RecordedAudio, StoreError, UserId};

use crate::config::LocalStoreConfig;

const LOCATOR_SCHEME: &str = "file://";

/// Object attributes kept in a JSON sidecar next to each upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub owner: UserId,
    pub recording_id: String,
    pub duration_secs: u32,
}

/// Object storage in a directory tree: `{root}/{bucket}/{prefix}/{file_name}`.
///
/// Objects are write-once. Uploading to a name that already exists fails.
pub struct LocalMediaStore {
    config: LocalStoreConfig,
}

impl LocalMediaStore {
    pub fn new(config: LocalStoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Validation)?;
        let dir = config.objects_dir();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LocalStoreConfig {
        &self.config
    }

    /// Where `file_name` lives on disk. Rejects names that would escape the
    /// bucket.
    pub fn object_path(&self, file_name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(file_name);
        let valid = !file_name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::Validation(format!("invalid object name {:?}", file_name)));
        }
        Ok(self.config.objects_dir().join(relative))
    }

    /// Read an object back through the locator `upload` returned.
    pub fn fetch(&self, locator: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve_locator(locator)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(locator.to_string()),
            _ => StoreError::Storage(format!("failed to read {}: {}", path.display(), e)),
        })
    }

    pub fn metadata(&self, file_name: &str) -> Result<ObjectMetadata, StoreError> {
        let path = sidecar_path(&self.object_path(file_name)?);
        let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(file_name.to_string()),
            _ => StoreError::Storage(format!("failed to read metadata: {}", e)),
        })?;
        serde_json::from_str(&json).map_err(|e| StoreError::Storage(format!("failed to parse metadata: {}", e)))
    }

    fn resolve_locator(&self, locator: &str) -> Result<PathBuf, StoreError> {
        let raw = locator
            .strip_prefix(LOCATOR_SCHEME)
            .ok_or_else(|| StoreError::Validation(format!("not a local locator: {}", locator)))?;
        let path = fs::canonicalize(raw).map_err(|_| StoreError::NotFound(locator.to_string()))?;
        let objects = fs::canonicalize(self.config.objects_dir())
            .map_err(|e| StoreError::Storage(format!("object directory unavailable: {}", e)))?;
        if !path.starts_with(&objects) {
            return Err(StoreError::Validation(format!("locator outside the bucket: {}", locator)));
        }
        Ok(path)
    }

    fn write_object(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("failed to create directory: {}", e)))?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StoreError::Storage(format!("object already exists: {}", path.display())),
                _ => StoreError::Storage(format!("failed to create object: {}", e)),
            })?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::Storage(format!("failed to write object: {}", e)))
    }
}

impl MediaStore for LocalMediaStore {
    fn upload(&self, owner: &UserId, audio: &RecordedAudio, file_name: &str) -> Result<String, StoreError> {
        let path = self.object_path(file_name)?;
        debug!("Uploading {} bytes to {}", audio.len(), path.display());

        let checksum = sha256_hex(audio.bytes());
        if checksum != audio.checksum {
            return Err(StoreError::Validation(format!("checksum mismatch for recording {}", audio.id)));
        }

        self.write_object(&path, audio.bytes())?;

        let metadata = ObjectMetadata {
            content_type: audio.mime_type.clone(),
            cache_control: self.config.cache_control(),
            checksum,
            size_bytes: audio.len() as u64,
            owner: owner.clone(),
            recording_id: audio.id.clone(),
            duration_secs: audio.duration_secs,
        };
        // Objects are write-once: never leave one behind without its sidecar.
        let locator = match seal_object(&path, &metadata) {
            Ok(locator) => locator,
            Err(e) => {
                warn!("Rolling back upload of {}: {}", file_name, e);
                remove_object(&path);
                return Err(e);
            }
        };
        info!("Stored {} ({} bytes) for {}", file_name, audio.len(), owner);
        Ok(locator)
    }
}

/// Write the sidecar for a freshly written object and return its locator.
fn seal_object(path: &Path, metadata: &ObjectMetadata) -> Result<String, StoreError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| StoreError::Storage(format!("failed to serialize metadata: {}", e)))?;
    fs::write(sidecar_path(path), json).map_err(|e| StoreError::Storage(format!("failed to write metadata: {}", e)))?;
    let absolute = fs::canonicalize(path)
        .map_err(|e| StoreError::Storage(format!("failed to resolve {}: {}", path.display(), e)))?;
    Ok(format!("{}{}", LOCATOR_SCHEME, absolute.display()))
}

fn remove_object(path: &Path) {
    for file in [path.to_path_buf(), sidecar_path(path)] {
        if file.is_file() {
            if let Err(e) = fs::remove_file(&file) {
                warn!("Failed to remove {}: {}", file.display(), e);
            }
        }
    }
}

fn sidecar_path(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_os_string();
    name.push(".metadata.json");
    PathBuf::from(name)
}
