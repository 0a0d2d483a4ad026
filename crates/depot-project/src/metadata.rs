//! Creation metadata persisted in every entity directory.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use depot_types::{Author, CreationTime};
use serde::{Deserialize, Serialize};

/// File holding an entity's [`CreationMetadata`].
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed metadata in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Who created an entity, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationMetadata {
    pub name: String,
    pub author: Author,
    #[serde(rename = "creation_time_millis")]
    pub creation_time: CreationTime,
}

impl CreationMetadata {
    pub fn new(name: impl Into<String>, author: Author, creation_time: CreationTime) -> Self {
        Self {
            name: name.into(),
            author,
            creation_time,
        }
    }

    /// Read the metadata file in `dir`.
    pub fn read(dir: &Path) -> Result<Self, MetadataError> {
        let path = dir.join(METADATA_FILE);
        let raw = std::fs::read(&path).map_err(|source| MetadataError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| MetadataError::Malformed { path, source })
    }

    /// Write the metadata file in `dir` atomically: the file is either
    /// absent or complete.
    pub fn write(&self, dir: &Path) -> Result<(), MetadataError> {
        let path = dir.join(METADATA_FILE);
        let io_err = |source: io::Error| MetadataError::Io {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(self).map_err(|source| MetadataError::Malformed {
            path: path.clone(),
            source,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CreationMetadata {
        CreationMetadata::new(
            "alpha",
            Author::new("Alice", "alice@example.com").unwrap(),
            CreationTime::from_millis(1000),
        )
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        sample().write(dir.path()).unwrap();
        assert_eq!(CreationMetadata::read(dir.path()).unwrap(), sample());
        // Only the metadata file remains; the temp file was renamed into place.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn on_disk_format() {
        let dir = tempfile::tempdir().unwrap();
        sample().write(dir.path()).unwrap();
        let raw = std::fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["name"], "alpha");
        assert_eq!(json["author"]["email"], "alice@example.com");
        assert_eq!(json["creation_time_millis"], 1000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CreationMetadata::read(dir.path()),
            Err(MetadataError::Io { .. })
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), b"{not json").unwrap();
        assert!(matches!(
            CreationMetadata::read(dir.path()),
            Err(MetadataError::Malformed { .. })
        ));
    }
}
