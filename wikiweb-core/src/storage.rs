//! Persistence backends for the wiki state.

use crate::web::Web;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stored data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("More than one stored web has the address '{0}'")]
    DuplicateWeb(String),
}

/// System-wide setup state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub setup_complete: bool,
}

/// Everything a backend hands back on startup
#[derive(Debug, Default)]
pub struct StoredWiki {
    pub system: SystemState,
    pub webs: Vec<Web>,
}

pub trait Storage: Send + Sync {
    fn load(&self) -> Result<StoredWiki, StorageError>;
    fn save_system(&self, system: &SystemState) -> Result<(), StorageError>;
    fn save_web(&self, web: &Web) -> Result<(), StorageError>;
    fn delete_web(&self, address: &str) -> Result<(), StorageError>;
}

/// Keeps nothing; the wiki lives only in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl Storage for NoPersistence {
    fn load(&self) -> Result<StoredWiki, StorageError> {
        Ok(StoredWiki::default())
    }

    fn save_system(&self, _system: &SystemState) -> Result<(), StorageError> {
        Ok(())
    }

    fn save_web(&self, _web: &Web) -> Result<(), StorageError> {
        Ok(())
    }

    fn delete_web(&self, _address: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// One JSON document per web plus one for the system state:
///
/// ```text
/// <root>/system.json
/// <root>/webs/<address>.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn system_path(&self) -> PathBuf {
        self.root.join("system.json")
    }

    fn webs_dir(&self) -> PathBuf {
        self.root.join("webs")
    }

    fn web_path(&self, address: &str) -> PathBuf {
        self.webs_dir().join(format!("{}.json", encode_file_name(address)))
    }

    /// Write through a temporary sibling so readers never see a partial file.
    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, path).map_err(|source| io_error(path, source))?;

        debug!(path = %path.display(), "Saved");
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, StorageError> {
        let contents = fs::read(path).map_err(|source| io_error(path, source))?;
        serde_json::from_slice(&contents).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<StoredWiki, StorageError> {
        let system_path = self.system_path();
        let system = if system_path.exists() {
            Self::read_json(&system_path)?
        } else {
            SystemState::default()
        };

        let mut webs = Vec::new();
        let dir = self.webs_dir();
        if dir.is_dir() {
            let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
            let mut paths = Vec::new();
            for entry in entries {
                let path = entry.map_err(|source| io_error(&dir, source))?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    paths.push(path);
                }
            }
            paths.sort();
            for path in paths {
                webs.push(Self::read_json::<Web>(&path)?);
            }
        }

        debug!(root = %self.root.display(), webs = webs.len(), "Loaded stored wiki");
        Ok(StoredWiki { system, webs })
    }

    fn save_system(&self, system: &SystemState) -> Result<(), StorageError> {
        self.write_atomic(&self.system_path(), system)
    }

    fn save_web(&self, web: &Web) -> Result<(), StorageError> {
        self.write_atomic(&self.web_path(web.address()), web)
    }

    fn delete_web(&self, address: &str) -> Result<(), StorageError> {
        let path = self.web_path(address);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(&path, source)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Web addresses are user supplied; keep file names to a safe alphabet.
fn encode_file_name(address: &str) -> String {
    let mut out = String::with_capacity(address.len());
    for byte in address.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use chrono::Utc;

    #[test]
    fn test_file_name_encoding() {
        assert_eq!(encode_file_name("wiki1"), "wiki1");
        assert_eq!(encode_file_name("../etc"), "%2E%2E%2Fetc");
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());

        let mut web = Web::new("wiki1", "Wiki1");
        web.write_page("HomePage", "hello", Author::new("Guest", "127.0.0.1"), Utc::now())
            .unwrap();
        storage.save_web(&web).unwrap();
        storage
            .save_system(&SystemState {
                password: Some("pswd".into()),
                setup_complete: true,
            })
            .unwrap();

        let loaded = storage.load().unwrap();
        assert!(loaded.system.setup_complete);
        assert_eq!(loaded.webs.len(), 1);
        assert_eq!(loaded.webs[0].address(), "wiki1");
        assert!(!dir.path().join("webs/wiki1.json.tmp").exists());

        storage.delete_web("wiki1").unwrap();
        storage.delete_web("wiki1").unwrap();
        assert!(storage.load().unwrap().webs.is_empty());
    }

    #[test]
    fn test_load_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = JsonFileStorage::new(dir.path().join("missing")).load().unwrap();
        assert_eq!(loaded.system, SystemState::default());
        assert!(loaded.webs.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("system.json"), "{not json").unwrap();
        let err = JsonFileStorage::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
    }
}
