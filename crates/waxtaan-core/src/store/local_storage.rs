//! File-backed key/value storage for client-side state.
//!
//! Plays the role browser `localStorage` plays for the web client: a flat
//! string map persisted as JSON in the data dir. The bearer token is kept
//! under [`TOKEN_KEY`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{LOCAL_STORAGE_FILE, TOKEN_KEY};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct LocalStorage {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl LocalStorage {
    /// Open the store in `data_dir`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        let path = data_dir.as_ref().join(LOCAL_STORAGE_FILE);
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StorageError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), StorageError> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(&self.values).map_err(|source| {
            StorageError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;

        // Write-then-rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

/// Handle on the persisted bearer token. Every call re-reads storage, so a
/// logout from another process is seen on the next poll.
#[derive(Debug, Clone)]
pub struct TokenStore {
    data_dir: PathBuf,
}

impl TokenStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn token(&self) -> Result<Option<String>, StorageError> {
        let storage = LocalStorage::open(&self.data_dir)?;
        Ok(storage
            .get(TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        LocalStorage::open(&self.data_dir)?.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        LocalStorage::open(&self.data_dir)?.remove(TOKEN_KEY)
    }
}
