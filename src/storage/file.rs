//! Storage backed by a single JSON object on disk.
//!
//! Every write rewrites the file through a temporary sibling and a rename,
//! so a crash never leaves a half-written store behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Storage, StorageError, StorageResult};

const DEFAULT_FILE_NAME: &str = "storage.json";

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage in the platform data directory for this application.
    pub fn default_location() -> StorageResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "gradegate").ok_or_else(|| {
            StorageError::Unavailable("no home directory for application data".into())
        })?;
        Ok(Self::new(dirs.data_dir().join(DEFAULT_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => Ok(map),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Discarding corrupt storage file");
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> StorageResult<R> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut items = self.read_all()?;
        let result = f(&mut items);
        self.write_all(&items)?;
        Ok(result)
    }
}

impl Storage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<bool> {
        self.modify(|items| items.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.into_keys().collect())
    }
}
