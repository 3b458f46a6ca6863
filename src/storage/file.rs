//! JSON-file backed key-value store.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;

use crate::storage::{KeyValueStore, StorageError};

/// Durable store: every key lives in one JSON object on disk, mirrored in
/// memory for reads. Each write rewrites the file through a temp file and
/// rename so a crash never leaves a half-written state file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store, loading existing contents if the file exists.
    ///
    /// An unreadable or corrupt file is logged and treated as empty; the next
    /// write replaces it.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();

        if path.exists() {
            match read_state(&path) {
                Ok(map) => {
                    for (k, v) in map {
                        inner.insert(k, v);
                    }
                    tracing::debug!(path = ?path, keys = inner.len(), "Loaded state file");
                }
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "State file unusable, starting empty");
                }
            }
        }

        Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let map: BTreeMap<String, String> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &map)?;
            writer.flush()?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        for (key, value) in entries {
            self.inner.insert(key.to_string(), value.to_string());
        }
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.inner.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
