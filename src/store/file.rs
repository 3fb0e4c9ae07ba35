use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{CredentialStore, StoreKey};
use crate::error::Error;

/// JSON-file [`CredentialStore`] that survives process restarts.
///
/// The whole map is rewritten on every mutation through a sibling temp file
/// and a rename, so a crash never leaves a half-written session behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Store(format!("{}: {e}", path.display()))),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy, persist it, and only then make it visible.
    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        f(&mut next);
        let bytes = serde_json::to_vec_pretty(&next)?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| Error::Store(format!("{}: {e}", self.path.display())))?;

        *entries = next;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.entries.lock().get(key.as_str()).cloned()
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        self.mutate(|entries| {
            entries.insert(key.as_str().to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: StoreKey) -> Result<(), Error> {
        self.mutate(|entries| {
            entries.remove(key.as_str());
        })
    }

    fn clear(&self) -> Result<(), Error> {
        self.mutate(BTreeMap::clear)
    }
}
