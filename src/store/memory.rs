use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CredentialStore, StoreKey};
use crate::error::Error;

/// In-process [`CredentialStore`]. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an arbitrary key, including ones the client does not own.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Write an arbitrary key, e.g. data cached by other parts of the app.
    pub fn set_raw(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_owned(), value.to_owned());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.get_raw(key.as_str())
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        self.set_raw(key.as_str(), value);
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), Error> {
        self.entries.write().remove(key.as_str());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.entries.write().clear();
        Ok(())
    }
}
