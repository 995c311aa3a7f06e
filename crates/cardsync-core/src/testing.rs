//! In-memory stores for unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::documents::DocumentStore;
use crate::models::DocumentHandle;
use crate::state::{StateStore, SyncState};
use crate::{Error, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<DocumentHandle, String>>,
    unreadable: HashSet<DocumentHandle>,
    read_only: HashSet<DocumentHandle>,
    writes: Mutex<Vec<DocumentHandle>>,
}

impl MemoryDocumentStore {
    pub fn new<'a>(documents: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            documents: Mutex::new(
                documents
                    .into_iter()
                    .map(|(handle, text)| (DocumentHandle::new(handle), text.to_string()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn unreadable(mut self, handle: &str) -> Self {
        self.unreadable.insert(DocumentHandle::new(handle));
        self
    }

    pub fn read_only(mut self, handle: &str) -> Self {
        self.read_only.insert(DocumentHandle::new(handle));
        self
    }

    pub fn text(&self, handle: &str) -> String {
        lock(&self.documents)
            .get(&DocumentHandle::new(handle))
            .cloned()
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<DocumentHandle> {
        lock(&self.writes).clone()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        Ok(lock(&self.documents).keys().cloned().collect())
    }

    fn read_document(&self, handle: &DocumentHandle) -> Result<String> {
        if self.unreadable.contains(handle) {
            return Err(Error::Document(format!("cannot read {handle}")));
        }
        lock(&self.documents)
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::Document(format!("no such document {handle}")))
    }

    fn write_document(&self, handle: &DocumentHandle, text: &str) -> Result<()> {
        if self.read_only.contains(handle) {
            return Err(Error::Document(format!("cannot write {handle}")));
        }
        lock(&self.documents).insert(handle.clone(), text.to_string());
        lock(&self.writes).push(handle.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    saved: Mutex<Option<SyncState>>,
    fail_persist: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<SyncState> {
        lock(&self.saved).clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<SyncState> {
        Ok(lock(&self.saved).clone().unwrap_or_default())
    }

    fn persist(&self, state: &SyncState) -> Result<()> {
        if self.fail_persist {
            return Err(Error::StatePersistence("disk full".to_string()));
        }
        *lock(&self.saved) = Some(state.clone());
        Ok(())
    }
}
