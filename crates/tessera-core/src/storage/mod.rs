//! # Model Storage
//!
//! Persisted storage the registry lazy-loads from and saves to.
//!
//! - `MemoryStore`: process-local, used by tests and the default registry
//! - `RedbStore`: disk-backed, used by the app
//!
//! Both keep snapshots in the binary persistence format, so a record written
//! by one can be read by the other.

mod redb_store;

pub use redb_store::RedbStore;

use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::model::ModelSnapshot;
use crate::TesseraError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::RwLock;

/// Persisted model storage.
///
/// Durability guarantees are the implementation's concern.
pub trait ModelStore: Send + Sync + Debug {
    /// Load a snapshot, or `None` if nothing is stored under `id`.
    fn load(&self, id: &str) -> Result<Option<ModelSnapshot>, TesseraError>;

    /// Write a snapshot, replacing any previous record for its id.
    fn store(&self, snapshot: &ModelSnapshot) -> Result<(), TesseraError>;

    /// Ids of all stored models.
    fn ids(&self) -> Result<BTreeSet<String>, TesseraError>;
}

/// In-memory store holding encoded snapshots.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> TesseraError {
    TesseraError::IoError("memory store lock poisoned".to_string())
}

impl ModelStore for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<ModelSnapshot>, TesseraError> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(id)
            .map(Vec::as_slice)
            .map(snapshot_from_bytes)
            .transpose()
    }

    fn store(&self, snapshot: &ModelSnapshot) -> Result<(), TesseraError> {
        let bytes = snapshot_to_bytes(snapshot)?;
        self.records
            .write()
            .map_err(poisoned)?
            .insert(snapshot.id.clone(), bytes);
        Ok(())
    }

    fn ids(&self) -> Result<BTreeSet<String>, TesseraError> {
        Ok(self.records.read().map_err(poisoned)?.keys().cloned().collect())
    }
}
