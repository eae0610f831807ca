//! # redb-backed Model Storage
//!
//! A disk-backed model store using the redb embedded database.
//!
//! One table maps model ids to encoded snapshots. Every `store` is its own
//! write transaction; redb provides crash safety and MVCC for readers.

use super::ModelStore;
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::model::ModelSnapshot;
use crate::TesseraError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeSet;
use std::path::Path;

/// Table for models: model id -> encoded snapshot bytes
const MODELS: TableDefinition<&str, &[u8]> = TableDefinition::new("models");

fn io_err(e: impl std::fmt::Display) -> TesseraError {
    TesseraError::IoError(e.to_string())
}

/// A disk-backed model store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a model database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TesseraError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize the table so read transactions never miss it
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(MODELS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }
}

impl ModelStore for RedbStore {
    fn load(&self, id: &str) -> Result<Option<ModelSnapshot>, TesseraError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(MODELS).map_err(io_err)?;
        let Some(guard) = table.get(id).map_err(io_err)? else {
            return Ok(None);
        };
        snapshot_from_bytes(guard.value()).map(Some)
    }

    fn store(&self, snapshot: &ModelSnapshot) -> Result<(), TesseraError> {
        let bytes = snapshot_to_bytes(snapshot)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(MODELS).map_err(io_err)?;
            table
                .insert(snapshot.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        tracing::debug!(model = %snapshot.id, bytes = bytes.len(), "stored model snapshot");
        Ok(())
    }

    fn ids(&self) -> Result<BTreeSet<String>, TesseraError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(MODELS).map_err(io_err)?;
        let mut ids = BTreeSet::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            ids.insert(key.value().to_string());
        }
        Ok(ids)
    }
}
