//! # Model Registry
//!
//! Maps model ids to live models and owns their lifecycle.
//!
//! ## Locking
//!
//! - One registry-wide mutex guards the id -> slot map.
//! - Each slot is its own mutex; a batch holds a slot for its whole dispatch.
//! - The map lock is never held while waiting on a slot lock.
//!
//! The API is synchronous. Locks are taken with tokio's `blocking_*`
//! methods, so callers inside an async runtime must run it on a blocking
//! thread (`tokio::task::spawn_blocking`).

use crate::codec::{ExportFormat, JsonCodec, ModelCodec};
use crate::corpus::{CorpusSource, StaticCorpus};
use crate::generator::{ModelGenerator, blank_model_id, generated_model_id};
use crate::graph::{Axiom, AxiomChange, Graph, GraphStore};
use crate::model::Model;
use crate::mutation::{MutationGateway, Policy};
use crate::oracle::{OracleFactory, SchemaOracleFactory};
use crate::primitives::SOURCE_KEY;
use crate::schema::Schema;
use crate::storage::{MemoryStore, ModelStore};
use crate::{Annotation, TesseraError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A registry slot.
pub type ModelHandle = Arc<Mutex<Model>>;

/// Exclusive access to one model, held for the duration of a batch.
pub type ModelLease = OwnedMutexGuard<Model>;

/// How a new model comes into being.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateKind {
    /// Seed from a corpus. Deterministic id; replaces any model with that id.
    Generate { seed_class: String, corpus: String },
    /// An empty model under a fresh id.
    GenerateBlank { corpus: Option<String> },
    /// A model read from exported text.
    Import { text: String },
}

/// The registry of live models.
#[derive(Debug)]
pub struct ModelRegistry {
    schema: Arc<Schema>,
    store: Arc<dyn ModelStore>,
    oracles: Arc<dyn OracleFactory>,
    corpus: Arc<dyn CorpusSource>,
    codec: Arc<dyn ModelCodec>,
    models: Mutex<BTreeMap<String, ModelHandle>>,
}

impl ModelRegistry {
    /// Registry with in-memory storage, the schema oracle, no corpora and
    /// the JSON codec.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            store: Arc::new(MemoryStore::new()),
            oracles: Arc::new(SchemaOracleFactory),
            corpus: Arc::new(StaticCorpus::new()),
            codec: Arc::new(JsonCodec),
            models: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ModelStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_oracles(mut self, oracles: Arc<dyn OracleFactory>) -> Self {
        self.oracles = oracles;
        self
    }

    #[must_use]
    pub fn with_corpus(mut self, corpus: Arc<dyn CorpusSource>) -> Self {
        self.corpus = corpus;
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn ModelCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// The background schema shared by every model.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn empty_model(&self, id: String) -> Result<Model, TesseraError> {
        Model::new(id, Graph::new(), self.oracles.create(&self.schema))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Create and register a model. Returns its id and slot.
    ///
    /// New models start dirty so the next `save_all` persists them.
    pub fn create(&self, kind: CreateKind) -> Result<(String, ModelHandle), TesseraError> {
        let model = match kind {
            CreateKind::Generate { seed_class, corpus } => {
                let annotations = self.corpus.annotations(&corpus)?;
                let mut model = self.empty_model(generated_model_id(&corpus, &seed_class))?;
                let report = ModelGenerator::new(&self.schema).seed(
                    &mut model,
                    &seed_class,
                    &corpus,
                    &annotations,
                )?;
                tracing::info!(
                    model = model.id(),
                    individuals = report.individuals,
                    rejected = report.rejected,
                    "generated model"
                );
                model
            }
            CreateKind::GenerateBlank { corpus } => {
                let mut model = self.empty_model(blank_model_id(corpus.as_deref()))?;
                if let Some(corpus) = corpus {
                    MutationGateway::apply(
                        &mut model,
                        &[AxiomChange::Add(Axiom::ModelAnnotation(Annotation::new(
                            SOURCE_KEY, corpus,
                        )))],
                        Policy::Strict,
                    )?;
                }
                tracing::info!(model = model.id(), "created blank model");
                model
            }
            CreateKind::Import { text } => {
                let snapshot = self.codec.read(&text)?;
                let taken = self.models.blocking_lock().contains_key(&snapshot.id)
                    || self.store.load(&snapshot.id)?.is_some();
                if taken {
                    return Err(TesseraError::ImportError(format!(
                        "model {} already exists",
                        snapshot.id
                    )));
                }
                let model = Model::from_snapshot(snapshot, self.oracles.create(&self.schema))?;
                tracing::info!(model = model.id(), "imported model");
                model
            }
        };

        Ok(self.register(model))
    }

    fn register(&self, mut model: Model) -> (String, ModelHandle) {
        model.dirty = true;
        let id = model.id().to_string();
        let handle = Arc::new(Mutex::new(model));
        let displaced = self
            .models
            .blocking_lock()
            .insert(id.clone(), Arc::clone(&handle));

        if let Some(displaced) = displaced {
            tracing::debug!(model = %id, "disposing displaced model");
            displaced.blocking_lock().dispose();
        }
        (id, handle)
    }

    /// The slot for `id`, lazy-loading it from storage if needed.
    ///
    /// Loading runs without the map lock. If another caller registers `id`
    /// meanwhile, its slot wins and the freshly loaded copy is discarded.
    pub fn get(&self, id: &str) -> Result<ModelHandle, TesseraError> {
        if let Some(handle) = self.models.blocking_lock().get(id) {
            return Ok(Arc::clone(handle));
        }

        let snapshot = self
            .store
            .load(id)?
            .ok_or_else(|| TesseraError::UnknownModel(id.to_string()))?;
        let mut model = Model::from_snapshot(snapshot, self.oracles.create(&self.schema))?;

        let mut models = self.models.blocking_lock();
        if let Some(existing) = models.get(id) {
            let existing = Arc::clone(existing);
            drop(models);
            model.dispose();
            return Ok(existing);
        }
        let handle = Arc::new(Mutex::new(model));
        models.insert(id.to_string(), Arc::clone(&handle));
        tracing::debug!(model = id, "lazy-loaded model from storage");
        Ok(handle)
    }

    /// Lock the model `id` for exclusive use.
    ///
    /// The lease is only handed out while `id` still maps to the locked slot;
    /// a slot unlinked or replaced during the wait is skipped.
    pub fn lease(&self, id: &str) -> Result<ModelLease, TesseraError> {
        loop {
            let handle = self.get(id)?;
            let lease = Arc::clone(&handle).blocking_lock_owned();
            let current = self
                .models
                .blocking_lock()
                .get(id)
                .is_some_and(|slot| Arc::ptr_eq(slot, &handle));
            if current {
                return Ok(lease);
            }
            drop(lease);
            tracing::debug!(model = id, "slot replaced while waiting, retrying");
        }
    }

    /// Persist the model `id`.
    pub fn save(&self, id: &str) -> Result<(), TesseraError> {
        let handle = self.get(id)?;
        let mut model = handle.blocking_lock();
        self.save_model(&mut model)
    }

    /// Persist a model the caller already holds.
    pub fn save_model(&self, model: &mut Model) -> Result<(), TesseraError> {
        self.store.store(&model.snapshot())?;
        model.mark_clean();
        tracing::info!(model = model.id(), "saved model");
        Ok(())
    }

    /// Persist every dirty registered model. Returns how many were written.
    pub fn save_all(&self) -> Result<usize, TesseraError> {
        let handles: Vec<ModelHandle> = self.models.blocking_lock().values().cloned().collect();
        let mut saved = 0;
        for handle in handles {
            let mut model = handle.blocking_lock();
            if model.is_dirty() {
                self.save_model(&mut model)?;
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Drop the model from the registry and release its oracle.
    ///
    /// Unsaved changes are lost; a later `get` reloads the stored copy.
    pub fn unlink(&self, id: &str) -> bool {
        let removed = self.models.blocking_lock().remove(id);
        match removed {
            Some(handle) => {
                handle.blocking_lock().dispose();
                tracing::info!(model = id, "unlinked model");
                true
            }
            None => false,
        }
    }

    /// Drop the registry entry only. Persisted storage is untouched.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.models.blocking_lock().remove(id).is_some();
        if removed {
            tracing::info!(model = id, "deleted model from registry");
        }
        removed
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Ids of registered models.
    #[must_use]
    pub fn list_ids(&self) -> BTreeSet<String> {
        self.models.blocking_lock().keys().cloned().collect()
    }

    /// Ids of registered and stored models.
    pub fn available_ids(&self) -> Result<BTreeSet<String>, TesseraError> {
        let mut ids = self.list_ids();
        ids.extend(self.store.ids()?);
        Ok(ids)
    }

    /// Model annotations of `id`.
    ///
    /// A stored model that is not registered is read from its snapshot
    /// without being registered.
    pub fn annotations_of(&self, id: &str) -> Result<Vec<Annotation>, TesseraError> {
        let registered = self.models.blocking_lock().get(id).cloned();
        if let Some(handle) = registered {
            return Ok(handle.blocking_lock().graph().model_annotations());
        }
        self.store
            .load(id)?
            .map(|snapshot| snapshot.graph.annotations)
            .ok_or_else(|| TesseraError::UnknownModel(id.to_string()))
    }

    /// Render a model as export text.
    pub fn export(&self, model: &Model, format: ExportFormat) -> Result<String, TesseraError> {
        self.codec.write(&model.snapshot(), format)
    }
}

// =============================================================================
// TESTS
// =============================================================================
