//! # Model
//!
//! A live model: its instance graph paired with its own consistency oracle.
//!
//! Fields are private; changes go through `mutation::MutationGateway`,
//! which keeps the dirty flag and the oracle's view in step.

use crate::graph::{Graph, SerializableGraph};
use crate::oracle::ConsistencyOracle;
use crate::TesseraError;
use serde::{Deserialize, Serialize};

/// A model as written to persisted storage and export envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub id: String,
    pub graph: SerializableGraph,
}

/// An editable instance graph scoped by an identifier.
#[derive(Debug)]
pub struct Model {
    id: String,
    pub(crate) graph: Graph,
    pub(crate) oracle: Box<dyn ConsistencyOracle>,
    pub(crate) dirty: bool,
}

impl Model {
    /// Bind a graph to a fresh oracle and classify it once.
    pub fn new(
        id: impl Into<String>,
        graph: Graph,
        oracle: Box<dyn ConsistencyOracle>,
    ) -> Result<Self, TesseraError> {
        let mut model = Self {
            id: id.into(),
            graph,
            oracle,
            dirty: false,
        };
        model.flush()?;
        Ok(model)
    }

    /// Rebuild a model from a persisted or imported snapshot.
    pub fn from_snapshot(
        snapshot: ModelSnapshot,
        oracle: Box<dyn ConsistencyOracle>,
    ) -> Result<Self, TesseraError> {
        Self::new(snapshot.id, Graph::from(snapshot.graph), oracle)
    }

    /// The model identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read access to the instance graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Read access to the oracle.
    #[must_use]
    pub fn oracle(&self) -> &dyn ConsistencyOracle {
        self.oracle.as_ref()
    }

    /// Whether the model changed since it was created, loaded or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Re-classify via the oracle.
    pub fn flush(&mut self) -> Result<(), TesseraError> {
        self.oracle.flush(&self.graph)
    }

    /// Consistency as of the last flush.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.oracle.is_consistent()
    }

    /// Serializable copy of the model.
    #[must_use]
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            id: self.id.clone(),
            graph: SerializableGraph::from(&self.graph),
        }
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn dispose(&mut self) {
        self.oracle.dispose();
        self.graph = Graph::new();
    }
}
