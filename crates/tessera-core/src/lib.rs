//! # tessera-core
//!
//! The batch model-mutation engine for Tessera.
//!
//! Clients edit small typed instance graphs ("models") over a shared
//! background schema by sending ordered batches of requests. This crate
//! registers the models, routes the requests, keeps each model's
//! consistency oracle in step with its graph, and renders what changed.
//!
//! ## Architectural Constraints
//!
//! - Synchronous API: no async fns, no network
//! - Deterministic rendering: BTreeMap/BTreeSet only
//! - External collaborators are traits: `GraphStore`, `ConsistencyOracle`,
//!   `CorpusSource`, `ModelCodec`, `ModelStore`
//! - Every model change goes through `MutationGateway`

// =============================================================================
// MODULES
// =============================================================================

pub mod batch;
pub mod codec;
pub mod corpus;
pub mod formats;
pub mod generator;
pub mod graph;
pub mod model;
pub mod mutation;
pub mod oracle;
pub mod primitives;
pub mod registry;
pub mod render;
pub mod schema;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Annotation, ClassExpression, ClassId, Fact, IndividualId, RelationId, TesseraError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use batch::{BatchCall, BatchDispatcher, BatchRequest, BatchResponse, Signal};
pub use graph::{Axiom, AxiomChange, Graph, GraphStore, SerializableGraph};
pub use model::{Model, ModelSnapshot};
pub use mutation::{MutationGateway, OperationResponse, Policy, removal_cascade};
pub use registry::{CreateKind, ModelHandle, ModelRegistry};
pub use render::GraphSerializer;
pub use render::ids::IdMapper;
pub use schema::{Schema, SchemaDefinition};

// =============================================================================
// RE-EXPORTS: Collaborators
// =============================================================================

pub use codec::{ExportFormat, JsonCodec, ModelCodec};
pub use corpus::{CorpusAnnotation, CorpusDefinition, CorpusSource, StaticCorpus};
pub use oracle::{ConsistencyOracle, OracleFactory, SchemaOracle, SchemaOracleFactory};
pub use storage::{MemoryStore, ModelStore, RedbStore};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes};
