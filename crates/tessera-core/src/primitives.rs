//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Tessera engine.
//!
//! These are compiled into the binary and are immutable at runtime.
//! Schema-dependent values (labels, aliases, disjointness) live in `Schema`.

/// Magic bytes for the persisted model snapshot header.
///
/// - Snapshot = Magic Bytes ("TSRA") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"TSRA";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to `SerializableGraph`.
pub const FORMAT_VERSION: u8 = 1;

/// Namespace used when a schema definition does not name one.
pub const DEFAULT_NAMESPACE: &str = "http://purl.obolibrary.org/obo/";

/// Prefix of every model identifier.
pub const MODEL_ID_PREFIX: &str = "gomodel:";

/// Compact id of the relation linking generated activities to their process.
pub const PART_OF: &str = "BFO:0000050";

/// Compact id of the relation linking an activity to its gene product.
pub const ENABLED_BY: &str = "RO:0002333";

/// Annotation key whose value is used as an individual's label.
pub const LABEL_KEY: &str = "label";

/// Annotation key recording the corpus a model was generated from.
pub const SOURCE_KEY: &str = "source";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of requests in a single batch call.
pub const MAX_BATCH_REQUESTS: usize = 1000;

/// Maximum nesting depth of a class expression received on the wire.
///
/// Bounds recursion in both conversion and rendering.
pub const MAX_EXPRESSION_DEPTH: usize = 32;

/// Maximum depth walked when computing superclass closures.
pub const MAX_ANCESTOR_DEPTH: usize = 64;
