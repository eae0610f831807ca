//! # Core Type Definitions
//!
//! This module contains the value types shared by every engine component:
//! - Identifiers (`IndividualId`, `ClassId`, `RelationId`)
//! - Type descriptors (`ClassExpression`)
//! - Graph payload (`Fact`, `Annotation`)
//! - Error types (`TesseraError`)
//!
//! ## Ordering Guarantees
//!
//! All types in this module implement `Ord` so they can live in
//! `BTreeMap`/`BTreeSet` and render in a stable order.
//!
//! Identifier newtypes always hold FULL identifiers. Compact identifiers only
//! exist at the wire boundary (see `render::ids`).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Full identifier of an individual, scoped to its model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndividualId(pub String);

/// Full identifier of a schema class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub String);

/// Full identifier of an object relation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(pub String);

macro_rules! impl_identifier {
    ($($name:ident),*) => {
        $(
            impl $name {
                /// Wrap a full identifier.
                #[must_use]
                pub fn new(s: impl Into<String>) -> Self {
                    Self(s.into())
                }

                /// Get the identifier as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

impl_identifier!(IndividualId, ClassId, RelationId);

// =============================================================================
// CLASS EXPRESSIONS
// =============================================================================

/// A type descriptor attached to an individual.
///
/// Only `Named` expressions carry an identifier that round-trips through the
/// compact/full mapping; the compound variants are rendered structurally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassExpression {
    /// A named schema class.
    Named(ClassId),
    /// All of the operands hold.
    Intersection(Vec<ClassExpression>),
    /// At least one of the operands holds.
    Union(Vec<ClassExpression>),
    /// Some `relation` edge leads to an instance of `filler`.
    Existential {
        relation: RelationId,
        filler: Box<ClassExpression>,
    },
}

impl ClassExpression {
    /// Shorthand for a named class expression.
    #[must_use]
    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(ClassId::new(id))
    }

    /// Shorthand for an existential restriction.
    #[must_use]
    pub fn some(relation: RelationId, filler: ClassExpression) -> Self {
        Self::Existential {
            relation,
            filler: Box::new(filler),
        }
    }

    /// Every relation mentioned anywhere in this expression.
    pub fn relations(&self) -> Vec<&RelationId> {
        let mut out = Vec::new();
        self.collect_relations(&mut out);
        out
    }

    fn collect_relations<'a>(&'a self, out: &mut Vec<&'a RelationId>) {
        match self {
            Self::Named(_) => {}
            Self::Intersection(operands) | Self::Union(operands) => {
                for operand in operands {
                    operand.collect_relations(out);
                }
            }
            Self::Existential { relation, filler } => {
                out.push(relation);
                filler.collect_relations(out);
            }
        }
    }
}

// =============================================================================
// ANNOTATIONS & FACTS
// =============================================================================

/// A `(key, value)` pair on an individual, a fact, or a model.
///
/// Annotations are a multiset: the same key (and even the same pair) may
/// appear more than once on one target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

impl Annotation {
    /// Create a new annotation.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A directed, relation-typed edge between two individuals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub subject: IndividualId,
    pub relation: RelationId,
    pub object: IndividualId,
}

impl Fact {
    /// Create a new fact.
    #[must_use]
    pub fn new(subject: IndividualId, relation: RelationId, object: IndividualId) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }

    /// Whether the individual is either endpoint of this fact.
    #[must_use]
    pub fn involves(&self, individual: &IndividualId) -> bool {
        &self.subject == individual || &self.object == individual
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.object)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Tessera engine.
///
/// - No silent failures
/// - Use `Result<T, TesseraError>` for fallible operations
/// - The engine never panics; the batch dispatcher turns every variant into
///   an error response
#[derive(Debug, Error)]
pub enum TesseraError {
    /// A required request argument is absent.
    #[error("Expected non-empty {0} in request")]
    MissingParameter(String),

    /// Two requests of one batch name different models.
    #[error("Using multiple model ids in one batch call is not supported: {pinned} and {found}")]
    MultipleModelIds { pinned: String, found: String },

    /// A solo-only operation was combined with other requests.
    #[error("{0} cannot be combined with other operations")]
    IncompatibleBatch(String),

    /// The batch exceeds the request limit.
    #[error("Batch of {0} requests exceeds the maximum of {1}")]
    BatchTooLarge(usize, usize),

    /// The request entity is not part of the protocol.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// The `(entity, operation)` pair is not routed.
    #[error("Unknown operation: {entity}/{operation}")]
    UnknownOperation { entity: String, operation: String },

    /// No request of the batch resolved a model.
    #[error("Empty batch calls are not supported, at least one request is required")]
    EmptyBatch,

    /// A class expression in the request is malformed.
    #[error("Invalid class expression: {0}")]
    InvalidExpression(String),

    /// A protocol operation exists but has no implementation.
    #[error("Operation not implemented: {0}")]
    NotImplemented(String),

    /// The model is neither registered nor in persisted storage.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The individual is not declared in the model.
    #[error("Unknown individual: {0}")]
    UnknownIndividual(String),

    /// The fact does not exist in the model.
    #[error("Unknown fact: {0}")]
    UnknownFact(String),

    /// The corpus loader has no corpus under this name.
    #[error("Unknown corpus: {0}")]
    UnknownCorpus(String),

    /// A removal would leave dependent axioms dangling.
    #[error("Still in use: {0}")]
    InUse(String),

    /// Serialized model text could not be imported.
    #[error("Import failed: {0}")]
    ImportError(String),

    /// The consistency oracle failed to classify the model.
    #[error("Consistency oracle failure: {0}")]
    OracleFailure(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration or schema definition is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TesseraError {
    /// Stable variant name, used in response commentary.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MissingParameterError",
            Self::MultipleModelIds { .. } => "MultipleModelIdsError",
            Self::IncompatibleBatch(_) => "IncompatibleBatchError",
            Self::BatchTooLarge(..) => "BatchTooLargeError",
            Self::UnknownEntity(_) => "UnknownEntityError",
            Self::UnknownOperation { .. } => "UnknownOperationError",
            Self::EmptyBatch => "EmptyBatchError",
            Self::InvalidExpression(_) => "InvalidExpressionError",
            Self::NotImplemented(_) => "NotImplemented",
            Self::UnknownModel(_) => "UnknownModelError",
            Self::UnknownIndividual(_) => "UnknownIndividualError",
            Self::UnknownFact(_) => "UnknownFactError",
            Self::UnknownCorpus(_) => "UnknownCorpusError",
            Self::InUse(_) => "InUseError",
            Self::ImportError(_) => "ImportError",
            Self::OracleFailure(_) => "OracleFailure",
            Self::SerializationError(_) => "SerializationError",
            Self::IoError(_) => "IoError",
            Self::InvalidConfig(_) => "InvalidConfigError",
        }
    }

    /// Whether the error describes a malformed batch rather than an internal
    /// failure. Protocol errors are reported without commentary.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_)
                | Self::MultipleModelIds { .. }
                | Self::IncompatibleBatch(_)
                | Self::BatchTooLarge(..)
                | Self::UnknownEntity(_)
                | Self::UnknownOperation { .. }
                | Self::EmptyBatch
                | Self::InvalidExpression(_)
                | Self::NotImplemented(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_relations_walks_nested_operands() {
        let part_of = RelationId::new("http://x.org/part_of");
        let enabled_by = RelationId::new("http://x.org/enabled_by");
        let expr = ClassExpression::Intersection(vec![
            ClassExpression::named("http://x.org/A"),
            ClassExpression::some(
                part_of.clone(),
                ClassExpression::Union(vec![
                    ClassExpression::named("http://x.org/B"),
                    ClassExpression::some(enabled_by.clone(), ClassExpression::named("http://x.org/C")),
                ]),
            ),
        ]);

        assert_eq!(expr.relations(), vec![&part_of, &enabled_by]);
    }

    #[test]
    fn fact_involves_either_endpoint() {
        let a = IndividualId::new("a");
        let b = IndividualId::new("b");
        let fact = Fact::new(a.clone(), RelationId::new("r"), b.clone());

        assert!(fact.involves(&a));
        assert!(fact.involves(&b));
        assert!(!fact.involves(&IndividualId::new("c")));
    }

    #[test]
    fn protocol_errors_are_classified() {
        assert!(TesseraError::EmptyBatch.is_protocol());
        assert!(TesseraError::NotImplemented("model/undo".into()).is_protocol());
        assert!(!TesseraError::OracleFailure("boom".into()).is_protocol());
        assert!(!TesseraError::UnknownModel("gomodel:x".into()).is_protocol());
    }

    #[test]
    fn error_messages_name_the_offender() {
        let err = TesseraError::MultipleModelIds {
            pinned: "gomodel:a".into(),
            found: "gomodel:b".into(),
        };
        let text = err.to_string();
        assert!(text.contains("gomodel:a"));
        assert!(text.contains("gomodel:b"));
        assert_eq!(err.kind(), "MultipleModelIdsError");
    }
}
