//! Batch call and request shapes as received from a client.

use super::response::mint_packet_id;
use crate::primitives::MAX_EXPRESSION_DEPTH;
use crate::render::ids::IdMapper;
use crate::{Annotation, ClassExpression, RelationId, TesseraError};
use serde::{Deserialize, Serialize};

// =============================================================================
// CALL
// =============================================================================

/// One batch call: an ordered list of requests plus passthrough fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchCall {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub intention: String,
    #[serde(default, alias = "packetId")]
    pub packet_id: Option<String>,
    #[serde(default)]
    pub requests: Vec<BatchRequest>,
    /// Set by the transport; not part of the request body.
    #[serde(skip)]
    pub privileged: bool,
}

impl BatchCall {
    /// A call with the given intention and requests.
    #[must_use]
    pub fn new(intention: impl Into<String>, requests: Vec<BatchRequest>) -> Self {
        Self {
            intention: intention.into(),
            requests,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_packet_id(mut self, packet_id: impl Into<String>) -> Self {
        self.packet_id = Some(packet_id.into());
        self
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// The caller's packet id, or a fresh one if it is absent or empty.
    #[must_use]
    pub fn packet_id_or_mint(&self) -> String {
        self.packet_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(mint_packet_id)
    }
}

/// One request of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub entity: String,
    pub operation: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl BatchRequest {
    #[must_use]
    pub fn new(entity: impl Into<String>, operation: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            entity: entity.into(),
            operation: operation.into(),
            arguments,
        }
    }
}

/// A key/value pair on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Request arguments. Which fields are read depends on the operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Arguments {
    #[serde(default, alias = "modelId", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
    #[serde(default, alias = "corpusRef", skip_serializing_if = "Option::is_none")]
    pub corpus_ref: Option<String>,
    #[serde(default, alias = "importModel", skip_serializing_if = "Option::is_none")]
    pub import_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Vec<WireExpression>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<KeyValue>>,
}

/// Read a required string argument; empty strings count as absent.
pub(crate) fn required<'a>(value: Option<&'a String>, field: &str) -> Result<&'a str, TesseraError> {
    value
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TesseraError::MissingParameter(format!("request.arguments.{}", field)))
}

impl Arguments {
    /// `values` as annotations; `MissingParameter` if absent or empty.
    pub(crate) fn annotations(&self) -> Result<Vec<Annotation>, TesseraError> {
        match &self.values {
            Some(values) if !values.is_empty() => Ok(values
                .iter()
                .map(|kv| Annotation::new(kv.key.clone(), kv.value.clone()))
                .collect()),
            _ => Err(TesseraError::MissingParameter(
                "request.arguments.values".to_string(),
            )),
        }
    }

    /// Class expressions named by `subject` and `expressions`, in that order.
    ///
    /// `MissingParameter` if neither yields one.
    pub(crate) fn class_expressions(
        &self,
        mapper: &IdMapper,
    ) -> Result<Vec<ClassExpression>, TesseraError> {
        let mut classes = Vec::new();
        if let Some(subject) = self.subject.as_deref().filter(|s| !s.trim().is_empty()) {
            classes.push(ClassExpression::named(mapper.to_full(subject)));
        }
        for expression in self.expressions.iter().flatten() {
            classes.push(expression.to_class_expression(mapper)?);
        }
        if classes.is_empty() {
            return Err(TesseraError::MissingParameter(
                "request.arguments.subject".to_string(),
            ));
        }
        Ok(classes)
    }
}

// =============================================================================
// CLASS EXPRESSIONS ON THE WIRE
// =============================================================================

/// A class expression as sent by a client, in compact ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireExpression {
    Class {
        id: String,
    },
    Svf {
        property: String,
        filler: Box<WireExpression>,
    },
    Intersection {
        expressions: Vec<WireExpression>,
    },
    Union {
        expressions: Vec<WireExpression>,
    },
}

impl WireExpression {
    /// Resolve to a `ClassExpression` with full ids.
    pub fn to_class_expression(&self, mapper: &IdMapper) -> Result<ClassExpression, TesseraError> {
        self.resolve(mapper, 0)
    }

    fn resolve(&self, mapper: &IdMapper, depth: usize) -> Result<ClassExpression, TesseraError> {
        if depth >= MAX_EXPRESSION_DEPTH {
            return Err(TesseraError::InvalidExpression(format!(
                "nesting exceeds {} levels",
                MAX_EXPRESSION_DEPTH
            )));
        }
        match self {
            Self::Class { id } => {
                if id.trim().is_empty() {
                    return Err(TesseraError::InvalidExpression("empty class id".to_string()));
                }
                Ok(ClassExpression::named(mapper.to_full(id)))
            }
            Self::Svf { property, filler } => {
                if property.trim().is_empty() {
                    return Err(TesseraError::InvalidExpression(
                        "empty restriction property".to_string(),
                    ));
                }
                Ok(ClassExpression::some(
                    RelationId(mapper.to_full(property)),
                    filler.resolve(mapper, depth + 1)?,
                ))
            }
            Self::Intersection { expressions } => Ok(ClassExpression::Intersection(
                Self::resolve_all(expressions, mapper, depth, "intersection")?,
            )),
            Self::Union { expressions } => Ok(ClassExpression::Union(Self::resolve_all(
                expressions,
                mapper,
                depth,
                "union",
            )?)),
        }
    }

    fn resolve_all(
        expressions: &[WireExpression],
        mapper: &IdMapper,
        depth: usize,
        kind: &str,
    ) -> Result<Vec<ClassExpression>, TesseraError> {
        if expressions.is_empty() {
            return Err(TesseraError::InvalidExpression(format!("empty {}", kind)));
        }
        expressions
            .iter()
            .map(|e| e.resolve(mapper, depth + 1))
            .collect()
    }
}

// =============================================================================
// VOCABULARY
// =============================================================================

/// Request entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Individual,
    Edge,
    Model,
    Relations,
    Evidence,
}

impl Entity {
    /// Parse an entity name; `UnknownEntity` otherwise.
    pub fn parse(name: &str) -> Result<Self, TesseraError> {
        match name {
            "individual" => Ok(Self::Individual),
            "edge" => Ok(Self::Edge),
            "model" => Ok(Self::Model),
            "relations" => Ok(Self::Relations),
            "evidence" => Ok(Self::Evidence),
            other => Err(TesseraError::UnknownEntity(other.to_string())),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Edge => "edge",
            Self::Model => "model",
            Self::Relations => "relations",
            Self::Evidence => "evidence",
        }
    }
}

/// Request operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Create,
    Remove,
    Add,
    AddType,
    RemoveType,
    AddAnnotation,
    RemoveAnnotation,
    Generate,
    GenerateBlank,
    Export,
    Import,
    Store,
    AllModelIds,
    AllModelMeta,
    Search,
    Undo,
    Redo,
    GetUndoRedo,
}

impl Operation {
    /// Parse an operation name. `None` if it is not in the vocabulary.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let operation = match name {
            "get" => Self::Get,
            "create" => Self::Create,
            "remove" => Self::Remove,
            "add" => Self::Add,
            "add-type" => Self::AddType,
            "remove-type" => Self::RemoveType,
            "add-annotation" => Self::AddAnnotation,
            "remove-annotation" => Self::RemoveAnnotation,
            "generate" => Self::Generate,
            "generate-blank" => Self::GenerateBlank,
            "export" => Self::Export,
            "import" => Self::Import,
            "store" => Self::Store,
            "all-model-ids" => Self::AllModelIds,
            "all-model-meta" => Self::AllModelMeta,
            "search" => Self::Search,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "get-undo-redo" => Self::GetUndoRedo,
            _ => return None,
        };
        Some(operation)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Add => "add",
            Self::AddType => "add-type",
            Self::RemoveType => "remove-type",
            Self::AddAnnotation => "add-annotation",
            Self::RemoveAnnotation => "remove-annotation",
            Self::Generate => "generate",
            Self::GenerateBlank => "generate-blank",
            Self::Export => "export",
            Self::Import => "import",
            Self::Store => "store",
            Self::AllModelIds => "all-model-ids",
            Self::AllModelMeta => "all-model-meta",
            Self::Search => "search",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::GetUndoRedo => "get-undo-redo",
        }
    }
}

/// Whether `(entity, operation)` is a solo-only meta operation.
///
/// Unrecognized names are never meta.
#[must_use]
pub fn is_meta(entity: &str, operation: &str) -> bool {
    matches!(
        (Entity::parse(entity).ok(), Operation::parse(operation)),
        (
            Some(Entity::Model),
            Some(Operation::Export | Operation::AllModelIds | Operation::AllModelMeta)
        ) | (Some(Entity::Relations | Entity::Evidence), Some(Operation::Get))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::DEFAULT_NAMESPACE;

    fn mapper() -> IdMapper {
        let mut mapper = IdMapper::new(DEFAULT_NAMESPACE);
        mapper.insert_alias("enabled_by", format!("{}RO_0002333", DEFAULT_NAMESPACE));
        mapper
    }

    #[test]
    fn call_parses_kebab_case_keys() {
        let call: BatchCall = serde_json::from_str(
            r#"{
                "uid": "u1",
                "intention": "action",
                "packet-id": "p1",
                "requests": [{
                    "entity": "individual",
                    "operation": "add-type",
                    "arguments": {
                        "model-id": "gomodel:a",
                        "individual": "gomodel-a:1",
                        "expressions": [{"type": "class", "id": "GO:0008150"}]
                    }
                }]
            }"#,
        )
        .expect("parse");

        assert_eq!(call.packet_id.as_deref(), Some("p1"));
        let arguments = &call.requests[0].arguments;
        assert_eq!(arguments.model_id.as_deref(), Some("gomodel:a"));
        assert_eq!(arguments.expressions.as_ref().map(Vec::len), Some(1));
        assert!(!call.privileged);
    }

    #[test]
    fn empty_packet_id_is_replaced() {
        let call = BatchCall::new("query", Vec::new()).with_packet_id("");
        assert!(!call.packet_id_or_mint().is_empty());
        assert_eq!(call.with_packet_id("p-7").packet_id_or_mint(), "p-7");
    }

    #[test]
    fn nested_expression_resolves() {
        let wire: WireExpression = serde_json::from_value(serde_json::json!({
            "type": "intersection",
            "expressions": [
                {"type": "class", "id": "GO:0003674"},
                {"type": "svf", "property": "enabled_by", "filler": {"type": "class", "id": "UniProtKB:P1"}}
            ]
        }))
        .expect("wire");

        let expression = wire.to_class_expression(&mapper()).expect("resolve");
        let relations = expression.relations();
        assert_eq!(relations.len(), 1);
        assert_eq!(
            relations[0].as_str(),
            "http://purl.obolibrary.org/obo/RO_0002333"
        );
    }

    #[test]
    fn empty_operands_are_invalid() {
        let wire = WireExpression::Union {
            expressions: Vec::new(),
        };
        assert!(matches!(
            wire.to_class_expression(&mapper()),
            Err(TesseraError::InvalidExpression(_))
        ));
    }

    #[test]
    fn deep_nesting_is_invalid() {
        let mut wire = WireExpression::Class { id: "GO:1".into() };
        for _ in 0..=MAX_EXPRESSION_DEPTH {
            wire = WireExpression::Svf {
                property: "enabled_by".into(),
                filler: Box::new(wire),
            };
        }
        assert!(matches!(
            wire.to_class_expression(&mapper()),
            Err(TesseraError::InvalidExpression(_))
        ));
    }

    #[test]
    fn missing_arguments_name_the_field() {
        let arguments = Arguments::default();
        assert!(matches!(
            arguments.annotations(),
            Err(TesseraError::MissingParameter(field)) if field == "request.arguments.values"
        ));
        assert!(matches!(
            required(arguments.model_id.as_ref(), "model-id"),
            Err(TesseraError::MissingParameter(field)) if field == "request.arguments.model-id"
        ));
    }

    #[test]
    fn vocabulary_parses() {
        assert_eq!(Entity::parse("edge").expect("edge"), Entity::Edge);
        assert!(matches!(Entity::parse("graph"), Err(TesseraError::UnknownEntity(_))));
        assert_eq!(Operation::parse("get-undo-redo"), Some(Operation::GetUndoRedo));
        assert_eq!(Operation::parse("explode"), None);
        assert!(is_meta("model", "export"));
        assert!(is_meta("relations", "get"));
        assert!(!is_meta("model", "get"));
        assert!(!is_meta("nonsense", "export"));
    }
}
