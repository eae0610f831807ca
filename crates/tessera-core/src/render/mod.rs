//! # Graph Serializer
//!
//! Renders a model, or the part of it a batch touched, into the
//! transport-neutral JSON structures of a batch response.
//!
//! All ids leave this module in compact form (see `ids`).
//!
//! ## Class expression shapes
//!
//! ```text
//! Named         {"id": .., "label": .., "type": "NamedClass"}
//! Intersection  {"intersectionOf": [..]}
//! Union         {"unionOf": [..]}
//! Existential   {"type": "Restriction", "onProperty": {..}, "someValuesFrom": {..}}
//! ```

pub mod ids;

use crate::graph::GraphStore;
use crate::model::Model;
use crate::primitives::LABEL_KEY;
use crate::schema::Schema;
use crate::{Annotation, ClassExpression, Fact, IndividualId, RelationId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// RENDERED SHAPES
// =============================================================================

/// A rendered annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationJson {
    pub key: String,
    pub value: String,
}

impl From<&Annotation> for AnnotationJson {
    fn from(annotation: &Annotation) -> Self {
        Self {
            key: annotation.key.clone(),
            value: annotation.value.clone(),
        }
    }
}

/// A rendered named class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAtom {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A rendered object property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyJson {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A rendered existential restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionJson {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "onProperty")]
    pub on_property: PropertyJson,
    #[serde(rename = "someValuesFrom")]
    pub some_values_from: Box<ExpressionJson>,
}

/// A rendered class expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpressionJson {
    Named(ClassAtom),
    Intersection {
        #[serde(rename = "intersectionOf")]
        intersection_of: Vec<ExpressionJson>,
    },
    Union {
        #[serde(rename = "unionOf")]
        union_of: Vec<ExpressionJson>,
    },
    Restriction(RestrictionJson),
}

/// A rendered individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualJson {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub types: Vec<ExpressionJson>,
    #[serde(default, rename = "inferred-type", skip_serializing_if = "Vec::is_empty")]
    pub inferred_types: Vec<ExpressionJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationJson>,
}

/// A rendered fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactJson {
    pub subject: String,
    pub property: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationJson>,
}

/// Rendered model content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelPayload {
    pub individuals: Vec<IndividualJson>,
    pub facts: Vec<FactJson>,
    pub properties: Vec<PropertyJson>,
    /// Model annotations; only present on whole-model renders.
    pub annotations: Option<Vec<AnnotationJson>>,
}

// =============================================================================
// SERIALIZER
// =============================================================================

const NAMED_CLASS: &str = "NamedClass";
const OBJECT_PROPERTY: &str = "ObjectProperty";
const RESTRICTION: &str = "Restriction";

/// Renders models against one schema.
pub struct GraphSerializer<'a> {
    schema: &'a Schema,
}

impl<'a> GraphSerializer<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Render the whole model.
    pub fn render_whole(&self, model: &Model) -> ModelPayload {
        let graph = model.graph();
        let individuals: BTreeSet<IndividualId> = graph.individuals().into_iter().collect();
        let mut payload = self.render_individuals(model, &individuals, graph.facts());
        payload.annotations = Some(
            graph
                .model_annotations()
                .iter()
                .map(AnnotationJson::from)
                .collect(),
        );
        payload
    }

    /// Render only `individuals` and the facts touching them.
    ///
    /// Ids no longer present in the model are skipped.
    pub fn render_subset(&self, model: &Model, individuals: &BTreeSet<IndividualId>) -> ModelPayload {
        let graph = model.graph();
        let present: BTreeSet<IndividualId> = individuals
            .iter()
            .filter(|id| graph.contains_individual(id))
            .cloned()
            .collect();
        let facts = graph
            .facts()
            .into_iter()
            .filter(|fact| present.contains(&fact.subject) || present.contains(&fact.object))
            .collect();
        self.render_individuals(model, &present, facts)
    }

    fn render_individuals(
        &self,
        model: &Model,
        individuals: &BTreeSet<IndividualId>,
        facts: Vec<Fact>,
    ) -> ModelPayload {
        let graph = model.graph();
        let mut used: BTreeSet<RelationId> = BTreeSet::new();

        let rendered = individuals
            .iter()
            .map(|id| {
                let types = graph.types_of(id).unwrap_or_default();
                let annotations = graph.annotations_of(id).unwrap_or_default();
                for expression in &types {
                    used.extend(expression.relations().into_iter().cloned());
                }
                IndividualJson {
                    id: self.compact(id.as_str()),
                    label: annotations
                        .iter()
                        .find(|a| a.key == LABEL_KEY)
                        .map(|a| a.value.clone()),
                    types: types.iter().map(|t| self.render_expression(t)).collect(),
                    inferred_types: model
                        .oracle()
                        .types_of(id)
                        .iter()
                        .map(|t| self.render_expression(t))
                        .collect(),
                    annotations: annotations.iter().map(AnnotationJson::from).collect(),
                }
            })
            .collect();

        let facts = facts
            .into_iter()
            .map(|fact| {
                let annotations = graph.fact_annotations(&fact);
                used.insert(fact.relation.clone());
                FactJson {
                    subject: self.compact(fact.subject.as_str()),
                    property: self.compact(fact.relation.as_str()),
                    object: self.compact(fact.object.as_str()),
                    annotations: annotations.iter().map(AnnotationJson::from).collect(),
                }
            })
            .collect();

        ModelPayload {
            individuals: rendered,
            facts,
            properties: used.iter().map(|r| self.render_property(r)).collect(),
            annotations: None,
        }
    }

    /// Render one class expression.
    pub fn render_expression(&self, expression: &ClassExpression) -> ExpressionJson {
        match expression {
            ClassExpression::Named(class) => ExpressionJson::Named(ClassAtom {
                id: self.compact(class.as_str()),
                label: self.schema.class_label(class).map(str::to_string),
                kind: NAMED_CLASS.to_string(),
            }),
            ClassExpression::Intersection(operands) => ExpressionJson::Intersection {
                intersection_of: operands.iter().map(|o| self.render_expression(o)).collect(),
            },
            ClassExpression::Union(operands) => ExpressionJson::Union {
                union_of: operands.iter().map(|o| self.render_expression(o)).collect(),
            },
            ClassExpression::Existential { relation, filler } => {
                ExpressionJson::Restriction(RestrictionJson {
                    kind: RESTRICTION.to_string(),
                    on_property: self.render_property(relation),
                    some_values_from: Box::new(self.render_expression(filler)),
                })
            }
        }
    }

    /// Render one relation as a property atom.
    pub fn render_property(&self, relation: &RelationId) -> PropertyJson {
        PropertyJson {
            id: self.compact(relation.as_str()),
            label: self.schema.relation_label(relation).map(str::to_string),
            kind: OBJECT_PROPERTY.to_string(),
        }
    }

    /// Compact form of a full id.
    #[must_use]
    pub fn to_compact_id(&self, full: &str) -> String {
        self.compact(full)
    }

    /// Full form of a compact id, resolved against this serializer's schema.
    #[must_use]
    pub fn to_full_id(&self, compact: &str) -> String {
        self.schema.mapper().to_full(compact)
    }

    fn compact(&self, full: &str) -> String {
        self.schema.mapper().to_compact(full)
    }
}

// =============================================================================
// TESTS
// =============================================================================
