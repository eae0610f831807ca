//! # Graph Store
//!
//! The instance graph of one model: individuals, their types and
//! annotations, facts between them, and model-level annotations.
//!
//! This module implements the `GraphStore` trait.
//! All data structures use `BTreeMap` for deterministic ordering.
//!
//! The graph only changes through `AxiomChange` primitives. Every change has
//! an exact inverse, which is what strict-mode rollback relies on; to keep
//! that true, removals never cascade here. A removal that would orphan
//! dependent axioms fails with `TesseraError::InUse` and the caller must
//! expand it first (see `mutation::removal_cascade`).

use crate::{Annotation, ClassExpression, Fact, IndividualId, TesseraError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// AXIOMS
// =============================================================================

/// The unit of change applied to a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axiom {
    /// The individual exists.
    Declaration(IndividualId),
    /// The individual is an instance of the class expression.
    ClassAssertion {
        individual: IndividualId,
        class: ClassExpression,
    },
    /// A relation-typed edge between two declared individuals.
    Fact(Fact),
    /// An annotation on an individual.
    IndividualAnnotation {
        individual: IndividualId,
        annotation: Annotation,
    },
    /// An annotation on an existing fact.
    FactAnnotation { fact: Fact, annotation: Annotation },
    /// An annotation on the model itself.
    ModelAnnotation(Annotation),
}

impl Axiom {
    /// Individuals this axiom is about.
    pub fn individuals(&self) -> Vec<IndividualId> {
        match self {
            Self::Declaration(individual)
            | Self::ClassAssertion { individual, .. }
            | Self::IndividualAnnotation { individual, .. } => vec![individual.clone()],
            Self::Fact(fact) | Self::FactAnnotation { fact, .. } => {
                vec![fact.subject.clone(), fact.object.clone()]
            }
            Self::ModelAnnotation(_) => Vec::new(),
        }
    }
}

/// Adding or removing one axiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxiomChange {
    Add(Axiom),
    Remove(Axiom),
}

impl AxiomChange {
    /// The change that exactly undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Add(axiom) => Self::Remove(axiom.clone()),
            Self::Remove(axiom) => Self::Add(axiom.clone()),
        }
    }

    /// The axiom being added or removed.
    #[must_use]
    pub fn axiom(&self) -> &Axiom {
        match self {
            Self::Add(axiom) | Self::Remove(axiom) => axiom,
        }
    }
}

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the instance-graph capability a model needs.
///
/// Read accessors return owned values so that persistent or remote stores
/// can implement the trait without borrowing from internal caches.
pub trait GraphStore {
    /// Apply one change. Returns `true` if the graph changed, `false` if the
    /// change was a no-op (duplicate add, absent remove).
    fn apply(&mut self, change: &AxiomChange) -> Result<bool, TesseraError>;

    /// Check if an individual is declared.
    fn contains_individual(&self, individual: &IndividualId) -> bool;

    /// Check if a fact exists.
    fn contains_fact(&self, fact: &Fact) -> bool;

    /// All declared individuals, in order.
    fn individuals(&self) -> Vec<IndividualId>;

    /// Asserted types of an individual.
    fn types_of(&self, individual: &IndividualId) -> Result<Vec<ClassExpression>, TesseraError>;

    /// Annotations of an individual, sorted.
    fn annotations_of(&self, individual: &IndividualId) -> Result<Vec<Annotation>, TesseraError>;

    /// All facts, in order.
    fn facts(&self) -> Vec<Fact>;

    /// Annotations of a fact, sorted.
    fn fact_annotations(&self, fact: &Fact) -> Vec<Annotation>;

    /// Model-level annotations, sorted.
    fn model_annotations(&self) -> Vec<Annotation>;

    /// Facts whose subject or object is the individual.
    fn facts_involving(&self, individual: &IndividualId) -> Vec<Fact> {
        self.facts()
            .into_iter()
            .filter(|fact| fact.involves(individual))
            .collect()
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IndividualRecord {
    types: BTreeSet<ClassExpression>,
    annotations: Vec<Annotation>,
}

/// The in-memory instance graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// Declared individuals with their types and annotations.
    individuals: BTreeMap<IndividualId, IndividualRecord>,
    /// Facts with their annotations.
    facts: BTreeMap<Fact, Vec<Annotation>>,
    /// Model-level annotations.
    annotations: Vec<Annotation>,
    /// Next sequence number handed out for minted individual ids.
    next_sequence: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared individuals.
    #[must_use]
    pub fn individual_count(&self) -> usize {
        self.individuals.len()
    }

    /// Number of facts.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Hand out the next sequence number for an individual id.
    pub(crate) fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }

    fn record_mut(
        &mut self,
        individual: &IndividualId,
    ) -> Result<&mut IndividualRecord, TesseraError> {
        self.individuals
            .get_mut(individual)
            .ok_or_else(|| TesseraError::UnknownIndividual(individual.to_string()))
    }

    fn record(&self, individual: &IndividualId) -> Result<&IndividualRecord, TesseraError> {
        self.individuals
            .get(individual)
            .ok_or_else(|| TesseraError::UnknownIndividual(individual.to_string()))
    }

    fn add(&mut self, axiom: &Axiom) -> Result<bool, TesseraError> {
        match axiom {
            Axiom::Declaration(individual) => {
                if self.individuals.contains_key(individual) {
                    return Ok(false);
                }
                self.individuals
                    .insert(individual.clone(), IndividualRecord::default());
                Ok(true)
            }
            Axiom::ClassAssertion { individual, class } => {
                Ok(self.record_mut(individual)?.types.insert(class.clone()))
            }
            Axiom::Fact(fact) => {
                for endpoint in [&fact.subject, &fact.object] {
                    if !self.individuals.contains_key(endpoint) {
                        return Err(TesseraError::UnknownIndividual(endpoint.to_string()));
                    }
                }
                if self.facts.contains_key(fact) {
                    return Ok(false);
                }
                self.facts.insert(fact.clone(), Vec::new());
                Ok(true)
            }
            Axiom::IndividualAnnotation {
                individual,
                annotation,
            } => {
                insert_sorted(&mut self.record_mut(individual)?.annotations, annotation);
                Ok(true)
            }
            Axiom::FactAnnotation { fact, annotation } => {
                let annotations = self
                    .facts
                    .get_mut(fact)
                    .ok_or_else(|| TesseraError::UnknownFact(fact.to_string()))?;
                insert_sorted(annotations, annotation);
                Ok(true)
            }
            Axiom::ModelAnnotation(annotation) => {
                insert_sorted(&mut self.annotations, annotation);
                Ok(true)
            }
        }
    }

    fn remove(&mut self, axiom: &Axiom) -> Result<bool, TesseraError> {
        match axiom {
            Axiom::Declaration(individual) => {
                let Some(record) = self.individuals.get(individual) else {
                    return Ok(false);
                };
                let has_facts = self.facts.keys().any(|fact| fact.involves(individual));
                if !record.types.is_empty() || !record.annotations.is_empty() || has_facts {
                    return Err(TesseraError::InUse(individual.to_string()));
                }
                self.individuals.remove(individual);
                Ok(true)
            }
            Axiom::ClassAssertion { individual, class } => {
                Ok(self.record_mut(individual)?.types.remove(class))
            }
            Axiom::Fact(fact) => match self.facts.get(fact) {
                None => Ok(false),
                Some(annotations) if !annotations.is_empty() => {
                    Err(TesseraError::InUse(fact.to_string()))
                }
                Some(_) => {
                    self.facts.remove(fact);
                    Ok(true)
                }
            },
            Axiom::IndividualAnnotation {
                individual,
                annotation,
            } => Ok(remove_one(
                &mut self.record_mut(individual)?.annotations,
                annotation,
            )),
            Axiom::FactAnnotation { fact, annotation } => Ok(self
                .facts
                .get_mut(fact)
                .map(|annotations| remove_one(annotations, annotation))
                .unwrap_or(false)),
            Axiom::ModelAnnotation(annotation) => Ok(remove_one(&mut self.annotations, annotation)),
        }
    }
}

// Annotation lists are kept sorted. Equal annotations are interchangeable,
// so an `Add` after a `Remove` (or the reverse) restores the exact list.

fn insert_sorted(annotations: &mut Vec<Annotation>, annotation: &Annotation) {
    let index = annotations.partition_point(|a| a <= annotation);
    annotations.insert(index, annotation.clone());
}

/// Remove one occurrence of `annotation`.
fn remove_one(annotations: &mut Vec<Annotation>, annotation: &Annotation) -> bool {
    match annotations.binary_search(annotation) {
        Ok(index) => {
            annotations.remove(index);
            true
        }
        Err(_) => false,
    }
}

impl GraphStore for Graph {
    fn apply(&mut self, change: &AxiomChange) -> Result<bool, TesseraError> {
        match change {
            AxiomChange::Add(axiom) => self.add(axiom),
            AxiomChange::Remove(axiom) => self.remove(axiom),
        }
    }

    fn contains_individual(&self, individual: &IndividualId) -> bool {
        self.individuals.contains_key(individual)
    }

    fn contains_fact(&self, fact: &Fact) -> bool {
        self.facts.contains_key(fact)
    }

    fn individuals(&self) -> Vec<IndividualId> {
        self.individuals.keys().cloned().collect()
    }

    fn types_of(&self, individual: &IndividualId) -> Result<Vec<ClassExpression>, TesseraError> {
        Ok(self.record(individual)?.types.iter().cloned().collect())
    }

    fn annotations_of(&self, individual: &IndividualId) -> Result<Vec<Annotation>, TesseraError> {
        Ok(self.record(individual)?.annotations.clone())
    }

    fn facts(&self) -> Vec<Fact> {
        self.facts.keys().cloned().collect()
    }

    fn fact_annotations(&self, fact: &Fact) -> Vec<Annotation> {
        self.facts.get(fact).cloned().unwrap_or_default()
    }

    fn model_annotations(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// One individual in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableIndividual {
    pub id: IndividualId,
    pub types: Vec<ClassExpression>,
    pub annotations: Vec<Annotation>,
}

/// One fact in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableFact {
    pub fact: Fact,
    pub annotations: Vec<Annotation>,
}

/// Serializable representation of a Graph.
///
/// Uses sequences instead of maps so the same value encodes with both
/// postcard (persistence) and serde_json (export).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub individuals: Vec<SerializableIndividual>,
    pub facts: Vec<SerializableFact>,
    pub annotations: Vec<Annotation>,
    pub next_sequence: u64,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            individuals: graph
                .individuals
                .iter()
                .map(|(id, record)| SerializableIndividual {
                    id: id.clone(),
                    types: record.types.iter().cloned().collect(),
                    annotations: record.annotations.clone(),
                })
                .collect(),
            facts: graph
                .facts
                .iter()
                .map(|(fact, annotations)| SerializableFact {
                    fact: fact.clone(),
                    annotations: annotations.clone(),
                })
                .collect(),
            annotations: graph.annotations.clone(),
            next_sequence: graph.next_sequence,
        }
    }
}

fn sorted(mut annotations: Vec<Annotation>) -> Vec<Annotation> {
    annotations.sort();
    annotations
}

impl From<SerializableGraph> for Graph {
    fn from(s: SerializableGraph) -> Self {
        let individuals = s
            .individuals
            .into_iter()
            .map(|individual| {
                (
                    individual.id,
                    IndividualRecord {
                        types: individual.types.into_iter().collect(),
                        annotations: sorted(individual.annotations),
                    },
                )
            })
            .collect();
        let facts = s
            .facts
            .into_iter()
            .map(|entry| (entry.fact, sorted(entry.annotations)))
            .collect();

        Self {
            individuals,
            facts,
            annotations: sorted(s.annotations),
            next_sequence: s.next_sequence,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RelationId;

    fn ind(s: &str) -> IndividualId {
        IndividualId::new(s)
    }

    fn declare(graph: &mut Graph, s: &str) {
        graph
            .apply(&AxiomChange::Add(Axiom::Declaration(ind(s))))
            .expect("declare");
    }

    #[test]
    fn duplicate_declaration_is_a_noop() {
        let mut graph = Graph::new();
        let change = AxiomChange::Add(Axiom::Declaration(ind("a")));

        assert!(graph.apply(&change).expect("first"));
        assert!(!graph.apply(&change).expect("second"));
        assert_eq!(graph.individual_count(), 1);
    }

    #[test]
    fn class_assertion_requires_declaration() {
        let mut graph = Graph::new();
        let change = AxiomChange::Add(Axiom::ClassAssertion {
            individual: ind("ghost"),
            class: ClassExpression::named("http://x.org/A"),
        });

        assert!(matches!(
            graph.apply(&change),
            Err(TesseraError::UnknownIndividual(_))
        ));
    }

    #[test]
    fn fact_requires_both_endpoints() {
        let mut graph = Graph::new();
        declare(&mut graph, "a");
        let fact = Fact::new(ind("a"), RelationId::new("r"), ind("b"));

        let result = graph.apply(&AxiomChange::Add(Axiom::Fact(fact)));
        assert!(matches!(result, Err(TesseraError::UnknownIndividual(id)) if id == "b"));
    }

    #[test]
    fn declaration_removal_refuses_dependents() {
        let mut graph = Graph::new();
        declare(&mut graph, "a");
        declare(&mut graph, "b");
        let fact = Fact::new(ind("a"), RelationId::new("r"), ind("b"));
        graph
            .apply(&AxiomChange::Add(Axiom::Fact(fact.clone())))
            .expect("fact");

        let result = graph.apply(&AxiomChange::Remove(Axiom::Declaration(ind("a"))));
        assert!(matches!(result, Err(TesseraError::InUse(_))));

        graph
            .apply(&AxiomChange::Remove(Axiom::Fact(fact)))
            .expect("remove fact");
        assert!(graph
            .apply(&AxiomChange::Remove(Axiom::Declaration(ind("a"))))
            .expect("remove decl"));
        assert!(!graph.contains_individual(&ind("a")));
    }

    #[test]
    fn annotations_are_a_multiset() {
        let mut graph = Graph::new();
        let note = Annotation::new("comment", "same");
        for _ in 0..2 {
            graph
                .apply(&AxiomChange::Add(Axiom::ModelAnnotation(note.clone())))
                .expect("add");
        }
        assert_eq!(graph.model_annotations().len(), 2);

        graph
            .apply(&AxiomChange::Remove(Axiom::ModelAnnotation(note.clone())))
            .expect("remove");
        assert_eq!(graph.model_annotations(), vec![note]);
    }

    #[test]
    fn inverse_restores_previous_state() {
        let mut graph = Graph::new();
        declare(&mut graph, "a");
        let before = graph.clone();

        let change = AxiomChange::Add(Axiom::IndividualAnnotation {
            individual: ind("a"),
            annotation: Annotation::new("label", "x"),
        });
        graph.apply(&change).expect("apply");
        graph.apply(&change.inverse()).expect("undo");

        assert_eq!(graph, before);
    }

    #[test]
    fn annotation_removal_inverse_is_exact() {
        let mut graph = Graph::new();
        declare(&mut graph, "a");
        for (key, value) in [("comment", "a"), ("label", "x"), ("comment", "z")] {
            graph
                .apply(&AxiomChange::Add(Axiom::IndividualAnnotation {
                    individual: ind("a"),
                    annotation: Annotation::new(key, value),
                }))
                .expect("add");
        }
        let before = graph.clone();

        let change = AxiomChange::Remove(Axiom::IndividualAnnotation {
            individual: ind("a"),
            annotation: Annotation::new("comment", "a"),
        });
        assert!(graph.apply(&change).expect("remove"));
        graph.apply(&change.inverse()).expect("undo");

        assert_eq!(graph, before);
        assert_eq!(
            graph.annotations_of(&ind("a")).expect("annotations").len(),
            3
        );
    }

    #[test]
    fn serializable_roundtrip_preserves_sequence() {
        let mut graph = Graph::new();
        declare(&mut graph, "a");
        let _ = graph.take_sequence();
        let _ = graph.take_sequence();

        let restored = Graph::from(SerializableGraph::from(&graph));
        assert_eq!(restored, graph);
        assert_eq!(restored.next_sequence, 2);
    }
}
