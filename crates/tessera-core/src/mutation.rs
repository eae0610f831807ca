//! # Mutation Gateway
//!
//! The only path by which a model's graph changes.
//!
//! Two disciplines over one entry point, selected by `Policy`:
//!
//! - **Strict**: each change is applied, the oracle is flushed, and the
//!   change is undone if it turned a consistent model inconsistent. Rollback
//!   covers exactly the one change just applied, never more.
//! - **Relaxed**: every change is applied without consulting the oracle.
//!   The caller flushes once afterwards; an inconsistent result is reported,
//!   not corrected. If a change fails midway, the earlier ones stay applied.

use crate::graph::{Axiom, AxiomChange, GraphStore};
use crate::model::Model;
use crate::render::ids::IdMapper;
use crate::{IndividualId, TesseraError};
use std::collections::BTreeSet;

/// Which mutation discipline to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Per-change consistency check with rollback.
    Strict,
    /// Apply everything, check once later, never roll back.
    Relaxed,
}

/// Result of one strict-mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResponse {
    pub success: bool,
    pub results_in_inconsistency: bool,
}

impl OperationResponse {
    const ACCEPTED: Self = Self {
        success: true,
        results_in_inconsistency: false,
    };
    const ROLLED_BACK: Self = Self {
        success: false,
        results_in_inconsistency: true,
    };
}

/// Result of applying a list of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Individuals touched by changes that remain applied.
    pub touched: BTreeSet<IndividualId>,
    /// One entry per change under `Policy::Strict`; empty under `Relaxed`.
    pub responses: Vec<OperationResponse>,
}

impl MutationOutcome {
    /// Number of strict changes that were rolled back.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.responses.iter().filter(|r| !r.success).count()
    }
}

/// The MutationGateway applies axiom changes to models.
pub struct MutationGateway;

impl MutationGateway {
    /// Apply `changes` to `model` under the given policy.
    pub fn apply(
        model: &mut Model,
        changes: &[AxiomChange],
        policy: Policy,
    ) -> Result<MutationOutcome, TesseraError> {
        match policy {
            Policy::Relaxed => Ok(MutationOutcome {
                touched: Self::apply_relaxed(model, changes)?,
                responses: Vec::new(),
            }),
            Policy::Strict => {
                let mut outcome = MutationOutcome::default();
                for change in changes {
                    let response = Self::apply_strict(model, change)?;
                    if response.success {
                        outcome.touched.extend(change.axiom().individuals());
                    }
                    outcome.responses.push(response);
                }
                Ok(outcome)
            }
        }
    }

    /// Apply one change with a consistency check and rollback.
    pub fn apply_strict(
        model: &mut Model,
        change: &AxiomChange,
    ) -> Result<OperationResponse, TesseraError> {
        let was_consistent = model.is_consistent();

        if !model.graph.apply(change)? {
            return Ok(OperationResponse::ACCEPTED);
        }
        model.dirty = true;
        model.flush()?;

        if was_consistent && !model.is_consistent() {
            tracing::debug!(model = model.id(), ?change, "rolling back inconsistent change");
            model.graph.apply(&change.inverse())?;
            model.flush()?;
            return Ok(OperationResponse::ROLLED_BACK);
        }
        Ok(OperationResponse::ACCEPTED)
    }

    /// Apply every change without consulting the oracle.
    ///
    /// Returns the individuals touched by the changes.
    pub fn apply_relaxed(
        model: &mut Model,
        changes: &[AxiomChange],
    ) -> Result<BTreeSet<IndividualId>, TesseraError> {
        let mut touched = BTreeSet::new();
        for change in changes {
            if model.graph.apply(change)? {
                model.dirty = true;
            }
            touched.extend(change.axiom().individuals());
        }
        Ok(touched)
    }

    /// Mint a fresh individual id for the model.
    ///
    /// Sequence numbers are persisted with the graph, so ids are not reused
    /// across reloads. Imported graphs may already hold a minted id; those
    /// are skipped.
    pub fn mint_individual(model: &mut Model, mapper: &IdMapper) -> IndividualId {
        loop {
            let sequence = model.graph.take_sequence();
            let candidate = mapper.mint_individual(model.id(), sequence);
            if !model.graph.contains_individual(&candidate) {
                return candidate;
            }
        }
    }
}

// =============================================================================
// REMOVAL CASCADE
// =============================================================================

/// Expand the removal of `axiom` into an ordered list of changes.
///
/// Dependents come first (fact annotations before their fact, facts and
/// types before a declaration) and the axiom itself last, so each step is
/// individually valid and individually invertible.
pub fn removal_cascade<G: GraphStore + ?Sized>(
    graph: &G,
    axiom: &Axiom,
) -> Result<Vec<AxiomChange>, TesseraError> {
    let mut changes = Vec::new();
    match axiom {
        Axiom::Declaration(individual) => {
            for fact in graph.facts_involving(individual) {
                push_fact_removal(graph, &fact, &mut changes);
            }
            for class in graph.types_of(individual)? {
                changes.push(AxiomChange::Remove(Axiom::ClassAssertion {
                    individual: individual.clone(),
                    class,
                }));
            }
            for annotation in graph.annotations_of(individual)? {
                changes.push(AxiomChange::Remove(Axiom::IndividualAnnotation {
                    individual: individual.clone(),
                    annotation,
                }));
            }
            changes.push(AxiomChange::Remove(axiom.clone()));
        }
        Axiom::Fact(fact) => push_fact_removal(graph, fact, &mut changes),
        _ => changes.push(AxiomChange::Remove(axiom.clone())),
    }
    Ok(changes)
}

fn push_fact_removal<G: GraphStore + ?Sized>(
    graph: &G,
    fact: &crate::Fact,
    changes: &mut Vec<AxiomChange>,
) {
    for annotation in graph.fact_annotations(fact) {
        changes.push(AxiomChange::Remove(Axiom::FactAnnotation {
            fact: fact.clone(),
            annotation,
        }));
    }
    changes.push(AxiomChange::Remove(Axiom::Fact(fact.clone())));
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::oracle::SchemaOracle;
    use crate::schema::{Schema, SchemaDefinition};
    use crate::{Annotation, ClassExpression, Fact, RelationId};
    use std::sync::Arc;

    fn setup() -> (Schema, Model) {
        let schema = Schema::from_definition(&SchemaDefinition::builtin()).expect("schema");
        let oracle = Box::new(SchemaOracle::new(Arc::new(schema.clone())));
        let model = Model::new("gomodel:test", Graph::new(), oracle).expect("model");
        (schema, model)
    }

    fn typed(schema: &Schema, individual: &IndividualId, compact: &str) -> AxiomChange {
        AxiomChange::Add(Axiom::ClassAssertion {
            individual: individual.clone(),
            class: ClassExpression::named(schema.mapper().to_full(compact)),
        })
    }

    fn declared(model: &mut Model, schema: &Schema) -> IndividualId {
        let id = MutationGateway::mint_individual(model, schema.mapper());
        MutationGateway::apply_strict(model, &AxiomChange::Add(Axiom::Declaration(id.clone())))
            .expect("declare");
        id
    }

    #[test]
    fn strict_accepts_consistent_change() {
        let (schema, mut model) = setup();
        let id = declared(&mut model, &schema);

        let response =
            MutationGateway::apply_strict(&mut model, &typed(&schema, &id, "GO:0008150"))
                .expect("apply");

        assert!(response.success);
        assert!(!response.results_in_inconsistency);
        assert!(model.is_dirty());
        assert_eq!(model.graph().types_of(&id).expect("types").len(), 1);
    }

    #[test]
    fn strict_rolls_back_inconsistent_change() {
        let (schema, mut model) = setup();
        let id = declared(&mut model, &schema);
        MutationGateway::apply_strict(&mut model, &typed(&schema, &id, "GO:0008150"))
            .expect("first type");
        let before = model.graph().clone();

        let response =
            MutationGateway::apply_strict(&mut model, &typed(&schema, &id, "GO:0003674"))
                .expect("apply");

        assert!(!response.success);
        assert!(response.results_in_inconsistency);
        assert_eq!(model.graph(), &before);
        assert!(model.is_consistent());
    }

    #[test]
    fn strict_does_not_roll_back_when_already_inconsistent() {
        let (schema, mut model) = setup();
        let id = declared(&mut model, &schema);
        MutationGateway::apply(
            &mut model,
            &[
                typed(&schema, &id, "GO:0008150"),
                typed(&schema, &id, "GO:0003674"),
            ],
            Policy::Relaxed,
        )
        .expect("relaxed");
        model.flush().expect("flush");
        assert!(!model.is_consistent());

        let response = MutationGateway::apply_strict(&mut model, &typed(&schema, &id, "GO:0005575"))
            .expect("apply");
        assert!(response.success);
    }

    #[test]
    fn relaxed_keeps_inconsistent_state() {
        let (schema, mut model) = setup();
        let id = declared(&mut model, &schema);

        let outcome = MutationGateway::apply(
            &mut model,
            &[
                typed(&schema, &id, "GO:0008150"),
                typed(&schema, &id, "GO:0003674"),
            ],
            Policy::Relaxed,
        )
        .expect("relaxed");
        model.flush().expect("flush");

        assert!(outcome.touched.contains(&id));
        assert!(outcome.responses.is_empty());
        assert!(!model.is_consistent());
        assert_eq!(model.graph().types_of(&id).expect("types").len(), 2);
    }

    #[test]
    fn relaxed_failure_keeps_earlier_changes() {
        let (schema, mut model) = setup();
        let id = declared(&mut model, &schema);
        let ghost = IndividualId::new("http://x.org/ghost");

        let result = MutationGateway::apply_relaxed(
            &mut model,
            &[
                typed(&schema, &id, "GO:0008150"),
                typed(&schema, &ghost, "GO:0008150"),
            ],
        );

        assert!(matches!(result, Err(TesseraError::UnknownIndividual(_))));
        assert_eq!(model.graph().types_of(&id).expect("types").len(), 1);
    }

    #[test]
    fn strict_policy_reports_each_change() {
        let (schema, mut model) = setup();
        let id = declared(&mut model, &schema);

        let outcome = MutationGateway::apply(
            &mut model,
            &[
                typed(&schema, &id, "GO:0008150"),
                typed(&schema, &id, "GO:0003674"),
            ],
            Policy::Strict,
        )
        .expect("strict");

        assert_eq!(outcome.responses.len(), 2);
        assert_eq!(outcome.rejected(), 1);
        assert!(model.is_consistent());
    }

    #[test]
    fn cascade_removes_declaration_with_dependents() {
        let (schema, mut model) = setup();
        let a = declared(&mut model, &schema);
        let b = declared(&mut model, &schema);
        let fact = Fact::new(
            a.clone(),
            RelationId::new(schema.mapper().to_full("part_of")),
            b.clone(),
        );
        MutationGateway::apply_relaxed(
            &mut model,
            &[
                typed(&schema, &a, "GO:0003674"),
                AxiomChange::Add(Axiom::Fact(fact.clone())),
                AxiomChange::Add(Axiom::FactAnnotation {
                    fact: fact.clone(),
                    annotation: Annotation::new("evidence", "ECO:0000314"),
                }),
            ],
        )
        .expect("populate");

        let cascade =
            removal_cascade(model.graph(), &Axiom::Declaration(a.clone())).expect("cascade");
        assert_eq!(cascade.len(), 4);
        assert_eq!(cascade.last(), Some(&AxiomChange::Remove(Axiom::Declaration(a.clone()))));

        let touched = MutationGateway::apply_relaxed(&mut model, &cascade).expect("remove");
        assert!(touched.contains(&b));
        assert!(!model.graph().contains_individual(&a));
        assert!(model.graph().contains_individual(&b));
        assert_eq!(model.graph().fact_count(), 0);
    }

    #[test]
    fn minted_ids_are_unique() {
        let (schema, mut model) = setup();
        let a = MutationGateway::mint_individual(&mut model, schema.mapper());
        let b = MutationGateway::mint_individual(&mut model, schema.mapper());
        assert_ne!(a, b);
    }
}
