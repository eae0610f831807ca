//! # Consistency Oracle
//!
//! The classification capability bound 1:1 to each model.
//!
//! The engine only depends on the `ConsistencyOracle` trait; any
//! classification service that can flush, report consistency and list the
//! types of an individual can be plugged in through an `OracleFactory`.
//!
//! `SchemaOracle` is the reference implementation shipped with the engine.
//! It is not a reasoner: it closes asserted named types over the schema's
//! subclass hierarchy and flags an individual whose closure contains two
//! disjoint classes.

use crate::graph::GraphStore;
use crate::schema::Schema;
use crate::{ClassExpression, ClassId, IndividualId, TesseraError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// Classification and consistency checking for one model.
pub trait ConsistencyOracle: Send + Debug {
    /// Re-classify the graph, picking up every change since the last flush.
    fn flush(&mut self, graph: &dyn GraphStore) -> Result<(), TesseraError>;

    /// Whether the graph was consistent at the last flush.
    fn is_consistent(&self) -> bool;

    /// Inferred types of an individual as of the last flush.
    fn types_of(&self, individual: &IndividualId) -> BTreeSet<ClassExpression>;

    /// Release held resources. Called when the owning model is unlinked or
    /// displaced in the registry.
    fn dispose(&mut self) {}
}

/// Builds a fresh oracle for each model.
pub trait OracleFactory: Send + Sync + Debug {
    fn create(&self, schema: &Arc<Schema>) -> Box<dyn ConsistencyOracle>;
}

// =============================================================================
// SCHEMA ORACLE
// =============================================================================

/// Subclass closure plus disjointness, over the shared schema.
#[derive(Debug)]
pub struct SchemaOracle {
    schema: Arc<Schema>,
    inferred: BTreeMap<IndividualId, BTreeSet<ClassId>>,
    unsatisfiable: BTreeSet<IndividualId>,
}

impl SchemaOracle {
    /// Create an oracle that has not been flushed yet.
    ///
    /// An unflushed oracle reports the (empty) graph as consistent.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            inferred: BTreeMap::new(),
            unsatisfiable: BTreeSet::new(),
        }
    }

    /// Individuals found unsatisfiable at the last flush.
    #[must_use]
    pub fn unsatisfiable(&self) -> &BTreeSet<IndividualId> {
        &self.unsatisfiable
    }

    /// Named classes an expression entails for its instance.
    ///
    /// Intersections entail each operand; unions and restrictions entail no
    /// named class on their own.
    fn entailed(&self, expression: &ClassExpression, out: &mut BTreeSet<ClassId>) {
        match expression {
            ClassExpression::Named(class) => out.extend(self.schema.ancestors(class)),
            ClassExpression::Intersection(operands) => {
                for operand in operands {
                    self.entailed(operand, out);
                }
            }
            ClassExpression::Union(_) | ClassExpression::Existential { .. } => {}
        }
    }

    fn has_disjoint_pair(&self, classes: &BTreeSet<ClassId>) -> bool {
        classes.iter().enumerate().any(|(i, a)| {
            classes
                .iter()
                .skip(i + 1)
                .any(|b| self.schema.are_disjoint(a, b))
        })
    }
}

impl ConsistencyOracle for SchemaOracle {
    fn flush(&mut self, graph: &dyn GraphStore) -> Result<(), TesseraError> {
        let mut inferred = BTreeMap::new();
        let mut unsatisfiable = BTreeSet::new();

        for individual in graph.individuals() {
            let mut classes = BTreeSet::new();
            for expression in graph.types_of(&individual)? {
                self.entailed(&expression, &mut classes);
            }
            if self.has_disjoint_pair(&classes) {
                unsatisfiable.insert(individual.clone());
            }
            inferred.insert(individual, classes);
        }

        self.inferred = inferred;
        self.unsatisfiable = unsatisfiable;
        Ok(())
    }

    fn is_consistent(&self) -> bool {
        self.unsatisfiable.is_empty()
    }

    fn types_of(&self, individual: &IndividualId) -> BTreeSet<ClassExpression> {
        self.inferred
            .get(individual)
            .map(|classes| {
                classes
                    .iter()
                    .cloned()
                    .map(ClassExpression::Named)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn dispose(&mut self) {
        self.inferred.clear();
        self.unsatisfiable.clear();
    }
}

/// Factory for `SchemaOracle`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaOracleFactory;

impl OracleFactory for SchemaOracleFactory {
    fn create(&self, schema: &Arc<Schema>) -> Box<dyn ConsistencyOracle> {
        Box::new(SchemaOracle::new(Arc::clone(schema)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Axiom, AxiomChange, Graph};
    use crate::schema::SchemaDefinition;

    fn setup() -> (Arc<Schema>, Graph, IndividualId) {
        let schema = Arc::new(Schema::from_definition(&SchemaDefinition::builtin()).expect("schema"));
        let mut graph = Graph::new();
        let individual = IndividualId::new("http://x.org/i_1");
        graph
            .apply(&AxiomChange::Add(Axiom::Declaration(individual.clone())))
            .expect("declare");
        (schema, graph, individual)
    }

    fn assert_type(schema: &Schema, graph: &mut Graph, individual: &IndividualId, compact: &str) {
        graph
            .apply(&AxiomChange::Add(Axiom::ClassAssertion {
                individual: individual.clone(),
                class: ClassExpression::named(schema.mapper().to_full(compact)),
            }))
            .expect("assert type");
    }

    #[test]
    fn unflushed_oracle_is_consistent() {
        let (schema, _, _) = setup();
        assert!(SchemaOracle::new(schema).is_consistent());
    }

    #[test]
    fn disjoint_types_are_inconsistent() {
        let (schema, mut graph, individual) = setup();
        let mut oracle = SchemaOracle::new(Arc::clone(&schema));

        assert_type(&schema, &mut graph, &individual, "GO:0008150");
        oracle.flush(&graph).expect("flush");
        assert!(oracle.is_consistent());

        assert_type(&schema, &mut graph, &individual, "GO:0003674");
        oracle.flush(&graph).expect("flush");
        assert!(!oracle.is_consistent());
        assert!(oracle.unsatisfiable().contains(&individual));
    }

    #[test]
    fn intersection_operands_are_entailed() {
        let (schema, mut graph, individual) = setup();
        let mut oracle = SchemaOracle::new(Arc::clone(&schema));
        let process = schema.mapper().to_full("GO:0008150");

        graph
            .apply(&AxiomChange::Add(Axiom::ClassAssertion {
                individual: individual.clone(),
                class: ClassExpression::Intersection(vec![ClassExpression::named(process.clone())]),
            }))
            .expect("assert");
        oracle.flush(&graph).expect("flush");

        assert!(oracle
            .types_of(&individual)
            .contains(&ClassExpression::named(process)));
    }

    #[test]
    fn dispose_clears_state() {
        let (schema, mut graph, individual) = setup();
        let mut oracle = SchemaOracle::new(Arc::clone(&schema));
        assert_type(&schema, &mut graph, &individual, "GO:0008150");
        assert_type(&schema, &mut graph, &individual, "GO:0005575");
        oracle.flush(&graph).expect("flush");
        assert!(!oracle.is_consistent());

        oracle.dispose();
        assert!(oracle.is_consistent());
        assert!(oracle.types_of(&individual).is_empty());
    }
}
