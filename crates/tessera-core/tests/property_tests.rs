//! # Property-Based Tests
//!
//! Identifier and mutation invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tessera_core::generator::{blank_model_id, generated_model_id};
use tessera_core::graph::{Axiom, AxiomChange};
use tessera_core::primitives::DEFAULT_NAMESPACE;
use tessera_core::{
    ClassExpression, Graph, GraphStore, IdMapper, Model, MutationGateway, Policy, Schema,
    SchemaDefinition, SchemaOracle,
};

fn mapper() -> IdMapper {
    let mut mapper = IdMapper::new(DEFAULT_NAMESPACE);
    mapper.insert_alias("part_of", format!("{}BFO_0000050", DEFAULT_NAMESPACE));
    mapper
}

fn model() -> (Arc<Schema>, Model) {
    let schema = Arc::new(Schema::from_definition(&SchemaDefinition::builtin()).expect("schema"));
    let oracle = Box::new(SchemaOracle::new(Arc::clone(&schema)));
    let model = Model::new("gomodel:prop", Graph::new(), oracle).expect("model");
    (schema, model)
}

const ROOTS: [&str; 3] = ["GO:0008150", "GO:0003674", "GO:0005575"];

proptest! {
    /// Generated ids depend only on their inputs.
    #[test]
    fn generated_ids_are_deterministic(corpus in "[a-z_]{1,12}", seed in "[A-Z]{2,4}:[0-9]{7}") {
        let id = generated_model_id(&corpus, &seed);
        prop_assert_eq!(&id, &generated_model_id(&corpus, &seed));
        prop_assert!(id.starts_with("gomodel:"));
    }

    /// Blank ids never repeat.
    #[test]
    fn blank_ids_are_unique(count in 2usize..50) {
        let ids: BTreeSet<String> = (0..count).map(|_| blank_model_id(Some("fb"))).collect();
        prop_assert_eq!(ids.len(), count);
    }

    /// Compact ids survive a trip through the full form.
    #[test]
    fn compact_ids_roundtrip(prefix in "[A-Za-z]{1,10}", local in "[0-9A-Za-z]{1,10}") {
        let compact = format!("{}:{}", prefix, local);
        let mapper = mapper();
        prop_assert_eq!(mapper.to_compact(&mapper.to_full(&compact)), compact);
    }

    /// Full ids survive a trip through the compact form.
    #[test]
    fn full_ids_roundtrip(path in "[a-z]{1,8}(/[a-z_]{1,8}){0,2}") {
        let full = format!("http://example.org/{}", path);
        let mapper = mapper();
        prop_assert_eq!(mapper.to_full(&mapper.to_compact(&full)), full);
    }

    /// Minted individual ids compact to `{model}:{sequence}` and resolve back.
    #[test]
    fn minted_ids_roundtrip(sequence in 0u64..1_000_000) {
        let mapper = mapper();
        let minted = mapper.mint_individual("gomodel:abc", sequence);
        let compact = mapper.to_compact(minted.as_str());
        prop_assert_eq!(&compact, &format!("gomodel-abc:{}", sequence));
        prop_assert_eq!(mapper.to_full(&compact), minted.0);
    }

    /// Strict mutation never leaves a consistent model inconsistent.
    #[test]
    fn strict_preserves_consistency(picks in vec(0usize..3, 1..12)) {
        let (schema, mut model) = model();
        let individual = MutationGateway::mint_individual(&mut model, schema.mapper());
        let mut changes = vec![AxiomChange::Add(Axiom::Declaration(individual.clone()))];
        changes.extend(picks.iter().map(|&i| AxiomChange::Add(Axiom::ClassAssertion {
            individual: individual.clone(),
            class: ClassExpression::named(schema.mapper().to_full(ROOTS[i])),
        })));

        MutationGateway::apply(&mut model, &changes, Policy::Strict).expect("apply");

        prop_assert!(model.is_consistent());
        prop_assert_eq!(model.graph().types_of(&individual).expect("types").len(), 1);
    }

    /// Relaxed mutation keeps every change regardless of consistency.
    #[test]
    fn relaxed_keeps_every_type(picks in vec(0usize..3, 1..12)) {
        let (schema, mut model) = model();
        let individual = MutationGateway::mint_individual(&mut model, schema.mapper());
        let mut changes = vec![AxiomChange::Add(Axiom::Declaration(individual.clone()))];
        changes.extend(picks.iter().map(|&i| AxiomChange::Add(Axiom::ClassAssertion {
            individual: individual.clone(),
            class: ClassExpression::named(schema.mapper().to_full(ROOTS[i])),
        })));

        MutationGateway::apply(&mut model, &changes, Policy::Relaxed).expect("apply");
        model.flush().expect("flush");

        let distinct: BTreeSet<usize> = picks.iter().copied().collect();
        prop_assert_eq!(model.graph().types_of(&individual).expect("types").len(), distinct.len());
        prop_assert_eq!(model.is_consistent(), distinct.len() == 1);
    }
}
