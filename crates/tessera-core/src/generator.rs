//! # Model Generation
//!
//! Model identifiers for generated and blank models, and seeding of a
//! generated model from an annotation corpus.
//!
//! Seeding builds one individual for the seed class plus one activity per
//! gene product annotated to the seed class (or a subclass of it):
//!
//! ```text
//! activity --part_of--> process
//! activity : <annotated class> and (enabled_by some <gene product>)
//! ```
//!
//! Every seed change goes through the strict gateway, so corpus entries
//! that would make the model inconsistent are rolled back and counted.

use crate::corpus::CorpusAnnotation;
use crate::graph::{Axiom, AxiomChange};
use crate::model::Model;
use crate::mutation::{MutationGateway, Policy};
use crate::primitives::{ENABLED_BY, LABEL_KEY, MODEL_ID_PREFIX, PART_OF, SOURCE_KEY};
use crate::render::ids::normalize_id_part;
use crate::schema::Schema;
use crate::{Annotation, ClassExpression, ClassId, Fact, RelationId, TesseraError};

// =============================================================================
// MODEL IDENTIFIERS
// =============================================================================

/// Deterministic id of a generated model.
///
/// The same `(corpus, seed)` always yields the same id.
#[must_use]
pub fn generated_model_id(corpus_ref: &str, seed_class: &str) -> String {
    format!(
        "{}{}-{}",
        MODEL_ID_PREFIX,
        normalize_id_part(corpus_ref),
        normalize_id_part(seed_class)
    )
}

/// Freshly minted id of a blank model. Never repeats.
#[must_use]
pub fn blank_model_id(corpus_ref: Option<&str>) -> String {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    match corpus_ref {
        Some(corpus) => format!("{}{}-{}", MODEL_ID_PREFIX, normalize_id_part(corpus), unique),
        None => format!("{}{}", MODEL_ID_PREFIX, unique),
    }
}

// =============================================================================
// SEEDING
// =============================================================================

/// Counts from one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Individuals added to the model.
    pub individuals: usize,
    /// Strict changes rolled back as inconsistency-inducing.
    pub rejected: usize,
}

/// Seeds generated models from corpus annotations.
pub struct ModelGenerator<'a> {
    schema: &'a Schema,
}

impl<'a> ModelGenerator<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Populate `model` (normally empty) for the seed class.
    pub fn seed(
        &self,
        model: &mut Model,
        seed_class: &str,
        corpus_ref: &str,
        annotations: &[CorpusAnnotation],
    ) -> Result<GenerationReport, TesseraError> {
        let mapper = self.schema.mapper();
        let seed = ClassId(mapper.to_full(seed_class));
        let part_of = RelationId(mapper.to_full(PART_OF));
        let enabled_by = RelationId(mapper.to_full(ENABLED_BY));
        let mut report = GenerationReport::default();

        let mut changes = vec![AxiomChange::Add(Axiom::ModelAnnotation(Annotation::new(
            SOURCE_KEY, corpus_ref,
        )))];

        let process = MutationGateway::mint_individual(model, mapper);
        changes.push(AxiomChange::Add(Axiom::Declaration(process.clone())));
        changes.push(AxiomChange::Add(Axiom::ClassAssertion {
            individual: process.clone(),
            class: ClassExpression::Named(seed.clone()),
        }));
        if let Some(label) = self.schema.class_label(&seed) {
            changes.push(AxiomChange::Add(Axiom::IndividualAnnotation {
                individual: process.clone(),
                annotation: Annotation::new(LABEL_KEY, label),
            }));
        }
        report.individuals += 1;

        for annotation in annotations {
            let class = ClassId(mapper.to_full(&annotation.class));
            if !self.schema.is_subclass_of(&class, &seed) {
                continue;
            }
            let activity = MutationGateway::mint_individual(model, mapper);
            changes.push(AxiomChange::Add(Axiom::Declaration(activity.clone())));
            changes.push(AxiomChange::Add(Axiom::ClassAssertion {
                individual: activity.clone(),
                class: ClassExpression::Intersection(vec![
                    ClassExpression::Named(class),
                    ClassExpression::some(
                        enabled_by.clone(),
                        ClassExpression::named(mapper.to_full(&annotation.gene)),
                    ),
                ]),
            }));
            changes.push(AxiomChange::Add(Axiom::Fact(Fact::new(
                activity,
                part_of.clone(),
                process.clone(),
            ))));
            report.individuals += 1;
        }

        let outcome = MutationGateway::apply(model, &changes, Policy::Strict)?;
        report.rejected = outcome.rejected();
        if report.rejected > 0 {
            tracing::warn!(
                model = model.id(),
                rejected = report.rejected,
                "seed changes rolled back as inconsistent"
            );
        }
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, GraphStore};
    use crate::oracle::SchemaOracle;
    use crate::schema::{ClassDefinition, SchemaDefinition};
    use std::sync::Arc;

    fn schema() -> Schema {
        let mut definition = SchemaDefinition::builtin();
        definition.classes.push(ClassDefinition {
            id: "GO:0006915".into(),
            label: Some("apoptotic process".into()),
            parents: vec!["GO:0008150".into()],
        });
        definition.classes.push(ClassDefinition {
            id: "GO:0097153".into(),
            label: Some("cysteine-type endopeptidase activity".into()),
            parents: vec!["GO:0003674".into()],
        });
        Schema::from_definition(&definition).expect("schema")
    }

    #[test]
    fn generated_ids_are_deterministic() {
        assert_eq!(
            generated_model_id("fb", "GO:0006915"),
            "gomodel:fb-GO-0006915"
        );
        assert_eq!(
            generated_model_id("fb", "GO:0006915"),
            generated_model_id("fb", "GO:0006915")
        );
    }

    #[test]
    fn blank_ids_never_repeat() {
        let a = blank_model_id(Some("fb"));
        let b = blank_model_id(Some("fb"));
        assert_ne!(a, b);
        assert!(a.starts_with("gomodel:fb-"));
        assert!(blank_model_id(None).starts_with(MODEL_ID_PREFIX));
    }

    #[test]
    fn seeding_links_matching_annotations() {
        let schema = schema();
        let oracle = Box::new(SchemaOracle::new(Arc::new(schema.clone())));
        let mut model =
            Model::new(generated_model_id("fb", "GO:0006915"), Graph::new(), oracle).expect("model");
        let annotations = vec![
            CorpusAnnotation {
                gene: "FB:FBgn0000001".into(),
                class: "GO:0006915".into(),
            },
            CorpusAnnotation {
                gene: "FB:FBgn0000002".into(),
                class: "GO:0097153".into(),
            },
        ];

        let report = ModelGenerator::new(&schema)
            .seed(&mut model, "GO:0006915", "fb", &annotations)
            .expect("seed");

        assert_eq!(report.individuals, 2);
        assert_eq!(report.rejected, 0);
        assert_eq!(model.graph().individual_count(), 2);
        assert_eq!(model.graph().fact_count(), 1);
        assert!(model.is_consistent());
        assert_eq!(
            model.graph().model_annotations(),
            vec![Annotation::new(SOURCE_KEY, "fb")]
        );
    }
}
