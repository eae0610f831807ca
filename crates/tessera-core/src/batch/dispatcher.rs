//! # Batch Dispatcher
//!
//! Runs the requests of one batch call in order against a single pinned
//! model, then decides how much of the model to render.
//!
//! ## Flow
//!
//! 1. Pre-scan: size limit, and solo-only meta operations must be alone.
//! 2. Each request is parsed, routed and applied. The first request naming
//!    a model pins it and takes its lock until the call ends.
//! 3. One flush, then `rebuild` (whole model) or `merge` (touched subset).
//!
//! ## Non-atomic batches
//!
//! A failing request stops the batch, but requests before it stay applied.
//! Nothing is rolled back and the response only reports the error.

use super::request::{Arguments, BatchCall, BatchRequest, Entity, Operation, is_meta, required};
use super::response::{BatchResponse, ResponseData, Signal, TermJson};
use crate::codec::ExportFormat;
use crate::graph::{Axiom, AxiomChange, GraphStore};
use crate::model::Model;
use crate::mutation::{MutationGateway, Policy, removal_cascade};
use crate::primitives::MAX_BATCH_REQUESTS;
use crate::registry::{CreateKind, ModelLease, ModelRegistry};
use crate::render::ids::IdMapper;
use crate::render::{AnnotationJson, GraphSerializer};
use crate::{Fact, IndividualId, RelationId, TesseraError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// =============================================================================
// BATCH STATE
// =============================================================================

/// Per-call state: the pinned model and what the call touched.
#[derive(Default)]
struct BatchState {
    lease: Option<ModelLease>,
    relevant: BTreeSet<IndividualId>,
    rebuild: bool,
}

impl BatchState {
    /// The pinned model, pinning it on first use.
    fn pin(
        &mut self,
        registry: &ModelRegistry,
        arguments: &Arguments,
    ) -> Result<&mut Model, TesseraError> {
        let requested = required(arguments.model_id.as_ref(), "model-id")?;
        if let Some(lease) = &self.lease {
            if lease.id() != requested {
                return Err(TesseraError::MultipleModelIds {
                    pinned: lease.id().to_string(),
                    found: requested.to_string(),
                });
            }
        } else {
            self.lease = Some(registry.lease(requested)?);
        }
        self.lease.as_deref_mut().ok_or(TesseraError::EmptyBatch)
    }

    /// Create a model and pin it in place of the current one.
    fn repin(&mut self, registry: &ModelRegistry, kind: CreateKind) -> Result<(), TesseraError> {
        // Regenerating the pinned id disposes the model behind our own lease.
        self.lease = None;
        let (_, handle) = registry.create(kind)?;
        self.lease = Some(handle.blocking_lock_owned());
        self.rebuild = true;
        Ok(())
    }
}

fn change(add: bool, axiom: Axiom) -> AxiomChange {
    if add {
        AxiomChange::Add(axiom)
    } else {
        AxiomChange::Remove(axiom)
    }
}

fn unknown_operation(entity: Entity, operation: Operation) -> TesseraError {
    TesseraError::UnknownOperation {
        entity: entity.as_str().to_string(),
        operation: operation.as_str().to_string(),
    }
}

/// The declared individual named by `arguments.individual`.
fn existing_individual(
    model: &Model,
    mapper: &IdMapper,
    arguments: &Arguments,
) -> Result<IndividualId, TesseraError> {
    let compact = required(arguments.individual.as_ref(), "individual")?;
    let individual = IndividualId(mapper.to_full(compact));
    if !model.graph().contains_individual(&individual) {
        return Err(TesseraError::UnknownIndividual(compact.to_string()));
    }
    Ok(individual)
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Executes batch calls against a registry.
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    registry: Arc<ModelRegistry>,
}

impl BatchDispatcher {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Run one batch call. Never fails: errors become error responses.
    ///
    /// Blocks on model locks; call from a blocking context.
    pub fn dispatch(&self, call: &BatchCall) -> BatchResponse {
        let packet_id = call.packet_id_or_mint();
        tracing::debug!(
            packet_id = %packet_id,
            requests = call.requests.len(),
            privileged = call.privileged,
            "dispatching batch"
        );

        match self.run(&call.requests) {
            Ok((signal, data)) => BatchResponse::success(
                packet_id,
                call.uid.clone(),
                call.intention.clone(),
                signal,
                data,
            ),
            Err(error) => {
                tracing::warn!(
                    packet_id = %packet_id,
                    kind = error.kind(),
                    error = %error,
                    "batch request failed"
                );
                BatchResponse::error(packet_id, call.uid.clone(), call.intention.clone(), &error)
            }
        }
    }

    fn run(&self, requests: &[BatchRequest]) -> Result<(Signal, ResponseData), TesseraError> {
        if requests.len() > MAX_BATCH_REQUESTS {
            return Err(TesseraError::BatchTooLarge(requests.len(), MAX_BATCH_REQUESTS));
        }
        if let Some(meta) = requests.iter().find(|r| is_meta(&r.entity, &r.operation)) {
            if requests.len() > 1 {
                return Err(TesseraError::IncompatibleBatch(format!(
                    "{}/{}",
                    meta.entity, meta.operation
                )));
            }
            return self.meta(meta).map(|data| (Signal::Meta, data));
        }

        let mut state = BatchState::default();
        for request in requests {
            self.apply(&mut state, request)?;
        }
        self.finish(state)
    }

    fn apply(&self, state: &mut BatchState, request: &BatchRequest) -> Result<(), TesseraError> {
        let entity = Entity::parse(&request.entity)?;
        let operation =
            Operation::parse(&request.operation).ok_or_else(|| TesseraError::UnknownOperation {
                entity: request.entity.clone(),
                operation: request.operation.clone(),
            })?;

        match entity {
            Entity::Individual => self.individual(state, operation, &request.arguments),
            Entity::Edge => self.edge(state, operation, &request.arguments),
            Entity::Model => self.model(state, operation, &request.arguments),
            Entity::Relations | Entity::Evidence => Err(unknown_operation(entity, operation)),
        }
    }

    // =========================================================================
    // ROUTES
    // =========================================================================

    fn individual(
        &self,
        state: &mut BatchState,
        operation: Operation,
        arguments: &Arguments,
    ) -> Result<(), TesseraError> {
        let mapper = self.registry.schema().mapper();
        let (changes, structural) = match operation {
            Operation::Create => {
                let model = state.pin(&self.registry, arguments)?;
                let classes = arguments.class_expressions(mapper)?;
                let individual = MutationGateway::mint_individual(model, mapper);
                let mut changes = vec![AxiomChange::Add(Axiom::Declaration(individual.clone()))];
                changes.extend(classes.into_iter().map(|class| {
                    AxiomChange::Add(Axiom::ClassAssertion {
                        individual: individual.clone(),
                        class,
                    })
                }));
                if arguments.values.as_ref().is_some_and(|v| !v.is_empty()) {
                    changes.extend(arguments.annotations()?.into_iter().map(|annotation| {
                        AxiomChange::Add(Axiom::IndividualAnnotation {
                            individual: individual.clone(),
                            annotation,
                        })
                    }));
                }
                (changes, false)
            }
            Operation::Get => {
                let model = state.pin(&self.registry, arguments)?;
                let individual = existing_individual(model, mapper, arguments)?;
                state.relevant.insert(individual);
                return Ok(());
            }
            Operation::Remove => {
                let model = state.pin(&self.registry, arguments)?;
                let individual = existing_individual(model, mapper, arguments)?;
                (
                    removal_cascade(model.graph(), &Axiom::Declaration(individual))?,
                    true,
                )
            }
            Operation::AddType | Operation::RemoveType => {
                let model = state.pin(&self.registry, arguments)?;
                let individual = existing_individual(model, mapper, arguments)?;
                let add = operation == Operation::AddType;
                let changes = arguments
                    .class_expressions(mapper)?
                    .into_iter()
                    .map(|class| {
                        change(
                            add,
                            Axiom::ClassAssertion {
                                individual: individual.clone(),
                                class,
                            },
                        )
                    })
                    .collect();
                (changes, false)
            }
            Operation::AddAnnotation | Operation::RemoveAnnotation => {
                let model = state.pin(&self.registry, arguments)?;
                let individual = existing_individual(model, mapper, arguments)?;
                let add = operation == Operation::AddAnnotation;
                let changes = arguments
                    .annotations()?
                    .into_iter()
                    .map(|annotation| {
                        change(
                            add,
                            Axiom::IndividualAnnotation {
                                individual: individual.clone(),
                                annotation,
                            },
                        )
                    })
                    .collect();
                (changes, false)
            }
            _ => return Err(unknown_operation(Entity::Individual, operation)),
        };

        let model = state.pin(&self.registry, arguments)?;
        let touched = MutationGateway::apply(model, &changes, Policy::Relaxed)?.touched;
        state.relevant.extend(touched);
        state.rebuild |= structural;
        Ok(())
    }

    fn edge(
        &self,
        state: &mut BatchState,
        operation: Operation,
        arguments: &Arguments,
    ) -> Result<(), TesseraError> {
        let (add, annotate) = match operation {
            Operation::Add => (true, false),
            Operation::Remove => (false, false),
            Operation::AddAnnotation => (true, true),
            Operation::RemoveAnnotation => (false, true),
            _ => return Err(unknown_operation(Entity::Edge, operation)),
        };
        let mapper = self.registry.schema().mapper();
        let model = state.pin(&self.registry, arguments)?;
        let fact = Fact::new(
            IndividualId(mapper.to_full(required(arguments.subject.as_ref(), "subject")?)),
            RelationId(mapper.to_full(required(arguments.predicate.as_ref(), "predicate")?)),
            IndividualId(mapper.to_full(required(arguments.object.as_ref(), "object")?)),
        );

        let changes = if add && !annotate {
            let mut changes = vec![AxiomChange::Add(Axiom::Fact(fact.clone()))];
            if arguments.values.as_ref().is_some_and(|v| !v.is_empty()) {
                changes.extend(arguments.annotations()?.into_iter().map(|annotation| {
                    AxiomChange::Add(Axiom::FactAnnotation {
                        fact: fact.clone(),
                        annotation,
                    })
                }));
            }
            changes
        } else if !model.graph().contains_fact(&fact) {
            return Err(TesseraError::UnknownFact(fact.to_string()));
        } else if annotate {
            arguments
                .annotations()?
                .into_iter()
                .map(|annotation| {
                    change(
                        add,
                        Axiom::FactAnnotation {
                            fact: fact.clone(),
                            annotation,
                        },
                    )
                })
                .collect()
        } else {
            removal_cascade(model.graph(), &Axiom::Fact(fact))?
        };

        let touched = MutationGateway::apply(model, &changes, Policy::Relaxed)?.touched;
        state.relevant.extend(touched);
        Ok(())
    }

    fn model(
        &self,
        state: &mut BatchState,
        operation: Operation,
        arguments: &Arguments,
    ) -> Result<(), TesseraError> {
        match operation {
            Operation::Get => {
                state.pin(&self.registry, arguments)?;
                state.rebuild = true;
            }
            Operation::Generate => {
                let seed_class = required(arguments.subject.as_ref(), "subject")?.to_string();
                let corpus = required(arguments.corpus_ref.as_ref(), "corpus-ref")?.to_string();
                state.repin(&self.registry, CreateKind::Generate { seed_class, corpus })?;
            }
            Operation::GenerateBlank => {
                let corpus = arguments
                    .corpus_ref
                    .clone()
                    .filter(|c| !c.trim().is_empty());
                state.repin(&self.registry, CreateKind::GenerateBlank { corpus })?;
            }
            Operation::Import => {
                let text = required(arguments.import_model.as_ref(), "import-model")?.to_string();
                state.repin(&self.registry, CreateKind::Import { text })?;
            }
            Operation::Store => {
                let model = state.pin(&self.registry, arguments)?;
                self.registry.save_model(model)?;
            }
            Operation::AddAnnotation | Operation::RemoveAnnotation => {
                let model = state.pin(&self.registry, arguments)?;
                let add = operation == Operation::AddAnnotation;
                let changes: Vec<AxiomChange> = arguments
                    .annotations()?
                    .into_iter()
                    .map(|annotation| change(add, Axiom::ModelAnnotation(annotation)))
                    .collect();
                MutationGateway::apply(model, &changes, Policy::Relaxed)?;
                state.rebuild = true;
            }
            Operation::Undo | Operation::Redo | Operation::GetUndoRedo => {
                return Err(TesseraError::NotImplemented(format!(
                    "model/{}",
                    operation.as_str()
                )));
            }
            _ => return Err(unknown_operation(Entity::Model, operation)),
        }
        Ok(())
    }

    // =========================================================================
    // META
    // =========================================================================

    fn meta(&self, request: &BatchRequest) -> Result<ResponseData, TesseraError> {
        let entity = Entity::parse(&request.entity)?;
        let operation =
            Operation::parse(&request.operation).ok_or_else(|| TesseraError::UnknownOperation {
                entity: request.entity.clone(),
                operation: request.operation.clone(),
            })?;
        let schema = self.registry.schema();
        let mapper = schema.mapper();
        let mut data = ResponseData::default();

        match (entity, operation) {
            (Entity::Model, Operation::Export) => {
                let id = required(request.arguments.model_id.as_ref(), "model-id")?;
                let handle = self.registry.get(id)?;
                let model = handle.blocking_lock();
                let format = ExportFormat::parse(request.arguments.format.as_deref());
                data.export_model = Some(self.registry.export(&model, format)?);
                data.id = Some(id.to_string());
            }
            (Entity::Model, Operation::AllModelIds) => {
                data.model_ids = Some(self.registry.available_ids()?.into_iter().collect());
            }
            (Entity::Model, Operation::AllModelMeta) => {
                let mut meta = BTreeMap::new();
                for id in self.registry.available_ids()? {
                    let annotations = match self.registry.annotations_of(&id) {
                        Ok(annotations) => annotations,
                        // Deleted since the id listing
                        Err(TesseraError::UnknownModel(_)) => continue,
                        Err(e) => return Err(e),
                    };
                    meta.insert(id, annotations.iter().map(AnnotationJson::from).collect());
                }
                data.models_meta = Some(meta);
            }
            (Entity::Relations, Operation::Get) => {
                data.relations = Some(
                    schema
                        .relations()
                        .map(|(id, info)| TermJson {
                            id: mapper.to_compact(id.as_str()),
                            label: info.label.clone(),
                            alias: info.alias.clone(),
                        })
                        .collect(),
                );
            }
            (Entity::Evidence, Operation::Get) => {
                data.evidence = Some(
                    schema
                        .evidence()
                        .map(|(id, label)| TermJson {
                            id: mapper.to_compact(id.as_str()),
                            label: label.map(str::to_string),
                            alias: None,
                        })
                        .collect(),
                );
            }
            _ => return Err(unknown_operation(entity, operation)),
        }
        Ok(data)
    }

    // =========================================================================
    // RENDER DECISION
    // =========================================================================

    fn finish(&self, state: BatchState) -> Result<(Signal, ResponseData), TesseraError> {
        let BatchState {
            lease,
            relevant,
            rebuild,
        } = state;
        let mut model = lease.ok_or(TesseraError::EmptyBatch)?;
        model.flush()?;

        let serializer = GraphSerializer::new(self.registry.schema());
        let (signal, payload) = if rebuild {
            (Signal::Rebuild, serializer.render_whole(&model))
        } else {
            (Signal::Merge, serializer.render_subset(&model, &relevant))
        };

        let mut data = ResponseData::from_payload(model.id(), payload);
        data.inconsistent_p = !model.is_consistent();
        Ok((signal, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::request::KeyValue;
    use crate::schema::{Schema, SchemaDefinition};

    fn dispatcher() -> BatchDispatcher {
        let schema = Schema::from_definition(&SchemaDefinition::builtin()).expect("schema");
        BatchDispatcher::new(Arc::new(ModelRegistry::new(Arc::new(schema))))
    }

    fn blank() -> BatchRequest {
        BatchRequest::new("model", "generate-blank", Arguments::default())
    }

    #[test]
    fn missing_packet_id_is_minted() {
        let response = dispatcher().dispatch(&BatchCall::new("action", vec![blank()]));
        assert!(response.is_success());
        assert!(!response.packet_id.is_empty());
    }

    #[test]
    fn packet_id_is_echoed() {
        let call = BatchCall::new("action", vec![blank()])
            .with_packet_id("p-42")
            .with_uid("curator");
        let response = dispatcher().dispatch(&call);
        assert_eq!(response.packet_id, "p-42");
        assert_eq!(response.uid.as_deref(), Some("curator"));
        assert_eq!(response.intention, "action");
    }

    #[test]
    fn empty_call_is_empty_batch() {
        let response = dispatcher().dispatch(&BatchCall::new("action", Vec::new()));
        assert!(!response.is_success());
        assert!(response.commentary.is_none());
    }

    #[test]
    fn model_annotation_triggers_rebuild() {
        let dispatcher = dispatcher();
        let created = dispatcher.dispatch(&BatchCall::new("action", vec![blank()]));
        let id = created.data.id.expect("id");

        let arguments = Arguments {
            model_id: Some(id),
            values: Some(vec![KeyValue::new("title", "apoptosis")]),
            ..Arguments::default()
        };
        let response = dispatcher.dispatch(&BatchCall::new(
            "action",
            vec![BatchRequest::new("model", "add-annotation", arguments)],
        ));

        assert_eq!(response.signal, Some(Signal::Rebuild));
        assert_eq!(response.data.annotations.map(|a| a.len()), Some(1));
    }

    #[test]
    fn search_is_not_routed() {
        let response = dispatcher().dispatch(&BatchCall::new(
            "query",
            vec![BatchRequest::new("individual", "search", Arguments::default())],
        ));
        assert_eq!(
            response.message.as_deref(),
            Some("Unknown operation: individual/search")
        );
    }
}
