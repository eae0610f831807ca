//! # Background Schema
//!
//! The shared, read-only knowledge every model is layered on: class and
//! relation labels, the subclass hierarchy, disjointness, relation aliases,
//! and the evidence vocabulary.
//!
//! A `Schema` is built once from a declarative `SchemaDefinition` (normally
//! parsed from the `[schema]` table of the app config) and shared via `Arc`.
//! Definitions use compact ids; the schema stores full ids.

use crate::primitives::{DEFAULT_NAMESPACE, ENABLED_BY, MAX_ANCESTOR_DEPTH, PART_OF};
use crate::render::ids::IdMapper;
use crate::{ClassId, RelationId, TesseraError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// DEFINITION (DESERIALIZABLE)
// =============================================================================

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// A class entry of a schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// A relation entry of a schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Colon-free shorthand accepted in requests, e.g. `part_of`.
    #[serde(default)]
    pub alias: Option<String>,
}

/// An evidence class entry of a schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Declarative schema, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub classes: Vec<ClassDefinition>,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
    #[serde(default)]
    pub evidence: Vec<TermDefinition>,
    /// Pairs of classes that share no instances.
    #[serde(default)]
    pub disjoint: Vec<[String; 2]>,
}

impl Default for SchemaDefinition {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            classes: Vec::new(),
            relations: Vec::new(),
            evidence: Vec::new(),
            disjoint: Vec::new(),
        }
    }
}

impl SchemaDefinition {
    /// The built-in schema: the three GO roots, the relations model
    /// generation needs, and two common evidence codes.
    #[must_use]
    pub fn builtin() -> Self {
        let class = |id: &str, label: &str, parents: &[&str]| ClassDefinition {
            id: id.to_string(),
            label: Some(label.to_string()),
            parents: parents.iter().map(|p| (*p).to_string()).collect(),
        };
        let relation = |id: &str, label: &str, alias: &str| RelationDefinition {
            id: id.to_string(),
            label: Some(label.to_string()),
            alias: Some(alias.to_string()),
        };
        let term = |id: &str, label: &str| TermDefinition {
            id: id.to_string(),
            label: Some(label.to_string()),
        };

        Self {
            namespace: default_namespace(),
            classes: vec![
                class("GO:0008150", "biological_process", &[]),
                class("GO:0003674", "molecular_function", &[]),
                class("GO:0005575", "cellular_component", &[]),
            ],
            relations: vec![
                relation(PART_OF, "part of", "part_of"),
                relation("BFO:0000066", "occurs in", "occurs_in"),
                relation(ENABLED_BY, "enabled by", "enabled_by"),
                relation("RO:0002411", "causally upstream of", "causally_upstream_of"),
            ],
            evidence: vec![
                term("ECO:0000314", "direct assay evidence"),
                term("ECO:0000315", "mutant phenotype evidence"),
            ],
            disjoint: vec![
                ["GO:0008150".to_string(), "GO:0003674".to_string()],
                ["GO:0008150".to_string(), "GO:0005575".to_string()],
                ["GO:0003674".to_string(), "GO:0005575".to_string()],
            ],
        }
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Relation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationInfo {
    pub label: Option<String>,
    pub alias: Option<String>,
}

/// The resolved background schema.
#[derive(Debug, Clone)]
pub struct Schema {
    mapper: IdMapper,
    class_labels: BTreeMap<ClassId, String>,
    parents: BTreeMap<ClassId, BTreeSet<ClassId>>,
    relations: BTreeMap<RelationId, RelationInfo>,
    evidence: BTreeMap<ClassId, Option<String>>,
    disjoint: BTreeSet<(ClassId, ClassId)>,
}

impl Schema {
    /// Resolve a definition into a schema.
    ///
    /// Fails with `InvalidConfig` if the namespace is not an absolute IRI or
    /// a relation alias contains a colon.
    pub fn from_definition(definition: &SchemaDefinition) -> Result<Self, TesseraError> {
        if !definition.namespace.contains("://") {
            return Err(TesseraError::InvalidConfig(format!(
                "schema namespace must be an absolute IRI, got '{}'",
                definition.namespace
            )));
        }

        let mut mapper = IdMapper::new(definition.namespace.clone());
        let mut relations = BTreeMap::new();
        for relation in &definition.relations {
            let full = mapper.to_full(&relation.id);
            if let Some(alias) = &relation.alias {
                if alias.contains(':') {
                    return Err(TesseraError::InvalidConfig(format!(
                        "relation alias '{}' must not contain ':'",
                        alias
                    )));
                }
                mapper.insert_alias(alias.clone(), full.clone());
            }
            relations.insert(
                RelationId(full),
                RelationInfo {
                    label: relation.label.clone(),
                    alias: relation.alias.clone(),
                },
            );
        }

        let mut class_labels = BTreeMap::new();
        let mut parents: BTreeMap<ClassId, BTreeSet<ClassId>> = BTreeMap::new();
        for class in &definition.classes {
            let id = ClassId(mapper.to_full(&class.id));
            if let Some(label) = &class.label {
                class_labels.insert(id.clone(), label.clone());
            }
            let entry = parents.entry(id).or_default();
            for parent in &class.parents {
                entry.insert(ClassId(mapper.to_full(parent)));
            }
        }

        let evidence = definition
            .evidence
            .iter()
            .map(|term| (ClassId(mapper.to_full(&term.id)), term.label.clone()))
            .collect();

        let disjoint = definition
            .disjoint
            .iter()
            .map(|[a, b]| ordered_pair(ClassId(mapper.to_full(a)), ClassId(mapper.to_full(b))))
            .collect();

        Ok(Self {
            mapper,
            class_labels,
            parents,
            relations,
            evidence,
            disjoint,
        })
    }

    /// The identifier mapping for this schema.
    #[must_use]
    pub fn mapper(&self) -> &IdMapper {
        &self.mapper
    }

    /// Label of a class, if the schema knows one.
    #[must_use]
    pub fn class_label(&self, class: &ClassId) -> Option<&str> {
        self.class_labels.get(class).map(String::as_str)
    }

    /// Label of a relation, if the schema knows one.
    #[must_use]
    pub fn relation_label(&self, relation: &RelationId) -> Option<&str> {
        self.relations
            .get(relation)
            .and_then(|info| info.label.as_deref())
    }

    /// All declared relations.
    pub fn relations(&self) -> impl Iterator<Item = (&RelationId, &RelationInfo)> {
        self.relations.iter()
    }

    /// All declared evidence classes.
    pub fn evidence(&self) -> impl Iterator<Item = (&ClassId, Option<&str>)> {
        self.evidence
            .iter()
            .map(|(id, label)| (id, label.as_deref()))
    }

    /// The class and all its declared superclasses.
    ///
    /// Cycles are tolerated; the walk is bounded by `MAX_ANCESTOR_DEPTH`.
    #[must_use]
    pub fn ancestors(&self, class: &ClassId) -> BTreeSet<ClassId> {
        let mut seen = BTreeSet::new();
        seen.insert(class.clone());
        let mut frontier = vec![class.clone()];

        for _ in 0..MAX_ANCESTOR_DEPTH {
            let mut next = Vec::new();
            for current in &frontier {
                if let Some(parents) = self.parents.get(current) {
                    for parent in parents {
                        if seen.insert(parent.clone()) {
                            next.push(parent.clone());
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        seen
    }

    /// Whether `class` is `ancestor` or one of its subclasses.
    #[must_use]
    pub fn is_subclass_of(&self, class: &ClassId, ancestor: &ClassId) -> bool {
        self.ancestors(class).contains(ancestor)
    }

    /// Whether the two classes are declared disjoint.
    #[must_use]
    pub fn are_disjoint(&self, a: &ClassId, b: &ClassId) -> bool {
        self.disjoint
            .contains(&ordered_pair(a.clone(), b.clone()))
    }
}

fn ordered_pair(a: ClassId, b: ClassId) -> (ClassId, ClassId) {
    if a <= b { (a, b) } else { (b, a) }
}
