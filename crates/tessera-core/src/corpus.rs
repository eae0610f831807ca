//! # Annotation Corpus
//!
//! Seed data for `model/generate`: which gene products are annotated to
//! which classes, grouped into named corpora.

use crate::TesseraError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// One gene-product-to-class annotation, in compact ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusAnnotation {
    pub gene: String,
    pub class: String,
}

/// A named corpus, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDefinition {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<CorpusAnnotation>,
}

/// Supplies the annotations of a corpus.
pub trait CorpusSource: Send + Sync + Debug {
    /// All annotations of `corpus`; `UnknownCorpus` if there is no such corpus.
    fn annotations(&self, corpus: &str) -> Result<Vec<CorpusAnnotation>, TesseraError>;
}

/// A fixed set of corpora held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    corpora: BTreeMap<String, Vec<CorpusAnnotation>>,
}

impl StaticCorpus {
    /// Create a source with no corpora.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from configuration entries. Later entries with the
    /// same name extend earlier ones.
    #[must_use]
    pub fn from_definitions(definitions: &[CorpusDefinition]) -> Self {
        let mut corpus = Self::new();
        for definition in definitions {
            corpus
                .corpora
                .entry(definition.name.clone())
                .or_default()
                .extend(definition.annotations.iter().cloned());
        }
        corpus
    }

    /// Add (or extend) a corpus.
    #[must_use]
    pub fn with_corpus(mut self, name: impl Into<String>, annotations: Vec<CorpusAnnotation>) -> Self {
        self.corpora.entry(name.into()).or_default().extend(annotations);
        self
    }
}

impl CorpusSource for StaticCorpus {
    fn annotations(&self, corpus: &str) -> Result<Vec<CorpusAnnotation>, TesseraError> {
        self.corpora
            .get(corpus)
            .cloned()
            .ok_or_else(|| TesseraError::UnknownCorpus(corpus.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(gene: &str, class: &str) -> CorpusAnnotation {
        CorpusAnnotation {
            gene: gene.into(),
            class: class.into(),
        }
    }

    #[test]
    fn definitions_with_same_name_merge() {
        let corpus = StaticCorpus::from_definitions(&[
            CorpusDefinition {
                name: "fb".into(),
                annotations: vec![annotation("FB:1", "GO:1")],
            },
            CorpusDefinition {
                name: "fb".into(),
                annotations: vec![annotation("FB:2", "GO:2")],
            },
        ]);
        assert_eq!(corpus.annotations("fb").expect("fb").len(), 2);
    }

    #[test]
    fn unknown_corpus_is_an_error() {
        let corpus = StaticCorpus::new().with_corpus("mgi", Vec::new());
        assert!(corpus.annotations("mgi").expect("mgi").is_empty());
        assert!(matches!(
            corpus.annotations("zfin"),
            Err(TesseraError::UnknownCorpus(name)) if name == "zfin"
        ));
    }
}
