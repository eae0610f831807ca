//! # Model Text Codec
//!
//! The opaque text form a model takes on `model/export` and `model/import`.
//!
//! The engine treats the text as a black box behind `ModelCodec`. The
//! shipped `JsonCodec` writes a serde_json envelope carrying the model id,
//! the requested format name and the graph; it does not emit any ontology
//! syntax.

use crate::graph::SerializableGraph;
use crate::model::ModelSnapshot;
use crate::TesseraError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// =============================================================================
// EXPORT FORMAT
// =============================================================================

/// Export format names accepted on `model/export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    RdfXml,
    Owl,
    Owx,
    #[default]
    Ofn,
    Obo,
}

impl ExportFormat {
    /// Parse a format name. Absent or unknown names fall back to the default.
    #[must_use]
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("rdfxml") => Self::RdfXml,
            Some("owl") => Self::Owl,
            Some("owx") => Self::Owx,
            Some("ofn") => Self::Ofn,
            Some("obo") => Self::Obo,
            Some(other) => {
                tracing::debug!(format = other, "unknown export format, using default");
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Canonical format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RdfXml => "rdfxml",
            Self::Owl => "owl",
            Self::Owx => "owx",
            Self::Ofn => "ofn",
            Self::Obo => "obo",
        }
    }
}

// =============================================================================
// CODEC TRAIT
// =============================================================================

/// Reads and writes the text form of a model.
pub trait ModelCodec: Send + Sync + Debug {
    /// Render a snapshot as text.
    fn write(&self, snapshot: &ModelSnapshot, format: ExportFormat) -> Result<String, TesseraError>;

    /// Parse text back into a snapshot. The model id must be recoverable
    /// from the text; otherwise this fails with `ImportError`.
    fn read(&self, text: &str) -> Result<ModelSnapshot, TesseraError>;
}

// =============================================================================
// JSON CODEC
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ExportEnvelope {
    #[serde(rename = "model-id", default)]
    model_id: Option<String>,
    format: String,
    graph: SerializableGraph,
}

/// Envelope codec over serde_json.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl ModelCodec for JsonCodec {
    fn write(&self, snapshot: &ModelSnapshot, format: ExportFormat) -> Result<String, TesseraError> {
        let envelope = ExportEnvelope {
            model_id: Some(snapshot.id.clone()),
            format: format.as_str().to_string(),
            graph: snapshot.graph.clone(),
        };
        serde_json::to_string_pretty(&envelope)
            .map_err(|e| TesseraError::SerializationError(e.to_string()))
    }

    fn read(&self, text: &str) -> Result<ModelSnapshot, TesseraError> {
        let envelope: ExportEnvelope = serde_json::from_str(text)
            .map_err(|e| TesseraError::ImportError(format!("unparseable model text: {}", e)))?;

        match envelope.model_id {
            Some(id) if !id.trim().is_empty() => Ok(ModelSnapshot {
                id,
                graph: envelope.graph,
            }),
            _ => Err(TesseraError::ImportError(
                "no model id in import metadata".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ModelSnapshot {
        ModelSnapshot {
            id: "gomodel:exported".to_string(),
            graph: SerializableGraph::default(),
        }
    }

    #[test]
    fn format_names_parse() {
        assert_eq!(ExportFormat::parse(Some("owx")), ExportFormat::Owx);
        assert_eq!(ExportFormat::parse(Some("RDFXML")), ExportFormat::RdfXml);
        assert_eq!(ExportFormat::parse(Some("turtle")), ExportFormat::Ofn);
        assert_eq!(ExportFormat::parse(None), ExportFormat::Ofn);
    }

    #[test]
    fn envelope_records_format() {
        let text = JsonCodec
            .write(&snapshot(), ExportFormat::Obo)
            .expect("write");
        assert!(text.contains("\"format\": \"obo\""));
        assert!(text.contains("gomodel:exported"));
        assert_eq!(JsonCodec.read(&text).expect("read"), snapshot());
    }

    #[test]
    fn missing_id_is_import_error() {
        let text = r#"{"format":"ofn","graph":{"individuals":[],"facts":[],"annotations":[],"next_sequence":0}}"#;
        assert!(matches!(
            JsonCodec.read(text),
            Err(TesseraError::ImportError(_))
        ));
    }

    #[test]
    fn garbage_is_import_error() {
        assert!(matches!(
            JsonCodec.read("Ontology(<x>)"),
            Err(TesseraError::ImportError(_))
        ));
    }
}
