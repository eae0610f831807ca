//! Batch response shapes.

use crate::TesseraError;
use crate::render::{AnnotationJson, FactJson, IndividualJson, ModelPayload, PropertyJson};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generic failure message for non-protocol errors.
pub const INTERNAL_FAILURE_MESSAGE: &str = "Could not successfully complete batch request.";

/// A fresh packet id for calls that did not bring one.
#[must_use]
pub fn mint_packet_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// How the client should apply the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Merge the rendered subset into the client's copy.
    Merge,
    /// Replace the client's copy with the rendered whole model.
    Rebuild,
    /// Not about a model; see the meta fields.
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Success,
    Error,
}

/// A schema term listed by `relations/get` or `evidence/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermJson {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Response payload. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inconsistent_p: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individuals: Option<Vec<IndividualJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<Vec<FactJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<AnnotationJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<TermJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<TermJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models_meta: Option<BTreeMap<String, Vec<AnnotationJson>>>,
}

impl ResponseData {
    /// Payload for a rendered model.
    #[must_use]
    pub fn from_payload(id: impl Into<String>, payload: ModelPayload) -> Self {
        Self {
            id: Some(id.into()),
            individuals: Some(payload.individuals),
            facts: Some(payload.facts),
            properties: Some(payload.properties),
            annotations: payload.annotations,
            ..Self::default()
        }
    }
}

/// The outcome of one batch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchResponse {
    pub packet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub intention: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
    #[serde(default)]
    pub data: ResponseData,
}

impl BatchResponse {
    /// A successful response.
    #[must_use]
    pub fn success(
        packet_id: impl Into<String>,
        uid: Option<String>,
        intention: impl Into<String>,
        signal: Signal,
        data: ResponseData,
    ) -> Self {
        Self {
            packet_id: packet_id.into(),
            uid,
            intention: intention.into(),
            signal: Some(signal),
            message_type: MessageType::Success,
            message: Some("success".to_string()),
            commentary: None,
            data,
        }
    }

    /// An error response.
    ///
    /// Protocol errors carry their own text as the message. Anything else
    /// gets the generic failure message and the error as commentary.
    #[must_use]
    pub fn error(
        packet_id: impl Into<String>,
        uid: Option<String>,
        intention: impl Into<String>,
        error: &TesseraError,
    ) -> Self {
        let (message, commentary) = if error.is_protocol() {
            (error.to_string(), None)
        } else {
            (
                INTERNAL_FAILURE_MESSAGE.to_string(),
                Some(format!("{}: {}", error.kind(), error)),
            )
        };
        Self {
            packet_id: packet_id.into(),
            uid,
            intention: intention.into(),
            signal: None,
            message_type: MessageType::Error,
            message: Some(message),
            commentary,
            data: ResponseData::default(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message_type == MessageType::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_have_no_commentary() {
        let response = BatchResponse::error("p", None, "action", &TesseraError::EmptyBatch);
        assert_eq!(response.message_type, MessageType::Error);
        assert!(response.signal.is_none());
        assert!(response.commentary.is_none());
        assert!(
            response
                .message
                .as_deref()
                .is_some_and(|m| m.starts_with("Empty batch"))
        );
    }

    #[test]
    fn internal_errors_are_wrapped() {
        let error = TesseraError::UnknownModel("gomodel:x".into());
        let response = BatchResponse::error("p", None, "action", &error);
        assert_eq!(response.message.as_deref(), Some(INTERNAL_FAILURE_MESSAGE));
        assert_eq!(
            response.commentary.as_deref(),
            Some("UnknownModelError: Unknown model: gomodel:x")
        );
    }

    #[test]
    fn wire_keys_are_kebab_case() {
        let data = ResponseData {
            id: Some("gomodel:a".into()),
            inconsistent_p: true,
            model_ids: Some(vec!["gomodel:a".into()]),
            ..ResponseData::default()
        };
        let response = BatchResponse::success("p", Some("u".into()), "query", Signal::Meta, data);
        let json = serde_json::to_value(&response).expect("json");

        assert_eq!(json["packet-id"], "p");
        assert_eq!(json["message-type"], "success");
        assert_eq!(json["signal"], "meta");
        assert_eq!(json["data"]["inconsistent-p"], true);
        assert_eq!(json["data"]["model-ids"][0], "gomodel:a");
        assert!(json["data"].get("individuals").is_none());
    }

    #[test]
    fn consistent_models_omit_flag() {
        let json = serde_json::to_value(ResponseData::default()).expect("json");
        assert!(json.get("inconsistent-p").is_none());
    }
}
