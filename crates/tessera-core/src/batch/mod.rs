//! # Batch Protocol
//!
//! The ordered-batch call: request and response shapes, and the dispatcher
//! that executes a call against the model registry.
//!
//! A call pins at most one model. Meta operations (export, id and metadata
//! listings, relation and evidence vocabularies) must be sent alone and
//! answer with `signal = meta`.

pub mod dispatcher;
pub mod request;
pub mod response;

pub use dispatcher::BatchDispatcher;
pub use request::{Arguments, BatchCall, BatchRequest, Entity, KeyValue, Operation, WireExpression};
pub use response::{BatchResponse, MessageType, ResponseData, Signal, TermJson, mint_packet_id};
