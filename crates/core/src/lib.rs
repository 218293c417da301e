//! Backend-agnostic building blocks for the digital twin service.
//!
//! The real-time voice relay and the text chat endpoint only ever talk to the
//! generative backend through the traits defined here, so the backend itself
//! stays an opaque, swappable dependency.

pub mod chat;
pub mod generic_types;
pub mod llm_client;
pub mod realtime_api;
