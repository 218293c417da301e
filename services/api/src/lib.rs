//! Digital Twin API Library Crate
//!
//! This library contains the logic for the digital twin web service: the
//! application state, the text chat and health handlers, the real-time voice
//! relay and routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;

#[cfg(test)]
pub(crate) mod test_support;
