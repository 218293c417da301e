//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the backend clients and the persona.

use std::sync::Arc;
use twin_core::{
    generic_types::LiveSessionConfig, llm_client::ChatClient, realtime_api::RealtimeConnector,
};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_client: Arc<dyn ChatClient>,
    pub connector: Arc<dyn RealtimeConnector>,
    pub system_prompt: Arc<String>,
    /// Fixed configuration every voice session is opened with.
    pub live_config: Arc<LiveSessionConfig>,
}
