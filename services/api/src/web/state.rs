//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;
use study_hub_core::service::StudyHub;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<StudyHub>,
}
