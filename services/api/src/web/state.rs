//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use study_tracker_core::ports::{DatabaseService, StudyAssistantService};

/// The shared application state, created once at startup and passed to all handlers.
/// Handlers keep no state of their own between requests.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub assistant: Arc<dyn StudyAssistantService>,
    pub config: Arc<Config>,
}
