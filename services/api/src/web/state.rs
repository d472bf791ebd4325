//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use quickscan_core::ports::{ExtractionService, ScanRecorder};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn ScanRecorder>,
    pub config: Arc<Config>,
    /// `None` when no API key is configured.
    pub extractor: Option<Arc<dyn ExtractionService>>,
}
