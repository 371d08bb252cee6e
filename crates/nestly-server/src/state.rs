//! Shared application state.

use std::sync::Arc;

use crate::shortener::Shortener;

/// State shared by all handlers.
pub struct AppState {
    pub shortener: Arc<dyn Shortener>,
}
