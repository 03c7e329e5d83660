use linko_core::{CodeLength, Redirector, Shortener};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<dyn Shortener>,
    pub redirector: Arc<dyn Redirector>,
    /// Bounds used to reject malformed codes before any store is touched.
    pub code_length: CodeLength,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        redirector: Arc<dyn Redirector>,
        code_length: CodeLength,
    ) -> Self {
        Self {
            shortener,
            redirector,
            code_length,
        }
    }
}
