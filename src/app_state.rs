use crate::services::composition_service::Composer;

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub composer: Composer,
}

impl AppState {
    pub fn new(composer: Composer) -> Self {
        Self { composer }
    }
}
