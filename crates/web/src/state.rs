use std::sync::Arc;

use storage::store::ResultsStore;

/// Rules applied to uploaded results files.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Required file name suffix, compared case-insensitively
    pub extension: String,
    pub max_bytes: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResultsStore>,
    pub uploads: UploadSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn ResultsStore>, uploads: UploadSettings) -> Self {
        Self { store, uploads }
    }

    pub fn store(&self) -> &dyn ResultsStore {
        self.store.as_ref()
    }
}
