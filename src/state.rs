use std::sync::Arc;

use crate::generation::DesignGenerator;

/// Shared handler state; the generator owns the pipeline singleton.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<DesignGenerator>,
}

impl AppState {
    pub fn new(generator: DesignGenerator) -> Self {
        AppState {
            generator: Arc::new(generator),
        }
    }
}
