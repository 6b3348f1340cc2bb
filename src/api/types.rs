//! Shared state for the HTTP layer.

use std::sync::Arc;

use crate::config::ConverterConfig;
use crate::pipeline::Converter;

/// Handler state. Cheap to clone; the converter is shared.
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
}

impl AppState {
    pub fn new(converter: Arc<Converter>) -> Self {
        Self { converter }
    }

    /// State with a converter built from `config` and the live environment.
    pub fn from_config(config: ConverterConfig) -> Self {
        Self::new(Arc::new(Converter::new(config)))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.converter.config().max_upload_bytes
    }
}
