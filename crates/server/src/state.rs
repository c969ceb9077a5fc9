use std::sync::Arc;
use tuneshift_core::{
    BlobStore, Config, ConversionManager, EncoderCapabilities, RecordStore,
};

/// Shared application state
pub struct AppState {
    config: Config,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    conversions: Arc<ConversionManager>,
    capabilities: EncoderCapabilities,
}

impl AppState {
    pub fn new(
        config: Config,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        conversions: Arc<ConversionManager>,
        capabilities: EncoderCapabilities,
    ) -> Self {
        Self {
            config,
            records,
            blobs,
            conversions,
            capabilities,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn conversions(&self) -> &ConversionManager {
        &self.conversions
    }

    /// Encoders detected at startup.
    pub fn capabilities(&self) -> &EncoderCapabilities {
        &self.capabilities
    }
}
