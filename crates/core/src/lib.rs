pub mod blob;
pub mod config;
pub mod converter;
pub mod format;
pub mod lifecycle;
pub mod metrics;
pub mod record;
pub mod testing;

pub use blob::{BlobError, BlobKey, BlobStore, FsBlobStore, CONVERTED_NAMESPACE, ORIGINAL_NAMESPACE};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ServerConfig, StorageConfig,
};
pub use converter::{
    BackendOutcome, ConversionBackend, ConversionOrchestrator, ConverterConfig, ConverterError,
    EncoderCapabilities, FfmpegBackend, SymphoniaBackend,
};
pub use format::{FormatParams, FormatRegistry, TargetFormat, UnsupportedFormat};
pub use lifecycle::ConversionManager;
pub use record::{
    AudioRecord, ConversionStatus, CreateRecordRequest, RecordError, RecordFilter, RecordStore,
    SqliteRecordStore,
};
