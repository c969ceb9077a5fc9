//! Audio records: one uploaded asset and its conversion state.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteRecordStore;
pub use store::{CreateRecordRequest, RecordError, RecordFilter, RecordStore};
pub use types::{extension_of, AudioRecord, ConversionStatus, DEFAULT_TARGET_EXTENSION};
