//! Byte-blob storage for original uploads and converted files.

mod error;
mod fs_store;
mod traits;
mod types;

pub use error::BlobError;
pub use fs_store::FsBlobStore;
pub use traits::BlobStore;
pub use types::{BlobKey, CONVERTED_NAMESPACE, ORIGINAL_NAMESPACE};
