//! Conversion state machine for audio records.
//!
//! A record starts `pending`. Each conversion attempt ends in exactly one
//! store write that moves it to `success` or `failed`; a failed record may be
//! retried and a successful one re-converted.

mod manager;

pub use manager::ConversionManager;
