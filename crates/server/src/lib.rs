//! HTTP server for tuneshift: upload, convert and download audio records.

pub mod api;
pub mod metrics;
pub mod state;
