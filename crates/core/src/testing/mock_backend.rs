//! Mock conversion backend for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::converter::{BackendOutcome, ConversionBackend, ConverterError};

/// One `convert` call seen by a [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub input_path: PathBuf,
    pub target: String,
}

#[derive(Debug, Clone)]
enum Behavior {
    Convert(Vec<u8>),
    Unavailable,
    Fail,
}

/// Scriptable implementation of [`ConversionBackend`].
///
/// Clones share the call log, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone)]
pub struct MockBackend {
    name: String,
    behavior: Arc<Mutex<Behavior>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    /// A backend that reports `Unavailable` until configured otherwise.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: Arc::new(Mutex::new(Behavior::Unavailable)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return these bytes from every call.
    pub fn converting(self, bytes: &[u8]) -> Self {
        self.set_behavior(Behavior::Convert(bytes.to_vec()));
        self
    }

    pub fn unavailable(self) -> Self {
        self.set_behavior(Behavior::Unavailable);
        self
    }

    /// Report a conversion failure from every call.
    pub fn failing(self) -> Self {
        self.set_behavior(Behavior::Fail);
        self
    }

    /// Switch behavior on an existing handle (affects all clones).
    pub fn set_converting(&self, bytes: &[u8]) {
        self.set_behavior(Behavior::Convert(bytes.to_vec()));
    }

    pub fn set_failing(&self) {
        self.set_behavior(Behavior::Fail);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }
}

#[async_trait]
impl ConversionBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn convert(&self, input_path: &Path, target: &str) -> BackendOutcome {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                input_path: input_path.to_path_buf(),
                target: target.to_string(),
            });

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match behavior {
            Behavior::Convert(bytes) => BackendOutcome::Converted(bytes),
            Behavior::Unavailable => BackendOutcome::Unavailable(ConverterError::BackendDisabled {
                backend: self.name.clone(),
            }),
            Behavior::Fail => BackendOutcome::Failed(ConverterError::conversion_failed(
                "mock failure",
                None,
            )),
        }
    }
}
