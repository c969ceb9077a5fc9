//! Ordered, best-effort conversion across backends.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument, Span};

use super::config::ConverterConfig;
use super::ffmpeg::FfmpegBackend;
use super::native::SymphoniaBackend;
use super::traits::ConversionBackend;
use super::types::BackendOutcome;
use crate::metrics::{BACKEND_ATTEMPTS, BACKEND_DURATION};

/// Tries each backend in order and returns the first converted payload.
///
/// Backends run strictly one after another. Nothing is cached between calls.
pub struct ConversionOrchestrator {
    backends: Vec<Arc<dyn ConversionBackend>>,
    span: Span,
}

impl ConversionOrchestrator {
    /// Creates an orchestrator over an explicit backend list.
    pub fn new(backends: Vec<Arc<dyn ConversionBackend>>) -> Self {
        Self {
            backends,
            span: tracing::info_span!("conversion"),
        }
    }

    /// Builds the standard chain: in-process first, ffmpeg second.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(vec![
            Arc::new(SymphoniaBackend::from_config(config)),
            Arc::new(FfmpegBackend::new(config.clone())),
        ])
    }

    /// Routes diagnostics for every conversion through `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Names of the backends in attempt order.
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Converts `input_path` to `target`, or returns `None` when no backend
    /// produced data.
    pub async fn convert(&self, input_path: &Path, target: &str) -> Option<Vec<u8>> {
        let span = self.span.clone();
        async move {
            for backend in &self.backends {
                let start = Instant::now();
                let outcome = backend.convert(input_path, target).await;

                BACKEND_ATTEMPTS
                    .with_label_values(&[backend.name(), outcome.label()])
                    .inc();
                BACKEND_DURATION
                    .with_label_values(&[backend.name()])
                    .observe(start.elapsed().as_secs_f64());

                match outcome {
                    BackendOutcome::Converted(bytes) if !bytes.is_empty() => {
                        info!(
                            backend = backend.name(),
                            format = target,
                            bytes = bytes.len(),
                            "Conversion succeeded"
                        );
                        return Some(bytes);
                    }
                    BackendOutcome::Converted(_) => {
                        warn!(backend = backend.name(), format = target, "Backend returned no data");
                    }
                    BackendOutcome::Unavailable(reason) => {
                        info!(
                            backend = backend.name(),
                            format = target,
                            %reason,
                            "Backend unavailable, trying next"
                        );
                    }
                    BackendOutcome::Failed(error) => {
                        warn!(backend = backend.name(), format = target, %error, "Backend failed");
                    }
                }
            }

            warn!(format = target, "No backend produced converted data");
            None
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn orchestrator(primary: &MockBackend, fallback: &MockBackend) -> ConversionOrchestrator {
        ConversionOrchestrator::new(vec![
            Arc::new(primary.clone()) as Arc<dyn ConversionBackend>,
            Arc::new(fallback.clone()),
        ])
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = MockBackend::named("primary").converting(b"from-primary");
        let fallback = MockBackend::named("fallback").converting(b"from-fallback");

        let result = orchestrator(&primary, &fallback)
            .convert(Path::new("/in.wav"), "mp3")
            .await;

        assert_eq!(result.unwrap(), b"from-primary".to_vec());
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_primary_unavailable_invokes_fallback_once() {
        let primary = MockBackend::named("primary").unavailable();
        let fallback = MockBackend::named("fallback").converting(b"from-fallback");

        let result = orchestrator(&primary, &fallback)
            .convert(Path::new("/in.wav"), "ogg")
            .await;

        assert_eq!(result.unwrap(), b"from-fallback".to_vec());
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_primary_failure_invokes_fallback() {
        let primary = MockBackend::named("primary").failing();
        let fallback = MockBackend::named("fallback").converting(b"ok");

        let result = orchestrator(&primary, &fallback)
            .convert(Path::new("/in.wav"), "flac")
            .await;

        assert!(result.is_some());
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_both_fail_returns_none() {
        let primary = MockBackend::named("primary").unavailable();
        let fallback = MockBackend::named("fallback").unavailable();

        let result = orchestrator(&primary, &fallback)
            .convert(Path::new("/in.wav"), "mp3")
            .await;

        assert!(result.is_none());
        assert_eq!(primary.call_count(), 1);
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_bytes_count_as_no_data() {
        let primary = MockBackend::named("primary").converting(b"");
        let fallback = MockBackend::named("fallback").failing();

        let result = orchestrator(&primary, &fallback)
            .convert(Path::new("/in.wav"), "mp3")
            .await;

        assert!(result.is_none());
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_caching_between_calls() {
        let primary = MockBackend::named("primary").converting(b"x");
        let fallback = MockBackend::named("fallback").converting(b"y");
        let orch = orchestrator(&primary, &fallback);

        orch.convert(Path::new("/in.wav"), "mp3").await;
        orch.convert(Path::new("/in.wav"), "mp3").await;

        assert_eq!(primary.call_count(), 2);
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn test_backends_receive_input_and_target() {
        let primary = MockBackend::named("primary").failing();
        let fallback = MockBackend::named("fallback").failing();

        orchestrator(&primary, &fallback)
            .convert(Path::new("/music/song.flac"), "m4a")
            .await;

        let calls = fallback.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input_path, Path::new("/music/song.flac"));
        assert_eq!(calls[0].target, "m4a");
    }

    #[test]
    fn test_from_config_order() {
        let orch = ConversionOrchestrator::from_config(&ConverterConfig::default());
        assert_eq!(orch.backend_names(), vec!["symphonia", "ffmpeg"]);
    }

    #[tokio::test]
    async fn test_real_chain_missing_input() {
        let orch = ConversionOrchestrator::from_config(&ConverterConfig::default());
        let result = orch.convert(Path::new("/nonexistent/in.wav"), "wav").await;
        assert!(result.is_none());
    }
}
