//! Job model and the processing seam.

use async_trait::async_trait;
use skimmer_types::{Endpoint, ExtractedResult};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// One in-flight extraction request.
///
/// The result channel is single-shot and owned by the job; workers
/// consume it on delivery, so a job can never produce two results.
pub struct Job {
    pub url: String,
    pub endpoint: Endpoint,
    pub max_chars: Option<usize>,
    pub result_tx: oneshot::Sender<ExtractedResult>,
    /// Cancelled when the originating HTTP request goes away.
    pub cancel: CancellationToken,
}

impl Job {
    pub fn new(
        url: impl Into<String>,
        endpoint: Endpoint,
        max_chars: Option<usize>,
        cancel: CancellationToken,
    ) -> (Self, oneshot::Receiver<ExtractedResult>) {
        let (result_tx, result_rx) = oneshot::channel();
        (
            Self {
                url: url.into(),
                endpoint,
                max_chars,
                result_tx,
                cancel,
            },
            result_rx,
        )
    }
}

/// Turns a job into a result. The production implementation wraps the
/// dispatcher; tests substitute stubs.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(
        &self,
        url: &str,
        endpoint: Endpoint,
        max_chars: Option<usize>,
    ) -> ExtractedResult;
}
