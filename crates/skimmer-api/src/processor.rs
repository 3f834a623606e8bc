//! Production job processor: the dispatcher behind the worker seam.

use async_trait::async_trait;
use skimmer_extract::Dispatcher;
use skimmer_types::{Endpoint, ExtractedResult};
use skimmer_workers::JobProcessor;
use std::sync::Arc;

/// Wraps the dispatcher so worker pools stay independent of adapter
/// construction.
pub struct DispatchProcessor {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchProcessor {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl JobProcessor for DispatchProcessor {
    async fn process(
        &self,
        url: &str,
        endpoint: Endpoint,
        max_chars: Option<usize>,
    ) -> ExtractedResult {
        self.dispatcher.dispatch(url, endpoint, max_chars).await
    }
}
