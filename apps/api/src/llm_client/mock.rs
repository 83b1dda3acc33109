//! Scripted `CompletionProvider` for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{CompletionOptions, CompletionProvider, LlmError};

type Responder = dyn Fn(&str, usize) -> Result<String, LlmError> + Send + Sync;

/// Answers each call through `respond(system_prompt, call_index)` and counts calls.
pub struct MockProvider {
    calls: AtomicUsize,
    respond: Box<Responder>,
}

impl MockProvider {
    pub fn new(
        respond: impl Fn(&str, usize) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    pub fn always_rate_limited() -> Arc<Self> {
        Self::new(|_, _| Err(LlmError::RateLimited("429 Too Many Requests".to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        system: &str,
        _user: &str,
        _options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(system, call)
    }
}
