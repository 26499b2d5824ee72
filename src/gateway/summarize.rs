//! Full-text summarization.

use std::sync::Arc;

use super::GatewayError;
use crate::llm::ChatCapability;
use crate::utils::{with_retry, RetryConfig, RetryResult};

const SYSTEM_PROMPT: &str = "You are a research assistant summarizing papers.";

/// Turns extracted paper text into study notes
#[derive(Clone)]
pub struct SummarizationGateway {
    capability: Arc<dyn ChatCapability>,
    retry: RetryConfig,
}

impl SummarizationGateway {
    pub fn new(capability: Arc<dyn ChatCapability>, retry: RetryConfig) -> Self {
        Self { capability, retry }
    }

    /// Summarize `full_text`. Any non-empty reply is accepted, trimmed.
    pub async fn summarize(&self, full_text: &str) -> Option<String> {
        let prompt = format!(
            "Summarize the following research paper content in the form of detailed study notes:\n\n{}",
            full_text
        );
        let capability = Arc::clone(&self.capability);

        let result = with_retry(self.retry, |_| {
            let capability = Arc::clone(&capability);
            let prompt = prompt.as_str();
            async move {
                let reply = capability.complete(SYSTEM_PROMPT, prompt).await?;
                let reply = reply.trim();
                if reply.is_empty() {
                    Err(GatewayError::Empty)
                } else {
                    Ok(reply.to_string())
                }
            }
        })
        .await;

        if let RetryResult::Exhausted { errors } = &result {
            tracing::warn!(
                "Summarization failed after {} attempts: {}",
                errors.len(),
                errors.last().map(|e| e.to_string()).unwrap_or_default()
            );
        }

        result.ok()
    }
}

impl std::fmt::Debug for SummarizationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizationGateway")
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        reply: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(reply: Result<&'static str, ()>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatCapability for Fixed {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(prompt.contains("detailed study notes"));
            self.reply
                .map(str::to_string)
                .map_err(|_| LlmError::Network("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_summary_is_trimmed() {
        let capability = Fixed::new(Ok("\n  Notes about the paper.  \n"));
        let gateway = SummarizationGateway::new(capability.clone(), RetryConfig::default().no_delay());
        assert_eq!(
            gateway.summarize("full text").await.as_deref(),
            Some("Notes about the paper.")
        );
        assert_eq!(capability.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_replies_yield_absent() {
        let capability = Fixed::new(Ok("   "));
        let gateway = SummarizationGateway::new(capability.clone(), RetryConfig::default().no_delay());
        assert_eq!(gateway.summarize("full text").await, None);
        assert_eq!(capability.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_errors_yield_absent() {
        let capability = Fixed::new(Err(()));
        let gateway = SummarizationGateway::new(capability.clone(), RetryConfig::default().no_delay());
        assert_eq!(gateway.summarize("full text").await, None);
        assert_eq!(capability.calls.load(Ordering::SeqCst), 5);
    }
}
