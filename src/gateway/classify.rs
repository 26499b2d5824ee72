//! Relevance classification with strict answer parsing.

use std::sync::Arc;

use super::GatewayError;
use crate::llm::ChatCapability;
use crate::models::TopicSet;
use crate::utils::{with_retry, RetryConfig, RetryResult};

const SYSTEM_PROMPT: &str = "You are a research assistant analyzing papers.";

/// Normalize a model reply into a verdict.
///
/// Trims, lowercases and drops one trailing period; only `yes` and `no` count.
pub fn parse_verdict(reply: &str) -> Option<bool> {
    let normalized = reply.trim().to_lowercase();
    let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);
    match normalized {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

fn build_prompt(title: &str, abstract_text: &str, topics: &TopicSet) -> String {
    format!(
        "Analyze the following research paper to determine if it is relevant to the topics [{}]. \
         Title: {} Abstract: {}. Answer only Yes or No.",
        topics, title, abstract_text
    )
}

/// Decides whether a paper is relevant to a topic set
#[derive(Clone)]
pub struct ClassificationGateway {
    capability: Arc<dyn ChatCapability>,
    retry: RetryConfig,
    log_failures: bool,
}

impl ClassificationGateway {
    pub fn new(capability: Arc<dyn ChatCapability>, retry: RetryConfig) -> Self {
        Self {
            capability,
            retry,
            log_failures: false,
        }
    }

    /// Log the raw replies when a paper could not be classified
    pub fn log_failures(mut self, enabled: bool) -> Self {
        self.log_failures = enabled;
        self
    }

    /// Classify a paper. Returns `false` when no authoritative answer was obtained.
    pub async fn classify(&self, title: &str, abstract_text: &str, topics: &TopicSet) -> bool {
        let prompt = build_prompt(title, abstract_text, topics);
        let capability = Arc::clone(&self.capability);

        let result = with_retry(self.retry, |_| {
            let capability = Arc::clone(&capability);
            let prompt = prompt.as_str();
            async move {
                let reply = capability.complete(SYSTEM_PROMPT, prompt).await?;
                parse_verdict(&reply).ok_or(GatewayError::Unparseable(reply))
            }
        })
        .await;

        match result {
            RetryResult::Success { value, .. } => value,
            RetryResult::Exhausted { errors } => {
                if self.log_failures {
                    let replies: Vec<&str> = errors
                        .iter()
                        .filter_map(|e| match e {
                            GatewayError::Unparseable(reply) => Some(reply.as_str()),
                            _ => None,
                        })
                        .collect();
                    tracing::warn!(
                        "Failed to classify paper after {} attempts: {}: {:?}",
                        errors.len(),
                        title,
                        replies
                    );
                }
                false
            }
        }
    }
}

impl std::fmt::Debug for ClassificationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationGateway")
            .field("retry", &self.retry)
            .field("log_failures", &self.log_failures)
            .finish()
    }
}
