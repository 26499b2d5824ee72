//! Retry-wrapped adapters over the chat capability.
//!
//! - [`ClassificationGateway`]: strict Yes/No relevance verdicts, conservative on failure
//! - [`SummarizationGateway`]: free-form study notes from full text
//!
//! Neither gateway ever returns an error: exhausting the retry bound is a
//! definitive "no" (classification) or "absent" (summarization).

mod classify;
mod summarize;

pub use classify::{parse_verdict, ClassificationGateway};
pub use summarize::SummarizationGateway;

use crate::llm::LlmError;

/// Why a single gateway attempt did not produce a usable answer
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The capability itself failed
    #[error(transparent)]
    Capability(#[from] LlmError),

    /// The model answered, but not in the required form
    #[error("Unparseable reply: {0:?}")]
    Unparseable(String),

    /// The model answered with nothing but whitespace
    #[error("Empty reply")]
    Empty,
}
