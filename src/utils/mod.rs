//! Utility modules shared by the pipeline stages.
//!
//! - [`HttpClient`]: shared reqwest client with a long default timeout
//! - [`RetryConfig`] / [`with_retry`]: bounded retry with exponential backoff
//! - [`ProgressReporter`]: per-entry progress bar on stderr
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use arxiv_digest::utils::{with_retry, RetryConfig};
//!
//! # async fn ask() -> Result<String, String> { Ok("yes".to_string()) }
//! # #[tokio::main]
//! # async fn main() {
//! let config = RetryConfig::default().max_attempts(3);
//! let answer = with_retry(config, |_attempt| ask()).await.ok();
//! # let _ = answer;
//! # }
//! ```

mod http;
mod progress;
mod retry;

pub use http::{HttpClient, DEFAULT_TIMEOUT};
pub use progress::{ProgressAwareStderr, ProgressReporter};
pub use retry::{with_retry, RetryConfig, RetryResult, DEFAULT_MAX_ATTEMPTS};
