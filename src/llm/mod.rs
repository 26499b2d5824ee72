//! Language-model capability used by the classification and summarization gateways.
//!
//! The gateways only see [`ChatCapability`]. Concrete backends are the closed
//! [`Provider`] variant, chosen once from a `"provider/model"` string:
//!
//! - `openai/<model>` selects the hosted OpenAI endpoint
//! - anything else (`ollama/phi4`, `local/llama3.1`) selects the local
//!   OpenAI-compatible endpoint, Ollama by default
//!
//! Both variants speak the chat-completions protocol through [`OpenAiCompatClient`].

mod client;

pub use client::OpenAiCompatClient;

use async_trait::async_trait;

use crate::utils::HttpClient;

/// Provider prefix that selects the hosted endpoint
pub const HOSTED_PROVIDER: &str = "openai";
/// Default local endpoint (Ollama's OpenAI-compatible API)
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";
/// Default hosted endpoint
pub const DEFAULT_HOSTED_BASE_URL: &str = "https://api.openai.com/v1";
/// Ollama ignores the key but the protocol wants one
const LOCAL_API_KEY: &str = "ollama";

/// A request/response text-generation capability
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Send a system instruction and a user prompt, get the reply text back
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Errors that can occur when talking to a model
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status from the endpoint
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not match the chat-completions shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The endpoint answered without any message content
    #[error("Model returned no content")]
    EmptyResponse,

    /// Invalid model selection or missing credentials
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

/// Which endpoint family a model lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Local,
    Hosted,
}

/// A parsed `"provider/model"` selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub kind: ProviderKind,
    pub provider: String,
    pub model: String,
}

impl ModelSpec {
    /// Parse `"provider/model"`. The model part may itself contain `/`.
    pub fn parse(spec: &str) -> Result<Self, LlmError> {
        let (provider, model) = spec.split_once('/').ok_or_else(|| {
            LlmError::Config(format!(
                "Model '{}' must be written as provider/model (e.g. ollama/phi4)",
                spec
            ))
        })?;

        let provider = provider.trim().to_lowercase();
        let model = model.trim().to_string();
        if provider.is_empty() || model.is_empty() {
            return Err(LlmError::Config(format!(
                "Model '{}' must be written as provider/model (e.g. ollama/phi4)",
                spec
            )));
        }

        let kind = if provider == HOSTED_PROVIDER {
            ProviderKind::Hosted
        } else {
            ProviderKind::Local
        };

        Ok(Self {
            kind,
            provider,
            model,
        })
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Endpoint settings shared by both provider variants
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub local_base_url: String,
    pub hosted_base_url: String,
    /// Token for the hosted endpoint
    pub api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            hosted_base_url: DEFAULT_HOSTED_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

/// A configured model backend
#[derive(Debug, Clone)]
pub enum Provider {
    Local(OpenAiCompatClient),
    Hosted(OpenAiCompatClient),
}

impl Provider {
    /// Bind a model selection to its endpoint.
    ///
    /// The hosted endpoint requires an API key; the local one never does.
    pub fn from_spec(
        spec: &ModelSpec,
        settings: &ProviderSettings,
        http: HttpClient,
    ) -> Result<Self, LlmError> {
        match spec.kind {
            ProviderKind::Local => Ok(Provider::Local(OpenAiCompatClient::new(
                http,
                &settings.local_base_url,
                LOCAL_API_KEY,
                &spec.model,
            ))),
            ProviderKind::Hosted => {
                let api_key = settings
                    .api_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        LlmError::Config(format!(
                            "Model '{}' needs an API token (--token, config, or OPENAI_API_KEY)",
                            spec
                        ))
                    })?;
                Ok(Provider::Hosted(OpenAiCompatClient::new(
                    http,
                    &settings.hosted_base_url,
                    api_key,
                    &spec.model,
                )))
            }
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Local(_) => ProviderKind::Local,
            Provider::Hosted(_) => ProviderKind::Hosted,
        }
    }

    pub fn model(&self) -> &str {
        self.client().model()
    }

    fn client(&self) -> &OpenAiCompatClient {
        match self {
            Provider::Local(client) | Provider::Hosted(client) => client,
        }
    }
}

#[async_trait]
impl ChatCapability for Provider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.client().complete(system, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_spec() {
        let spec = ModelSpec::parse("ollama/phi4").unwrap();
        assert_eq!(spec.kind, ProviderKind::Local);
        assert_eq!(spec.provider, "ollama");
        assert_eq!(spec.model, "phi4");
    }

    #[test]
    fn test_parse_hosted_spec() {
        let spec = ModelSpec::parse(" OpenAI / gpt-4o-mini ").unwrap();
        assert_eq!(spec.kind, ProviderKind::Hosted);
        assert_eq!(spec.model, "gpt-4o-mini");
        assert_eq!(spec.to_string(), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_parse_model_with_slash() {
        let spec = ModelSpec::parse("ollama/library/qwen2.5:7b").unwrap();
        assert_eq!(spec.model, "library/qwen2.5:7b");
    }

    #[test]
    fn test_parse_invalid_spec() {
        assert!(ModelSpec::parse("phi4").is_err());
        assert!(ModelSpec::parse("ollama/").is_err());
        assert!(ModelSpec::parse("/phi4").is_err());
    }

    #[test]
    fn test_hosted_requires_key() {
        let spec = ModelSpec::parse("openai/gpt-4o-mini").unwrap();
        let http = HttpClient::new().unwrap();

        let err = Provider::from_spec(&spec, &ProviderSettings::default(), http.clone());
        assert!(matches!(err, Err(LlmError::Config(_))));

        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = Provider::from_spec(&spec, &settings, http).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Hosted);
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_local_needs_no_key() {
        let spec = ModelSpec::parse("ollama/phi4").unwrap();
        let provider =
            Provider::from_spec(&spec, &ProviderSettings::default(), HttpClient::new().unwrap())
                .unwrap();
        assert_eq!(provider.kind(), ProviderKind::Local);
    }
}
