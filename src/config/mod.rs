//! Configuration management.
//!
//! Settings come from, in increasing priority:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config <path>`, else `<config_dir>/arxiv-digest/config.toml`)
//! 3. `ARXIV_DIGEST_<SECTION>__<KEY>` environment variables
//! 4. command-line flags (applied by the binary)
//!
//! # Configuration File Format
//!
//! ```toml
//! [feed]
//! category = "cs"
//! # url = "https://rss.arxiv.org/rss/cs.AI"
//!
//! [models]
//! classify = "ollama/phi4"
//! summarize = ""
//! local_base_url = "http://localhost:11434/v1"
//! hosted_base_url = "https://api.openai.com/v1"
//! request_timeout_secs = 300
//!
//! [retry]
//! initial_delay_ms = 500
//! max_delay_ms = 8000
//!
//! [storage]
//! state_dir = "~/.arxiv-digest"
//! scratch_dir = "~/.arxiv-digest/tmp"
//!
//! [topic_groups]
//! RUST = ["rust", "memory safety"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::{DEFAULT_CATEGORY, RSS_BASE_URL};
use crate::llm::{ProviderSettings, DEFAULT_HOSTED_BASE_URL, DEFAULT_LOCAL_BASE_URL};
use crate::models::{default_topic_groups, TopicGroups};
use crate::utils::{RetryConfig, DEFAULT_MAX_ATTEMPTS};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "arxiv-digest";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "ARXIV_DIGEST";

/// Environment variables consulted for the hosted API token, in order
pub const TOKEN_ENV_VARS: &[&str] = &["OPENAI_API_KEY", "OPENAI_TOKEN"];

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file already exists: {0} (use --force to overwrite)")]
    Exists(PathBuf),

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Extra or overriding topic groups
    #[serde(default)]
    pub topic_groups: TopicGroups,
}

/// Which feed to read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// arXiv category for the RSS listing
    #[serde(default = "default_category")]
    pub category: String,

    /// Full feed URL; takes precedence over `category`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            url: None,
        }
    }
}

impl FeedConfig {
    /// Effective feed URL
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!("{}/{}", RSS_BASE_URL, self.category),
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Model selection and endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// `provider/model` used for relevance classification
    #[serde(default = "default_classify_model")]
    pub classify: String,

    /// `provider/model` used for summaries; empty disables them
    #[serde(default)]
    pub summarize: String,

    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,

    #[serde(default = "default_hosted_base_url")]
    pub hosted_base_url: String,

    /// Hosted API token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            classify: default_classify_model(),
            summarize: String::new(),
            local_base_url: default_local_base_url(),
            hosted_base_url: default_hosted_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ModelsConfig {
    /// Summarization model, if one is configured
    pub fn summarize_model(&self) -> Option<&str> {
        Some(self.summarize.trim()).filter(|s| !s.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoint settings with the token resolved from `token`, the file, then the environment
    pub fn provider_settings(&self, token: Option<&str>) -> ProviderSettings {
        let api_key = token
            .map(str::to_string)
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .or_else(token_from_env);

        ProviderSettings {
            local_base_url: self.local_base_url.clone(),
            hosted_base_url: self.hosted_base_url.clone(),
            api_key,
        }
    }
}

fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

fn default_classify_model() -> String {
    "ollama/phi4".to_string()
}

fn default_local_base_url() -> String {
    DEFAULT_LOCAL_BASE_URL.to_string()
}

fn default_hosted_base_url() -> String {
    DEFAULT_HOSTED_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    300
}

/// Backoff between model calls. Every call gets exactly
/// [`DEFAULT_MAX_ATTEMPTS`] attempts; only the delays are configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Zero retries immediately
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryConfig::default()
        }
        .max_attempts(DEFAULT_MAX_ATTEMPTS)
    }
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

/// On-disk locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Dedup state files
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Downloaded PDFs, removed at the end of each run
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl StorageConfig {
    pub fn state_path(&self) -> PathBuf {
        expand_home(&self.state_dir)
    }

    pub fn scratch_path(&self) -> PathBuf {
        expand_home(&self.scratch_dir)
    }
}

fn default_state_dir() -> String {
    "~/.arxiv-digest".to_string()
}

fn default_scratch_dir() -> String {
    "~/.arxiv-digest/tmp".to_string()
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Built-in groups overlaid with configured ones (names upper-cased)
    pub fn topic_groups(&self) -> TopicGroups {
        let mut groups = default_topic_groups();
        for (name, topics) in &self.topic_groups {
            groups.insert(name.to_uppercase(), topics.clone());
        }
        groups
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Default config file location, whether or not it exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// The default config file, if present
pub fn find_config_file() -> Option<PathBuf> {
    default_config_path().filter(|p| p.is_file())
}

/// Load configuration. An explicit `path` must exist; otherwise the default file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = find_config_file() {
                tracing::debug!("Using config file: {}", path.display());
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// TOML text of the default configuration, with the built-in topic groups spelled out
pub fn default_config_toml() -> Result<String, ConfigError> {
    let config = Config {
        topic_groups: default_topic_groups(),
        ..Config::default()
    };
    config.to_toml()
}

/// Write the default configuration to `path` (or the default location)
pub fn init_config(path: Option<&Path>, force: bool) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().ok_or(ConfigError::NoConfigDir)?,
    };

    if path.exists() && !force {
        return Err(ConfigError::Exists(path));
    }

    let content = default_config_toml()?;
    let io_err = |source| ConfigError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&path, content).map_err(io_err)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.models.classify, "ollama/phi4");
        assert_eq!(config.models.summarize_model(), None);
        assert_eq!(config.feed.url(), "https://rss.arxiv.org/rss/cs");
        assert_eq!(config.retry.to_retry_config().max_attempts, 5);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[feed]
category = "cs.SE"

[models]
classify = "openai/gpt-4o-mini"
summarize = "ollama/llama3.1"
request_timeout_secs = 60

[retry]
max_attempts = 3
initial_delay_ms = 0

[storage]
state_dir = "/tmp/arxiv-state"

[topic_groups]
RUST = ["rust", "memory safety"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.feed.url(), "https://rss.arxiv.org/rss/cs.SE");
        assert_eq!(config.models.classify, "openai/gpt-4o-mini");
        assert_eq!(config.models.summarize_model(), Some("ollama/llama3.1"));
        assert_eq!(config.models.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.models.local_base_url, "http://localhost:11434/v1");
        assert_eq!(config.retry.to_retry_config().max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.retry.max_delay_ms, 8000);
        assert!(config.retry.to_retry_config().initial_delay.is_zero());
        assert_eq!(config.storage.state_path(), PathBuf::from("/tmp/arxiv-state"));

        let groups = config.topic_groups();
        assert_eq!(groups["RUST"], vec!["rust", "memory safety"]);
        assert!(groups.contains_key("ML"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = load_config(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        fs::write(&path, "invalid = toml = content").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_feed_url_overrides_category() {
        let feed = FeedConfig {
            category: "cs".to_string(),
            url: Some("http://localhost/rss".to_string()),
        };
        assert_eq!(feed.url(), "http://localhost/rss");
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config(Some(&path), false).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.models.classify, "ollama/phi4");
        assert_eq!(config.topic_groups()["TST"], vec!["testing"]);

        assert!(matches!(
            init_config(Some(&path), false),
            Err(ConfigError::Exists(_))
        ));
        init_config(Some(&path), true).unwrap();
    }

    #[test]
    fn test_explicit_token_wins() {
        let models = ModelsConfig {
            api_key: Some("from-file".to_string()),
            ..ModelsConfig::default()
        };
        assert_eq!(
            models.provider_settings(Some("from-flag")).api_key.as_deref(),
            Some("from-flag")
        );
        assert_eq!(
            models.provider_settings(None).api_key.as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.arxiv-digest"), home.join(".arxiv-digest"));
        }
    }
}
