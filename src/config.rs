//! TOML configuration parsing and validation.
//!
//! Every section and field has a default, so the estimator runs with no
//! config file at all. Credentials never live in the file: each provider
//! section names the environment variable that holds its key, and
//! [`Credentials::from_env`] resolves them at startup.
//!
//! ```toml
//! [search]
//! limit = 15
//!
//! [fetch]
//! timeout_secs = 15
//!
//! [llm]
//! model = "llama-3.3-70b-versatile"
//!
//! [embedding]
//! provider = "local"
//! model = "all-minilm-l6-v2"
//! ```

use anyhow::{bail, Context, Result};
use arbitration_core::rank::DEFAULT_DOC_PREFIX_CHARS;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Hard upper bound on candidate URLs fetched per run.
pub const MAX_FETCH_URLS: usize = 15;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub ranking: RankingConfig,
    pub expansion: ExpansionConfig,
    pub synthesis: SynthesisConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub engine: String,
    /// Results requested from the provider per configuration.
    pub results_per_query: u32,
    /// Maximum hits kept after merging all configurations.
    pub limit: usize,
    pub timeout_secs: u64,
    pub api_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://serpapi.com/search.json".to_string(),
            engine: "google".to_string(),
            results_per_query: 10,
            limit: 15,
            timeout_secs: 20,
            api_key_env: "SERPAPI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub max_urls: usize,
    pub timeout_secs: u64,
    /// Extracted text shorter than this falls back to the snippet.
    pub min_text_chars: usize,
    pub max_text_chars: usize,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
    /// Bodies larger than this are abandoned and count as absent content.
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_urls: MAX_FETCH_URLS,
            timeout_secs: 15,
            min_text_chars: 100,
            max_text_chars: 50_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            accept_invalid_certs: true,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RankingConfig {
    /// Characters of document text embedded per document.
    pub doc_prefix_chars: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            doc_prefix_chars: DEFAULT_DOC_PREFIX_CHARS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExpansionConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Run the lexicon keyword scan before asking the model.
    pub extract_keywords: bool,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 200,
            extract_keywords: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SynthesisConfig {
    pub top_k: usize,
    /// Characters of each document's text placed in the prompt.
    pub doc_text_chars: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            doc_text_chars: 8000,
            temperature: 0.3,
            max_tokens: 4000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API root (`{base_url}/chat/completions`).
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// The model name, with `GROQ_MODEL` taking precedence when set.
    pub fn effective_model(&self) -> String {
        std::env::var("GROQ_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.model.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"`, `"openai"`, or `"ollama"`.
    pub provider: String,
    pub model: Option<String>,
    /// Base URL for the Ollama provider.
    pub url: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
    /// Memoize vectors by text hash.
    pub cache: bool,
    /// Most vectors the cache holds; the oldest are evicted first.
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            url: None,
            batch_size: 32,
            timeout_secs: 30,
            cache: true,
            cache_capacity: 4096,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7341".to_string(),
        }
    }
}

/// Provider credentials resolved from the environment.
///
/// A variable that is unset or blank counts as absent.
#[derive(Clone, Default)]
pub struct Credentials {
    pub search_api_key: Option<String>,
    pub llm_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "***"))
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    pub fn from_env(config: &Config) -> Self {
        Self {
            search_api_key: read_env(&config.search.api_key_env),
            llm_api_key: read_env(&config.llm.api_key_env),
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.search.limit == 0 {
        bail!("search.limit must be >= 1");
    }
    if config.search.results_per_query == 0 {
        bail!("search.results_per_query must be >= 1");
    }
    if config.search.timeout_secs == 0 {
        bail!("search.timeout_secs must be > 0");
    }

    if config.fetch.max_urls == 0 || config.fetch.max_urls > MAX_FETCH_URLS {
        bail!("fetch.max_urls must be in [1, {}]", MAX_FETCH_URLS);
    }
    if config.fetch.timeout_secs == 0 {
        bail!("fetch.timeout_secs must be > 0");
    }
    if config.fetch.min_text_chars > config.fetch.max_text_chars {
        bail!("fetch.min_text_chars must be <= fetch.max_text_chars");
    }
    if config.fetch.max_bytes == 0 {
        bail!("fetch.max_bytes must be > 0");
    }

    if config.ranking.doc_prefix_chars == 0 {
        bail!("ranking.doc_prefix_chars must be > 0");
    }

    if config.synthesis.top_k == 0 {
        bail!("synthesis.top_k must be >= 1");
    }
    if config.synthesis.doc_text_chars == 0 {
        bail!("synthesis.doc_text_chars must be > 0");
    }

    if config.llm.timeout_secs == 0 {
        bail!("llm.timeout_secs must be > 0");
    }

    for (name, t) in [
        ("expansion.temperature", config.expansion.temperature),
        ("synthesis.temperature", config.synthesis.temperature),
    ] {
        if !(0.0..=2.0).contains(&t) {
            bail!("{} must be in [0.0, 2.0]", name);
        }
    }

    match config.embedding.provider.as_str() {
        "local" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
            other
        ),
    }
    if config.embedding.provider == "openai" && config.embedding.model.is_none() {
        bail!("embedding.model must be specified when provider is 'openai'");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be >= 1");
    }
    if config.embedding.timeout_secs == 0 {
        bail!("embedding.timeout_secs must be > 0");
    }
    if config.embedding.cache && config.embedding.cache_capacity == 0 {
        bail!("embedding.cache_capacity must be >= 1 when embedding.cache is on");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        validate(&config).unwrap();
        assert_eq!(config.fetch.max_urls, 15);
        assert_eq!(config.fetch.min_text_chars, 100);
        assert_eq!(config.fetch.max_text_chars, 50_000);
        assert_eq!(config.ranking.doc_prefix_chars, 2048);
        assert_eq!(config.synthesis.top_k, 5);
        assert_eq!(config.synthesis.doc_text_chars, 8000);
        assert_eq!(config.fetch.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.embedding.cache_capacity, 4096);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[search]\nlimit = 8\n\n[embedding]\nprovider = \"ollama\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.search.limit, 8);
        assert_eq!(config.search.engine, "google");
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.fetch.timeout_secs, 15);
    }

    #[test]
    fn test_rejects_too_many_urls() {
        let file = write_config("[fetch]\nmax_urls = 40\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("fetch.max_urls"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let file = write_config("[embedding]\nprovider = \"magic\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_openai_requires_model() {
        let file = write_config("[embedding]\nprovider = \"openai\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        for section in ["search", "fetch", "llm", "embedding"] {
            let file = write_config(&format!("[{}]\ntimeout_secs = 0\n", section));
            let err = load_config(file.path()).unwrap_err();
            assert!(
                err.to_string().contains(&format!("{}.timeout_secs", section)),
                "{}: {}",
                section,
                err
            );
        }
    }

    #[test]
    fn test_rejects_zero_size_limits() {
        let file = write_config("[fetch]\nmax_bytes = 0\n");
        assert!(load_config(file.path()).unwrap_err().to_string().contains("fetch.max_bytes"));

        let file = write_config("[embedding]\ncache_capacity = 0\n");
        assert!(load_config(file.path())
            .unwrap_err()
            .to_string()
            .contains("embedding.cache_capacity"));
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/arbx.example.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.embedding.batch_size, 32);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_or_default(Path::new("/nonexistent/arbx.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_blank_env_is_absent() {
        let mut config = Config::default();
        config.search.api_key_env = "ARBX_TEST_BLANK_SEARCH_KEY".to_string();
        config.llm.api_key_env = "ARBX_TEST_SET_LLM_KEY".to_string();
        std::env::set_var("ARBX_TEST_BLANK_SEARCH_KEY", "   ");
        std::env::set_var("ARBX_TEST_SET_LLM_KEY", "gsk_test");
        let creds = Credentials::from_env(&config);
        assert!(creds.search_api_key.is_none());
        assert_eq!(creds.llm_api_key.as_deref(), Some("gsk_test"));
        assert!(!format!("{:?}", creds).contains("gsk_test"));
    }
}
