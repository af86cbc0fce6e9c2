//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__MAX_WEB_RESULTS=3`).
//! Every field has a default so an empty environment yields a usable config.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{key}': {e}")))
    }

    pub fn app(&self) -> Result<AppConfig> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn validate_for_env(&self) -> Result<()> {
        let app = self.app()?;
        app.retrieval.validate()?;
        app.web.validate()?;
        match self.env_name.as_str() {
            "prod" | "production" if app.embedding.backend == EmbeddingBackend::Hashed => {
                Err(Error::InvalidConfig(
                    "hashed embeddings are for development and tests only".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub web: WebConfig,
    pub corpus: CorpusConfig,
}

/// Per-query knobs of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub similarity_threshold: f32,
    pub max_local_results: usize,
    pub max_web_results: usize,
    pub enable_web_fallback: bool,
    pub extract_web_content: bool,
    pub web_timeout_ms: u64,
    pub web_confidence: f32,
    pub no_information_confidence: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.4,
            max_local_results: 5,
            max_web_results: 5,
            enable_web_fallback: true,
            extract_web_content: true,
            web_timeout_ms: 10_000,
            web_confidence: 0.7,
            no_information_confidence: 0.3,
        }
    }
}

impl RetrievalSettings {
    pub fn web_timeout(&self) -> Duration {
        Duration::from_millis(self.web_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("similarity_threshold", self.similarity_threshold)?;
        check_unit("web_confidence", self.web_confidence)?;
        check_unit("no_information_confidence", self.no_information_confidence)?;
        if self.max_local_results == 0 {
            return Err(Error::InvalidConfig("max_local_results must be >= 1".into()));
        }
        if self.max_web_results == 0 {
            return Err(Error::InvalidConfig("max_web_results must be >= 1".into()));
        }
        if self.web_timeout_ms == 0 {
            return Err(Error::InvalidConfig("web_timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must be within [0, 1], got {value}")))
    }
}

/// Partial update for [`RetrievalSettings`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub similarity_threshold: Option<f32>,
    pub max_local_results: Option<usize>,
    pub max_web_results: Option<usize>,
    pub enable_web_fallback: Option<bool>,
    pub extract_web_content: Option<bool>,
}

impl SettingsUpdate {
    /// Returns the updated settings, or an error without touching `current`
    /// when any provided field is out of range.
    pub fn apply_to(&self, current: &RetrievalSettings) -> Result<RetrievalSettings> {
        let mut next = current.clone();
        if let Some(t) = self.similarity_threshold {
            next.similarity_threshold = t;
        }
        if let Some(n) = self.max_local_results {
            next.max_local_results = n;
        }
        if let Some(n) = self.max_web_results {
            next.max_web_results = n;
        }
        if let Some(b) = self.enable_web_fallback {
            next.enable_web_fallback = b;
        }
        if let Some(b) = self.extract_web_content {
            next.extract_web_content = b;
        }
        next.validate()?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Bge,
    Hashed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model_dir: Option<String>,
    pub max_tokens: usize,
    pub hashed_dim: usize,
    pub cache_capacity: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Bge,
            model_dir: None,
            max_tokens: 256,
            hashed_dim: 384,
            cache_capacity: 1024,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    Lance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub lancedb_dir: String,
    pub table: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Lance,
            lancedb_dir: "data/indexes/lancedb".to_string(),
            table: "documents".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebProviderKind {
    Disabled,
    Duckduckgo,
    Tavily,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub provider: WebProviderKind,
    pub tavily_api_key: Option<String>,
    pub user_agent: String,
    pub max_content_chars: usize,
    pub skip_domains: Vec<String>,
    /// Sustained search rate; bursts are capped at the same count.
    pub requests_per_second: u32,
    /// Successful searches are reused for this long. 0 disables the cache.
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl WebConfig {
    pub fn validate(&self) -> Result<()> {
        if self.provider == WebProviderKind::Tavily && self.tavily_api_key.is_none() {
            return Err(Error::InvalidConfig(
                "web.provider = \"tavily\" requires web.tavily_api_key".into(),
            ));
        }
        if self.requests_per_second == 0 {
            return Err(Error::InvalidConfig("web.requests_per_second must be >= 1".into()));
        }
        Ok(())
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            provider: WebProviderKind::Duckduckgo,
            tavily_api_key: None,
            user_agent: "IntelliSearch/0.1 (+retrieval fallback)".to_string(),
            max_content_chars: 5000,
            skip_domains: ["facebook.com", "twitter.com", "instagram.com", "linkedin.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            requests_per_second: 1,
            cache_ttl_secs: 24 * 60 * 60,
            cache_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { path: "data/corpus".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_leaves_unspecified_fields() {
        let current = RetrievalSettings::default();
        let update = SettingsUpdate { max_web_results: Some(4), ..SettingsUpdate::default() };
        let next = update.apply_to(&current).unwrap();
        assert_eq!(next.max_web_results, 4);
        assert_eq!(next.similarity_threshold, current.similarity_threshold);
        assert_eq!(next.max_local_results, current.max_local_results);
        assert!(next.enable_web_fallback);
    }

    #[test]
    fn update_rejects_out_of_range_threshold() {
        let current = RetrievalSettings::default();
        for bad in [-0.1_f32, 1.01, f32::NAN] {
            let update =
                SettingsUpdate { similarity_threshold: Some(bad), ..SettingsUpdate::default() };
            assert!(matches!(update.apply_to(&current), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn update_rejects_zero_counts() {
        let current = RetrievalSettings::default();
        let update = SettingsUpdate { max_local_results: Some(0), ..SettingsUpdate::default() };
        assert!(update.apply_to(&current).is_err());
    }

    #[test]
    fn web_requires_a_positive_request_rate() {
        let web = WebConfig { requests_per_second: 0, ..WebConfig::default() };
        assert!(matches!(web.validate(), Err(Error::InvalidConfig(_))));
        assert!(WebConfig::default().validate().is_ok());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_with_base(base, "/data/x"), PathBuf::from("/data/x"));
        assert_eq!(resolve_with_base(base, "data/x"), PathBuf::from("/srv/app/data/x"));
    }
}
