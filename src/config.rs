use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Language;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_cache_path")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_cache_key")]
    pub key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_cache_path(),
            key: default_cache_key(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_cache_path() -> Option<PathBuf> {
    Some(PathBuf::from("./data/ragchat.sqlite"))
}
fn default_cache_key() -> String {
    "rag_chat.cached_files".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointsConfig {
    pub ingest_url: String,
    pub query_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub language: Option<String>,
}

impl Config {
    /// In-memory cache, local endpoints. Used when no config file is needed.
    pub fn minimal() -> Self {
        Self {
            cache: CacheConfig {
                backend: "memory".to_string(),
                path: None,
                key: default_cache_key(),
            },
            endpoints: EndpointsConfig {
                ingest_url: "http://127.0.0.1:8000/ingest-pdf".to_string(),
                query_url: "http://127.0.0.1:8000/query".to_string(),
                timeout_secs: None,
            },
            session: SessionConfig::default(),
        }
    }

    /// The configured default response language.
    pub fn language(&self) -> Result<Language> {
        match &self.session.language {
            Some(tag) => tag.parse::<Language>().map_err(anyhow::Error::msg),
            None => Ok(Language::default()),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate endpoints
    for (field, url) in [
        ("endpoints.ingest_url", &config.endpoints.ingest_url),
        ("endpoints.query_url", &config.endpoints.query_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("{} must be an http(s) URL, got '{}'", field, url);
        }
    }
    if config.endpoints.timeout_secs == Some(0) {
        anyhow::bail!("endpoints.timeout_secs must be > 0 when set");
    }

    // Validate cache
    if config.cache.key.trim().is_empty() {
        anyhow::bail!("cache.key must not be empty");
    }
    match config.cache.backend.as_str() {
        "sqlite" => {
            if config.cache.path.is_none() {
                anyhow::bail!("cache.path must be specified when backend is 'sqlite'");
            }
        }
        "memory" => {}
        other => anyhow::bail!(
            "Unknown cache backend: '{}'. Must be sqlite or memory.",
            other
        ),
    }

    config
        .language()
        .with_context(|| "Invalid session.language")?;

    Ok(())
}
