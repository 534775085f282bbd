use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::prompt::DEFAULT_TEMPLATE;

pub type Number = f32;

pub const EPSILON: f32 = 1e-6;

const CONFIG_FILE: &str = "ragline";
const ENV_PREFIX: &str = "RAGLINE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    Ollama,
    OpenAi,
    Hash,
}

impl FromStr for EmbeddingProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbeddingProvider::Ollama),
            "openai" => Ok(EmbeddingProvider::OpenAi),
            "hash" => Ok(EmbeddingProvider::Hash),
            other => Err(RagError::Config(format!(
                "unknown embedding_provider '{}' (expected ollama, openai or hash)",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmbeddingProvider::Ollama => "ollama",
            EmbeddingProvider::OpenAi => "openai",
            EmbeddingProvider::Hash => "hash",
        };
        f.write_str(name)
    }
}

/// Raw values as found in the config file and `RAGLINE_*` environment.
#[derive(Deserialize, Default)]
pub struct RaglineConfig {
    pub docs_path: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub top_k: Option<usize>,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub hash_dimensions: Option<usize>,
    pub chat_model: Option<String>,
    pub llm_url: Option<String>,
    pub temperature: Option<f32>,
    pub prompt_template: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}

/// Reads `key`, treating only an absent key as `None`. A value of the wrong
/// type is an error.
fn opt<'de, T: Deserialize<'de>>(config: &Config, key: &str) -> std::result::Result<Option<T>, ConfigError> {
    match config.get(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl RaglineConfig {
    pub fn try_from(config: &Config) -> std::result::Result<Self, ConfigError> {
        Ok(RaglineConfig {
            docs_path: opt(config, "docs_path")?,
            chunk_size: opt(config, "chunk_size")?,
            chunk_overlap: opt(config, "chunk_overlap")?,
            top_k: opt(config, "top_k")?,
            embedding_provider: opt(config, "embedding_provider")?,
            embedding_model: opt(config, "embedding_model")?,
            embedding_url: opt(config, "embedding_url")?,
            embedding_api_key: opt(config, "embedding_api_key")?,
            hash_dimensions: opt(config, "hash_dimensions")?,
            chat_model: opt(config, "chat_model")?,
            llm_url: opt(config, "llm_url")?,
            temperature: opt(config, "temperature")?,
            prompt_template: opt(config, "prompt_template")?,
            request_timeout_secs: opt(config, "request_timeout_secs")?,
            verbose: opt(config, "verbose")?,
        })
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub docs_path: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub hash_dimensions: usize,
    pub chat_model: String,
    pub llm_url: String,
    pub temperature: Option<f32>,
    pub prompt_template: String,
    pub request_timeout_secs: Option<u64>,
    pub verbose: bool,
}

impl Settings {
    /// Loads `ragline.{toml,json,yaml}` from the working directory (or `path`
    /// when given) and layers `RAGLINE_*` environment variables on top.
    /// Cross-field checks are left to [`Settings::validate`] so callers can
    /// apply further overrides first.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(p) => ConfigFile::from(p).required(true),
            None => ConfigFile::with_name(CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Self::from_raw(RaglineConfig::try_from(&config)?)
    }

    /// Applies defaults and validates.
    pub fn resolve(raw: RaglineConfig) -> Result<Self> {
        let settings = Self::from_raw(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn from_raw(raw: RaglineConfig) -> Result<Self> {
        let embedding_provider = raw
            .embedding_provider
            .as_deref()
            .unwrap_or("ollama")
            .parse()?;

        Ok(Self {
            docs_path: raw.docs_path.unwrap_or_else(|| "data".to_string()),
            chunk_size: raw.chunk_size.unwrap_or(500),
            chunk_overlap: raw.chunk_overlap.unwrap_or(50),
            top_k: raw.top_k.unwrap_or(4),
            embedding_provider,
            embedding_model: raw
                .embedding_model
                .unwrap_or_else(|| "nomic-embed-text".to_string()),
            embedding_url: raw
                .embedding_url
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            embedding_api_key: raw.embedding_api_key.filter(|k| !k.is_empty()),
            hash_dimensions: raw.hash_dimensions.unwrap_or(384),
            chat_model: raw.chat_model.unwrap_or_else(|| "llama3".to_string()),
            llm_url: raw
                .llm_url
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            temperature: raw.temperature,
            prompt_template: raw
                .prompt_template
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            request_timeout_secs: raw.request_timeout_secs,
            verbose: raw.verbose.unwrap_or(false),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than a non-zero chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.hash_dimensions == 0 {
            return Err(RagError::Config("hash_dimensions must be positive".into()));
        }
        Ok(())
    }

    pub fn print_config(&self) {
        println!("docs_path={}", self.docs_path);
        println!("chunk_size={}", self.chunk_size);
        println!("chunk_overlap={}", self.chunk_overlap);
        println!("top_k={}", self.top_k);
        println!("embedding_provider={}", self.embedding_provider);
        println!("embedding_model={}", self.embedding_model);
        println!("embedding_url={}", self.embedding_url);
        println!(
            "embedding_api_key={}",
            if self.embedding_api_key.is_some() { "<set>" } else { "<unset>" }
        );
        println!("hash_dimensions={}", self.hash_dimensions);
        println!("chat_model={}", self.chat_model);
        println!("llm_url={}", self.llm_url);
        match self.temperature {
            Some(t) => println!("temperature={}", t),
            None => println!("temperature=<model default>"),
        }
        match self.request_timeout_secs {
            Some(s) => println!("request_timeout_secs={}", s),
            None => println!("request_timeout_secs=<none>"),
        }
        println!("verbose={}", self.verbose);
        println!("prompt_template={:?}", self.prompt_template);
    }
}
