//! Embedding providers.
//!
//! `OllamaEmbedder` and `OpenAiEmbedder` call a model service over blocking
//! HTTP; `HashEmbedder` is a deterministic offline stand-in.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{EmbeddingProvider, Number, Settings};
use crate::error::{RagError, Result};
use crate::vector_ops::normalize_vector;

pub trait Embedder {
    /// One vector per input text, in input order.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<Number>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<Number>> {
        self.embed_documents(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Embedding("service returned no embedding".into()))
    }
}

pub(crate) fn http_client(timeout_secs: Option<u64>) -> Result<Client> {
    Client::builder()
        .timeout(timeout_secs.map(Duration::from_secs))
        .build()
        .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn check_count(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RagError::Embedding(format!(
            "requested {} embeddings but received {}",
            expected, actual
        )));
    }
    Ok(())
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<Number>>,
}

pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout_secs: Option<u64>) -> Result<Self> {
        info!("Using Ollama embeddings: model={}, url={}", model, base_url);
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: endpoint(base_url, "api/embed"),
            model: model.to_string(),
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<Number>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let response = self
            .client
            .post(&self.url)
            .json(&OllamaEmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .map_err(|e| RagError::Embedding(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::Embedding(format!("{} returned {}: {}", self.url, status, body)));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .map_err(|e| RagError::Embedding(format!("malformed response: {}", e)))?;
        check_count(texts.len(), parsed.embeddings.len())?;
        Ok(parsed.embeddings)
    }
}

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<Number>,
}

/// Any service speaking the OpenAI `/v1/embeddings` protocol.
pub struct OpenAiEmbedder {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        info!("Using OpenAI-compatible embeddings: model={}, url={}", model, base_url);
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: endpoint(base_url, "v1/embeddings"),
            model: model.to_string(),
            api_key,
        })
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<Number>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let mut request = self.client.post(&self.url).json(&OpenAiEmbedRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| RagError::Embedding(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::Embedding(format!("{} returned {}: {}", self.url, status, body)));
        }

        let mut parsed: OpenAiEmbedResponse = response
            .json()
            .map_err(|e| RagError::Embedding(format!("malformed response: {}", e)))?;
        check_count(texts.len(), parsed.data.len())?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Deterministic bag-of-words embedder. Every lowercase alphanumeric token
/// seeds a PRNG with its SHA-256 digest and contributes one Gaussian vector;
/// the sum is L2-normalized. Texts sharing tokens land close together.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<Number> {
        let mut vector = vec![0.0; self.dimensions];
        for token in tokenize(text) {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&Sha256::digest(token.as_bytes()));
            let mut rng = StdRng::from_seed(seed);
            for x in vector.iter_mut() {
                let sample: Number = rng.sample(StandardNormal);
                *x += sample;
            }
        }
        normalize_vector(&mut vector);
        vector
    }
}

impl Embedder for HashEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<Number>>> {
        Ok(texts.par_iter().map(|t| self.embed_one(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<Number>> {
        Ok(self.embed_one(text))
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Builds the embedder selected by `embedding_provider`.
pub fn from_settings(settings: &Settings) -> Result<Box<dyn Embedder>> {
    let embedder: Box<dyn Embedder> = match settings.embedding_provider {
        EmbeddingProvider::Ollama => Box::new(OllamaEmbedder::new(
            &settings.embedding_url,
            &settings.embedding_model,
            settings.request_timeout_secs,
        )?),
        EmbeddingProvider::OpenAi => Box::new(OpenAiEmbedder::new(
            &settings.embedding_url,
            &settings.embedding_model,
            settings.embedding_api_key.clone(),
            settings.request_timeout_secs,
        )?),
        EmbeddingProvider::Hash => {
            info!("Using hash embeddings: dimensions={}", settings.hash_dimensions);
            Box::new(HashEmbedder::new(settings.hash_dimensions))
        }
    };
    Ok(embedder)
}
