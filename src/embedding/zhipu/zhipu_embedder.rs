use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    embedding::{Embedder, EmbedderError},
    llm::{
        openai_like::{EmbeddingRequest, EmbeddingResponse},
        zhipu::client::{env_credentials, error_from_response},
    },
};

/// Zhipu accepts at most 64 inputs per embeddings call.
const MAX_BATCH: usize = 64;

/// Embeddings from Zhipu `embedding-2` / `embedding-3`.
#[derive(Clone)]
pub struct ZhipuEmbedder {
    model: String,
    api_key: SecretString,
    base_url: String,
    dimensions: Option<usize>,
    client: Client,
}

impl Default for ZhipuEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZhipuEmbedder {
    pub fn new() -> Self {
        let (api_key, base_url) = env_credentials();
        Self {
            model: "embedding-3".to_string(),
            api_key,
            base_url,
            dimensions: None,
            client: Client::new(),
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = SecretString::from(api_key.into());
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `embedding-3` supports 256, 512, 1024 or 2048.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[async_trait]
impl Embedder for ZhipuEmbedder {
    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
        let mut vectors = Vec::with_capacity(documents.len());
        for batch in documents.chunks(MAX_BATCH) {
            let request = EmbeddingRequest {
                model: &self.model,
                input: batch,
                dimensions: self.dimensions,
            };
            let res = self
                .client
                .post(format!("{}/embeddings", self.base_url))
                .bearer_auth(self.api_key.expose_secret())
                .json(&request)
                .send()
                .await?;
            if !res.status().is_success() {
                return Err(error_from_response(res).await.into());
            }
            let batch_vectors = res.json::<EmbeddingResponse>().await?.into_vectors();
            if batch_vectors.len() != batch.len() {
                return Err(EmbedderError::MismatchedCount {
                    expected: batch.len(),
                    actual: batch_vectors.len(),
                });
            }
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedderError> {
        self.embed_documents(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbedderError::EmbeddingNotFound("data[0]".into()))
    }
}
