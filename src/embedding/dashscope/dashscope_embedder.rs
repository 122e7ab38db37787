use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    embedding::{Embedder, EmbedderError},
    llm::dashscope::client::{env_credentials, error_from_response},
};

#[derive(Serialize, Debug)]
struct EmbeddingPayload<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    parameters: EmbeddingParameters<'a>,
}

#[derive(Serialize, Debug)]
struct EmbeddingInput<'a> {
    texts: &'a [String],
}

#[derive(Serialize, Debug)]
struct EmbeddingParameters<'a> {
    text_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    output: EmbeddingOutput,
}

#[derive(Deserialize, Debug)]
struct EmbeddingOutput {
    embeddings: Vec<TextEmbedding>,
}

#[derive(Deserialize, Debug)]
struct TextEmbedding {
    text_index: usize,
    embedding: Vec<f64>,
}

/// Embeddings from the DashScope `text-embedding-v*` models.
///
/// Documents are embedded with `text_type=document` and queries with
/// `text_type=query`, which the v2+ models use to tune the vector.
#[derive(Clone)]
pub struct QwenEmbedder {
    model: String,
    api_key: SecretString,
    base_url: String,
    dimension: Option<usize>,
    client: Client,
}

impl Default for QwenEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl QwenEmbedder {
    pub fn new() -> Self {
        let (api_key, base_url) = env_credentials();
        Self {
            model: "text-embedding-v3".to_string(),
            api_key,
            base_url,
            dimension: None,
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
        self.base_url = base_url.into();
        self
    }

    /// Output dimension; only honoured by `text-embedding-v3` and later.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// v3+ accepts at most 10 texts per call, older models 25.
    fn batch_size(&self) -> usize {
        if self.model.starts_with("text-embedding-v1") || self.model.starts_with("text-embedding-v2")
        {
            25
        } else {
            10
        }
    }

    async fn embed(&self, texts: &[String], text_type: &str) -> Result<Vec<Vec<f64>>, EmbedderError> {
        let url = format!(
            "{}/services/embeddings/text-embedding/text-embedding",
            self.base_url
        );
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size()) {
            let payload = EmbeddingPayload {
                model: &self.model,
                input: EmbeddingInput { texts: batch },
                parameters: EmbeddingParameters {
                    text_type,
                    dimension: self.dimension,
                },
            };
            let res = self
                .client
                .post(&url)
                .bearer_auth(self.api_key.expose_secret())
                .json(&payload)
                .send()
                .await?;
            if !res.status().is_success() {
                return Err(error_from_response(res).await.into());
            }

            let mut embeddings = res.json::<EmbeddingResponse>().await?.output.embeddings;
            if embeddings.len() != batch.len() {
                return Err(EmbedderError::MismatchedCount {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }
            embeddings.sort_by_key(|e| e.text_index);
            vectors.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        log::debug!(
            "DashScope embedded {} texts with {}",
            vectors.len(),
            self.model
        );
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for QwenEmbedder {
    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
        self.embed(documents, "document").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedderError> {
        self.embed(&[text.to_string()], "query")
            .await?
            .pop()
            .ok_or_else(|| EmbedderError::EmbeddingNotFound("output.embeddings[0]".into()))
    }
}
