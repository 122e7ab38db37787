use async_trait::async_trait;

use crate::{
    embedding::{Embedder, EmbedderError},
    llm::{
        openai_like::{EmbeddingRequest, EmbeddingResponse},
        xinference::client::error_from_response,
        XinferenceConfig,
    },
};

/// Embeddings from a model launched on an Xinference server.
#[derive(Clone)]
pub struct XinferenceEmbedder {
    model: String,
    dimensions: Option<usize>,
    config: XinferenceConfig,
}

impl XinferenceEmbedder {
    /// `model` is the UID the embedding model was launched with.
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            dimensions: None,
            config: XinferenceConfig::from_env(),
        }
    }

    pub fn with_config(mut self, config: XinferenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[async_trait]
impl Embedder for XinferenceEmbedder {
    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: documents,
            dimensions: self.dimensions,
        };
        let res = self.config.post("/v1/embeddings").json(&request).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        let vectors = res.json::<EmbeddingResponse>().await?.into_vectors();
        if vectors.len() != documents.len() {
            return Err(EmbedderError::MismatchedCount {
                expected: documents.len(),
                actual: vectors.len(),
            });
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

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_embed_documents() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_body(Matcher::Json(json!({"model": "bge-m3", "input": ["x", "y"]})))
            .with_body(
                json!({
                    "object": "list",
                    "model": "bge-m3",
                    "data": [
                        {"index": 1, "object": "embedding", "embedding": [0.2]},
                        {"index": 0, "object": "embedding", "embedding": [0.1]}
                    ],
                    "usage": {"prompt_tokens": 2, "total_tokens": 2}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let embedder = XinferenceEmbedder::new("bge-m3").with_config(XinferenceConfig {
            base_url: server.url(),
            api_key: None,
            client: reqwest::Client::new(),
        });
        let vectors = embedder
            .embed_documents(&["x".to_string(), "y".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1], vec![0.2]]);
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
