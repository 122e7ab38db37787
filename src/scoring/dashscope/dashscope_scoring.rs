use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::{
    llm::dashscope::client::{env_credentials, error_from_response},
    scoring::{scores_by_index, RerankResult, ScoringError, ScoringModel},
};

#[derive(Deserialize, Debug)]
struct RerankResponse {
    output: RerankOutput,
}

#[derive(Deserialize, Debug)]
struct RerankOutput {
    results: Vec<RerankResult>,
}

/// Reranking with DashScope `gte-rerank`.
#[derive(Clone)]
pub struct QwenScoringModel {
    model: String,
    api_key: SecretString,
    base_url: String,
    client: Client,
}

impl Default for QwenScoringModel {
    fn default() -> Self {
        Self::new()
    }
}

impl QwenScoringModel {
    pub fn new() -> Self {
        let (api_key, base_url) = env_credentials();
        Self {
            model: "gte-rerank".to_string(),
            api_key,
            base_url,
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
}

#[async_trait]
impl ScoringModel for QwenScoringModel {
    async fn score_all(&self, query: &str, segments: &[String]) -> Result<Vec<f64>, ScoringError> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }
        let payload = json!({
            "model": self.model,
            "input": {"query": query, "documents": segments},
            "parameters": {"return_documents": false, "top_n": segments.len()},
        });
        let res = self
            .client
            .post(format!(
                "{}/services/rerank/text-rerank/text-rerank",
                self.base_url
            ))
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        let response = res.json::<RerankResponse>().await?;
        scores_by_index(response.output.results, segments.len())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn test_score_all() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/services/rerank/text-rerank/text-rerank")
            .match_body(Matcher::PartialJson(json!({
                "model": "gte-rerank",
                "input": {"query": "什么是文本排序模型", "documents": ["a", "b"]},
                "parameters": {"top_n": 2}
            })))
            .with_body(
                json!({
                    "output": {"results": [
                        {"index": 1, "relevance_score": 0.93},
                        {"index": 0, "relevance_score": 0.11}
                    ]},
                    "usage": {"total_tokens": 79},
                    "request_id": "x"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let model = QwenScoringModel::new()
            .with_api_key("k")
            .with_base_url(server.url());
        let scores = model
            .score_all("什么是文本排序模型", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(scores, vec![0.11, 0.93]);
    }
}
