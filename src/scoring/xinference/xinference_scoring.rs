use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    llm::{xinference::client::error_from_response, XinferenceConfig},
    scoring::{scores_by_index, RerankResult, ScoringError, ScoringModel},
};

#[derive(Deserialize, Debug)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

/// Reranking with a rerank model launched on Xinference.
#[derive(Clone)]
pub struct XinferenceScoringModel {
    model: String,
    config: XinferenceConfig,
}

impl XinferenceScoringModel {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            config: XinferenceConfig::from_env(),
        }
    }

    pub fn with_config(mut self, config: XinferenceConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl ScoringModel for XinferenceScoringModel {
    async fn score_all(&self, query: &str, segments: &[String]) -> Result<Vec<f64>, ScoringError> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }
        let payload = json!({
            "model": self.model,
            "query": query,
            "documents": segments,
            "return_documents": false,
        });
        let res = self.config.post("/v1/rerank").json(&payload).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        let response = res.json::<RerankResponse>().await?;
        scores_by_index(response.results, segments.len())
    }
}
