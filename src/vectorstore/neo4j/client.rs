use std::collections::HashMap;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::Neo4jError;

/// A Cypher statement with its parameters.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Statement {
    pub statement: String,
    pub parameters: Map<String, Value>,
}

impl Statement {
    pub fn new<S: Into<String>>(statement: S) -> Self {
        Self {
            statement: statement.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_param<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub data: Vec<RowData>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RowData {
    pub row: Vec<Value>,
}

impl QueryResult {
    /// Rows keyed by column name.
    pub fn records(&self) -> Vec<HashMap<&str, &Value>> {
        self.data
            .iter()
            .map(|d| {
                self.columns
                    .iter()
                    .map(String::as_str)
                    .zip(d.row.iter())
                    .collect()
            })
            .collect()
    }
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    statements: &'a [Statement],
}

#[derive(Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    code: String,
    message: String,
}

/// Client for the Neo4j HTTP transactional endpoint.
///
/// Every call runs its statements in a single auto-committed transaction
/// (`POST {uri}/db/{database}/tx/commit`).
#[derive(Clone)]
pub struct Neo4jClient {
    uri: Url,
    database: String,
    username: String,
    password: SecretString,
    client: Client,
}

impl Neo4jClient {
    pub fn new(uri: &str, username: &str, password: &str) -> Result<Self, Neo4jError> {
        let parsed = Url::parse(uri).map_err(|_| Neo4jError::InvalidUri(uri.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Neo4jError::InvalidUri(uri.to_string()));
        }
        Ok(Self {
            uri: parsed,
            database: "neo4j".to_string(),
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
            client: Client::new(),
        })
    }

    /// Reads `NEO4J_URI` (default `http://localhost:7474`), `NEO4J_USERNAME`
    /// (default `neo4j`), `NEO4J_PASSWORD` and `NEO4J_DATABASE` (default
    /// `neo4j`).
    pub fn from_env() -> Result<Self, Neo4jError> {
        let uri =
            std::env::var("NEO4J_URI").unwrap_or_else(|_| "http://localhost:7474".to_string());
        let username = std::env::var("NEO4J_USERNAME").unwrap_or_else(|_| "neo4j".to_string());
        let password = std::env::var("NEO4J_PASSWORD").unwrap_or_default();
        let client = Self::new(&uri, &username, &password)?;
        Ok(match std::env::var("NEO4J_DATABASE") {
            Ok(database) if !database.is_empty() => client.with_database(database),
            _ => client,
        })
    }

    pub fn with_database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn commit_url(&self) -> Result<Url, Neo4jError> {
        let mut url = self.uri.clone();
        url.path_segments_mut()
            .map_err(|_| Neo4jError::InvalidUri(self.uri.to_string()))?
            .pop_if_empty()
            .extend(["db", self.database.as_str(), "tx", "commit"]);
        Ok(url)
    }

    /// Runs a single statement.
    pub async fn run(&self, statement: Statement) -> Result<QueryResult, Neo4jError> {
        let mut results = self.run_all(&[statement]).await?;
        results
            .pop()
            .ok_or_else(|| Neo4jError::InvalidResponse("no result for statement".to_string()))
    }

    /// Runs the statements in one transaction; any error rolls all of them
    /// back.
    pub async fn run_all(&self, statements: &[Statement]) -> Result<Vec<QueryResult>, Neo4jError> {
        for s in statements {
            log::debug!("Cypher: {}", s.statement);
        }
        let res = self
            .client
            .post(self.commit_url()?)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header("Accept", "application/json;charset=UTF-8")
            .json(&CommitRequest { statements })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Neo4jError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let response = res.json::<CommitResponse>().await?;
        if let Some(error) = response.errors.into_iter().next() {
            log::error!("Neo4j error {}: {}", error.code, error.message);
            return Err(Neo4jError::DatabaseError {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.results)
    }
}
