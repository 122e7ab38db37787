//! # langchain-ai-rust-community
//!
//! Community integrations for langchain-ai-rust. Each module adapts one vendor
//! API to the crate's common interfaces ([`vectorstore::VectorStore`],
//! [`language_models::llm::LLM`], [`embedding::Embedder`],
//! [`scoring::ScoringModel`], [`tools::Tool`]).
//!
//! ## Overview
//!
//! - **Vector stores**: Neo4j (vector + full-text hybrid search) and YugabyteDB
//!   with pgvector, both with metadata filtering through [`vectorstore::Filter`]
//! - **LLMs**: DashScope/Qwen, Xinference and Zhipu chat, with streaming and tool calls
//! - **Embeddings and reranking**: DashScope, Xinference and Zhipu embedders; DashScope
//!   and Xinference scoring models
//! - **Code sandbox**: run model-generated code in a locked-down Docker container
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! langchain-ai-rust-community = "0.3"
//! # Only the Neo4j store:
//! # langchain-ai-rust-community = { version = "0.3", default-features = false, features = ["neo4j"] }
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use langchain_ai_rust_community::embedding::QwenEmbedder;
//! use langchain_ai_rust_community::schemas::Document;
//! use langchain_ai_rust_community::vectorstore::{
//!     neo4j::StoreBuilder, Filter, VecStoreOptions, VectorStore, VectorStoreInitializable,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreBuilder::new()
//!     .embedder(QwenEmbedder::default())
//!     .build()
//!     .await?;
//! store.initialize().await?;
//! store
//!     .add_documents(&[Document::new("Rust is fast")], &VecStoreOptions::default())
//!     .await?;
//! let options = VecStoreOptions::default().with_filters(Filter::eq("category", "lang"));
//! let docs = store.similarity_search("fast languages", 4, &options).await?;
//! # Ok(()) }
//! ```

/// Embedding models: DashScope, Xinference, Zhipu.
pub mod embedding;
/// Crate-wide error type and error codes.
pub mod error;
/// Common LLM traits, options and results.
pub mod language_models;
/// LLM implementations: DashScope (Qwen), Xinference, Zhipu.
pub mod llm;
/// Messages, documents and tool-call schemas.
pub mod schemas;
/// Reranking models: DashScope, Xinference.
pub mod scoring;
/// Tools, including the Docker code sandbox (feature `docker`).
pub mod tools;
/// Vector stores: Neo4j, YugabyteDB (feature-gated).
pub mod vectorstore;

pub use url;

use std::sync::Arc;

/// Type alias for a tool wrapped in Arc
pub type Tool = Arc<dyn crate::tools::Tool>;

/// Type alias for a list of tools
pub type Tools = Vec<Arc<dyn crate::tools::Tool>>;

/// Type alias for message list
pub type Messages = Vec<crate::schemas::Message>;

/// Type alias for embedding vector (f64)
pub type Embedding = Vec<f64>;

/// Type alias for document list
pub type Documents = Vec<crate::schemas::Document>;
