//! Search engine client contract.
//!
//! Implementations:
//! - `ElasticsearchClient`: HTTP client with retries for transport failures
//! - `RecordingSearchClient`: in-memory engine that records every write

mod error;
mod http;
mod memory;

pub use error::SearchError;
pub use http::ElasticsearchClient;
pub use memory::{RecordingSearchClient, SearchWrite};

use crate::entity::EntityId;
use crate::mapping::Document;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Store a full document, replacing any previous version.
    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
        body: &Document,
    ) -> Result<(), SearchError>;

    /// Merge fields into an existing document.
    ///
    /// Fails with `SearchError::NotFound` if the document does not exist.
    async fn update_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
        partial: &Document,
    ) -> Result<(), SearchError>;

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
    ) -> Result<(), SearchError>;

    /// Create an index with its settings and mappings. Existing indices are
    /// left alone.
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError>;
}
