use super::{SearchClient, SearchError};
use crate::entity::EntityId;
use crate::mapping::Document;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Elasticsearch-compatible REST client (typed document API).
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::search_write(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn document_url(&self, index: &str, doc_type: &str, id: EntityId) -> String {
        format!("{}/{}/{}/{}", self.base_url, index, doc_type, id)
    }

    /// Send a request built fresh for every attempt and map the response.
    async fn send<F>(
        &self,
        operation: &str,
        index: &str,
        id: Option<EntityId>,
        build: F,
    ) -> Result<(), SearchError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let build = &build;
        with_retry_if(
            &self.retry,
            operation,
            move || async move {
                let response = build().send().await?;
                check_response(response, index, id).await
            },
            SearchError::is_retryable,
        )
        .await
    }
}

async fn check_response(
    response: reqwest::Response,
    index: &str,
    id: Option<EntityId>,
) -> Result<(), SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let id = id.unwrap_or_default();
    match status.as_u16() {
        404 => Err(SearchError::NotFound {
            index: index.to_string(),
            id,
        }),
        409 => Err(SearchError::Conflict {
            index: index.to_string(),
            id,
        }),
        code => Err(SearchError::Http { status: code, body }),
    }
}

#[async_trait]
impl SearchClient for ElasticsearchClient {
    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
        body: &Document,
    ) -> Result<(), SearchError> {
        let url = self.document_url(index, doc_type, id);
        debug!("PUT {}", url);
        self.send(&format!("Index {}/{}", index, id), index, Some(id), || {
            self.client.put(&url).json(body)
        })
        .await
    }

    async fn update_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
        partial: &Document,
    ) -> Result<(), SearchError> {
        let url = format!("{}/_update", self.document_url(index, doc_type, id));
        let body = json!({ "doc": partial });
        debug!("POST {}", url);
        self.send(&format!("Update {}/{}", index, id), index, Some(id), || {
            self.client.post(&url).json(&body)
        })
        .await
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
    ) -> Result<(), SearchError> {
        let url = self.document_url(index, doc_type, id);
        debug!("DELETE {}", url);
        self.send(&format!("Delete {}/{}", index, id), index, Some(id), || {
            self.client.delete(&url)
        })
        .await
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let url = format!("{}/{}", self.base_url, index);
        let result = self
            .send(&format!("Create index {}", index), index, None, || {
                self.client.put(&url).json(body)
            })
            .await;

        match result {
            Err(SearchError::Http { status: 400, body })
                if body.contains("resource_already_exists_exception") =>
            {
                info!("Index {} already exists", index);
                Ok(())
            }
            other => other,
        }
    }
}
