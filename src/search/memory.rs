use super::{SearchClient, SearchError};
use crate::entity::EntityId;
use crate::mapping::Document;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One call received by the recording client, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchWrite {
    Index {
        index: String,
        doc_type: String,
        id: EntityId,
        body: Document,
    },
    Update {
        index: String,
        doc_type: String,
        id: EntityId,
        partial: Document,
    },
    Delete {
        index: String,
        doc_type: String,
        id: EntityId,
    },
    CreateIndex {
        index: String,
        body: Value,
    },
}

impl SearchWrite {
    pub fn index(&self) -> &str {
        match self {
            SearchWrite::Index { index, .. }
            | SearchWrite::Update { index, .. }
            | SearchWrite::Delete { index, .. }
            | SearchWrite::CreateIndex { index, .. } => index,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, SearchWrite::Delete { .. })
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    writes: Vec<SearchWrite>,
    documents: BTreeMap<(String, EntityId), Document>,
    indices: BTreeMap<String, Value>,
    failures: HashMap<String, SearchError>,
}

/// In-memory search engine that keeps documents and logs every call.
///
/// Behaves like the real engine for the document API: updates merge fields
/// into an existing document and fail with `NotFound` otherwise, deletes of
/// missing documents fail with `NotFound`. Indices can be made to fail on
/// demand with `fail_index`.
#[derive(Debug, Clone, Default)]
pub struct RecordingSearchClient {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call received so far, in order.
    pub fn writes(&self) -> Vec<SearchWrite> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn document(&self, index: &str, id: EntityId) -> Option<Document> {
        self.state().documents.get(&(index.to_string(), id)).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.state().documents.len()
    }

    pub fn index_body(&self, index: &str) -> Option<Value> {
        self.state().indices.get(index).cloned()
    }

    /// Make every subsequent call against `index` fail with `error`.
    pub fn fail_index(&self, index: &str, error: SearchError) {
        self.state().failures.insert(index.to_string(), error);
    }

    pub fn heal(&self, index: &str) {
        self.state().failures.remove(index);
    }

    /// Place a document without recording a write.
    pub fn seed_document(&self, index: &str, id: EntityId, body: Document) {
        self.state().documents.insert((index.to_string(), id), body);
    }

    /// Drop a document without recording a write, as an out-of-band purge would.
    pub fn remove_document(&self, index: &str, id: EntityId) -> bool {
        self.state()
            .documents
            .remove(&(index.to_string(), id))
            .is_some()
    }
}

fn injected_failure(state: &RecordingState, index: &str) -> Result<(), SearchError> {
    match state.failures.get(index) {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl SearchClient for RecordingSearchClient {
    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
        body: &Document,
    ) -> Result<(), SearchError> {
        let mut state = self.state();
        state.writes.push(SearchWrite::Index {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id,
            body: body.clone(),
        });
        injected_failure(&state, index)?;

        state
            .documents
            .insert((index.to_string(), id), body.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
        partial: &Document,
    ) -> Result<(), SearchError> {
        let mut state = self.state();
        state.writes.push(SearchWrite::Update {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id,
            partial: partial.clone(),
        });
        injected_failure(&state, index)?;

        match state.documents.get_mut(&(index.to_string(), id)) {
            Some(document) => {
                document.extend(partial.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(())
            }
            None => Err(SearchError::NotFound {
                index: index.to_string(),
                id,
            }),
        }
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: EntityId,
    ) -> Result<(), SearchError> {
        let mut state = self.state();
        state.writes.push(SearchWrite::Delete {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id,
        });
        injected_failure(&state, index)?;

        match state.documents.remove(&(index.to_string(), id)) {
            Some(_) => Ok(()),
            None => Err(SearchError::NotFound {
                index: index.to_string(),
                id,
            }),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let mut state = self.state();
        state.writes.push(SearchWrite::CreateIndex {
            index: index.to_string(),
            body: body.clone(),
        });
        injected_failure(&state, index)?;

        state
            .indices
            .entry(index.to_string())
            .or_insert_with(|| body.clone());
        Ok(())
    }
}
