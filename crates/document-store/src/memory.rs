use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    BasketId, Document, Result, StoreError, Version,
    store::{DocumentStore, SaveOptions, validate_batch, validate_for_save},
};

type Key = (String, BasketId);

/// In-memory document store.
///
/// Each save is independent, matching the behavior of a document database.
/// `save_all` still applies a batch under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<Key, Document>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    fn check_version(
        documents: &HashMap<Key, Document>,
        document: &Document,
        options: &SaveOptions,
    ) -> Result<Version> {
        let current = documents
            .get(&(document.kind.clone(), document.id))
            .map(|d| d.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current != expected
        {
            metrics::counter!("document_store_conflicts_total", "backend" => "memory")
                .increment(1);
            return Err(StoreError::ConcurrencyConflict {
                kind: document.kind.clone(),
                id: document.id,
                expected,
                actual: current,
            });
        }

        Ok(current.next())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self, kind: &str, id: BasketId) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(kind.to_string(), id)).cloned())
    }

    async fn save(&self, mut document: Document, options: SaveOptions) -> Result<Version> {
        validate_for_save(&document, &options)?;

        let mut documents = self.documents.write().await;
        let version = Self::check_version(&documents, &document, &options)?;

        document.version = version;
        tracing::debug!(kind = %document.kind, id = %document.id, %version, "document saved");
        documents.insert((document.kind.clone(), document.id), document);
        metrics::counter!("document_store_saves_total", "backend" => "memory").increment(1);

        Ok(version)
    }

    async fn save_all(&self, writes: Vec<(Document, SaveOptions)>) -> Result<Vec<Version>> {
        validate_batch(&writes)?;

        let mut documents = self.documents.write().await;

        // Check every write before touching the map
        let mut versions = Vec::with_capacity(writes.len());
        for (document, options) in &writes {
            versions.push(Self::check_version(&documents, document, options)?);
        }

        for ((mut document, _), version) in writes.into_iter().zip(&versions) {
            document.version = *version;
            documents.insert((document.kind.clone(), document.id), document);
        }
        metrics::counter!("document_store_saves_total", "backend" => "memory")
            .increment(versions.len() as u64);

        Ok(versions)
    }

    async fn current_version(&self, kind: &str, id: BasketId) -> Result<Option<Version>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(kind.to_string(), id)).map(|d| d.version))
    }
}
