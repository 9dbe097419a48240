//! Transaction boundary of a single use case.

use async_trait::async_trait;
use common::BasketId;
use document_store::{Document, DocumentStore, DocumentStoreExt, SaveOptions, Version};
use tokio::sync::Mutex;

use crate::aggregate::Aggregate;
use crate::error::{DomainError, Result};
use crate::repository::Repository;

/// How a unit of work writes its changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// Buffer every save and write them in one transaction on commit.
    Atomic,
    /// Write each save immediately.
    #[default]
    BestEffort,
}

/// Repository view over a document store for the duration of one use case.
///
/// In atomic mode nothing reaches the store until [`UnitOfWork::commit`];
/// dropping the unit discards its writes. Reads always see the unit's own
/// pending writes.
pub struct UnitOfWork<'s, S: DocumentStore> {
    store: &'s S,
    mode: CommitMode,
    pending: Mutex<Vec<(Document, SaveOptions)>>,
}

impl<'s, S: DocumentStore> UnitOfWork<'s, S> {
    pub fn new(store: &'s S, mode: CommitMode) -> Self {
        Self {
            store,
            mode,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    /// Number of writes waiting for commit.
    pub async fn pending_writes(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Writes all buffered documents.
    ///
    /// A no-op in best-effort mode, where every save is already stored.
    #[tracing::instrument(skip(self), fields(mode = ?self.mode))]
    pub async fn commit(self) -> Result<()> {
        let writes = self.pending.into_inner();
        if writes.is_empty() {
            return Ok(());
        }
        let count = writes.len();
        self.store.save_all(writes).await?;
        tracing::debug!(count, "Unit of work committed");
        Ok(())
    }

    async fn find_pending<A: Aggregate>(&self, id: BasketId) -> Result<Option<A>> {
        let pending = self.pending.lock().await;
        let Some((document, _)) = pending
            .iter()
            .find(|(d, _)| d.kind == A::aggregate_type() && d.id == id)
        else {
            return Ok(None);
        };
        let mut aggregate: A = document.state()?;
        aggregate.set_version(document.version);
        Ok(Some(aggregate))
    }

    fn options_for(version: Version) -> SaveOptions {
        if version == Version::initial() {
            SaveOptions::expect_new()
        } else {
            SaveOptions::expect_version(version)
        }
    }
}

#[async_trait]
impl<A, S> Repository<A> for UnitOfWork<'_, S>
where
    A: Aggregate + 'static,
    S: DocumentStore,
{
    async fn find(&self, id: BasketId) -> Result<A> {
        if let Some(aggregate) = self.find_pending::<A>(id).await? {
            return Ok(aggregate);
        }

        match self.store.load_state::<A>(A::aggregate_type(), id).await? {
            Some((mut aggregate, version)) => {
                aggregate.set_version(version);
                Ok(aggregate)
            }
            None => A::default_for(id)
                .ok_or_else(|| DomainError::not_found(A::aggregate_type(), id)),
        }
    }

    async fn save(&self, aggregate: &mut A) -> Result<()> {
        let kind = A::aggregate_type();
        let id = aggregate.id();
        let current = aggregate.version();

        match self.mode {
            CommitMode::BestEffort => {
                let document = Document::from_state(id, kind, current.next(), &*aggregate)?;
                let version = self
                    .store
                    .save(document, Self::options_for(current))
                    .await?;
                aggregate.set_version(version);
            }
            CommitMode::Atomic => {
                let mut pending = self.pending.lock().await;
                if let Some((document, _)) = pending
                    .iter_mut()
                    .find(|(d, _)| d.kind == kind && d.id == id)
                {
                    // a second save within the unit overwrites the first
                    let version = document.version;
                    *document = Document::from_state(id, kind, version, &*aggregate)?;
                    aggregate.set_version(version);
                } else {
                    let version = current.next();
                    let document = Document::from_state(id, kind, version, &*aggregate)?;
                    pending.push((document, Self::options_for(current)));
                    aggregate.set_version(version);
                }
            }
        }
        Ok(())
    }
}
