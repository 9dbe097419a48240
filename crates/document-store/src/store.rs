use std::collections::HashSet;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{BasketId, Document, Result, StoreError, Version};

/// Options for saving a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Version the writer loaded the document at.
    /// If None, the document is overwritten unconditionally.
    pub expected_version: Option<Version>,
}

impl SaveOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the document not to exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads the document of the given kind for a basket.
    ///
    /// Returns None if nothing has been stored yet.
    async fn load(&self, kind: &str, id: BasketId) -> Result<Option<Document>>;

    /// Saves a single document.
    ///
    /// If `options.expected_version` is set, the save fails with
    /// `ConcurrencyConflict` when the stored version differs.
    ///
    /// Returns the version the document is now stored at.
    async fn save(&self, document: Document, options: SaveOptions) -> Result<Version>;

    /// Saves several documents atomically: either every write succeeds or none does.
    async fn save_all(&self, writes: Vec<(Document, SaveOptions)>) -> Result<Vec<Version>>;

    /// Gets the stored version of a document.
    ///
    /// Returns None if the document doesn't exist.
    async fn current_version(&self, kind: &str, id: BasketId) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Loads and deserializes a document together with its version.
    async fn load_state<T: DeserializeOwned + Send>(
        &self,
        kind: &str,
        id: BasketId,
    ) -> Result<Option<(T, Version)>> {
        match self.load(kind, id).await? {
            Some(document) => {
                let version = document.version;
                Ok(Some((document.into_state()?, version)))
            }
            None => Ok(None),
        }
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// Validates a document before saving.
///
/// The document must be labelled with the version the save will produce.
pub fn validate_for_save(document: &Document, options: &SaveOptions) -> Result<()> {
    if document.kind.trim().is_empty() {
        return Err(StoreError::InvalidWrite(
            "Document kind must not be empty".to_string(),
        ));
    }

    if let Some(expected) = options.expected_version
        && document.version != expected.next()
    {
        return Err(StoreError::InvalidWrite(format!(
            "Document version must follow the expected version. Expected {}, got {}",
            expected.next(),
            document.version
        )));
    }

    Ok(())
}

/// Validates a batch of writes before saving them atomically.
pub fn validate_batch(writes: &[(Document, SaveOptions)]) -> Result<()> {
    let mut seen = HashSet::with_capacity(writes.len());
    for (document, options) in writes {
        validate_for_save(document, options)?;
        if !seen.insert((document.kind.as_str(), document.id)) {
            return Err(StoreError::InvalidWrite(format!(
                "Batch contains {} {} more than once",
                document.kind, document.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(kind: &str, id: BasketId, version: i64) -> Document {
        Document::new(id, kind, Version::new(version), serde_json::json!({}))
    }

    #[test]
    fn save_options_constructors() {
        assert_eq!(SaveOptions::new().expected_version, None);
        assert_eq!(
            SaveOptions::expect_new().expected_version,
            Some(Version::initial())
        );
        assert_eq!(
            SaveOptions::expect_version(Version::new(3)).expected_version,
            Some(Version::new(3))
        );
    }

    #[test]
    fn validate_rejects_version_gap() {
        let id = BasketId::new();
        let result = validate_for_save(
            &doc("basket", id, 3),
            &SaveOptions::expect_version(Version::first()),
        );
        assert!(matches!(result, Err(StoreError::InvalidWrite(_))));

        let ok = validate_for_save(
            &doc("basket", id, 2),
            &SaveOptions::expect_version(Version::first()),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn validate_rejects_empty_kind() {
        let result = validate_for_save(&doc(" ", BasketId::new(), 1), &SaveOptions::new());
        assert!(result.is_err());
    }

    #[test]
    fn validate_batch_rejects_duplicates() {
        let id = BasketId::new();
        let writes = vec![
            (doc("basket", id, 1), SaveOptions::expect_new()),
            (doc("basket", id, 1), SaveOptions::expect_new()),
        ];
        assert!(validate_batch(&writes).is_err());

        let writes = vec![
            (doc("basket", id, 1), SaveOptions::expect_new()),
            (doc("payment_process", id, 1), SaveOptions::expect_new()),
        ];
        assert!(validate_batch(&writes).is_ok());
    }
}
