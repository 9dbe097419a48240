//! Core aggregate trait.

use common::BasketId;
use document_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for aggregates persisted as versioned documents.
///
/// Every checkout aggregate is keyed by its basket's id; the aggregate type
/// distinguishes the documents of one basket from each other.
pub trait Aggregate: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Returns the aggregate type name.
    ///
    /// Used as the document kind in the store.
    fn aggregate_type() -> &'static str;

    /// Returns the basket id the aggregate belongs to.
    fn id(&self) -> BasketId;

    /// Returns the stored version the aggregate was loaded at.
    ///
    /// Version 0 means the aggregate has never been saved.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the unit of work after loading or saving.
    fn set_version(&mut self, version: Version);

    /// Returns the instance a lookup yields when nothing is stored yet.
    ///
    /// Aggregates that must be created explicitly return None.
    fn default_for(_id: BasketId) -> Option<Self> {
        None
    }
}
