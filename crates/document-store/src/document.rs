use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::BasketId;

/// Version number of a stored document, used for optimistic concurrency control.
///
/// A document that was never written is at version 0; every successful save
/// increments the version by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version written by the first save.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored document: one aggregate's serialized state plus its storage metadata.
///
/// Documents are addressed by `(kind, id)`. All checkout aggregates of a basket
/// share the basket id and differ by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The basket this document belongs to.
    pub id: BasketId,

    /// The kind of aggregate stored (e.g. "basket", "payment_process").
    pub kind: String,

    /// The version this document is stored at.
    pub version: Version,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// The serialized aggregate state.
    pub payload: serde_json::Value,
}

impl Document {
    /// Creates a document from a raw JSON payload.
    pub fn new(
        id: BasketId,
        kind: impl Into<String>,
        version: Version,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            version,
            updated_at: Utc::now(),
            payload,
        }
    }

    /// Creates a document from a serializable state.
    pub fn from_state<T: Serialize>(
        id: BasketId,
        kind: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(id, kind, version, serde_json::to_value(state)?))
    }

    /// Deserializes the payload into a concrete type.
    pub fn into_state<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload)
    }

    /// Deserializes the payload without consuming the document.
    pub fn state<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
