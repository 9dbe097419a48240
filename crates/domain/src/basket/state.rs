//! Basket lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The status of a basket in its lifecycle.
///
/// State transitions:
/// ```text
/// Open ──► Frozen ──► Finalized
///  ▲ │        │            │
///  │ │        │ unfreeze   │
///  └─┼────────┘            │
///    ▼                     │
/// Canceled ◄───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasketStatus {
    /// Items and checkout data can be changed.
    #[default]
    Open,

    /// Payment is in progress; the basket content is locked.
    Frozen,

    /// Payment executed and the order placed (terminal state).
    Finalized,

    /// Abandoned by the customer (terminal state).
    Canceled,
}

impl BasketStatus {
    /// Returns true if items and checkout data can be modified in this status.
    pub fn can_modify(&self) -> bool {
        matches!(self, BasketStatus::Open)
    }

    pub fn can_freeze(&self) -> bool {
        matches!(self, BasketStatus::Open)
    }

    pub fn can_unfreeze(&self) -> bool {
        matches!(self, BasketStatus::Frozen)
    }

    pub fn can_finalize(&self) -> bool {
        matches!(self, BasketStatus::Frozen)
    }

    /// Only a frozen basket, with its payment in flight, cannot be canceled.
    pub fn can_cancel(&self) -> bool {
        !matches!(self, BasketStatus::Frozen)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, BasketStatus::Finalized | BasketStatus::Canceled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BasketStatus::Open => "OPEN",
            BasketStatus::Frozen => "FROZEN",
            BasketStatus::Finalized => "FINALIZED",
            BasketStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for BasketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
