//! Identifier types shared by every checkout crate.

pub mod types;

pub use types::{BasketId, ItemId, PaymentId};
