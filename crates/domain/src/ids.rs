//! Identifiers issued by external systems.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Product identifier from the catalog.
    ProductId
);

string_id!(
    /// Price identifier from the pricing service.
    PriceId
);

string_id!(
    /// The selling location or channel a basket belongs to.
    OutletId
);

string_id!(
    /// Reference of the order created for a finalized basket.
    OrderRef
);

string_id!(
    /// Reference of a payment process at the payment gateway.
    PaymentRef
);

string_id!(
    /// Session of an anonymous customer.
    SessionId
);
