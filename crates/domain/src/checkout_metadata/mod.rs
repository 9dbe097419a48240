//! Customer, address and fulfillment data collected during checkout.

mod address;
mod customer;
mod metadata;

pub use address::Address;
pub use customer::{BusinessType, Customer, CustomerName, IdentifiedCustomer};
pub use metadata::{CheckoutMetadata, FulfillmentType};
