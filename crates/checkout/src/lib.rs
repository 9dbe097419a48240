//! Checkout use cases on top of the domain crate.
//!
//! This crate provides:
//! - Ports to the price, product, shipping, fulfillment, payment and order systems
//! - The staleness protocol that keeps basket calculations current
//! - Validation before a basket is frozen for payment
//! - `CheckoutService`, running every use case under a per-basket lock

pub mod config;
pub mod error;
pub mod locks;
pub mod ports;
pub mod refresh;
pub mod service;
pub mod validation;

pub use config::{Backend, CheckoutConfig};
pub use error::{CheckoutError, ErrorKind, Result};
pub use locks::BasketLocks;
pub use ports::{
    FulfillmentPort, GatewayProcessStatus, InMemoryFulfillmentPort, InMemoryOrderPort,
    InMemoryPaymentGateway, InMemoryPorts, InMemoryPricePort, InMemoryProductPort,
    InMemoryShippingPort, OrderPort, PaymentGatewayPort, PlacedOrder, Ports, PricePort,
    ProductPort, ShippingPort,
};
pub use refresh::StalenessProtocol;
pub use service::{BasketView, CheckoutDataInput, CheckoutService, CheckoutSnapshot, PaymentInput};
pub use validation::ValidationService;
