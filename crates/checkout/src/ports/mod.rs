//! Narrow interfaces to the external systems a checkout depends on.
//!
//! Every port has an in-memory implementation for tests and the demo binary.

pub mod fulfillment;
pub mod order;
pub mod payment_gateway;
pub mod price;
pub mod product;
pub mod shipping;

use std::sync::Arc;

pub use fulfillment::{FulfillmentPort, InMemoryFulfillmentPort};
pub use order::{InMemoryOrderPort, OrderPort, PlacedOrder};
pub use payment_gateway::{GatewayProcessStatus, InMemoryPaymentGateway, PaymentGatewayPort};
pub use price::{InMemoryPricePort, PricePort};
pub use product::{InMemoryProductPort, ProductPort};
pub use shipping::{InMemoryShippingPort, ShippingPort};

/// The set of external ports a checkout service talks to.
#[derive(Clone)]
pub struct Ports {
    pub price: Arc<dyn PricePort>,
    pub product: Arc<dyn ProductPort>,
    pub shipping: Arc<dyn ShippingPort>,
    pub fulfillment: Arc<dyn FulfillmentPort>,
    pub payment_gateway: Arc<dyn PaymentGatewayPort>,
    pub order: Arc<dyn OrderPort>,
}

/// In-memory ports, kept as concrete handles so tests can configure them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPorts {
    pub price: InMemoryPricePort,
    pub product: InMemoryProductPort,
    pub shipping: InMemoryShippingPort,
    pub fulfillment: InMemoryFulfillmentPort,
    pub payment_gateway: InMemoryPaymentGateway,
    pub order: InMemoryOrderPort,
}

impl InMemoryPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type-erased handles sharing state with `self`.
    pub fn ports(&self) -> Ports {
        Ports {
            price: Arc::new(self.price.clone()),
            product: Arc::new(self.product.clone()),
            shipping: Arc::new(self.shipping.clone()),
            fulfillment: Arc::new(self.fulfillment.clone()),
            payment_gateway: Arc::new(self.payment_gateway.clone()),
            order: Arc::new(self.order.clone()),
        }
    }
}
