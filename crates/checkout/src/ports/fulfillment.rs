//! Fulfillment options port trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{FulfillmentType, OutletId};

use crate::error::{CheckoutError, Result};

/// Lists the fulfillment types an outlet offers.
#[async_trait]
pub trait FulfillmentPort: Send + Sync {
    async fn possible_fulfillment(&self, outlet_id: &OutletId) -> Result<Vec<FulfillmentType>>;
}

#[derive(Debug, Default)]
struct InMemoryFulfillmentState {
    options: HashMap<OutletId, Vec<FulfillmentType>>,
    fail_on_fetch: bool,
}

/// In-memory fulfillment port for testing.
///
/// Outlets without explicit options offer delivery and pickup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFulfillmentPort {
    state: Arc<RwLock<InMemoryFulfillmentState>>,
}

impl InMemoryFulfillmentPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_options(&self, outlet_id: impl Into<OutletId>, options: Vec<FulfillmentType>) {
        self.state
            .write()
            .unwrap()
            .options
            .insert(outlet_id.into(), options);
    }

    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }
}

#[async_trait]
impl FulfillmentPort for InMemoryFulfillmentPort {
    async fn possible_fulfillment(&self, outlet_id: &OutletId) -> Result<Vec<FulfillmentType>> {
        let state = self.state.read().unwrap();
        if state.fail_on_fetch {
            return Err(CheckoutError::external("fulfillment", "fulfillment service unavailable"));
        }
        Ok(state
            .options
            .get(outlet_id)
            .cloned()
            .unwrap_or_else(|| vec![FulfillmentType::Delivery, FulfillmentType::Pickup]))
    }
}
