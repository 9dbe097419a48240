//! Shipping cost port trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Address, BasketItem, FulfillmentType, Money, ProductId};

use crate::error::{CheckoutError, Result};

/// Determines shipping costs per product.
///
/// Never consulted for pickup baskets.
#[async_trait]
pub trait ShippingPort: Send + Sync {
    async fn determine_shipping_costs(
        &self,
        items: &[BasketItem],
        fulfillment: FulfillmentType,
        shipping_address: Option<&Address>,
    ) -> Result<HashMap<ProductId, Money>>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    costs: HashMap<ProductId, Money>,
    fail_on_determine: bool,
    call_count: usize,
}

/// In-memory shipping port for testing.
///
/// Returns the configured cost for every product present in the items.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingPort {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cost(&self, product_id: impl Into<ProductId>, cost: Money) {
        self.state
            .write()
            .unwrap()
            .costs
            .insert(product_id.into(), cost);
    }

    pub fn set_fail_on_determine(&self, fail: bool) {
        self.state.write().unwrap().fail_on_determine = fail;
    }

    /// Returns how often shipping costs were requested.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().call_count
    }
}

#[async_trait]
impl ShippingPort for InMemoryShippingPort {
    async fn determine_shipping_costs(
        &self,
        items: &[BasketItem],
        _fulfillment: FulfillmentType,
        _shipping_address: Option<&Address>,
    ) -> Result<HashMap<ProductId, Money>> {
        let mut state = self.state.write().unwrap();
        state.call_count += 1;

        if state.fail_on_determine {
            return Err(CheckoutError::external("shipping", "shipping service unavailable"));
        }

        Ok(items
            .iter()
            .filter_map(|item| {
                state
                    .costs
                    .get(item.product_id())
                    .map(|cost| (item.product_id().clone(), *cost))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use domain::Currency;

    use super::*;

    #[tokio::test]
    async fn test_empty_items_cost_nothing() {
        let port = InMemoryShippingPort::new();
        port.set_cost("SKU-1", Money::from_cents(495, Currency::EUR));

        let costs = port
            .determine_shipping_costs(&[], FulfillmentType::Delivery, None)
            .await
            .unwrap();
        assert!(costs.is_empty());
        assert_eq!(port.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_determine() {
        let port = InMemoryShippingPort::new();
        port.set_fail_on_determine(true);

        let result = port
            .determine_shipping_costs(&[], FulfillmentType::Delivery, None)
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::ExternalFetchFailed { port: "shipping", .. })
        ));
    }
}
