//! Price port trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Money, OutletId, Price, PriceId, ProductId};

use crate::error::{CheckoutError, Result};

/// Fetches current gross prices.
#[async_trait]
pub trait PricePort: Send + Sync {
    /// Fetches the price of a product in an outlet.
    ///
    /// Repeated calls may return different prices.
    async fn fetch_price(&self, outlet_id: &OutletId, product_id: &ProductId) -> Result<Price>;
}

#[derive(Debug, Default)]
struct InMemoryPriceState {
    prices: HashMap<ProductId, Money>,
    fetched_at: Option<DateTime<Utc>>,
    fail_on_fetch: bool,
    fetch_count: usize,
}

/// In-memory price port for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPricePort {
    state: Arc<RwLock<InMemoryPriceState>>,
}

impl InMemoryPricePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gross price returned for a product.
    pub fn set_price(&self, product_id: impl Into<ProductId>, gross: Money) {
        self.state
            .write()
            .unwrap()
            .prices
            .insert(product_id.into(), gross);
    }

    /// Stamps fetched prices with a fixed time instead of now.
    pub fn set_fetched_at(&self, fetched_at: Option<DateTime<Utc>>) {
        self.state.write().unwrap().fetched_at = fetched_at;
    }

    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }

    /// Returns the number of fetch calls made so far.
    pub fn fetch_count(&self) -> usize {
        self.state.read().unwrap().fetch_count
    }
}

#[async_trait]
impl PricePort for InMemoryPricePort {
    async fn fetch_price(&self, outlet_id: &OutletId, product_id: &ProductId) -> Result<Price> {
        let mut state = self.state.write().unwrap();
        state.fetch_count += 1;

        if state.fail_on_fetch {
            return Err(CheckoutError::external("price", "price service unavailable"));
        }

        let gross = state.prices.get(product_id).copied().ok_or_else(|| {
            CheckoutError::external("price", format!("no price for product {product_id}"))
        })?;

        Ok(Price {
            id: PriceId::new(format!("{outlet_id}:{product_id}")),
            gross,
            updated_at: state.fetched_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use domain::Currency;

    use super::*;

    #[tokio::test]
    async fn test_fetch_configured_price() {
        let port = InMemoryPricePort::new();
        port.set_price("SKU-1", Money::from_cents(1999, Currency::EUR));

        let price = port
            .fetch_price(&OutletId::new("berlin"), &ProductId::new("SKU-1"))
            .await
            .unwrap();

        assert_eq!(price.gross, Money::from_cents(1999, Currency::EUR));
        assert_eq!(price.id, PriceId::new("berlin:SKU-1"));
        assert_eq!(port.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_and_failure() {
        let port = InMemoryPricePort::new();
        let outlet = OutletId::new("berlin");

        let err = port
            .fetch_price(&outlet, &ProductId::new("SKU-404"))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ExternalFetchFailed { port: "price", .. }));

        port.set_price("SKU-1", Money::from_cents(100, Currency::EUR));
        port.set_fail_on_fetch(true);
        assert!(port.fetch_price(&outlet, &ProductId::new("SKU-1")).await.is_err());
        assert_eq!(port.fetch_count(), 2);
    }
}
