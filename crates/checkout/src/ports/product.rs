//! Product catalog port trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Product, ProductId, Vat};

use crate::error::{CheckoutError, Result};

/// Fetches catalog data of products.
#[async_trait]
pub trait ProductPort: Send + Sync {
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product>;
}

#[derive(Debug, Default)]
struct InMemoryProductState {
    products: HashMap<ProductId, (String, Vat)>,
    fetched_at: Option<DateTime<Utc>>,
    fail_on_fetch: bool,
    fetch_count: usize,
}

/// In-memory product catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductPort {
    state: Arc<RwLock<InMemoryProductState>>,
}

impl InMemoryProductPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a product.
    pub fn set_product(&self, product_id: impl Into<ProductId>, name: impl Into<String>, vat: Vat) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product_id.into(), (name.into(), vat));
    }

    /// Stamps fetched products with a fixed time instead of now.
    pub fn set_fetched_at(&self, fetched_at: Option<DateTime<Utc>>) {
        self.state.write().unwrap().fetched_at = fetched_at;
    }

    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }

    pub fn fetch_count(&self) -> usize {
        self.state.read().unwrap().fetch_count
    }
}

#[async_trait]
impl ProductPort for InMemoryProductPort {
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product> {
        let mut state = self.state.write().unwrap();
        state.fetch_count += 1;

        if state.fail_on_fetch {
            return Err(CheckoutError::external("product", "catalog unavailable"));
        }

        let (name, vat) = state.products.get(product_id).cloned().ok_or_else(|| {
            CheckoutError::external("product", format!("unknown product {product_id}"))
        })?;

        Ok(Product {
            id: product_id.clone(),
            name,
            vat,
            updated_at: state.fetched_at.unwrap_or_else(Utc::now),
        })
    }
}
