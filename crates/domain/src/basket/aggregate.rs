//! Basket aggregate implementation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{BasketId, ItemId};
use document_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::calculation::{CalculationResult, combine};
use crate::error::{DomainError, Result};
use crate::ids::{OrderRef, OutletId, ProductId};
use crate::money::{Currency, Money};
use crate::rules::{BusinessRules, RefreshPolicy};
use crate::validation::Invalid;

use super::{BasketItem, BasketStatus, Price, Product};

/// Basket aggregate root.
///
/// Owns the item list and the lifecycle. Totals are derived from the items
/// through the calculation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    id: BasketId,

    #[serde(skip)]
    version: Version,

    outlet_id: OutletId,
    currency: Currency,
    status: BasketStatus,

    /// Items in insertion order.
    items: Vec<BasketItem>,

    /// Order created once the basket was paid.
    order: Option<OrderRef>,
}

impl Aggregate for Basket {
    fn aggregate_type() -> &'static str {
        "basket"
    }

    fn id(&self) -> BasketId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

// Query methods
impl Basket {
    /// Creates an empty, open basket.
    pub fn new(id: BasketId, outlet_id: OutletId, currency: Currency) -> Self {
        Self {
            id,
            version: Version::initial(),
            outlet_id,
            currency,
            status: BasketStatus::Open,
            items: Vec::new(),
            order: None,
        }
    }

    pub fn outlet_id(&self) -> &OutletId {
        &self.outlet_id
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn status(&self) -> BasketStatus {
        self.status
    }

    pub fn items(&self) -> &[BasketItem] {
        &self.items
    }

    pub fn get_item(&self, item_id: ItemId) -> Option<&BasketItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// Items of one product, in insertion order.
    pub fn items_of_product<'a>(
        &'a self,
        product_id: &'a ProductId,
    ) -> impl Iterator<Item = &'a BasketItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.product_id() == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn order(&self) -> Option<&OrderRef> {
        self.order.as_ref()
    }

    /// Reduction of all item calculations.
    pub fn calculation_result(&self) -> CalculationResult {
        combine(self.items.iter().map(BasketItem::calculation), self.currency)
    }

    pub fn requires_price_refresh(&self, policy: &RefreshPolicy, now: DateTime<Utc>) -> bool {
        self.items
            .iter()
            .any(|item| item.requires_price_refresh(policy, now))
    }

    pub fn requires_product_refresh(&self, policy: &RefreshPolicy, now: DateTime<Utc>) -> bool {
        self.items
            .iter()
            .any(|item| item.requires_product_refresh(policy, now))
    }

    /// Distinct products with a stale price snapshot.
    pub fn products_with_stale_price(
        &self,
        policy: &RefreshPolicy,
        now: DateTime<Utc>,
    ) -> Vec<ProductId> {
        self.distinct_products(|item| item.requires_price_refresh(policy, now))
    }

    /// Distinct products with a stale product snapshot.
    pub fn products_with_stale_product(
        &self,
        policy: &RefreshPolicy,
        now: DateTime<Utc>,
    ) -> Vec<ProductId> {
        self.distinct_products(|item| item.requires_product_refresh(policy, now))
    }

    fn distinct_products(&self, predicate: impl Fn(&BasketItem) -> bool) -> Vec<ProductId> {
        let mut products: Vec<ProductId> = Vec::new();
        for item in self.items.iter().filter(|item| predicate(*item)) {
            if !products.contains(item.product_id()) {
                products.push(item.product_id().clone());
            }
        }
        products
    }
}

// Command methods
impl Basket {
    /// Fails unless items and checkout data may still change.
    pub fn ensure_modifiable(&self) -> Result<()> {
        if !self.status.can_modify() {
            return Err(DomainError::illegal(format!(
                "Basket {} is not modifiable in status {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Appends a new, not yet calculated item.
    pub fn add_item(&mut self, product: Product, price: Price, rules: &BusinessRules) -> Result<ItemId> {
        self.ensure_modifiable()?;

        if self.items.len() + 1 > rules.max_item_amount {
            return Err(DomainError::illegal(format!(
                "Cannot surpass the max item count {}",
                rules.max_item_amount
            )));
        }

        let same_product = self.items_of_product(&product.id).count();
        if same_product + 1 > rules.max_same_item_count {
            return Err(DomainError::illegal(format!(
                "Cannot surpass the max item count {} for the same product",
                rules.max_same_item_count
            )));
        }

        let item = BasketItem::new(product, price);
        let item_id = item.id();
        self.items.push(item);
        Ok(item_id)
    }

    pub fn remove_item(&mut self, item_id: ItemId) -> Result<BasketItem> {
        self.ensure_modifiable()?;

        let index = self
            .items
            .iter()
            .position(|item| item.id() == item_id)
            .ok_or_else(|| DomainError::not_found("item", item_id))?;
        Ok(self.items.remove(index))
    }

    /// Replaces the price snapshot of every item of a product.
    ///
    /// Returns true if any snapshot was replaced.
    pub fn refresh_price(&mut self, product_id: &ProductId, price: Price) -> Result<bool> {
        self.ensure_modifiable()?;

        let mut refreshed = false;
        for item in self.items.iter_mut().filter(|i| i.product_id() == product_id) {
            item.replace_price(price.clone());
            refreshed = true;
        }
        Ok(refreshed)
    }

    /// Replaces the product snapshot of every item of a product.
    pub fn refresh_product(&mut self, product: Product) -> Result<bool> {
        self.ensure_modifiable()?;

        let mut refreshed = false;
        for item in self.items.iter_mut().filter(|i| *i.product_id() == product.id) {
            item.replace_product(product.clone());
            refreshed = true;
        }
        Ok(refreshed)
    }

    /// Applies shipping costs and recomputes every item.
    ///
    /// Products missing from the map ship for free. Returns true if any item
    /// changed value.
    pub fn recalculate(&mut self, shipping_costs: &HashMap<ProductId, Money>) -> bool {
        let zero = Money::zero(self.currency);
        let mut changed = false;
        for item in &mut self.items {
            let shipping = shipping_costs
                .get(item.product_id())
                .copied()
                .unwrap_or(zero);
            changed |= item.calculate(shipping);
        }
        changed
    }

    pub fn freeze(&mut self) -> Result<()> {
        if !self.status.can_freeze() {
            return Err(DomainError::illegal(format!(
                "Basket {} cannot be frozen in status {}",
                self.id, self.status
            )));
        }
        self.status = BasketStatus::Frozen;
        Ok(())
    }

    pub fn unfreeze(&mut self) -> Result<()> {
        if !self.status.can_unfreeze() {
            return Err(DomainError::illegal(format!(
                "Basket {} should be frozen, but is {}",
                self.id, self.status
            )));
        }
        self.status = BasketStatus::Open;
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        if !self.status.can_finalize() {
            return Err(DomainError::illegal(format!(
                "Basket {} should be frozen before it is finalized, but is {}",
                self.id, self.status
            )));
        }
        self.status = BasketStatus::Finalized;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        if !self.status.can_cancel() {
            return Err(DomainError::illegal(format!(
                "Basket {} cannot be canceled in status {}",
                self.id, self.status
            )));
        }
        self.status = BasketStatus::Canceled;
        Ok(())
    }

    /// Records the order placed for a finalized basket.
    pub fn set_order(&mut self, order: OrderRef) -> Result<()> {
        if self.status != BasketStatus::Finalized {
            return Err(DomainError::illegal(format!(
                "Basket {} should be finalized before an order is created, but is {}",
                self.id, self.status
            )));
        }
        if self.order.is_some() {
            return Err(DomainError::illegal(format!(
                "Basket {} already has an order",
                self.id
            )));
        }
        self.order = Some(order);
        Ok(())
    }

    /// Checks that the basket can be paid.
    pub fn validate(&self, policy: &RefreshPolicy, now: DateTime<Utc>) -> Vec<Invalid> {
        let mut invalids = Vec::new();

        if self.items.is_empty() {
            invalids.push(Invalid::generic("basket.items", "should not be empty"));
        }
        if !self.status.can_modify() {
            invalids.push(Invalid::generic(
                "basket.status",
                format!("should be {} but is {}", BasketStatus::Open, self.status),
            ));
        }

        for (index, item) in self.items.iter().enumerate() {
            invalids.extend(item.validate(&format!("basket.items[{index}]"), policy, now));
        }

        invalids
    }
}
