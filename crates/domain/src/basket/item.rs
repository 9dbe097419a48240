//! Basket line items and the external snapshots they carry.

use chrono::{DateTime, Utc};
use common::ItemId;
use serde::{Deserialize, Serialize};

use crate::calculation::{CalculationResult, item_result};
use crate::ids::{PriceId, ProductId};
use crate::money::Money;
use crate::rules::RefreshPolicy;
use crate::validation::{Invalid, path};
use crate::vat::Vat;

/// Catalog data of a product as fetched at `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub vat: Vat,
    pub updated_at: DateTime<Utc>,
}

/// Gross price of a product as fetched at `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub gross: Money,
    pub updated_at: DateTime<Utc>,
}

/// One unit of a product in a basket.
///
/// The calculation is derived from price, VAT and shipping cost and is only
/// updated by [`BasketItem::calculate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    id: ItemId,
    product: Product,
    price: Price,
    shipping_cost: Money,
    calculation: CalculationResult,
}

impl BasketItem {
    /// Creates an item with zero shipping and an empty calculation.
    pub(crate) fn new(product: Product, price: Price) -> Self {
        let currency = price.gross.currency();
        Self {
            id: ItemId::new(),
            product,
            price,
            shipping_cost: Money::zero(currency),
            calculation: CalculationResult::zero(currency),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn calculation(&self) -> &CalculationResult {
        &self.calculation
    }

    /// Recomputes the calculation with the given shipping cost.
    ///
    /// Returns true if the item's shipping cost or calculation changed.
    pub fn calculate(&mut self, shipping_cost: Money) -> bool {
        let result = item_result(self.price.gross, &self.product.vat, shipping_cost);
        if result == self.calculation && shipping_cost == self.shipping_cost {
            return false;
        }
        self.calculation = result;
        self.shipping_cost = shipping_cost;
        true
    }

    pub fn requires_price_refresh(&self, policy: &RefreshPolicy, now: DateTime<Utc>) -> bool {
        policy.is_price_stale(self.price.updated_at, now)
    }

    pub fn requires_product_refresh(&self, policy: &RefreshPolicy, now: DateTime<Utc>) -> bool {
        policy.is_product_stale(self.product.updated_at, now)
    }

    pub(crate) fn replace_price(&mut self, price: Price) {
        self.price = price;
    }

    pub(crate) fn replace_product(&mut self, product: Product) {
        self.product = product;
    }

    /// Checks the cached calculation against the item's inputs.
    pub fn validate(&self, parent: &str, policy: &RefreshPolicy, now: DateTime<Utc>) -> Vec<Invalid> {
        let mut invalids = Vec::new();

        if self.requires_price_refresh(policy, now) {
            invalids.push(Invalid::refresh_required(path(parent, "price")));
        }
        if self.requires_product_refresh(policy, now) {
            invalids.push(Invalid::refresh_required(path(parent, "product")));
        }

        if self.price.gross != self.calculation.item_cost.gross {
            invalids.push(Invalid::generic(
                path(parent, "calculation.itemCost.gross"),
                "does not match the price",
            ));
        }

        let vat = &self.product.vat;
        let rate_matches = self
            .calculation
            .item_cost
            .vat_amounts
            .get(&vat.sign)
            .is_some_and(|amount| amount.rate == vat.rate);
        if !rate_matches {
            invalids.push(Invalid::generic(
                path(parent, "calculation.itemCost.vatAmounts"),
                format!("does not contain rate {} for sign {}", vat.rate, vat.sign),
            ));
        }

        if self.shipping_cost != self.calculation.shipping_cost {
            invalids.push(Invalid::generic(
                path(parent, "calculation.shippingCost"),
                "does not match the item shipping cost",
            ));
        }

        invalids
    }
}
