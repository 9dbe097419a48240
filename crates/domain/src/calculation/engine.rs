//! Pure price/VAT/shipping arithmetic.

use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money};
use crate::vat::{Vat, VatAmounts};

/// Gross, net and VAT breakdown of an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub gross: Money,
    pub net: Money,
    pub vat_amounts: VatAmounts,
}

impl Cost {
    pub fn zero(currency: Currency) -> Self {
        Self {
            gross: Money::zero(currency),
            net: Money::zero(currency),
            vat_amounts: VatAmounts::new(),
        }
    }

    /// Splits a gross amount into net and VAT.
    pub fn from_gross(gross: Money, vat: &Vat) -> Self {
        let vat_amount = vat.amount_of(gross);
        Self {
            gross,
            net: gross - vat_amount,
            vat_amounts: VatAmounts::single(vat, vat_amount),
        }
    }

    /// Adds an already-taxed amount to gross and net.
    pub fn with_pass_through(&self, amount: Money) -> Self {
        Self {
            gross: self.gross + amount,
            net: self.net + amount,
            vat_amounts: self.vat_amounts.clone(),
        }
    }

    pub fn combine(&self, other: &Cost) -> Self {
        Self {
            gross: self.gross + other.gross,
            net: self.net + other.net,
            vat_amounts: self.vat_amounts.merge(&other.vat_amounts),
        }
    }
}

/// Calculation of one item, or the reduction of many.
///
/// `total_cost` is `item_cost` with shipping added to gross and net; shipping
/// carries no VAT of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub item_cost: Cost,
    pub shipping_cost: Money,
    pub total_cost: Cost,
}

impl CalculationResult {
    /// The identity of [`CalculationResult::combine`].
    pub fn zero(currency: Currency) -> Self {
        Self {
            item_cost: Cost::zero(currency),
            shipping_cost: Money::zero(currency),
            total_cost: Cost::zero(currency),
        }
    }

    pub fn combine(&self, other: &CalculationResult) -> Self {
        Self {
            item_cost: self.item_cost.combine(&other.item_cost),
            shipping_cost: self.shipping_cost + other.shipping_cost,
            total_cost: self.total_cost.combine(&other.total_cost),
        }
    }
}

/// Calculates a single item from its gross price, VAT category and shipping cost.
pub fn item_result(price: Money, vat: &Vat, shipping_cost: Money) -> CalculationResult {
    let item_cost = Cost::from_gross(price, vat);
    let total_cost = item_cost.with_pass_through(shipping_cost);
    CalculationResult {
        item_cost,
        shipping_cost,
        total_cost,
    }
}

/// Reduces item results into one. An empty input yields the zero result.
pub fn combine<'a>(
    results: impl IntoIterator<Item = &'a CalculationResult>,
    currency: Currency,
) -> CalculationResult {
    results
        .into_iter()
        .fold(CalculationResult::zero(currency), |acc, r| acc.combine(r))
}
