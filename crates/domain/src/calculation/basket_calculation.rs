use common::BasketId;
use document_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::{Currency, Money};
use crate::validation::Invalid;
use crate::vat::VatAmounts;

use super::CalculationResult;

/// Cached basket-level totals.
///
/// Always reconstructible from the basket's items; stored so reads don't have
/// to recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketCalculation {
    basket_id: BasketId,

    #[serde(skip)]
    version: Version,

    grand_total: Money,
    net_total: Money,
    shipping_cost_total: Money,
    vat_amounts: VatAmounts,
}

impl Aggregate for BasketCalculation {
    fn aggregate_type() -> &'static str {
        "basket_calculation"
    }

    fn id(&self) -> BasketId {
        self.basket_id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn default_for(id: BasketId) -> Option<Self> {
        Some(Self::new(id, Currency::default()))
    }
}

impl BasketCalculation {
    /// A zero calculation, as for an empty basket.
    pub fn new(basket_id: BasketId, currency: Currency) -> Self {
        Self::from_result(basket_id, &CalculationResult::zero(currency))
    }

    /// Builds the basket totals from the reduction of all item results.
    pub fn from_result(basket_id: BasketId, result: &CalculationResult) -> Self {
        Self {
            basket_id,
            version: Version::initial(),
            grand_total: result.total_cost.gross,
            net_total: result.total_cost.net,
            shipping_cost_total: result.shipping_cost,
            vat_amounts: result.total_cost.vat_amounts.clone(),
        }
    }

    /// Replaces the totals, keeping identity and version.
    ///
    /// Returns true if any total changed.
    pub fn update(&mut self, result: &CalculationResult) -> bool {
        let mut next = Self::from_result(self.basket_id, result);
        next.version = self.version;
        if *self == next {
            return false;
        }
        *self = next;
        true
    }

    pub fn basket_id(&self) -> BasketId {
        self.basket_id
    }

    pub fn grand_total(&self) -> Money {
        self.grand_total
    }

    pub fn net_total(&self) -> Money {
        self.net_total
    }

    pub fn shipping_cost_total(&self) -> Money {
        self.shipping_cost_total
    }

    pub fn vat_amounts(&self) -> &VatAmounts {
        &self.vat_amounts
    }

    /// Same totals, ignoring identity and version.
    pub fn same_totals(&self, other: &BasketCalculation) -> bool {
        self.grand_total == other.grand_total
            && self.net_total == other.net_total
            && self.shipping_cost_total == other.shipping_cost_total
            && self.vat_amounts == other.vat_amounts
    }

    pub fn validate(&self) -> Vec<Invalid> {
        let mut invalids = Vec::new();
        if self.grand_total.is_zero() {
            invalids.push(Invalid::generic(
                "basketCalculation.grandTotal",
                "should not be zero",
            ));
        }
        invalids
    }
}
