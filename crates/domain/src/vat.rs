//! VAT rates, signs and per-sign amount maps.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{Money, round_half_up};

/// Short code identifying a VAT category on receipts (e.g. "A" for the standard rate).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VatSign(String);

impl VatSign {
    pub fn new(sign: impl Into<String>) -> Self {
        Self(sign.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VatSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VatSign {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A VAT category: its sign and its rate in percent (19 means 19%).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vat {
    pub sign: VatSign,
    pub rate: Decimal,
}

impl Vat {
    pub fn new(sign: impl Into<VatSign>, rate: Decimal) -> Self {
        Self {
            sign: sign.into(),
            rate,
        }
    }

    /// Returns the VAT contained in a gross amount.
    ///
    /// `gross / (1 + rate/100) * rate/100`, rounded half-up to two decimals.
    pub fn amount_of(&self, gross: Money) -> Money {
        let divisor = Decimal::ONE_HUNDRED + self.rate;
        if divisor.is_zero() {
            return Money::zero(gross.currency());
        }
        let vat = round_half_up(gross.amount() * self.rate / divisor);
        Money::new(vat, gross.currency())
    }
}

/// The VAT collected under one sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatAmount {
    pub sign: VatSign,
    pub rate: Decimal,
    pub amount: Money,
}

/// VAT amounts keyed by sign.
///
/// Merging sums amounts that share a sign and inserts new signs, so it is
/// associative and commutative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VatAmounts(BTreeMap<VatSign, VatAmount>);

impl VatAmounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding a single sign.
    pub fn single(vat: &Vat, amount: Money) -> Self {
        let mut amounts = Self::new();
        amounts.add(vat.sign.clone(), vat.rate, amount);
        amounts
    }

    /// Adds an amount under a sign, summing with an existing entry.
    pub fn add(&mut self, sign: VatSign, rate: Decimal, amount: Money) {
        self.0
            .entry(sign.clone())
            .and_modify(|existing| existing.amount += amount)
            .or_insert(VatAmount { sign, rate, amount });
    }

    /// Returns the merge of two maps.
    pub fn merge(&self, other: &VatAmounts) -> VatAmounts {
        let mut merged = self.clone();
        for entry in other.0.values() {
            merged.add(entry.sign.clone(), entry.rate, entry.amount);
        }
        merged
    }

    pub fn get(&self, sign: &VatSign) -> Option<&VatAmount> {
        self.0.get(sign)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VatAmount> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all amounts.
    pub fn total(&self) -> Money {
        self.0.values().map(|v| v.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn eur(cents: i64) -> Money {
        Money::from_cents(cents, Currency::EUR)
    }

    #[test]
    fn test_vat_amount_of_gross() {
        let vat = Vat::new("A", Decimal::new(19, 0));
        assert_eq!(vat.amount_of(eur(11900)), eur(1900));

        let reduced = Vat::new("B", Decimal::new(7, 0));
        // 10.00 / 1.07 * 0.07 = 0.6542... -> 0.65
        assert_eq!(reduced.amount_of(eur(1000)), eur(65));
    }

    #[test]
    fn test_vat_rounds_half_up() {
        // 0.21 * 10 / 110 = 0.019090... -> 0.02
        let vat = Vat::new("C", Decimal::new(10, 0));
        assert_eq!(vat.amount_of(eur(21)), eur(2));
    }

    #[test]
    fn test_zero_rate_has_no_vat() {
        let vat = Vat::new("D", Decimal::ZERO);
        assert!(vat.amount_of(eur(5000)).is_zero());
    }

    #[test]
    fn test_merge_sums_same_sign() {
        let a = VatAmounts::single(&Vat::new("A", Decimal::new(19, 0)), eur(190));
        let b = VatAmounts::single(&Vat::new("A", Decimal::new(19, 0)), eur(310));
        let c = VatAmounts::single(&Vat::new("B", Decimal::new(7, 0)), eur(70));

        let merged = a.merge(&b).merge(&c);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(&VatSign::new("A")).unwrap().amount, eur(500));
        assert_eq!(merged.get(&VatSign::new("B")).unwrap().amount, eur(70));
        assert_eq!(merged.total(), eur(570));

        assert_eq!(a.merge(&c), c.merge(&a));
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let a = VatAmounts::single(&Vat::new("A", Decimal::new(19, 0)), eur(190));
        assert_eq!(a.merge(&VatAmounts::new()), a);
        assert_eq!(VatAmounts::new().merge(&a), a);
    }
}
