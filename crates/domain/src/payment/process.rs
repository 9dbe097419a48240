use common::{BasketId, PaymentId};
use document_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::error::{DomainError, Result};
use crate::ids::PaymentRef;
use crate::money::{Currency, Money};
use crate::validation::Invalid;

use super::{Payment, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProcessStatus {
    #[default]
    ToPay,
    PartiallyPaid,
    Paid,
}

/// Settlement of a basket total across one or more payments.
///
/// Payments are never removed, only canceled. Gift cards are always
/// allocated before any other instrument; otherwise insertion order applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcess {
    basket_id: BasketId,

    #[serde(skip)]
    version: Version,

    payments: Vec<Payment>,
    amount_paid: Money,
    amount_to_pay: Money,
    amount_to_return: Money,
    status: PaymentProcessStatus,
    external_ref: Option<PaymentRef>,
}

impl Aggregate for PaymentProcess {
    fn aggregate_type() -> &'static str {
        "payment_process"
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

impl PaymentProcess {
    pub fn new(basket_id: BasketId, currency: Currency) -> Self {
        Self {
            basket_id,
            version: Version::initial(),
            payments: Vec::new(),
            amount_paid: Money::zero(currency),
            amount_to_pay: Money::zero(currency),
            amount_to_return: Money::zero(currency),
            status: PaymentProcessStatus::ToPay,
            external_ref: None,
        }
    }

    pub fn basket_id(&self) -> BasketId {
        self.basket_id
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id() == id)
    }

    pub fn active_payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments.iter().filter(|p| !p.is_canceled())
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    pub fn amount_to_pay(&self) -> Money {
        self.amount_to_pay
    }

    pub fn amount_to_return(&self) -> Money {
        self.amount_to_return
    }

    pub fn status(&self) -> PaymentProcessStatus {
        self.status
    }

    pub fn external_ref(&self) -> Option<&PaymentRef> {
        self.external_ref.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.external_ref.is_some()
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_to_pay.is_zero()
    }

    /// Allocates `basket_total` across the active payments.
    ///
    /// Payments reached after the total is covered are canceled. Only the
    /// last applied payment's overpay is kept as the amount to return.
    pub fn calculate(&mut self, basket_total: Money) -> Result<()> {
        let currency = basket_total.currency();
        self.amount_to_pay = basket_total;
        self.amount_paid = Money::zero(currency);
        self.amount_to_return = Money::zero(currency);

        for index in self.settlement_order() {
            let payment = &mut self.payments[index];
            if self.amount_to_pay.is_zero() {
                payment.cancel()?;
                continue;
            }
            payment.calculate_usage(self.amount_to_pay);
            self.amount_to_return = payment.amount_overpaid();
            self.amount_paid += payment.amount_used();
            self.amount_to_pay -= payment.amount_used();
        }

        self.status = if self.amount_paid.is_zero() {
            PaymentProcessStatus::ToPay
        } else if self.amount_to_pay.is_zero() {
            PaymentProcessStatus::Paid
        } else {
            PaymentProcessStatus::PartiallyPaid
        };
        Ok(())
    }

    /// Indices of active payments, gift cards first, stable otherwise.
    fn settlement_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.payments.len())
            .filter(|&i| !self.payments[i].is_canceled())
            .collect();
        order.sort_by_key(|&i| !self.payments[i].is_gift_card());
        order
    }

    /// Adds a payment and recalculates.
    ///
    /// Gift cards may still be added once the basket is fully paid.
    pub fn add_payment(&mut self, basket_total: Money, payment: Payment) -> Result<PaymentId> {
        if basket_total.is_zero() {
            return Err(DomainError::illegal("No payment on empty basket"));
        }
        let already_paid = basket_total == self.amount_paid
            && self.active_payments().next().is_some()
            && !payment.is_gift_card();
        if already_paid {
            return Err(DomainError::illegal("basket already fully paid"));
        }

        let id = payment.id();
        self.payments.push(payment);
        self.calculate(basket_total)?;
        Ok(id)
    }

    pub fn cancel_payment(&mut self, id: PaymentId, basket_total: Money) -> Result<()> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| DomainError::not_found("payment", id))?;
        payment.cancel()?;
        self.calculate(basket_total)
    }

    /// Binds the process to the gateway reference and initializes all payments.
    pub fn initialize(&mut self, external_ref: PaymentRef) -> Result<()> {
        if self.external_ref.is_some() {
            return Err(DomainError::illegal("payment process already in progress"));
        }
        self.external_ref = Some(external_ref);
        self.payments.iter_mut().for_each(Payment::initialize);
        Ok(())
    }

    pub fn execute(&mut self) -> Result<()> {
        if self.external_ref.is_none() {
            return Err(DomainError::illegal("payment process not in process"));
        }
        self.payments.iter_mut().for_each(Payment::execute);
        Ok(())
    }

    /// Detaches the gateway reference and reverts payments to selected.
    pub fn reset(&mut self) {
        self.external_ref = None;
        self.payments.iter_mut().for_each(Payment::select);
    }

    pub fn validate(&self) -> Vec<Invalid> {
        let mut invalids = Vec::new();
        if self.active_payments().next().is_none() {
            invalids.push(Invalid::generic("paymentProcess.payments", "should not be empty"));
        }
        if !self.is_fully_paid() {
            invalids.push(Invalid::generic("paymentProcess.fullyPaid", "should be fully paid"));
        }
        invalids
    }

    /// Number of payments in the given status.
    pub fn count_with_status(&self, status: PaymentStatus) -> usize {
        self.payments.iter().filter(|p| p.status() == status).count()
    }
}
