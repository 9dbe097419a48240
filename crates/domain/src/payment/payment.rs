use common::PaymentId;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::money::Money;

/// Instruments a customer can pay with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Paypal,
    CreditCard,
    Cash,
    GiftCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Paypal => "PAYPAL",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::GiftCard => "GIFT_CARD",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PAYPAL" => Ok(PaymentMethod::Paypal),
            "CREDIT_CARD" => Ok(PaymentMethod::CreditCard),
            "CASH" => Ok(PaymentMethod::Cash),
            "GIFT_CARD" => Ok(PaymentMethod::GiftCard),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Selected,
    Initialized,
    Executed,
    Canceled,
}

/// A single payment instrument of a payment process.
///
/// `amount_used` and `amount_overpaid` are derived by the owning process; a
/// selected amount of zero means "whatever remains".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    method: PaymentMethod,
    amount_selected: Money,
    amount_used: Money,
    amount_overpaid: Money,
    status: PaymentStatus,
}

impl Payment {
    pub fn new(method: PaymentMethod, amount_selected: Money) -> Self {
        let currency = amount_selected.currency();
        Self {
            id: PaymentId::new(),
            method,
            amount_selected,
            amount_used: Money::zero(currency),
            amount_overpaid: Money::zero(currency),
            status: PaymentStatus::Selected,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn amount_selected(&self) -> Money {
        self.amount_selected
    }

    pub fn amount_used(&self) -> Money {
        self.amount_used
    }

    pub fn amount_overpaid(&self) -> Money {
        self.amount_overpaid
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn is_gift_card(&self) -> bool {
        self.method == PaymentMethod::GiftCard
    }

    pub fn is_canceled(&self) -> bool {
        self.status == PaymentStatus::Canceled
    }

    /// Applies this payment against the remaining amount.
    ///
    /// Canceled payments never report an overpay.
    pub(crate) fn calculate_usage(&mut self, to_pay: Money) {
        let max_limit = if self.amount_selected.is_positive() {
            self.amount_selected
        } else {
            to_pay
        };
        self.amount_used = if to_pay >= max_limit { max_limit } else { to_pay };
        self.amount_overpaid = if self.is_canceled() || self.amount_used >= self.amount_selected
        {
            Money::zero(to_pay.currency())
        } else {
            self.amount_selected - self.amount_used
        };
    }

    pub(crate) fn select(&mut self) {
        if !self.is_canceled() {
            self.status = PaymentStatus::Selected;
        }
    }

    pub(crate) fn initialize(&mut self) {
        if self.status == PaymentStatus::Selected {
            self.status = PaymentStatus::Initialized;
        }
    }

    pub(crate) fn execute(&mut self) {
        if self.status == PaymentStatus::Initialized {
            self.status = PaymentStatus::Executed;
        }
    }

    pub(crate) fn cancel(&mut self) -> Result<()> {
        if self.status == PaymentStatus::Executed {
            return Err(DomainError::illegal("Payment already processed"));
        }
        let currency = self.amount_selected.currency();
        self.status = PaymentStatus::Canceled;
        self.amount_used = Money::zero(currency);
        self.amount_overpaid = Money::zero(currency);
        Ok(())
    }
}
