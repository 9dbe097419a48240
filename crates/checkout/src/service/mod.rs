//! Checkout use cases.
//!
//! Every use case takes the basket's lock, opens one unit of work, runs the
//! staleness protocol where it reads the calculation and commits at the end.

mod basket;
mod checkout_data;
mod payment;

use std::time::Instant;

use document_store::DocumentStore;
use domain::{
    Address, Basket, BasketCalculation, BusinessRules, CheckoutMetadata, CommitMode, Currency,
    Customer, FulfillmentType, Money, PaymentMethod, PaymentProcess, UnitOfWork,
};
use serde::{Deserialize, Serialize};

use crate::config::CheckoutConfig;
use crate::error::Result;
use crate::locks::BasketLocks;
use crate::ports::Ports;
use crate::refresh::StalenessProtocol;
use crate::validation::ValidationService;

/// A basket together with its current calculation.
#[derive(Debug, Clone, Serialize)]
pub struct BasketView {
    pub basket: Basket,
    pub calculation: BasketCalculation,
}

/// All four aggregates of one basket.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSnapshot {
    pub basket: Basket,
    pub checkout_metadata: CheckoutMetadata,
    pub calculation: BasketCalculation,
    pub payment_process: PaymentProcess,
}

/// A payment to select together with the checkout data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub amount_selected: Money,
}

/// Any subset of checkout data applied in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutDataInput {
    pub customer: Option<Customer>,
    pub fulfillment: Option<FulfillmentType>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment: Option<PaymentInput>,
}

/// Orchestrates baskets, checkout data and payments over a document store.
pub struct CheckoutService<S: DocumentStore> {
    store: S,
    mode: CommitMode,
    ports: Ports,
    locks: BasketLocks,
    rules: BusinessRules,
    currency: Currency,
    protocol: StalenessProtocol,
    validation: ValidationService,
}

impl<S: DocumentStore> CheckoutService<S> {
    /// Creates a service using the commit mode of the configured backend.
    pub fn new(store: S, ports: Ports, config: &CheckoutConfig) -> Result<Self> {
        let protocol = StalenessProtocol::new(ports.clone(), config.refresh_policy()?);
        let validation = ValidationService::new(protocol.clone(), config.customer_rules()?);

        Ok(Self {
            store,
            mode: config.backend.commit_mode(),
            ports,
            locks: BasketLocks::new(),
            rules: config.business_rules(),
            currency: config.currency,
            protocol,
            validation,
        })
    }

    /// Overrides the commit mode chosen from the backend.
    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn commit_mode(&self) -> CommitMode {
        self.mode
    }

    pub fn locks(&self) -> &BasketLocks {
        &self.locks
    }

    fn unit_of_work(&self) -> UnitOfWork<'_, S> {
        UnitOfWork::new(&self.store, self.mode)
    }
}

fn record_duration(use_case: &'static str, start: Instant) {
    metrics::histogram!("checkout_use_case_duration_seconds", "use_case" => use_case)
        .record(start.elapsed().as_secs_f64());
}
