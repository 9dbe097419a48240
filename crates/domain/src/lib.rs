//! Domain layer for the checkout backend.
//!
//! This crate provides:
//! - Money and VAT primitives and the calculation engine
//! - The Basket, CheckoutMetadata, BasketCalculation and PaymentProcess aggregates
//! - Validation results and the business rules they are checked against
//! - Repository ports and a unit of work over a document store

pub mod aggregate;
pub mod basket;
pub mod calculation;
pub mod checkout_metadata;
pub mod error;
pub mod ids;
pub mod money;
pub mod payment;
pub mod repository;
pub mod rules;
pub mod unit_of_work;
pub mod validation;
pub mod vat;

pub use aggregate::Aggregate;
pub use basket::{Basket, BasketItem, BasketStatus, Price, Product};
pub use calculation::{BasketCalculation, CalculationResult, Cost};
pub use checkout_metadata::{
    Address, BusinessType, CheckoutMetadata, Customer, CustomerName, FulfillmentType,
    IdentifiedCustomer,
};
pub use common::{BasketId, ItemId, PaymentId};
pub use error::{DomainError, Result};
pub use ids::{OrderRef, OutletId, PaymentRef, PriceId, ProductId, SessionId};
pub use money::{Currency, Money};
pub use payment::{Payment, PaymentMethod, PaymentProcess, PaymentProcessStatus, PaymentStatus};
pub use repository::{
    BasketCalculationRepository, BasketRepository, CheckoutMetadataRepository,
    PaymentProcessRepository, Repository,
};
pub use rules::{BusinessRules, CustomerRules, RefreshPolicy};
pub use unit_of_work::{CommitMode, UnitOfWork};
pub use validation::{Invalid, ValidationErrors};
pub use vat::{Vat, VatAmount, VatAmounts, VatSign};
