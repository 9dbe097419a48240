//! Repository ports for the checkout aggregates.

use async_trait::async_trait;
use common::BasketId;

use crate::aggregate::Aggregate;
use crate::basket::Basket;
use crate::calculation::BasketCalculation;
use crate::checkout_metadata::CheckoutMetadata;
use crate::error::Result;
use crate::payment::PaymentProcess;

/// Loads and stores one aggregate type by basket id.
#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Loads the aggregate.
    ///
    /// Aggregates with a default instance are created on first access;
    /// others fail with `ResourceNotFound`.
    async fn find(&self, id: BasketId) -> Result<A>;

    /// Stores the aggregate and advances its version.
    async fn save(&self, aggregate: &mut A) -> Result<()>;
}

pub trait BasketRepository: Repository<Basket> {}
impl<T: Repository<Basket> + ?Sized> BasketRepository for T {}

pub trait CheckoutMetadataRepository: Repository<CheckoutMetadata> {}
impl<T: Repository<CheckoutMetadata> + ?Sized> CheckoutMetadataRepository for T {}

pub trait BasketCalculationRepository: Repository<BasketCalculation> {}
impl<T: Repository<BasketCalculation> + ?Sized> BasketCalculationRepository for T {}

pub trait PaymentProcessRepository: Repository<PaymentProcess> {}
impl<T: Repository<PaymentProcess> + ?Sized> PaymentProcessRepository for T {}
