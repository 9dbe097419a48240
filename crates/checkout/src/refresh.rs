//! Keeps the cached basket calculation in line with items, snapshots and
//! checkout metadata.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use document_store::DocumentStore;
use domain::{
    Aggregate, Basket, BasketCalculation, CheckoutMetadata, FulfillmentType, Money,
    PaymentProcess, ProductId, RefreshPolicy, Repository, UnitOfWork,
};

use crate::error::Result;
use crate::ports::Ports;

/// Decides when a basket has to be recalculated and performs the
/// recalculation.
///
/// The calculation is recomputed only when snapshots were refreshed, the
/// checkout metadata is outdated or the caller changed the items. Otherwise
/// the stored calculation is returned untouched.
#[derive(Clone)]
pub struct StalenessProtocol {
    ports: Ports,
    policy: RefreshPolicy,
}

impl StalenessProtocol {
    pub fn new(ports: Ports, policy: RefreshPolicy) -> Self {
        Self { ports, policy }
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Re-fetches price and product snapshots that are older than the policy allows.
    ///
    /// Only open, non-empty baskets are refreshed. Returns true if any
    /// snapshot was replaced.
    #[tracing::instrument(skip(self, basket), fields(basket_id = %basket.id()))]
    pub async fn refresh_stale_items(&self, basket: &mut Basket) -> Result<bool> {
        if !basket.status().can_modify() || basket.is_empty() {
            return Ok(false);
        }

        let now = Utc::now();
        let mut refreshed = false;

        for product_id in basket.products_with_stale_price(&self.policy, now) {
            let price = self
                .ports
                .price
                .fetch_price(basket.outlet_id(), &product_id)
                .await?;
            refreshed |= basket.refresh_price(&product_id, price)?;
        }

        for product_id in basket.products_with_stale_product(&self.policy, now) {
            let product = self.ports.product.fetch_product(&product_id).await?;
            refreshed |= basket.refresh_product(product)?;
        }

        if refreshed {
            metrics::counter!("checkout_snapshot_refreshes_total").increment(1);
            tracing::info!("Stale basket snapshots refreshed");
        }
        Ok(refreshed)
    }

    /// Shipping costs per product. Pickup baskets never ask the shipping port.
    pub async fn shipping_costs(
        &self,
        basket: &Basket,
        metadata: &CheckoutMetadata,
    ) -> Result<HashMap<ProductId, Money>> {
        if metadata.fulfillment() == FulfillmentType::Pickup || basket.is_empty() {
            return Ok(HashMap::new());
        }
        self.ports
            .shipping
            .determine_shipping_costs(
                basket.items(),
                metadata.fulfillment(),
                metadata.shipping_address(),
            )
            .await
    }

    /// Recalculates the basket and persists whatever changed.
    ///
    /// `basket_changed` is set when the caller already modified the basket's
    /// items or snapshots, so it has to be saved even if no item value moved.
    /// The calculation and the payment process are only saved when the new
    /// grand total changed them, and the metadata only when its outdated flag
    /// is cleared.
    #[tracing::instrument(skip_all, fields(basket_id = %basket.id()))]
    pub async fn recalculate<S: DocumentStore>(
        &self,
        uow: &UnitOfWork<'_, S>,
        basket: &mut Basket,
        metadata: &mut CheckoutMetadata,
        basket_changed: bool,
    ) -> Result<BasketCalculation> {
        let start = Instant::now();
        let id = basket.id();

        let shipping = self.shipping_costs(basket, metadata).await?;
        if basket.recalculate(&shipping) || basket_changed {
            uow.save(basket).await?;
        }

        let mut calculation: BasketCalculation = uow.find(id).await?;
        if calculation.update(&basket.calculation_result()) {
            uow.save(&mut calculation).await?;
        }

        let mut payment_process: PaymentProcess = uow.find(id).await?;
        let settled_before = payment_process.clone();
        payment_process.calculate(calculation.grand_total())?;
        if payment_process != settled_before {
            uow.save(&mut payment_process).await?;
        }

        if metadata.is_outdated() {
            metadata.reset_outdated();
            uow.save(metadata).await?;
        }

        metrics::counter!("checkout_recalculations_total").increment(1);
        metrics::histogram!("checkout_recalculation_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(grand_total = %calculation.grand_total(), "Basket recalculated");

        Ok(calculation)
    }

    /// Runs the staleness protocol for a read or after a mutation.
    ///
    /// `items_changed` is set by callers that just added or removed items.
    pub async fn ensure_current<S: DocumentStore>(
        &self,
        uow: &UnitOfWork<'_, S>,
        basket: &mut Basket,
        items_changed: bool,
    ) -> Result<BasketCalculation> {
        let mut metadata: CheckoutMetadata = uow.find(basket.id()).await?;
        let refreshed = self.refresh_stale_items(basket).await?;

        if items_changed || refreshed || metadata.is_outdated() {
            return self
                .recalculate(uow, basket, &mut metadata, items_changed || refreshed)
                .await;
        }

        metrics::counter!("checkout_recalculation_cache_hits_total").increment(1);
        tracing::debug!(basket_id = %basket.id(), "Serving cached basket calculation");
        Ok(uow.find(basket.id()).await?)
    }
}
