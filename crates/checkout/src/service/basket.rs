use std::time::Instant;

use document_store::DocumentStore;
use domain::{
    Basket, BasketCalculation, BasketId, CheckoutMetadata, Customer, DomainError, FulfillmentType,
    ItemId, OutletId, PaymentProcess, ProductId, Repository,
};

use super::{BasketView, CheckoutService, CheckoutSnapshot, record_duration};
use crate::error::{CheckoutError, Result};

impl<S: DocumentStore> CheckoutService<S> {
    /// Creates an open basket for an outlet.
    ///
    /// When a customer is given, the basket's checkout metadata is created
    /// with it.
    #[tracing::instrument(skip(self))]
    pub async fn create_basket(
        &self,
        outlet_id: OutletId,
        customer: Option<Customer>,
    ) -> Result<BasketView> {
        let start = Instant::now();
        let id = BasketId::new();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket = Basket::new(id, outlet_id, self.currency);
        uow.save(&mut basket).await?;

        let mut calculation = BasketCalculation::new(id, self.currency);
        uow.save(&mut calculation).await?;

        let mut payment_process = PaymentProcess::new(id, self.currency);
        uow.save(&mut payment_process).await?;

        if let Some(customer) = customer {
            let mut metadata = CheckoutMetadata::new(id);
            metadata.set_customer(customer);
            uow.save(&mut metadata).await?;
        }

        uow.commit().await?;

        metrics::counter!("checkout_baskets_created_total").increment(1);
        tracing::info!(basket_id = %id, "Basket created");
        record_duration("create_basket", start);

        Ok(BasketView {
            basket,
            calculation,
        })
    }

    /// Returns the basket with an up-to-date calculation.
    #[tracing::instrument(skip(self))]
    pub async fn get_basket(&self, id: BasketId) -> Result<BasketView> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;
        uow.commit().await?;

        record_duration("get_basket", start);
        Ok(BasketView {
            basket,
            calculation,
        })
    }

    /// Returns every aggregate of the basket after the staleness protocol ran.
    #[tracing::instrument(skip(self))]
    pub async fn find_all(&self, id: BasketId) -> Result<CheckoutSnapshot> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;
        let checkout_metadata: CheckoutMetadata = uow.find(id).await?;
        let payment_process: PaymentProcess = uow.find(id).await?;
        uow.commit().await?;

        record_duration("find_all", start);
        Ok(CheckoutSnapshot {
            basket,
            checkout_metadata,
            calculation,
            payment_process,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_basket(&self, id: BasketId) -> Result<Basket> {
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.cancel()?;
        uow.save(&mut basket).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, "Basket canceled");
        Ok(basket)
    }

    /// Fulfillment types the basket's outlet offers.
    #[tracing::instrument(skip(self))]
    pub async fn available_fulfillment(&self, id: BasketId) -> Result<Vec<FulfillmentType>> {
        let uow = self.unit_of_work();
        let basket: Basket = uow.find(id).await?;
        self.ports
            .fulfillment
            .possible_fulfillment(basket.outlet_id())
            .await
    }

    /// Adds one unit of a product at its current price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, id: BasketId, product_id: ProductId) -> Result<BasketView> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;
        let item_id = self.add_unit(&mut basket, &product_id).await?;
        let calculation = self.protocol.ensure_current(&uow, &mut basket, true).await?;
        uow.commit().await?;

        metrics::counter!("checkout_items_added_total").increment(1);
        tracing::info!(basket_id = %id, %item_id, %product_id, "Item added");
        record_duration("add_item", start);

        Ok(BasketView {
            basket,
            calculation,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, id: BasketId, item_id: ItemId) -> Result<BasketView> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.remove_item(item_id)?;
        let calculation = self.protocol.ensure_current(&uow, &mut basket, true).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, %item_id, "Item removed");
        record_duration("remove_item", start);

        Ok(BasketView {
            basket,
            calculation,
        })
    }

    /// Adds or removes units of a product until `quantity` remain.
    ///
    /// Units are changed one at a time, most recent first when removing. If a
    /// step fails, the units changed so far are recalculated and saved before
    /// the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn set_item_quantity(
        &self,
        id: BasketId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<BasketView> {
        let start = Instant::now();
        let target = usize::try_from(quantity)
            .map_err(|_| CheckoutError::bad_parameter("quantity is not allowed to be negative"))?;

        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let existing: Vec<ItemId> = basket
            .items_of_product(&product_id)
            .map(|item| item.id())
            .collect();
        if existing.is_empty() {
            return Err(DomainError::not_found("item", &product_id).into());
        }
        let items_before = basket.items().len();

        let adjusted = self
            .adjust_quantity(&mut basket, &product_id, &existing, target)
            .await;
        if let Err(err) = &adjusted {
            tracing::warn!(basket_id = %id, %product_id, error = %err, "Quantity only partly adjusted");
        }

        // Units are only ever added or only ever removed in one call.
        let items_changed = basket.items().len() != items_before;
        let calculation = self
            .protocol
            .ensure_current(&uow, &mut basket, items_changed)
            .await?;
        uow.commit().await?;
        adjusted?;

        tracing::info!(basket_id = %id, %product_id, quantity, "Item quantity set");
        record_duration("set_item_quantity", start);

        Ok(BasketView {
            basket,
            calculation,
        })
    }

    async fn adjust_quantity(
        &self,
        basket: &mut Basket,
        product_id: &ProductId,
        existing: &[ItemId],
        target: usize,
    ) -> Result<()> {
        if target < existing.len() {
            for item_id in existing.iter().rev().take(existing.len() - target) {
                basket.remove_item(*item_id)?;
            }
        } else {
            for _ in existing.len()..target {
                self.add_unit(basket, product_id).await?;
            }
        }
        Ok(())
    }

    async fn add_unit(&self, basket: &mut Basket, product_id: &ProductId) -> Result<ItemId> {
        let product = self.ports.product.fetch_product(product_id).await?;
        let price = self
            .ports
            .price
            .fetch_price(basket.outlet_id(), product_id)
            .await?;
        Ok(basket.add_item(product, price, &self.rules)?)
    }
}
