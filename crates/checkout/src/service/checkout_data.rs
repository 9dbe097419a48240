use std::time::Instant;

use document_store::DocumentStore;
use domain::{
    Address, Basket, BasketId, CheckoutMetadata, Customer, DomainError, FulfillmentType, Payment,
    PaymentProcess, Repository,
};

use super::{BasketView, CheckoutDataInput, CheckoutService, CheckoutSnapshot, record_duration};
use crate::error::Result;

impl<S: DocumentStore> CheckoutService<S> {
    #[tracing::instrument(skip(self))]
    pub async fn set_customer(&self, id: BasketId, customer: Customer) -> Result<CheckoutMetadata> {
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let mut metadata: CheckoutMetadata = uow.find(id).await?;
        metadata.set_customer(customer);
        uow.save(&mut metadata).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, "Customer set");
        Ok(metadata)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_billing_address(
        &self,
        id: BasketId,
        address: Address,
    ) -> Result<CheckoutMetadata> {
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let mut metadata: CheckoutMetadata = uow.find(id).await?;
        metadata.set_billing_address(address);
        uow.save(&mut metadata).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, "Billing address set");
        Ok(metadata)
    }

    /// Selects how the basket reaches the customer.
    ///
    /// The outlet's options are only consulted when the value changes.
    #[tracing::instrument(skip(self))]
    pub async fn set_fulfillment(
        &self,
        id: BasketId,
        fulfillment: FulfillmentType,
    ) -> Result<BasketView> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let mut metadata: CheckoutMetadata = uow.find(id).await?;
        if self.apply_fulfillment(&basket, &mut metadata, fulfillment).await? {
            uow.save(&mut metadata).await?;
        }

        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;
        uow.commit().await?;

        record_duration("set_fulfillment", start);
        Ok(BasketView {
            basket,
            calculation,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_shipping_address(&self, id: BasketId, address: Address) -> Result<BasketView> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let mut metadata: CheckoutMetadata = uow.find(id).await?;
        if metadata.set_shipping_address(address) {
            uow.save(&mut metadata).await?;
            tracing::info!(basket_id = %id, "Shipping address changed");
        }

        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;
        uow.commit().await?;

        record_duration("set_shipping_address", start);
        Ok(BasketView {
            basket,
            calculation,
        })
    }

    /// Applies any subset of checkout data, and optionally selects a payment,
    /// in one unit of work.
    #[tracing::instrument(skip(self))]
    pub async fn set_checkout_data(
        &self,
        id: BasketId,
        input: CheckoutDataInput,
    ) -> Result<CheckoutSnapshot> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let mut metadata: CheckoutMetadata = uow.find(id).await?;
        if let Some(customer) = input.customer {
            metadata.set_customer(customer);
        }
        if let Some(fulfillment) = input.fulfillment {
            self.apply_fulfillment(&basket, &mut metadata, fulfillment)
                .await?;
        }
        if let Some(address) = input.shipping_address {
            metadata.set_shipping_address(address);
        }
        if let Some(address) = input.billing_address {
            metadata.set_billing_address(address);
        }
        uow.save(&mut metadata).await?;

        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;

        let mut payment_process: PaymentProcess = uow.find(id).await?;
        if let Some(payment) = input.payment {
            self.check_payment_amount(&basket, payment.amount_selected)?;
            let payment_id = payment_process.add_payment(
                calculation.grand_total(),
                Payment::new(payment.method, payment.amount_selected),
            )?;
            uow.save(&mut payment_process).await?;
            tracing::info!(basket_id = %id, %payment_id, method = %payment.method, "Payment selected");
        }

        let checkout_metadata: CheckoutMetadata = uow.find(id).await?;
        uow.commit().await?;

        record_duration("set_checkout_data", start);
        Ok(CheckoutSnapshot {
            basket,
            checkout_metadata,
            calculation,
            payment_process,
        })
    }

    /// Returns true if the fulfillment changed.
    async fn apply_fulfillment(
        &self,
        basket: &Basket,
        metadata: &mut CheckoutMetadata,
        fulfillment: FulfillmentType,
    ) -> Result<bool> {
        if metadata.fulfillment() == fulfillment {
            return Ok(false);
        }

        let options = self
            .ports
            .fulfillment
            .possible_fulfillment(basket.outlet_id())
            .await?;
        if !options.contains(&fulfillment) {
            return Err(DomainError::illegal(format!(
                "cannot select {fulfillment} for outlet {}",
                basket.outlet_id()
            ))
            .into());
        }

        tracing::info!(%fulfillment, "Fulfillment changed");
        Ok(metadata.set_fulfillment(fulfillment))
    }
}
