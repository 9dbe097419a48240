use std::time::Instant;

use document_store::DocumentStore;
use domain::{
    Basket, BasketCalculation, BasketId, BasketStatus, DomainError, Money, Payment, PaymentId,
    PaymentMethod, PaymentProcess, Repository,
};

use super::{CheckoutService, record_duration};
use crate::error::{CheckoutError, Result};

impl<S: DocumentStore> CheckoutService<S> {
    /// Selects a payment. An amount of zero covers whatever remains to pay.
    #[tracing::instrument(skip(self))]
    pub async fn add_payment(
        &self,
        id: BasketId,
        method: PaymentMethod,
        amount_selected: Money,
    ) -> Result<PaymentProcess> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;
        self.check_payment_amount(&basket, amount_selected)?;

        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;
        let mut payment_process: PaymentProcess = uow.find(id).await?;
        let payment_id = payment_process.add_payment(
            calculation.grand_total(),
            Payment::new(method, amount_selected),
        )?;
        uow.save(&mut payment_process).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, %payment_id, %method, "Payment selected");
        record_duration("add_payment", start);
        Ok(payment_process)
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_payment(&self, id: BasketId, payment_id: PaymentId) -> Result<PaymentProcess> {
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        basket.ensure_modifiable()?;

        let calculation = self.protocol.ensure_current(&uow, &mut basket, false).await?;
        let mut payment_process: PaymentProcess = uow.find(id).await?;
        payment_process.cancel_payment(payment_id, calculation.grand_total())?;
        uow.save(&mut payment_process).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, %payment_id, "Payment canceled");
        Ok(payment_process)
    }

    #[tracing::instrument(skip(self))]
    pub async fn available_payment_methods(&self, id: BasketId) -> Result<Vec<PaymentMethod>> {
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        self.protocol.ensure_current(&uow, &mut basket, false).await?;
        uow.commit().await?;

        self.ports
            .payment_gateway
            .available_payment_methods(&basket)
            .await
    }

    /// Validates and freezes the basket and opens the payment at the gateway.
    ///
    /// Corrections made while validating are committed even when validation
    /// fails. A gateway failure leaves the basket open.
    #[tracing::instrument(skip(self))]
    pub async fn initialize_payment(&self, id: BasketId) -> Result<PaymentProcess> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        let payment_process: PaymentProcess = uow.find(id).await?;
        if payment_process.is_initialized() {
            return Err(DomainError::illegal("payment process already in progress").into());
        }

        self.protocol.ensure_current(&uow, &mut basket, false).await?;
        if let Err(err) = self.validation.validate(&uow, &mut basket).await {
            uow.commit().await?;
            return Err(err);
        }

        basket.freeze()?;

        let gateway = &self.ports.payment_gateway;
        let payment_ref = gateway.create_payment_process(&basket).await?;

        let mut payment_process: PaymentProcess = uow.find(id).await?;
        payment_process.initialize(payment_ref.clone())?;
        gateway
            .initialize_all_sub_payments(&payment_ref, payment_process.payments())
            .await?;

        uow.save(&mut basket).await?;
        uow.save(&mut payment_process).await?;
        uow.commit().await?;

        metrics::counter!("checkout_payments_initialized_total").increment(1);
        tracing::info!(basket_id = %id, %payment_ref, "Payment initialized");
        record_duration("initialize_payment", start);
        Ok(payment_process)
    }

    /// Executes the payment, finalizes the basket and places the order.
    ///
    /// If the order cannot be created, the finalized basket and executed
    /// payment are still committed before the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn execute_payment(&self, id: BasketId) -> Result<Basket> {
        let start = Instant::now();
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut basket: Basket = uow.find(id).await?;
        if basket.status() != BasketStatus::Frozen {
            return Err(DomainError::illegal(format!(
                "basket should be {} but is {}",
                BasketStatus::Frozen,
                basket.status()
            ))
            .into());
        }

        let mut payment_process: PaymentProcess = uow.find(id).await?;
        let payment_ref = payment_process
            .external_ref()
            .cloned()
            .ok_or_else(|| DomainError::illegal("payment process not initialized"))?;

        self.ports
            .payment_gateway
            .execute_payment(&payment_ref)
            .await?;
        payment_process.execute()?;
        basket.finalize()?;
        uow.save(&mut payment_process).await?;
        uow.save(&mut basket).await?;
        metrics::counter!("checkout_payments_executed_total").increment(1);

        let order_ref = match self.ports.order.create_order(&basket, &payment_process).await {
            Ok(order_ref) => order_ref,
            Err(err) => {
                tracing::warn!(basket_id = %id, error = %err, "Order creation failed after payment");
                uow.commit().await?;
                return Err(err);
            }
        };

        basket.set_order(order_ref.clone())?;
        uow.save(&mut basket).await?;
        uow.commit().await?;

        metrics::counter!("checkout_orders_created_total").increment(1);
        tracing::info!(basket_id = %id, %order_ref, "Order created");
        record_duration("execute_payment", start);
        Ok(basket)
    }

    /// Cancels an initialized payment and reopens the basket.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_payment_process(&self, id: BasketId) -> Result<PaymentProcess> {
        let _guard = self.locks.acquire(id).await;
        let uow = self.unit_of_work();

        let mut payment_process: PaymentProcess = uow.find(id).await?;
        if !payment_process.is_initialized() {
            return Err(DomainError::illegal("payment process not initialized").into());
        }

        let mut basket: Basket = uow.find(id).await?;
        basket.unfreeze()?;

        let calculation: BasketCalculation = uow.find(id).await?;
        payment_process.reset();
        payment_process.calculate(calculation.grand_total())?;

        uow.save(&mut basket).await?;
        uow.save(&mut payment_process).await?;
        uow.commit().await?;

        tracing::info!(basket_id = %id, "Payment process canceled");
        Ok(payment_process)
    }

    pub(super) fn check_payment_amount(&self, basket: &Basket, amount: Money) -> Result<()> {
        if amount.is_negative() {
            return Err(CheckoutError::bad_parameter(
                "payment amount is not allowed to be negative",
            ));
        }
        if amount.currency() != basket.currency() {
            return Err(CheckoutError::bad_parameter(format!(
                "payment currency {} does not match basket currency {}",
                amount.currency(),
                basket.currency()
            )));
        }
        Ok(())
    }
}
