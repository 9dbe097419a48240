//! Payment gateway port trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Aggregate, Basket, BasketId, Payment, PaymentMethod, PaymentRef};

use crate::error::{CheckoutError, Result};

/// External payment service provider.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// Payment methods offered for a basket.
    async fn available_payment_methods(&self, basket: &Basket) -> Result<Vec<PaymentMethod>>;

    /// Opens a payment process for a basket and returns its reference.
    async fn create_payment_process(&self, basket: &Basket) -> Result<PaymentRef>;

    /// Registers every payment of the process with the provider.
    async fn initialize_all_sub_payments(
        &self,
        payment_ref: &PaymentRef,
        payments: &[Payment],
    ) -> Result<()>;

    /// Captures the money of an initialized process.
    async fn execute_payment(&self, payment_ref: &PaymentRef) -> Result<()>;
}

/// Progress of a payment process at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayProcessStatus {
    Created,
    Initialized,
    Executed,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    methods: Option<Vec<PaymentMethod>>,
    processes: HashMap<PaymentRef, (BasketId, GatewayProcessStatus)>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_initialize: bool,
    fail_on_execute: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the offered payment methods. All methods are offered by default.
    pub fn set_methods(&self, methods: Vec<PaymentMethod>) {
        self.state.write().unwrap().methods = Some(methods);
    }

    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    pub fn set_fail_on_initialize(&self, fail: bool) {
        self.state.write().unwrap().fail_on_initialize = fail;
    }

    pub fn set_fail_on_execute(&self, fail: bool) {
        self.state.write().unwrap().fail_on_execute = fail;
    }

    /// Returns the gateway-side status of a process.
    pub fn status(&self, payment_ref: &PaymentRef) -> Option<GatewayProcessStatus> {
        self.state
            .read()
            .unwrap()
            .processes
            .get(payment_ref)
            .map(|(_, status)| *status)
    }

    pub fn process_count(&self) -> usize {
        self.state.read().unwrap().processes.len()
    }
}

#[async_trait]
impl PaymentGatewayPort for InMemoryPaymentGateway {
    async fn available_payment_methods(&self, _basket: &Basket) -> Result<Vec<PaymentMethod>> {
        let state = self.state.read().unwrap();
        Ok(state.methods.clone().unwrap_or_else(|| {
            vec![
                PaymentMethod::Paypal,
                PaymentMethod::CreditCard,
                PaymentMethod::Cash,
                PaymentMethod::GiftCard,
            ]
        }))
    }

    async fn create_payment_process(&self, basket: &Basket) -> Result<PaymentRef> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(CheckoutError::external("payment", "payment process rejected"));
        }

        state.next_id += 1;
        let payment_ref = PaymentRef::new(format!("PSP-{:04}", state.next_id));
        state.processes.insert(
            payment_ref.clone(),
            (basket.id(), GatewayProcessStatus::Created),
        );
        Ok(payment_ref)
    }

    async fn initialize_all_sub_payments(
        &self,
        payment_ref: &PaymentRef,
        _payments: &[Payment],
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_initialize {
            return Err(CheckoutError::external("payment", "payment initialization declined"));
        }
        let (_, status) = state.processes.get_mut(payment_ref).ok_or_else(|| {
            CheckoutError::external("payment", format!("unknown payment process {payment_ref}"))
        })?;
        *status = GatewayProcessStatus::Initialized;
        Ok(())
    }

    async fn execute_payment(&self, payment_ref: &PaymentRef) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_execute {
            return Err(CheckoutError::external("payment", "payment declined"));
        }
        let (_, status) = state.processes.get_mut(payment_ref).ok_or_else(|| {
            CheckoutError::external("payment", format!("unknown payment process {payment_ref}"))
        })?;
        if *status != GatewayProcessStatus::Initialized {
            return Err(CheckoutError::external(
                "payment",
                format!("payment process {payment_ref} is not initialized"),
            ));
        }
        *status = GatewayProcessStatus::Executed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::{Currency, OutletId};

    use super::*;

    fn basket() -> Basket {
        Basket::new(BasketId::new(), OutletId::new("berlin"), Currency::EUR)
    }

    #[tokio::test]
    async fn test_process_lifecycle() {
        let gateway = InMemoryPaymentGateway::new();
        let basket = basket();

        let payment_ref = gateway.create_payment_process(&basket).await.unwrap();
        assert_eq!(payment_ref, PaymentRef::new("PSP-0001"));
        assert_eq!(gateway.status(&payment_ref), Some(GatewayProcessStatus::Created));

        assert!(gateway.execute_payment(&payment_ref).await.is_err());

        gateway
            .initialize_all_sub_payments(&payment_ref, &[])
            .await
            .unwrap();
        gateway.execute_payment(&payment_ref).await.unwrap();
        assert_eq!(gateway.status(&payment_ref), Some(GatewayProcessStatus::Executed));
        assert_eq!(basket.id(), gateway.state.read().unwrap().processes[&payment_ref].0);
    }

    #[tokio::test]
    async fn test_failure_toggles() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_create(true);

        assert!(gateway.create_payment_process(&basket()).await.is_err());
        assert_eq!(gateway.process_count(), 0);
    }

    #[tokio::test]
    async fn test_available_methods() {
        let gateway = InMemoryPaymentGateway::new();
        assert_eq!(gateway.available_payment_methods(&basket()).await.unwrap().len(), 4);

        gateway.set_methods(vec![PaymentMethod::Cash]);
        assert_eq!(
            gateway.available_payment_methods(&basket()).await.unwrap(),
            vec![PaymentMethod::Cash]
        );
    }
}
