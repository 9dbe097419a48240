//! Order port trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Aggregate, Basket, BasketId, Money, OrderRef, PaymentProcess};

use crate::error::{CheckoutError, Result};

/// Places orders for paid baskets in the order management system.
#[async_trait]
pub trait OrderPort: Send + Sync {
    async fn create_order(&self, basket: &Basket, payment: &PaymentProcess) -> Result<OrderRef>;
}

/// An order as recorded by the in-memory order port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub basket_id: BasketId,
    pub item_count: usize,
    pub amount_paid: Money,
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderRef, PlacedOrder>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory order port for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderPort {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    pub fn order(&self, order_ref: &OrderRef) -> Option<PlacedOrder> {
        self.state.read().unwrap().orders.get(order_ref).cloned()
    }
}

#[async_trait]
impl OrderPort for InMemoryOrderPort {
    async fn create_order(&self, basket: &Basket, payment: &PaymentProcess) -> Result<OrderRef> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(CheckoutError::external("order", "order service unavailable"));
        }

        state.next_id += 1;
        let order_ref = OrderRef::new(format!("ORD-{:04}", state.next_id));
        state.orders.insert(
            order_ref.clone(),
            PlacedOrder {
                basket_id: basket.id(),
                item_count: basket.items().len(),
                amount_paid: payment.amount_paid(),
            },
        );
        Ok(order_ref)
    }
}
