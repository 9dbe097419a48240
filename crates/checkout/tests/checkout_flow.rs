//! Integration tests for the checkout use cases.

use std::sync::Arc;

use checkout::{
    CheckoutConfig, CheckoutDataInput, CheckoutService, ErrorKind, GatewayProcessStatus,
    InMemoryPorts, PaymentInput,
};
use chrono::{Duration, Utc};
use document_store::{DocumentStore, InMemoryDocumentStore, Version};
use domain::{
    Address, Aggregate, BasketId, BasketStatus, CheckoutMetadata, CommitMode, Currency, Customer,
    CustomerName, FulfillmentType, IdentifiedCustomer, Invalid, Money, OutletId, PaymentMethod,
    PaymentProcessStatus, PaymentStatus, ProductId, Repository, UnitOfWork, Vat,
};
use rust_decimal::Decimal;

const COFFEE: &str = "SKU-COFFEE";
const TEA: &str = "SKU-TEA";

fn eur(cents: i64) -> Money {
    Money::from_cents(cents, Currency::EUR)
}

fn address() -> Address {
    Address {
        country: "DE".to_string(),
        city: "Berlin".to_string(),
        zip_code: "10115".to_string(),
        street: "Invalidenstr.".to_string(),
        house_number: "117".to_string(),
    }
}

fn customer() -> Customer {
    Customer::Identified(IdentifiedCustomer {
        email: "jane.doe@example.com".to_string(),
        name: CustomerName {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        },
        ..Default::default()
    })
}

struct TestHarness {
    service: CheckoutService<InMemoryDocumentStore>,
    ports: InMemoryPorts,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(CheckoutConfig::default())
    }

    fn with_config(config: CheckoutConfig) -> Self {
        let ports = InMemoryPorts::new();
        ports
            .product
            .set_product(COFFEE, "Coffee beans", Vat::new("A", Decimal::new(19, 0)));
        ports
            .product
            .set_product(TEA, "Green tea", Vat::new("B", Decimal::new(7, 0)));
        ports.price.set_price(COFFEE, eur(1190));
        ports.price.set_price(TEA, eur(749));
        ports.shipping.set_cost(COFFEE, eur(495));

        let service =
            CheckoutService::new(InMemoryDocumentStore::new(), ports.ports(), &config).unwrap();
        Self { service, ports }
    }

    fn atomic() -> Self {
        let Self { service, ports } = Self::new();
        Self {
            service: service.with_commit_mode(CommitMode::Atomic),
            ports,
        }
    }

    async fn basket_with_coffee(&self) -> BasketId {
        let view = self
            .service
            .create_basket(OutletId::new("berlin-01"), None)
            .await
            .unwrap();
        let id = view.basket.id();
        self.service
            .add_item(id, ProductId::new(COFFEE))
            .await
            .unwrap();
        id
    }

    /// Stored versions of the basket, its calculation and its payment process.
    async fn versions(&self, id: BasketId) -> Vec<Option<Version>> {
        let store = self.service.store();
        let mut versions = Vec::new();
        for kind in ["basket", "basket_calculation", "payment_process"] {
            versions.push(store.current_version(kind, id).await.unwrap());
        }
        versions
    }

    async fn complete_checkout(&self, id: BasketId) {
        self.service
            .set_checkout_data(
                id,
                CheckoutDataInput {
                    customer: Some(customer()),
                    shipping_address: Some(address()),
                    billing_address: Some(address()),
                    payment: Some(PaymentInput {
                        method: PaymentMethod::CreditCard,
                        amount_selected: eur(0),
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_happy_path_from_basket_to_order() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    let view = h.service.add_item(id, ProductId::new(TEA)).await.unwrap();

    assert_eq!(view.basket.items().len(), 2);
    assert_eq!(view.calculation.grand_total(), eur(2434));
    assert_eq!(view.calculation.shipping_cost_total(), eur(495));

    h.complete_checkout(id).await;

    let process = h.service.initialize_payment(id).await.unwrap();
    let payment_ref = process.external_ref().cloned().unwrap();
    assert_eq!(
        h.ports.payment_gateway.status(&payment_ref),
        Some(GatewayProcessStatus::Initialized)
    );
    assert_eq!(
        h.service.get_basket(id).await.unwrap().basket.status(),
        BasketStatus::Frozen
    );

    let basket = h.service.execute_payment(id).await.unwrap();
    assert_eq!(basket.status(), BasketStatus::Finalized);
    assert!(basket.order().is_some());
    assert_eq!(h.ports.order.order_count(), 1);

    let snapshot = h.service.find_all(id).await.unwrap();
    assert_eq!(snapshot.payment_process.status(), PaymentProcessStatus::Paid);
    assert_eq!(snapshot.payment_process.amount_paid(), eur(2434));
    assert!(
        snapshot
            .payment_process
            .payments()
            .iter()
            .all(|p| p.status() == PaymentStatus::Executed)
    );
}

#[tokio::test]
async fn test_repeated_reads_use_cached_calculation() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    let calls = h.ports.shipping.call_count();

    let first = h.service.get_basket(id).await.unwrap();
    let second = h.service.get_basket(id).await.unwrap();

    assert_eq!(h.ports.shipping.call_count(), calls);
    assert_eq!(first.calculation, second.calculation);
    let snapshot = h.service.find_all(id).await.unwrap();
    assert!(!snapshot.checkout_metadata.is_outdated());
}

#[tokio::test]
async fn test_shipping_address_change_recalculates_once() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    let calls = h.ports.shipping.call_count();

    h.service.set_shipping_address(id, address()).await.unwrap();
    assert_eq!(h.ports.shipping.call_count(), calls + 1);

    h.service.set_shipping_address(id, address()).await.unwrap();
    h.service.get_basket(id).await.unwrap();
    assert_eq!(h.ports.shipping.call_count(), calls + 1);

    let snapshot = h.service.find_all(id).await.unwrap();
    assert!(!snapshot.checkout_metadata.is_outdated());
}

#[tokio::test]
async fn test_pickup_never_asks_for_shipping() {
    let h = TestHarness::new();
    let view = h
        .service
        .create_basket(OutletId::new("berlin-01"), None)
        .await
        .unwrap();
    let id = view.basket.id();

    h.service
        .set_fulfillment(id, FulfillmentType::Pickup)
        .await
        .unwrap();
    let view = h.service.add_item(id, ProductId::new(COFFEE)).await.unwrap();

    assert_eq!(h.ports.shipping.call_count(), 0);
    assert_eq!(view.calculation.grand_total(), eur(1190));
    assert!(view.calculation.shipping_cost_total().is_zero());
}

#[tokio::test]
async fn test_stale_price_is_refreshed_on_read() {
    let h = TestHarness::new();
    h.ports
        .price
        .set_fetched_at(Some(Utc::now() - Duration::hours(2)));
    let id = h.basket_with_coffee().await;

    h.ports.price.set_fetched_at(None);
    h.ports.price.set_price(COFFEE, eur(1290));
    let view = h.service.get_basket(id).await.unwrap();

    assert_eq!(view.basket.items()[0].price().gross, eur(1290));
    assert_eq!(view.calculation.grand_total(), eur(1785));

    let fetches = h.ports.price.fetch_count();
    h.service.get_basket(id).await.unwrap();
    assert_eq!(h.ports.price.fetch_count(), fetches);
}

#[tokio::test]
async fn test_set_item_quantity_adds_and_removes_units() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;

    let view = h
        .service
        .set_item_quantity(id, ProductId::new(COFFEE), 3)
        .await
        .unwrap();
    assert_eq!(view.basket.items().len(), 3);
    assert_eq!(view.calculation.grand_total(), eur(5055));

    let view = h
        .service
        .set_item_quantity(id, ProductId::new(COFFEE), 1)
        .await
        .unwrap();
    assert_eq!(view.basket.items().len(), 1);
    assert_eq!(view.calculation.grand_total(), eur(1685));
}

#[tokio::test]
async fn test_set_item_quantity_keeps_partial_progress() {
    let h = TestHarness::with_config(CheckoutConfig {
        max_same_item_count: 3,
        ..CheckoutConfig::default()
    });
    let id = h.basket_with_coffee().await;

    let err = h
        .service
        .set_item_quantity(id, ProductId::new(COFFEE), 5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);

    let view = h.service.get_basket(id).await.unwrap();
    assert_eq!(view.basket.items().len(), 3);
    assert_eq!(view.calculation.grand_total(), eur(5055));
}

#[tokio::test]
async fn test_set_item_quantity_rejects_bad_input() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;

    let err = h
        .service
        .set_item_quantity(id, ProductId::new(COFFEE), -1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadParameter);

    let err = h
        .service
        .set_item_quantity(id, ProductId::new(TEA), 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
}

#[tokio::test]
async fn test_unchanged_quantity_writes_nothing() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    let before = h.versions(id).await;
    assert!(before.iter().all(Option::is_some));

    for _ in 0..2 {
        let view = h
            .service
            .set_item_quantity(id, ProductId::new(COFFEE), 1)
            .await
            .unwrap();
        assert_eq!(view.basket.items().len(), 1);
        assert_eq!(view.calculation.grand_total(), eur(1685));
    }
    h.service.get_basket(id).await.unwrap();

    assert_eq!(h.versions(id).await, before);
}

#[tokio::test]
async fn test_metadata_only_change_keeps_basket_version() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    let before = h.versions(id).await;

    h.service.set_shipping_address(id, address()).await.unwrap();

    // Shipping costs come out the same, so only the metadata is written.
    assert_eq!(h.versions(id).await, before);
    let snapshot = h.service.find_all(id).await.unwrap();
    assert!(!snapshot.checkout_metadata.is_outdated());
}

#[tokio::test]
async fn test_initialize_fails_without_checkout_data() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.service
        .add_payment(id, PaymentMethod::CreditCard, eur(0))
        .await
        .unwrap();

    let err = h.service.initialize_payment(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    let fields: Vec<&str> = err
        .validation_errors()
        .unwrap()
        .iter()
        .map(Invalid::field)
        .collect();
    assert!(fields.contains(&"checkout.customer"));
    assert!(fields.contains(&"checkout.billingAddress"));

    assert_eq!(h.ports.payment_gateway.process_count(), 0);
    let view = h.service.get_basket(id).await.unwrap();
    assert_eq!(view.basket.status(), BasketStatus::Open);
}

#[tokio::test]
async fn test_initialize_requires_full_payment() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;
    h.service.add_item(id, ProductId::new(TEA)).await.unwrap();

    let snapshot = h.service.find_all(id).await.unwrap();
    assert_eq!(snapshot.payment_process.status(), PaymentProcessStatus::Paid);

    let process = h
        .service
        .cancel_payment(id, snapshot.payment_process.payments()[0].id())
        .await
        .unwrap();
    assert_eq!(process.status(), PaymentProcessStatus::ToPay);

    let err = h.service.initialize_payment(id).await.unwrap_err();
    let fields: Vec<&str> = err
        .validation_errors()
        .unwrap()
        .iter()
        .map(Invalid::field)
        .collect();
    assert!(fields.contains(&"paymentProcess.fullyPaid"));
}

#[tokio::test]
async fn test_gateway_failure_leaves_basket_open() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;

    h.ports.payment_gateway.set_fail_on_create(true);
    let err = h.service.initialize_payment(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalFetchFailed);

    let snapshot = h.service.find_all(id).await.unwrap();
    assert_eq!(snapshot.basket.status(), BasketStatus::Open);
    assert!(!snapshot.payment_process.is_initialized());

    h.ports.payment_gateway.set_fail_on_create(false);
    let process = h.service.initialize_payment(id).await.unwrap();
    assert!(process.is_initialized());
}

#[tokio::test]
async fn test_initialize_twice_is_rejected() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;
    h.service.initialize_payment(id).await.unwrap();

    let err = h.service.initialize_payment(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);
    assert_eq!(h.ports.payment_gateway.process_count(), 1);
}

#[tokio::test]
async fn test_cancel_payment_process_reopens_basket() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;
    h.service.initialize_payment(id).await.unwrap();

    let process = h.service.cancel_payment_process(id).await.unwrap();
    assert!(!process.is_initialized());
    assert!(process.is_fully_paid());
    assert!(
        process
            .payments()
            .iter()
            .all(|p| p.status() == PaymentStatus::Selected)
    );

    let view = h.service.add_item(id, ProductId::new(TEA)).await.unwrap();
    assert_eq!(view.basket.status(), BasketStatus::Open);
    assert_eq!(view.basket.items().len(), 2);
}

#[tokio::test]
async fn test_execute_requires_frozen_basket() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;

    let err = h.service.execute_payment(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);
    assert_eq!(h.ports.order.order_count(), 0);
}

#[tokio::test]
async fn test_order_failure_keeps_finalized_basket() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;
    h.service.initialize_payment(id).await.unwrap();

    h.ports.order.set_fail_on_create(true);
    let err = h.service.execute_payment(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalFetchFailed);

    let snapshot = h.service.find_all(id).await.unwrap();
    assert_eq!(snapshot.basket.status(), BasketStatus::Finalized);
    assert!(snapshot.basket.order().is_none());
}

#[tokio::test]
async fn test_unavailable_fulfillment_is_rejected() {
    let h = TestHarness::new();
    h.ports
        .fulfillment
        .set_options("berlin-01", vec![FulfillmentType::Delivery]);
    let id = h.basket_with_coffee().await;

    let options = h.service.available_fulfillment(id).await.unwrap();
    assert_eq!(options, vec![FulfillmentType::Delivery]);

    let err = h
        .service
        .set_fulfillment(id, FulfillmentType::Pickup)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);
    assert!(err.to_string().contains("cannot select PICKUP"));
}

#[tokio::test]
async fn test_canceled_basket_rejects_changes() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;

    let basket = h.service.cancel_basket(id).await.unwrap();
    assert_eq!(basket.status(), BasketStatus::Canceled);

    let err = h
        .service
        .add_item(id, ProductId::new(TEA))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);

    let err = h.service.set_customer(id, customer()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);
}

#[tokio::test]
async fn test_finalized_basket_can_be_canceled() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;
    h.service.initialize_payment(id).await.unwrap();

    let err = h.service.cancel_basket(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalModification);

    h.service.execute_payment(id).await.unwrap();
    let basket = h.service.cancel_basket(id).await.unwrap();
    assert_eq!(basket.status(), BasketStatus::Canceled);
    assert!(basket.order().is_some());
}

#[tokio::test]
async fn test_payment_amount_is_checked() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;

    let err = h
        .service
        .add_payment(id, PaymentMethod::Cash, eur(-100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadParameter);

    let err = h
        .service
        .add_payment(id, PaymentMethod::Cash, Money::from_cents(100, Currency::USD))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadParameter);
}

#[tokio::test]
async fn test_unknown_basket_is_not_found() {
    let h = TestHarness::new();
    let err = h.service.get_basket(BasketId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
}

#[tokio::test]
async fn test_concurrent_adds_are_serialized() {
    let h = TestHarness::new();
    let id = h.basket_with_coffee().await;
    let service = Arc::new(h.service);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.add_item(id, ProductId::new(COFFEE)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let view = service.get_basket(id).await.unwrap();
    assert_eq!(view.basket.items().len(), 5);
    assert_eq!(view.calculation.grand_total(), eur(5 * 1685));
}

#[tokio::test]
async fn test_concurrent_reads_recalculate_once() {
    let TestHarness { service, ports } = TestHarness::new();
    let id = {
        let view = service
            .create_basket(OutletId::new("berlin-01"), None)
            .await
            .unwrap();
        service
            .add_item(view.basket.id(), ProductId::new(COFFEE))
            .await
            .unwrap();
        view.basket.id()
    };

    // A writer outside the service invalidates the calculation without
    // recalculating it.
    {
        let uow = UnitOfWork::new(service.store(), CommitMode::BestEffort);
        let mut metadata: CheckoutMetadata = uow.find(id).await.unwrap();
        assert!(metadata.set_shipping_address(address()));
        uow.save(&mut metadata).await.unwrap();
        uow.commit().await.unwrap();
    }

    let calls = ports.shipping.call_count();
    let service = Arc::new(service);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_basket(id).await })
        })
        .collect();
    for handle in handles {
        let view = handle.await.unwrap().unwrap();
        assert_eq!(view.calculation.grand_total(), eur(1685));
    }

    assert_eq!(ports.shipping.call_count(), calls + 1);
    let snapshot = service.find_all(id).await.unwrap();
    assert!(!snapshot.checkout_metadata.is_outdated());
    assert_eq!(ports.shipping.call_count(), calls + 1);
}

#[tokio::test]
async fn test_lock_map_stays_small() {
    let h = TestHarness::new();
    for _ in 0..20 {
        let id = h.basket_with_coffee().await;
        h.service.get_basket(id).await.unwrap();
    }
    assert!(h.service.locks().len().await <= 1);
}

#[tokio::test]
async fn test_atomic_mode_flow() {
    let h = TestHarness::atomic();
    let id = h.basket_with_coffee().await;
    h.complete_checkout(id).await;
    h.service.initialize_payment(id).await.unwrap();
    let basket = h.service.execute_payment(id).await.unwrap();

    assert!(basket.order().is_some());
    assert_eq!(h.service.store().document_count().await, 4);
}
