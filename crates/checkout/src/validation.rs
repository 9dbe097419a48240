//! Consistency checks run before a basket is frozen for payment.

use chrono::Utc;
use document_store::DocumentStore;
use domain::{
    Aggregate, Basket, BasketCalculation, CheckoutMetadata, CustomerRules, Invalid,
    PaymentProcess, Repository, UnitOfWork, ValidationErrors,
};

use crate::error::Result;
use crate::refresh::StalenessProtocol;

/// Validates a basket and everything derived from it.
///
/// Validation recalculates the basket and compares the stored calculation
/// with the fresh one. Differences are reported, but the corrected values are
/// saved through the unit of work regardless of the outcome.
#[derive(Clone)]
pub struct ValidationService {
    protocol: StalenessProtocol,
    customer_rules: CustomerRules,
}

impl ValidationService {
    pub fn new(protocol: StalenessProtocol, customer_rules: CustomerRules) -> Self {
        Self {
            protocol,
            customer_rules,
        }
    }

    /// Validates the basket, resolving stale snapshots once.
    ///
    /// When the only obstacle is a stale price or product snapshot, the
    /// snapshots are refreshed, the basket is recalculated and the checks run
    /// again. Anything still invalid after that is returned as
    /// `ValidationFailed`.
    #[tracing::instrument(skip_all, fields(basket_id = %basket.id()))]
    pub async fn validate<S: DocumentStore>(
        &self,
        uow: &UnitOfWork<'_, S>,
        basket: &mut Basket,
    ) -> Result<()> {
        let mut errors = self.collect(uow, basket).await?;

        if errors.requires_refresh() {
            tracing::info!("Refreshing stale snapshots before validating again");
            let refreshed = self.protocol.refresh_stale_items(basket).await?;
            let mut metadata: CheckoutMetadata = uow.find(basket.id()).await?;
            self.protocol
                .recalculate(uow, basket, &mut metadata, refreshed)
                .await?;
            errors = self.collect(uow, basket).await?;
        }

        if !errors.is_empty() {
            metrics::counter!("checkout_validation_failures_total").increment(1);
            tracing::warn!(invalids = errors.len(), "Basket validation failed");
        }
        Ok(errors.into_result()?)
    }

    async fn collect<S: DocumentStore>(
        &self,
        uow: &UnitOfWork<'_, S>,
        basket: &mut Basket,
    ) -> Result<ValidationErrors> {
        let id = basket.id();
        let mut errors = ValidationErrors::default();

        errors.extend(basket.validate(self.protocol.policy(), Utc::now()));

        let before: BasketCalculation = uow.find(id).await?;
        let mut metadata: CheckoutMetadata = uow.find(id).await?;
        let after = self
            .protocol
            .recalculate(uow, basket, &mut metadata, false)
            .await?;
        errors.extend(compare_calculations(&before, &after));
        errors.extend(after.validate());

        errors.extend(metadata.validate(&self.customer_rules));

        let payment_process: PaymentProcess = uow.find(id).await?;
        errors.extend(payment_process.validate());

        Ok(errors)
    }
}

fn compare_calculations(before: &BasketCalculation, after: &BasketCalculation) -> Vec<Invalid> {
    if before.same_totals(after) {
        return Vec::new();
    }

    let mut invalids = vec![Invalid::generic(
        "basket.calculationResult",
        "calculation resulted in update",
    )];
    if before.grand_total() != after.grand_total() {
        invalids.push(Invalid::generic(
            "basketCalculation.grandTotal",
            "total is incorrect",
        ));
    }
    if before.net_total() != after.net_total() {
        invalids.push(Invalid::generic(
            "basketCalculation.netTotal",
            "net total is incorrect",
        ));
    }
    if before.shipping_cost_total() != after.shipping_cost_total() {
        invalids.push(Invalid::generic(
            "basketCalculation.shippingCostTotal",
            "shipping cost is incorrect",
        ));
    }
    if before.vat_amounts() != after.vat_amounts() {
        invalids.push(Invalid::generic(
            "basketCalculation.vatAmounts",
            "vat amounts are incorrect",
        ));
    }
    invalids
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use document_store::InMemoryDocumentStore;
    use domain::{
        Address, BasketId, CommitMode, Currency, Customer, CustomerName, IdentifiedCustomer,
        Money, OutletId, Payment, PaymentMethod, RefreshPolicy, Vat,
    };
    use rust_decimal::Decimal;

    use super::*;
    use crate::ports::InMemoryPorts;

    fn eur(cents: i64) -> Money {
        Money::from_cents(cents, Currency::EUR)
    }

    fn address() -> Address {
        Address {
            country: "DE".to_string(),
            city: "Berlin".to_string(),
            zip_code: "10115".to_string(),
            street: "Invalidenstr.".to_string(),
            house_number: "1".to_string(),
        }
    }

    fn customer() -> Customer {
        Customer::Identified(IdentifiedCustomer {
            email: "jane@example.com".to_string(),
            name: CustomerName {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
            },
            ..Default::default()
        })
    }

    fn service(ports: &InMemoryPorts) -> ValidationService {
        let protocol = StalenessProtocol::new(ports.ports(), RefreshPolicy::default());
        ValidationService::new(protocol, CustomerRules::standard().unwrap())
    }

    fn seeded_ports() -> InMemoryPorts {
        let ports = InMemoryPorts::new();
        ports
            .product
            .set_product("SKU-1", "Coffee", Vat::new("A", Decimal::new(19, 0)));
        ports.price.set_price("SKU-1", eur(1190));
        ports
    }

    async fn basket_with_item(
        uow: &UnitOfWork<'_, InMemoryDocumentStore>,
        ports: &InMemoryPorts,
    ) -> Basket {
        let protocol = StalenessProtocol::new(ports.ports(), RefreshPolicy::default());
        let mut basket = Basket::new(BasketId::new(), OutletId::new("berlin-01"), Currency::EUR);
        let product = ports.ports().product.fetch_product(&"SKU-1".into()).await.unwrap();
        let price = ports
            .ports()
            .price
            .fetch_price(basket.outlet_id(), &"SKU-1".into())
            .await
            .unwrap();
        basket
            .add_item(product, price, &domain::BusinessRules::default())
            .unwrap();
        protocol.ensure_current(uow, &mut basket, true).await.unwrap();
        basket
    }

    async fn complete_checkout(uow: &UnitOfWork<'_, InMemoryDocumentStore>, basket: &Basket) {
        let mut metadata: CheckoutMetadata = uow.find(basket.id()).await.unwrap();
        metadata.set_customer(customer());
        metadata.set_shipping_address(address());
        metadata.set_billing_address(address());
        uow.save(&mut metadata).await.unwrap();

        let calculation: BasketCalculation = uow.find(basket.id()).await.unwrap();
        let mut process: PaymentProcess = uow.find(basket.id()).await.unwrap();
        process
            .add_payment(
                calculation.grand_total(),
                Payment::new(PaymentMethod::CreditCard, eur(0)),
            )
            .unwrap();
        uow.save(&mut process).await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_basket_is_valid() {
        let store = InMemoryDocumentStore::new();
        let uow = UnitOfWork::new(&store, CommitMode::BestEffort);
        let ports = seeded_ports();
        let mut basket = basket_with_item(&uow, &ports).await;
        complete_checkout(&uow, &basket).await;

        service(&ports).validate(&uow, &mut basket).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_checkout_data_is_reported() {
        let store = InMemoryDocumentStore::new();
        let uow = UnitOfWork::new(&store, CommitMode::BestEffort);
        let ports = seeded_ports();
        let mut basket = basket_with_item(&uow, &ports).await;

        let err = service(&ports)
            .validate(&uow, &mut basket)
            .await
            .unwrap_err();
        let fields: Vec<&str> = err
            .validation_errors()
            .unwrap()
            .iter()
            .map(Invalid::field)
            .collect();

        assert!(fields.contains(&"checkout.customer"));
        assert!(fields.contains(&"checkout.shippingAddress"));
        assert!(fields.contains(&"paymentProcess.payments"));
    }

    #[tokio::test]
    async fn test_changed_shipping_is_reported_and_persisted() {
        let store = InMemoryDocumentStore::new();
        let uow = UnitOfWork::new(&store, CommitMode::BestEffort);
        let ports = seeded_ports();
        let mut basket = basket_with_item(&uow, &ports).await;
        complete_checkout(&uow, &basket).await;

        ports.shipping.set_cost("SKU-1", eur(495));
        let err = service(&ports)
            .validate(&uow, &mut basket)
            .await
            .unwrap_err();
        let fields: Vec<&str> = err
            .validation_errors()
            .unwrap()
            .iter()
            .map(Invalid::field)
            .collect();
        assert!(fields.contains(&"basket.calculationResult"));
        assert!(fields.contains(&"basketCalculation.shippingCostTotal"));

        let calculation: BasketCalculation = uow.find(basket.id()).await.unwrap();
        assert_eq!(calculation.grand_total(), eur(1685));

        service(&ports).validate(&uow, &mut basket).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_snapshots_are_refreshed_once() {
        let store = InMemoryDocumentStore::new();
        let uow = UnitOfWork::new(&store, CommitMode::BestEffort);
        let ports = seeded_ports();
        ports
            .price
            .set_fetched_at(Some(Utc::now() - Duration::hours(3)));
        let mut basket = basket_with_item(&uow, &ports).await;
        complete_checkout(&uow, &basket).await;

        ports.price.set_fetched_at(None);
        let fetches = ports.price.fetch_count();
        service(&ports).validate(&uow, &mut basket).await.unwrap();

        assert_eq!(ports.price.fetch_count(), fetches + 1);
        assert!(!basket.requires_price_refresh(&RefreshPolicy::default(), Utc::now()));
    }
}
