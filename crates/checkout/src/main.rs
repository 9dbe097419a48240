//! Demo entry point: runs one basket from creation to order.

use checkout::{
    Backend, CheckoutConfig, CheckoutDataInput, CheckoutError, CheckoutService, InMemoryPorts,
    PaymentInput,
};
use document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
use domain::{
    Address, Aggregate, Customer, CustomerName, FulfillmentType, IdentifiedCustomer, Money,
    OutletId, PaymentMethod, ProductId, Vat,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn seed_ports(config: &CheckoutConfig) -> InMemoryPorts {
    let money = |cents| Money::from_cents(cents, config.currency);
    let ports = InMemoryPorts::new();

    ports
        .product
        .set_product("SKU-COFFEE", "Coffee beans 1kg", Vat::new("A", Decimal::new(19, 0)));
    ports
        .product
        .set_product("SKU-TEA", "Green tea 100g", Vat::new("B", Decimal::new(7, 0)));
    ports.price.set_price("SKU-COFFEE", money(1990));
    ports.price.set_price("SKU-TEA", money(749));
    ports.shipping.set_cost("SKU-COFFEE", money(495));

    ports
}

fn demo_address() -> Address {
    Address {
        country: "DE".to_string(),
        city: "Berlin".to_string(),
        zip_code: "10115".to_string(),
        street: "Invalidenstraße".to_string(),
        house_number: "117".to_string(),
    }
}

async fn run_demo<S: DocumentStore>(store: S, config: &CheckoutConfig) -> checkout::Result<()> {
    let ports = seed_ports(config);
    let service = CheckoutService::new(store, ports.ports(), config)?;

    let customer = Customer::Identified(IdentifiedCustomer {
        email: "jane.doe@example.com".to_string(),
        name: CustomerName {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        },
        ..Default::default()
    });

    let view = service
        .create_basket(OutletId::new("berlin-01"), Some(customer))
        .await?;
    let id = view.basket.id();

    service.add_item(id, ProductId::new("SKU-COFFEE")).await?;
    service.add_item(id, ProductId::new("SKU-TEA")).await?;
    service
        .set_item_quantity(id, ProductId::new("SKU-TEA"), 3)
        .await?;

    let snapshot = service
        .set_checkout_data(
            id,
            CheckoutDataInput {
                fulfillment: Some(FulfillmentType::Delivery),
                shipping_address: Some(demo_address()),
                billing_address: Some(demo_address()),
                payment: Some(PaymentInput {
                    method: PaymentMethod::GiftCard,
                    amount_selected: Money::from_cents(1000, config.currency),
                }),
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(
        grand_total = %snapshot.calculation.grand_total(),
        to_pay = %snapshot.payment_process.amount_to_pay(),
        "Checkout data set"
    );

    service
        .add_payment(id, PaymentMethod::CreditCard, Money::zero(config.currency))
        .await?;
    service.initialize_payment(id).await?;
    let basket = service.execute_payment(id).await?;

    let snapshot = service.find_all(id).await?;
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| CheckoutError::Configuration(format!("cannot render snapshot: {e}")))?;
    tracing::info!(basket_id = %id, order = ?basket.order(), "Checkout completed");
    println!("{json}");

    Ok(())
}

#[tokio::main]
async fn main() -> checkout::Result<()> {
    // 1. Initialize tracing
    init_tracing();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| CheckoutError::Configuration(format!("cannot install metrics recorder: {e}")))?;

    // 3. Load configuration and pick the backend
    let config = CheckoutConfig::from_env();
    tracing::info!(backend = ?config.backend, currency = %config.currency, "starting checkout demo");

    match config.backend {
        Backend::Memory => run_demo(InMemoryDocumentStore::new(), &config).await?,
        Backend::Postgres => {
            let store = PostgresDocumentStore::connect(config.require_database_url()?).await?;
            store.run_migrations().await?;
            run_demo(store, &config).await?;
        }
    }

    tracing::debug!(metrics = %metrics_handle.render(), "metrics snapshot");
    Ok(())
}
