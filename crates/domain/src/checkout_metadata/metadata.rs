use common::BasketId;
use document_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::rules::CustomerRules;
use crate::validation::Invalid;

use super::{Address, Customer};

const PATH: &str = "checkout";

/// How the goods reach the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentType {
    #[default]
    Delivery,
    Pickup,
}

impl FulfillmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentType::Delivery => "DELIVERY",
            FulfillmentType::Pickup => "PICKUP",
        }
    }
}

impl std::fmt::Display for FulfillmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Customer, address and fulfillment data of a basket.
///
/// `outdated` is raised whenever a change affects shipping costs and cleared
/// once the basket has been recalculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    basket_id: BasketId,

    #[serde(skip)]
    version: Version,

    fulfillment: FulfillmentType,
    customer: Option<Customer>,
    shipping_address: Option<Address>,
    billing_address: Option<Address>,
    outdated: bool,
}

impl Aggregate for CheckoutMetadata {
    fn aggregate_type() -> &'static str {
        "checkout_metadata"
    }

    fn id(&self) -> BasketId {
        self.basket_id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn default_for(id: BasketId) -> Option<Self> {
        Some(Self::new(id))
    }
}

impl CheckoutMetadata {
    pub fn new(basket_id: BasketId) -> Self {
        Self {
            basket_id,
            version: Version::initial(),
            fulfillment: FulfillmentType::default(),
            customer: None,
            shipping_address: None,
            billing_address: None,
            outdated: false,
        }
    }

    pub fn basket_id(&self) -> BasketId {
        self.basket_id
    }

    pub fn fulfillment(&self) -> FulfillmentType {
        self.fulfillment
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    pub fn billing_address(&self) -> Option<&Address> {
        self.billing_address.as_ref()
    }

    pub fn is_outdated(&self) -> bool {
        self.outdated
    }

    /// Returns true if the fulfillment type changed.
    pub fn set_fulfillment(&mut self, fulfillment: FulfillmentType) -> bool {
        if self.fulfillment == fulfillment {
            return false;
        }
        self.fulfillment = fulfillment;
        self.outdated = true;
        true
    }

    /// Returns true if the shipping address changed.
    pub fn set_shipping_address(&mut self, address: Address) -> bool {
        if self.shipping_address.as_ref() == Some(&address) {
            return false;
        }
        self.shipping_address = Some(address);
        self.outdated = true;
        true
    }

    pub fn set_billing_address(&mut self, address: Address) {
        self.billing_address = Some(address);
    }

    pub fn set_customer(&mut self, customer: Customer) {
        self.customer = Some(customer);
    }

    pub fn reset_outdated(&mut self) {
        self.outdated = false;
    }

    /// Checks that everything needed to complete the checkout is present.
    ///
    /// Pickup orders need neither customer nor addresses.
    pub fn validate(&self, rules: &CustomerRules) -> Vec<Invalid> {
        if self.fulfillment == FulfillmentType::Pickup {
            return Vec::new();
        }

        let mut invalids = Vec::new();
        match &self.customer {
            Some(customer) => invalids.extend(customer.validate(PATH, rules)),
            None => invalids.push(Invalid::null("checkout.customer")),
        }
        match &self.shipping_address {
            Some(address) => invalids.extend(address.validate(PATH, "shippingAddress")),
            None => invalids.push(Invalid::null("checkout.shippingAddress")),
        }
        match &self.billing_address {
            Some(address) => invalids.extend(address.validate(PATH, "billingAddress")),
            None => invalids.push(Invalid::null("checkout.billingAddress")),
        }
        invalids
    }
}
