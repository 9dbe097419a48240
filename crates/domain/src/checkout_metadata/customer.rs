//! Customer data attached to a basket.

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::rules::CustomerRules;
use crate::validation::{Invalid, invalid_if_blank, invalid_unless_match, path};

/// Whether an identified customer buys as a consumer or as a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusinessType {
    #[default]
    B2C,
    B2B,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerName {
    pub first_name: String,
    pub last_name: String,
}

/// Data of a logged-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentifiedCustomer {
    #[serde(default)]
    pub business_type: BusinessType,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_tax_id: String,
    #[serde(default)]
    pub customer_tax_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: CustomerName,
}

/// The buyer of a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Customer {
    Identified(IdentifiedCustomer),
    Session { session_id: SessionId },
}

impl Customer {
    pub fn session(session_id: impl Into<SessionId>) -> Self {
        Customer::Session {
            session_id: session_id.into(),
        }
    }

    pub fn validate(&self, parent: &str, rules: &CustomerRules) -> Vec<Invalid> {
        let node = path(parent, "customer");
        match self {
            Customer::Identified(customer) => customer.validate(&node, rules),
            Customer::Session { .. } => Vec::new(),
        }
    }
}

impl IdentifiedCustomer {
    fn validate(&self, node: &str, rules: &CustomerRules) -> Vec<Invalid> {
        let checks = match self.business_type {
            BusinessType::B2B => vec![
                invalid_if_blank(node, "companyName", &self.company_name),
                invalid_unless_match(node, "companyTaxId", &self.company_tax_id, &rules.tax_id),
            ],
            BusinessType::B2C => {
                let name = path(node, "name");
                let mut checks = vec![
                    invalid_if_blank(&name, "firstName", &self.name.first_name),
                    invalid_if_blank(&name, "lastName", &self.name.last_name),
                    invalid_unless_match(node, "email", &self.email, &rules.email),
                ];
                if !self.customer_tax_id.trim().is_empty() {
                    checks.push(invalid_unless_match(
                        node,
                        "customerTaxId",
                        &self.customer_tax_id,
                        &rules.tax_id,
                    ));
                }
                checks
            }
        };
        checks.into_iter().flatten().collect()
    }
}
