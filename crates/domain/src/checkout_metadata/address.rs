use serde::{Deserialize, Serialize};

use crate::validation::{Invalid, invalid_if_blank, path};

/// A postal address used for shipping or billing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub city: String,
    pub zip_code: String,
    pub street: String,
    pub house_number: String,
}

impl Address {
    pub fn validate(&self, parent: &str, field: &str) -> Vec<Invalid> {
        let node = path(parent, field);
        [
            invalid_if_blank(&node, "country", &self.country),
            invalid_if_blank(&node, "city", &self.city),
            invalid_if_blank(&node, "zipCode", &self.zip_code),
            invalid_if_blank(&node, "street", &self.street),
            invalid_if_blank(&node, "houseNumber", &self.house_number),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
