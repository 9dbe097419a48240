//! Business rules and policies the aggregates are checked against.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// Default pattern for customer email addresses.
pub const DEFAULT_EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Default pattern for company and customer tax ids (EU VAT id shape).
pub const DEFAULT_TAX_ID_PATTERN: &str = r"^[A-Z]{2}[0-9A-Z]{2,13}$";

/// Item limits of a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessRules {
    /// Maximum number of items in a basket.
    pub max_item_amount: usize,
    /// Maximum number of items sharing one product.
    pub max_same_item_count: usize,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_item_amount: 100,
            max_same_item_count: 10,
        }
    }
}

/// How long cached price and product snapshots stay fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub price_ttl: Duration,
    pub product_ttl: Duration,
}

impl RefreshPolicy {
    /// Builds a policy from TTLs in seconds.
    ///
    /// Returns None if a TTL is negative or does not fit a `Duration`.
    pub fn new(price_ttl_seconds: i64, product_ttl_seconds: i64) -> Option<Self> {
        Some(Self {
            price_ttl: ttl(price_ttl_seconds)?,
            product_ttl: ttl(product_ttl_seconds)?,
        })
    }

    pub fn is_price_stale(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - updated_at > self.price_ttl
    }

    pub fn is_product_stale(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - updated_at > self.product_ttl
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            price_ttl: Duration::minutes(10),
            product_ttl: Duration::hours(1),
        }
    }
}

fn ttl(seconds: i64) -> Option<Duration> {
    if seconds < 0 {
        return None;
    }
    Duration::try_seconds(seconds)
}

/// Patterns identified customers are validated against.
#[derive(Debug, Clone)]
pub struct CustomerRules {
    pub email: Regex,
    pub tax_id: Regex,
}

impl CustomerRules {
    pub fn new(email_pattern: &str, tax_id_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(email_pattern)?,
            tax_id: Regex::new(tax_id_pattern)?,
        })
    }

    /// Rules built from the default patterns.
    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_EMAIL_PATTERN, DEFAULT_TAX_ID_PATTERN)
    }
}
