//! Checkout configuration loaded from environment variables.

use domain::rules::{DEFAULT_EMAIL_PATTERN, DEFAULT_TAX_ID_PATTERN};
use domain::{BusinessRules, CommitMode, Currency, CustomerRules, RefreshPolicy};

use crate::error::{CheckoutError, Result};

/// Persistence backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// In-process document store; every save is written on its own.
    #[default]
    Memory,
    /// PostgreSQL; each use case commits in one transaction.
    Postgres,
}

impl Backend {
    pub fn commit_mode(&self) -> CommitMode {
        match self {
            Backend::Memory => CommitMode::BestEffort,
            Backend::Postgres => CommitMode::Atomic,
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "postgres" => Ok(Backend::Postgres),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Checkout configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `CHECKOUT_MAX_ITEM_AMOUNT` (default: `100`)
/// - `CHECKOUT_MAX_SAME_ITEM_COUNT` (default: `10`)
/// - `CHECKOUT_PRICE_TTL_SECONDS` (default: `600`)
/// - `CHECKOUT_PRODUCT_TTL_SECONDS` (default: `3600`)
/// - `CHECKOUT_CURRENCY` (default: `EUR`)
/// - `CHECKOUT_EMAIL_REGEX`, `CHECKOUT_TAX_ID_REGEX`
/// - `CHECKOUT_BACKEND`: `memory` or `postgres` (default: `memory`)
/// - `DATABASE_URL`: required for the postgres backend
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub max_item_amount: usize,
    pub max_same_item_count: usize,
    pub price_ttl_seconds: i64,
    pub product_ttl_seconds: i64,
    pub currency: Currency,
    pub email_pattern: String,
    pub tax_id_pattern: String,
    pub backend: Backend,
    pub database_url: Option<String>,
}

impl CheckoutConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let count = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());
        let seconds = |key: &str| lookup(key).and_then(|v| v.trim().parse::<i64>().ok());

        Self {
            max_item_amount: count("CHECKOUT_MAX_ITEM_AMOUNT").unwrap_or(defaults.max_item_amount),
            max_same_item_count: count("CHECKOUT_MAX_SAME_ITEM_COUNT")
                .unwrap_or(defaults.max_same_item_count),
            price_ttl_seconds: seconds("CHECKOUT_PRICE_TTL_SECONDS")
                .unwrap_or(defaults.price_ttl_seconds),
            product_ttl_seconds: seconds("CHECKOUT_PRODUCT_TTL_SECONDS")
                .unwrap_or(defaults.product_ttl_seconds),
            currency: lookup("CHECKOUT_CURRENCY")
                .and_then(|v| v.trim().to_ascii_uppercase().parse().ok())
                .unwrap_or(defaults.currency),
            email_pattern: lookup("CHECKOUT_EMAIL_REGEX").unwrap_or(defaults.email_pattern),
            tax_id_pattern: lookup("CHECKOUT_TAX_ID_REGEX").unwrap_or(defaults.tax_id_pattern),
            backend: lookup("CHECKOUT_BACKEND")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.backend),
            database_url: lookup("DATABASE_URL"),
        }
    }

    pub fn business_rules(&self) -> BusinessRules {
        BusinessRules {
            max_item_amount: self.max_item_amount,
            max_same_item_count: self.max_same_item_count,
        }
    }

    /// Builds the snapshot TTLs. Negative or out-of-range seconds are rejected.
    pub fn refresh_policy(&self) -> Result<RefreshPolicy> {
        RefreshPolicy::new(self.price_ttl_seconds, self.product_ttl_seconds).ok_or_else(|| {
            CheckoutError::Configuration(format!(
                "invalid snapshot TTLs: price {}s, product {}s",
                self.price_ttl_seconds, self.product_ttl_seconds
            ))
        })
    }

    /// Compiles the customer patterns.
    pub fn customer_rules(&self) -> Result<CustomerRules> {
        CustomerRules::new(&self.email_pattern, &self.tax_id_pattern)
            .map_err(|e| CheckoutError::Configuration(format!("invalid customer pattern: {e}")))
    }

    /// Returns the database URL, which the postgres backend requires.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CheckoutError::Configuration("DATABASE_URL is required for the postgres backend".into())
        })
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_item_amount: 100,
            max_same_item_count: 10,
            price_ttl_seconds: 600,
            product_ttl_seconds: 3600,
            currency: Currency::EUR,
            email_pattern: DEFAULT_EMAIL_PATTERN.to_string(),
            tax_id_pattern: DEFAULT_TAX_ID_PATTERN.to_string(),
            backend: Backend::Memory,
            database_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use document_store::InMemoryDocumentStore;

    use super::*;
    use crate::{CheckoutService, InMemoryPorts};

    fn config_from(vars: &[(&str, &str)]) -> CheckoutConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CheckoutConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = config_from(&[]);
        assert_eq!(config.max_item_amount, 100);
        assert_eq!(config.max_same_item_count, 10);
        assert_eq!(config.price_ttl_seconds, 600);
        assert_eq!(config.product_ttl_seconds, 3600);
        assert_eq!(config.currency, Currency::EUR);
        assert_eq!(config.backend, Backend::Memory);
        assert!(config.database_url.is_none());
        assert!(config.customer_rules().is_ok());
        assert_eq!(config.refresh_policy().unwrap(), RefreshPolicy::default());
    }

    #[test]
    fn test_values_from_lookup() {
        let config = config_from(&[
            ("CHECKOUT_MAX_ITEM_AMOUNT", "20"),
            ("CHECKOUT_MAX_SAME_ITEM_COUNT", " 3 "),
            ("CHECKOUT_CURRENCY", "chf"),
            ("CHECKOUT_BACKEND", "Postgres"),
            ("DATABASE_URL", "postgres://localhost/checkout"),
        ]);

        assert_eq!(config.business_rules().max_item_amount, 20);
        assert_eq!(config.business_rules().max_same_item_count, 3);
        assert_eq!(config.currency, Currency::CHF);
        assert_eq!(config.backend.commit_mode(), CommitMode::Atomic);
        assert_eq!(
            config.require_database_url().unwrap(),
            "postgres://localhost/checkout"
        );
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config_from(&[
            ("CHECKOUT_MAX_ITEM_AMOUNT", "lots"),
            ("CHECKOUT_BACKEND", "mongo"),
        ]);
        assert_eq!(config.max_item_amount, 100);
        assert_eq!(config.backend, Backend::Memory);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_invalid_ttl_is_reported() {
        let config = config_from(&[("CHECKOUT_PRICE_TTL_SECONDS", "-5")]);
        let err = config.refresh_policy().unwrap_err();
        assert!(matches!(err, CheckoutError::Configuration(_)));

        let config = config_from(&[(
            "CHECKOUT_PRODUCT_TTL_SECONDS",
            "9223372036854775807",
        )]);
        assert!(config.refresh_policy().is_err());
    }

    #[test]
    fn test_service_rejects_invalid_ttl() {
        let config = config_from(&[("CHECKOUT_PRICE_TTL_SECONDS", "-1")]);
        let result = CheckoutService::new(
            InMemoryDocumentStore::new(),
            InMemoryPorts::new().ports(),
            &config,
        );
        assert!(matches!(result, Err(CheckoutError::Configuration(_))));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = config_from(&[("CHECKOUT_EMAIL_REGEX", "(")]);
        let err = config.customer_rules().unwrap_err();
        assert!(matches!(err, CheckoutError::Configuration(_)));
    }
}
