//! Runtime configuration.
//!
//! Everything is read from the environment with a default per key; a malformed
//! value is logged and replaced by the default rather than failing startup.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use stockledger_core::{DomainResult, Quantity, Sku};

pub const ENV_SKU_PREFIX: &str = "STOCKLEDGER_SKU_PREFIX";
pub const ENV_SKU_START: &str = "STOCKLEDGER_SKU_START";
pub const ENV_SKU_WIDTH: &str = "STOCKLEDGER_SKU_WIDTH";
pub const ENV_DEFAULT_MIN_STOCK: &str = "STOCKLEDGER_DEFAULT_MIN_STOCK";
pub const ENV_COMMIT_ATTEMPTS: &str = "STOCKLEDGER_COMMIT_ATTEMPTS";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Shape of system-allocated SKUs: `{prefix}{number:0width}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuFormat {
    pub prefix: String,
    pub start: u64,
    pub width: usize,
}

impl Default for SkuFormat {
    fn default() -> Self {
        Self {
            prefix: "P-".to_string(),
            start: 1001,
            width: 5,
        }
    }
}

impl SkuFormat {
    /// SKU for the `offset`-th allocation (0 → `start`).
    pub fn sku_for(&self, offset: u64) -> DomainResult<Sku> {
        let number = self.start.saturating_add(offset);
        Sku::parse(format!("{}{:0width$}", self.prefix, number, width = self.width))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub sku_format: SkuFormat,
    /// Reorder threshold applied when an item is created without one.
    pub default_min_stock: Quantity,
    /// Plan/commit rounds before a movement gives up on concurrent writers.
    pub commit_attempts: u32,
    /// PostgreSQL connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            sku_format: SkuFormat::default(),
            default_min_stock: Quantity::from(5),
            commit_attempts: 3,
            database_url: None,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let prefix = lookup(ENV_SKU_PREFIX).unwrap_or(defaults.sku_format.prefix);
        let start = parse_or(&lookup, ENV_SKU_START, defaults.sku_format.start);
        let width = parse_or(&lookup, ENV_SKU_WIDTH, defaults.sku_format.width);

        let mut default_min_stock =
            parse_or(&lookup, ENV_DEFAULT_MIN_STOCK, defaults.default_min_stock);
        if default_min_stock.is_negative() {
            warn!(
                key = ENV_DEFAULT_MIN_STOCK,
                value = %default_min_stock,
                "negative threshold, using default"
            );
            default_min_stock = defaults.default_min_stock;
        }

        let mut commit_attempts = parse_or(&lookup, ENV_COMMIT_ATTEMPTS, defaults.commit_attempts);
        if commit_attempts == 0 {
            warn!(key = ENV_COMMIT_ATTEMPTS, "zero attempts, using default");
            commit_attempts = defaults.commit_attempts;
        }

        let database_url = lookup(ENV_DATABASE_URL).filter(|url| !url.trim().is_empty());

        Self {
            sku_format: SkuFormat {
                prefix,
                start,
                width,
            },
            default_min_stock,
            commit_attempts,
            database_url,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    key,
                    value = %raw,
                    error = %e,
                    "malformed configuration value, using default"
                );
                default
            }
        },
    }
}
