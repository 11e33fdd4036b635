//! Token metadata model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Metadata for a token mint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TokenMeta {
    #[serde(skip_serializing)]
    pub id: i64,
    /// Mint address, unique
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: Option<i32>,
    pub verified: bool,
    pub last_price: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub metadata: Option<Value>,
}

impl TokenMeta {
    /// Short display symbol for a mint with no known metadata:
    /// first three and last three characters of the address.
    pub fn fallback_symbol(mint: &str) -> String {
        if mint.len() <= 6 {
            return mint.to_string();
        }
        format!("{}...{}", &mint[..3], &mint[mint.len() - 3..])
    }
}
