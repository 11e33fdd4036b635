//! User model - identity for a tracked trader

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered trader whose wallet is tracked when `is_live` is set
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// Display name shown on the dashboard
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Base58 wallet address, unique per user
    pub wallet_address: String,
    pub stream_platform: Option<String>,
    pub stream_url: Option<String>,
    pub avatar_url: Option<String>,
    /// Membership in the monitored set
    pub is_live: bool,
    /// Updated whenever a trade is recorded for the wallet
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
