//! Daily PnL model - one row per (wallet, reference-offset day)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Per-wallet per-day realized PnL record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyPnl {
    pub id: i64,
    pub user_id: Option<i64>,
    pub wallet_address: String,
    /// Day key: `clock::day_start` of the day the row covers
    pub date: DateTime<Utc>,
    /// SOL balance at first touch, seeded from the prior day's end balance
    pub start_balance: Decimal,
    /// SOL balance after the most recent swap of the day
    pub end_balance: Option<Decimal>,
    /// Algebraic sum of trade PnL over the day's swaps, scale 6
    pub realized_pnl: Decimal,
    /// Count of buys and sells; transfers are not counted
    pub total_trades: i32,
    pub last_trade_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a fresh daily row
#[derive(Debug, Clone)]
pub struct NewDailyPnl {
    pub user_id: Option<i64>,
    pub wallet_address: String,
    pub date: DateTime<Utc>,
    pub start_balance: Decimal,
    pub end_balance: Decimal,
}

/// Mutable fields written on each applied swap
#[derive(Debug, Clone)]
pub struct PnlUpdate {
    pub end_balance: Decimal,
    pub realized_pnl: Decimal,
    pub total_trades: i32,
    pub last_trade_id: Option<i64>,
}
