//! Trade models - one row per classified on-chain event

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a wallet's transaction
///
/// Buys and sells are swaps against SOL; deposits and withdrawals are plain
/// token transfers with no SOL leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    /// Token balance up, SOL balance down
    Buy,
    /// Token balance down, SOL balance up
    Sell,
    /// Token balance up, no SOL leg
    Deposit,
    /// Token balance down, no SOL leg
    Withdrawal,
}

impl TradeType {
    /// Buys and sells move the daily PnL; transfers do not
    pub fn is_swap(&self) -> bool {
        matches!(self, TradeType::Buy | TradeType::Sell)
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
            TradeType::Deposit => write!(f, "deposit"),
            TradeType::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

impl std::str::FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            "deposit" => Ok(TradeType::Deposit),
            "withdrawal" => Ok(TradeType::Withdrawal),
            _ => Err(format!("Unknown trade type: {}", s)),
        }
    }
}

/// Persisted trade row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Database ID
    pub id: i64,
    /// On-chain transaction signature (idempotency key)
    pub signature: String,
    /// Owning user, if the wallet is registered
    pub user_id: Option<i64>,
    /// Wallet the trade belongs to
    pub wallet_address: String,
    /// Traded token mint
    pub token_a: String,
    /// Counter leg: wrapped SOL for swaps, `token_a` for transfers
    pub token_b: String,
    /// Classification
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub trade_type: String,
    /// Token amount, scale 9
    pub amount_a: Decimal,
    /// SOL amount for swaps, token amount for transfers, scale 9
    pub amount_b: Decimal,
    /// Signed realized PnL in SOL, scale 6; zero for transfers
    pub trade_pnl: Decimal,
    /// Venue tag; "unknown" for swaps, "transfer" for transfers
    pub platform: String,
    /// Fee charged to the wallet when it paid the transaction fee
    pub tx_fees: Option<Decimal>,
    /// Raw parsed transaction kept for audit
    #[serde(skip_serializing)]
    pub raw_data: Option<Value>,
    /// Block time
    pub timestamp: DateTime<Utc>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Classification as a typed enum; rows only ever hold the four values
    pub fn kind(&self) -> Option<TradeType> {
        self.trade_type.parse().ok()
    }
}

/// Trade fields as produced by the classifier, before persistence
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub signature: String,
    pub user_id: Option<i64>,
    pub wallet_address: String,
    pub token_a: String,
    pub token_b: String,
    pub trade_type: TradeType,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
    pub trade_pnl: Decimal,
    pub platform: String,
    pub tx_fees: Option<Decimal>,
    pub raw_data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Convert an f64 amount into a fixed-scale decimal for persistence
///
/// Rounds away the float noise past `scale` digits and strips trailing
/// zeros so serialized amounts read as "0.1", not "0.100000000".
pub fn decimal_from_f64(value: f64, scale: u32) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(scale)
        .normalize()
}
