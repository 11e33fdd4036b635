//! Typed event bus between the monitor and the push hub
//!
//! Backed by a `tokio::sync::broadcast` channel. Listeners attached to the
//! same sender observe a wallet's events in emission order; nothing is
//! guaranteed across wallets.

use crate::models::{DailyPnl, Trade};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Events emitted by the monitor pipeline
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A trade was classified and persisted
    Trade { wallet: String, trade: Trade },
    /// Fresh balance readout for a wallet that produced activity
    Balance { wallet: String, update: BalanceUpdate },
    /// The wallet's daily PnL row changed
    Pnl { wallet: String, pnl: DailyPnl },
}

impl MonitorEvent {
    /// Wallet the event belongs to
    pub fn wallet(&self) -> &str {
        match self {
            MonitorEvent::Trade { wallet, .. } => wallet,
            MonitorEvent::Balance { wallet, .. } => wallet,
            MonitorEvent::Pnl { wallet, .. } => wallet,
        }
    }
}

/// Balance snapshot carried by [`MonitorEvent::Balance`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdate {
    pub sol_balance: f64,
    pub tokens: Vec<TokenHolding>,
    pub timestamp: DateTime<Utc>,
}

/// One token account balance inside a [`BalanceUpdate`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub mint: String,
    pub ui_amount: f64,
}

/// Shared sender half of the event bus
pub type EventBus = broadcast::Sender<MonitorEvent>;

/// Create the event bus with the given buffer capacity
pub fn event_bus(capacity: usize) -> EventBus {
    broadcast::channel(capacity).0
}
