//! wallet-pulse library
//!
//! Real-time wallet activity tracker for Solana: polls a curated roster of
//! wallets, classifies their transactions, keeps per-wallet daily realized
//! PnL, and pushes denormalized snapshots to WebSocket subscribers.

pub mod chain;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod events;
pub mod hub;
pub mod models;
pub mod monitor;
pub mod pnl;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use chain::{ChainClient, RpcChainClient};
pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use db::DbPool;
pub use error::{AppError, AppResult};
pub use events::{event_bus, EventBus, MonitorEvent};
pub use hub::Hub;
pub use models::{DailyPnl, NewTrade, TokenMeta, Trade, TradeType, User};
pub use monitor::Monitor;
pub use pnl::DailyPnlTracker;
pub use store::{PgStore, Store};
pub use token::TokenRegistry;
