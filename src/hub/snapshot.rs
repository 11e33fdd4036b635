//! Denormalized per-wallet snapshots
//!
//! The view the dashboard renders per trader: the user record, the latest
//! trade with token metadata resolved for both legs, today's PnL row, and
//! the current balance.

use crate::clock::{day_start, Clock};
use crate::error::AppResult;
use crate::models::{DailyPnl, TokenMeta, Trade, User};
use crate::store::Store;
use crate::token::TokenRegistry;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Snapshot delivered in `USERS_LIST` and `USERS_UPDATE` frames
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub user: User,
    pub last_trade: Option<TradeView>,
    pub daily_pnl: Option<DailyPnl>,
    /// Today's end balance, 0 when the wallet has no row yet
    pub balance: f64,
}

/// A trade with token metadata resolved for both legs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeView {
    #[serde(flatten)]
    pub trade: Trade,
    pub token_a_meta: Option<TokenMeta>,
    pub token_b_meta: Option<TokenMeta>,
}

/// Assemble the snapshot for one user
pub async fn build_snapshot(
    store: &Arc<dyn Store>,
    registry: &Arc<TokenRegistry>,
    clock: &Arc<dyn Clock>,
    user: User,
) -> AppResult<Snapshot> {
    let wallet = user.wallet_address.clone();

    let last_trade = store.latest_trade(&wallet).await?;
    let daily_pnl = store.get_daily_pnl(&wallet, day_start(clock.now())).await?;

    let last_trade = match last_trade {
        Some(trade) => {
            let token_a_meta = resolve(registry, &trade.token_a).await;
            let token_b_meta = resolve(registry, &trade.token_b).await;
            Some(TradeView {
                trade,
                token_a_meta,
                token_b_meta,
            })
        }
        None => None,
    };

    let balance = daily_pnl
        .as_ref()
        .and_then(|p| p.end_balance)
        .and_then(|b| b.to_f64())
        .unwrap_or(0.0);

    Ok(Snapshot {
        user,
        last_trade,
        daily_pnl,
        balance,
    })
}

async fn resolve(registry: &Arc<TokenRegistry>, mint: &str) -> Option<TokenMeta> {
    match registry.get(mint).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(mint = mint, error = %e, "Token metadata lookup failed");
            None
        }
    }
}
