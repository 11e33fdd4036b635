//! Daily PnL aggregation
//!
//! Owns the per-wallet per-day PnL row. The first touch of a wallet each day
//! seeds a fresh row from the prior day's end balance; each subsequent swap
//! folds its PnL into the row. Cache and database are updated inside one
//! critical section so readers never observe a half-applied trade.

use crate::clock::{day_start, Clock};
use crate::error::AppResult;
use crate::events::{EventBus, MonitorEvent};
use crate::models::trade::decimal_from_f64;
use crate::models::{DailyPnl, NewDailyPnl, PnlUpdate};
use crate::store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Scale for balances (matches `numeric(20,9)`)
const BALANCE_SCALE: u32 = 9;
/// Scale for realized PnL (matches `numeric(20,6)`)
const PNL_SCALE: u32 = 6;

/// Per-wallet daily PnL aggregator
pub struct DailyPnlTracker {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    cache: Mutex<HashMap<String, DailyPnl>>,
}

impl DailyPnlTracker {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            store,
            clock,
            events,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Make sure today's row exists for the wallet and return it
    ///
    /// Seeds `start_balance` from the previous day's `end_balance` when one
    /// exists, otherwise from `current_balance`.
    pub async fn ensure_today(
        &self,
        wallet: &str,
        user_id: Option<i64>,
        current_balance: f64,
    ) -> AppResult<DailyPnl> {
        let today = day_start(self.clock.now());
        let mut cache = self.cache.lock().await;
        self.ensure_row(&mut cache, wallet, user_id, current_balance, today)
            .await
    }

    /// Fold one swap into today's row and emit the updated snapshot
    pub async fn apply_trade(
        &self,
        wallet: &str,
        user_id: Option<i64>,
        current_balance: f64,
        trade_pnl: f64,
        last_trade_id: Option<i64>,
    ) -> AppResult<DailyPnl> {
        let today = day_start(self.clock.now());
        let mut cache = self.cache.lock().await;

        let mut row = self
            .ensure_row(&mut cache, wallet, user_id, current_balance, today)
            .await?;

        if trade_pnl != 0.0 {
            row.total_trades += 1;
        }
        row.end_balance = Some(decimal_from_f64(current_balance, BALANCE_SCALE));
        row.realized_pnl = (row.realized_pnl + decimal_from_f64(trade_pnl, PNL_SCALE))
            .round_dp(PNL_SCALE);
        if last_trade_id.is_some() {
            row.last_trade_id = last_trade_id;
        }

        let update = PnlUpdate {
            end_balance: row.end_balance.unwrap_or_default(),
            realized_pnl: row.realized_pnl,
            total_trades: row.total_trades,
            last_trade_id: row.last_trade_id,
        };
        self.store.update_daily_pnl(wallet, today, &update).await?;
        row.updated_at = self.clock.now();

        cache.insert(wallet.to_string(), row.clone());

        debug!(
            wallet = wallet,
            realized_pnl = %row.realized_pnl,
            total_trades = row.total_trades,
            "Daily PnL updated"
        );

        let _ = self.events.send(MonitorEvent::Pnl {
            wallet: wallet.to_string(),
            pnl: row.clone(),
        });

        Ok(row)
    }

    async fn ensure_row(
        &self,
        cache: &mut HashMap<String, DailyPnl>,
        wallet: &str,
        user_id: Option<i64>,
        current_balance: f64,
        today: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<DailyPnl> {
        if let Some(row) = cache.get(wallet) {
            if row.date == today {
                return Ok(row.clone());
            }
            // Cached row is stale after midnight; fall through and reseed
        }

        if let Some(row) = self.store.get_daily_pnl(wallet, today).await? {
            cache.insert(wallet.to_string(), row.clone());
            return Ok(row);
        }

        let start_balance = match self.store.last_daily_pnl(wallet).await? {
            Some(prev) => prev
                .end_balance
                .unwrap_or_else(|| decimal_from_f64(current_balance, BALANCE_SCALE)),
            None => decimal_from_f64(current_balance, BALANCE_SCALE),
        };

        let row = self
            .store
            .insert_daily_pnl(&NewDailyPnl {
                user_id,
                wallet_address: wallet.to_string(),
                date: today,
                start_balance,
                end_balance: start_balance,
            })
            .await?;

        info!(
            wallet = wallet,
            start_balance = %start_balance,
            "Seeded daily PnL row"
        );

        cache.insert(wallet.to_string(), row.clone());
        Ok(row)
    }
}
