//! Store contract and PostgreSQL implementation
//!
//! The pipeline persists through this trait; [`PgStore`] is the production
//! implementation, tests substitute an in-memory store. All mutations are
//! single-row and atomic; the trade upsert is keyed on the transaction
//! signature.

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{DailyPnl, NewDailyPnl, NewTrade, PnlUpdate, TokenMeta, Trade, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Persistence operations required by the pipeline
#[async_trait]
pub trait Store: Send + Sync {
    // -- users ------------------------------------------------------------

    /// Users whose wallets are currently monitored
    async fn list_live_users(&self) -> AppResult<Vec<User>>;

    /// All users ordered by `last_active` descending (dashboard ranking)
    async fn all_users_by_last_active(&self) -> AppResult<Vec<User>>;

    async fn user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>>;

    /// Stamp `last_active` on the owning user after a trade lands
    async fn touch_last_active(&self, user_id: i64) -> AppResult<()>;

    // -- trades -----------------------------------------------------------

    /// Insert by signature; on conflict overwrite all columns. Returns the
    /// stored row with its stable id.
    async fn upsert_trade(&self, trade: &NewTrade) -> AppResult<Trade>;

    async fn find_trade_by_signature(&self, signature: &str) -> AppResult<Option<Trade>>;

    async fn latest_trade(&self, wallet: &str) -> AppResult<Option<Trade>>;

    async fn trade_by_id(&self, id: i64) -> AppResult<Option<Trade>>;

    /// Most recent persisted signatures for a wallet with their block times
    async fn latest_signatures_for_wallet(
        &self,
        wallet: &str,
        limit: usize,
    ) -> AppResult<Vec<(String, DateTime<Utc>)>>;

    // -- daily PnL --------------------------------------------------------

    async fn get_daily_pnl(
        &self,
        wallet: &str,
        day: DateTime<Utc>,
    ) -> AppResult<Option<DailyPnl>>;

    async fn insert_daily_pnl(&self, row: &NewDailyPnl) -> AppResult<DailyPnl>;

    async fn update_daily_pnl(
        &self,
        wallet: &str,
        day: DateTime<Utc>,
        update: &PnlUpdate,
    ) -> AppResult<()>;

    /// Most recent PnL row for the wallet, any day
    async fn last_daily_pnl(&self, wallet: &str) -> AppResult<Option<DailyPnl>>;

    // -- token metadata ---------------------------------------------------

    async fn get_token(&self, mint: &str) -> AppResult<Option<TokenMeta>>;

    async fn upsert_token(&self, token: &TokenMeta) -> AppResult<TokenMeta>;

    async fn all_tokens(&self) -> AppResult<Vec<TokenMeta>>;

    async fn set_token_price(&self, mint: &str, price_usd: Decimal) -> AppResult<()>;
}

/// PostgreSQL-backed store
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const TRADE_COLUMNS: &str = "id, signature, user_id, wallet_address, token_a, token_b, type, \
     amount_a, amount_b, trade_pnl, platform, tx_fees, raw_data, timestamp, created_at";

const PNL_COLUMNS: &str = "id, user_id, wallet_address, date, start_balance, end_balance, \
     realized_pnl, total_trades, last_trade_id, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    async fn list_live_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE is_live = TRUE")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn all_users_by_last_active(&self) -> AppResult<Vec<User>> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY last_active DESC NULLS LAST")
                .fetch_all(&self.pool)
                .await?;
        Ok(users)
    }

    async fn user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE wallet_address = $1")
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn touch_last_active(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_active = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_trade(&self, trade: &NewTrade) -> AppResult<Trade> {
        let sql = format!(
            r#"
            INSERT INTO trades (
                signature, user_id, wallet_address, token_a, token_b, type,
                amount_a, amount_b, trade_pnl, platform, tx_fees, raw_data, timestamp
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (signature) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                wallet_address = EXCLUDED.wallet_address,
                token_a = EXCLUDED.token_a,
                token_b = EXCLUDED.token_b,
                type = EXCLUDED.type,
                amount_a = EXCLUDED.amount_a,
                amount_b = EXCLUDED.amount_b,
                trade_pnl = EXCLUDED.trade_pnl,
                platform = EXCLUDED.platform,
                tx_fees = EXCLUDED.tx_fees,
                raw_data = EXCLUDED.raw_data,
                timestamp = EXCLUDED.timestamp
            RETURNING {}
            "#,
            TRADE_COLUMNS
        );

        let row = sqlx::query_as::<_, Trade>(&sql)
            .bind(&trade.signature)
            .bind(trade.user_id)
            .bind(&trade.wallet_address)
            .bind(&trade.token_a)
            .bind(&trade.token_b)
            .bind(trade.trade_type.to_string())
            .bind(trade.amount_a)
            .bind(trade.amount_b)
            .bind(trade.trade_pnl)
            .bind(&trade.platform)
            .bind(trade.tx_fees)
            .bind(&trade.raw_data)
            .bind(trade.timestamp)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_trade_by_signature(&self, signature: &str) -> AppResult<Option<Trade>> {
        let sql = format!("SELECT {} FROM trades WHERE signature = $1", TRADE_COLUMNS);
        let trade = sqlx::query_as::<_, Trade>(&sql)
            .bind(signature)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trade)
    }

    async fn latest_trade(&self, wallet: &str) -> AppResult<Option<Trade>> {
        let sql = format!(
            "SELECT {} FROM trades WHERE wallet_address = $1 ORDER BY timestamp DESC LIMIT 1",
            TRADE_COLUMNS
        );
        let trade = sqlx::query_as::<_, Trade>(&sql)
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trade)
    }

    async fn trade_by_id(&self, id: i64) -> AppResult<Option<Trade>> {
        let sql = format!("SELECT {} FROM trades WHERE id = $1", TRADE_COLUMNS);
        let trade = sqlx::query_as::<_, Trade>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trade)
    }

    async fn latest_signatures_for_wallet(
        &self,
        wallet: &str,
        limit: usize,
    ) -> AppResult<Vec<(String, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            "SELECT signature, timestamp FROM trades \
             WHERE wallet_address = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(wallet)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_daily_pnl(
        &self,
        wallet: &str,
        day: DateTime<Utc>,
    ) -> AppResult<Option<DailyPnl>> {
        let sql = format!(
            "SELECT {} FROM pnl_records WHERE wallet_address = $1 AND date = $2",
            PNL_COLUMNS
        );
        let row = sqlx::query_as::<_, DailyPnl>(&sql)
            .bind(wallet)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_daily_pnl(&self, row: &NewDailyPnl) -> AppResult<DailyPnl> {
        let sql = format!(
            r#"
            INSERT INTO pnl_records (user_id, wallet_address, date, start_balance, end_balance)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            PNL_COLUMNS
        );

        let inserted = sqlx::query_as::<_, DailyPnl>(&sql)
            .bind(row.user_id)
            .bind(&row.wallet_address)
            .bind(row.date)
            .bind(row.start_balance)
            .bind(row.end_balance)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    async fn update_daily_pnl(
        &self,
        wallet: &str,
        day: DateTime<Utc>,
        update: &PnlUpdate,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE pnl_records
            SET end_balance = $3, realized_pnl = $4, total_trades = $5,
                last_trade_id = $6, updated_at = NOW()
            WHERE wallet_address = $1 AND date = $2
            "#,
        )
        .bind(wallet)
        .bind(day)
        .bind(update.end_balance)
        .bind(update.realized_pnl)
        .bind(update.total_trades)
        .bind(update.last_trade_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn last_daily_pnl(&self, wallet: &str) -> AppResult<Option<DailyPnl>> {
        let sql = format!(
            "SELECT {} FROM pnl_records WHERE wallet_address = $1 ORDER BY date DESC LIMIT 1",
            PNL_COLUMNS
        );
        let row = sqlx::query_as::<_, DailyPnl>(&sql)
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_token(&self, mint: &str) -> AppResult<Option<TokenMeta>> {
        let token = sqlx::query_as::<_, TokenMeta>("SELECT * FROM tokens WHERE address = $1")
            .bind(mint)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    async fn upsert_token(&self, token: &TokenMeta) -> AppResult<TokenMeta> {
        let stored = sqlx::query_as::<_, TokenMeta>(
            r#"
            INSERT INTO tokens (address, symbol, name, decimals, verified, last_price, last_updated, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (address) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                name = EXCLUDED.name,
                decimals = EXCLUDED.decimals,
                verified = EXCLUDED.verified,
                last_price = EXCLUDED.last_price,
                last_updated = EXCLUDED.last_updated,
                metadata = EXCLUDED.metadata
            RETURNING *
            "#,
        )
        .bind(&token.address)
        .bind(&token.symbol)
        .bind(&token.name)
        .bind(token.decimals)
        .bind(token.verified)
        .bind(token.last_price)
        .bind(token.last_updated)
        .bind(&token.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn all_tokens(&self) -> AppResult<Vec<TokenMeta>> {
        let tokens = sqlx::query_as::<_, TokenMeta>("SELECT * FROM tokens")
            .fetch_all(&self.pool)
            .await?;
        Ok(tokens)
    }

    async fn set_token_price(&self, mint: &str, price_usd: Decimal) -> AppResult<()> {
        sqlx::query("UPDATE tokens SET last_price = $2, last_updated = NOW() WHERE address = $1")
            .bind(mint)
            .bind(price_usd)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
