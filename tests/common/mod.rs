//! Shared test doubles: in-memory store, scripted chain client, fixed clock

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use wallet_pulse::chain::types::{
    AccountKey, ParsedTx, SignatureInfo, TokenAccountBalance, TokenBalance, TxMessage, TxMeta,
    UiTokenAmount,
};
use wallet_pulse::chain::ChainClient;
use wallet_pulse::clock::Clock;
use wallet_pulse::error::{AppError, AppResult};
use wallet_pulse::models::{DailyPnl, NewDailyPnl, NewTrade, PnlUpdate, TokenMeta, Trade, User};
use wallet_pulse::store::Store;

/// Reference instant used across tests: 2024-03-15 20:00 UTC, comfortably
/// inside the 2024-03-15 reference-offset day.
pub fn today() -> DateTime<Utc> {
    "2024-03-15T20:00:00Z".parse().unwrap()
}

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

// ---------------------------------------------------------------------------
// FixedClock

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ---------------------------------------------------------------------------
// MemStore

#[derive(Default)]
struct MemState {
    users: Vec<User>,
    trades: Vec<Trade>,
    pnl: Vec<DailyPnl>,
    tokens: Vec<TokenMeta>,
    next_user_id: i64,
    next_trade_id: i64,
    next_pnl_id: i64,
    next_token_id: i64,
}

/// In-memory [`Store`] with the same upsert semantics as the Postgres one
#[derive(Default)]
pub struct MemStore {
    state: Mutex<MemState>,
    /// When set, the next trade upsert fails with a database error
    fail_next_trade_upsert: Mutex<bool>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, name: &str, wallet: &str, is_live: bool) -> User {
        let mut state = self.state.lock();
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            name: name.to_string(),
            email: None,
            wallet_address: wallet.to_string(),
            stream_platform: None,
            stream_url: None,
            avatar_url: None,
            is_live,
            last_active: None,
            created_at: today(),
            updated_at: today(),
        };
        state.users.push(user.clone());
        user
    }

    pub fn set_live(&self, wallet: &str, is_live: bool) {
        let mut state = self.state.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.wallet_address == wallet) {
            user.is_live = is_live;
        }
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.state.lock().trades.clone()
    }

    pub fn pnl_rows(&self) -> Vec<DailyPnl> {
        self.state.lock().pnl.clone()
    }

    pub fn tokens(&self) -> Vec<TokenMeta> {
        self.state.lock().tokens.clone()
    }

    pub fn remove_token(&self, mint: &str) {
        self.state.lock().tokens.retain(|t| t.address != mint);
    }

    pub fn fail_next_trade_upsert(&self) {
        *self.fail_next_trade_upsert.lock() = true;
    }

    /// Seed a PnL row directly, bypassing the aggregator
    pub fn add_pnl_row(
        &self,
        wallet: &str,
        date: DateTime<Utc>,
        start_balance: Decimal,
        end_balance: Option<Decimal>,
    ) -> DailyPnl {
        let mut state = self.state.lock();
        state.next_pnl_id += 1;
        let row = DailyPnl {
            id: state.next_pnl_id,
            user_id: None,
            wallet_address: wallet.to_string(),
            date,
            start_balance,
            end_balance,
            realized_pnl: Decimal::ZERO,
            total_trades: 0,
            last_trade_id: None,
            created_at: date,
            updated_at: date,
        };
        state.pnl.push(row.clone());
        row
    }
}

#[async_trait]
impl Store for MemStore {
    async fn list_live_users(&self) -> AppResult<Vec<User>> {
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .filter(|u| u.is_live)
            .cloned()
            .collect())
    }

    async fn all_users_by_last_active(&self) -> AppResult<Vec<User>> {
        let mut users = self.state.lock().users.clone();
        users.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(users)
    }

    async fn user_by_wallet(&self, wallet: &str) -> AppResult<Option<User>> {
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .find(|u| u.wallet_address == wallet)
            .cloned())
    }

    async fn touch_last_active(&self, user_id: i64) -> AppResult<()> {
        let mut state = self.state.lock();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.last_active = Some(Utc::now());
        }
        Ok(())
    }

    async fn upsert_trade(&self, trade: &NewTrade) -> AppResult<Trade> {
        {
            let mut fail = self.fail_next_trade_upsert.lock();
            if *fail {
                *fail = false;
                return Err(AppError::Database(sqlx::Error::RowNotFound));
            }
        }

        let mut state = self.state.lock();

        if let Some(existing) = state
            .trades
            .iter_mut()
            .find(|t| t.signature == trade.signature)
        {
            existing.user_id = trade.user_id;
            existing.wallet_address = trade.wallet_address.clone();
            existing.token_a = trade.token_a.clone();
            existing.token_b = trade.token_b.clone();
            existing.trade_type = trade.trade_type.to_string();
            existing.amount_a = trade.amount_a;
            existing.amount_b = trade.amount_b;
            existing.trade_pnl = trade.trade_pnl;
            existing.platform = trade.platform.clone();
            existing.tx_fees = trade.tx_fees;
            existing.raw_data = trade.raw_data.clone();
            existing.timestamp = trade.timestamp;
            return Ok(existing.clone());
        }

        state.next_trade_id += 1;
        let row = Trade {
            id: state.next_trade_id,
            signature: trade.signature.clone(),
            user_id: trade.user_id,
            wallet_address: trade.wallet_address.clone(),
            token_a: trade.token_a.clone(),
            token_b: trade.token_b.clone(),
            trade_type: trade.trade_type.to_string(),
            amount_a: trade.amount_a,
            amount_b: trade.amount_b,
            trade_pnl: trade.trade_pnl,
            platform: trade.platform.clone(),
            tx_fees: trade.tx_fees,
            raw_data: trade.raw_data.clone(),
            timestamp: trade.timestamp,
            created_at: Utc::now(),
        };
        state.trades.push(row.clone());
        Ok(row)
    }

    async fn find_trade_by_signature(&self, signature: &str) -> AppResult<Option<Trade>> {
        Ok(self
            .state
            .lock()
            .trades
            .iter()
            .find(|t| t.signature == signature)
            .cloned())
    }

    async fn latest_trade(&self, wallet: &str) -> AppResult<Option<Trade>> {
        Ok(self
            .state
            .lock()
            .trades
            .iter()
            .filter(|t| t.wallet_address == wallet)
            .max_by_key(|t| t.timestamp)
            .cloned())
    }

    async fn trade_by_id(&self, id: i64) -> AppResult<Option<Trade>> {
        Ok(self.state.lock().trades.iter().find(|t| t.id == id).cloned())
    }

    async fn latest_signatures_for_wallet(
        &self,
        wallet: &str,
        limit: usize,
    ) -> AppResult<Vec<(String, DateTime<Utc>)>> {
        let mut rows: Vec<(String, DateTime<Utc>)> = self
            .state
            .lock()
            .trades
            .iter()
            .filter(|t| t.wallet_address == wallet)
            .map(|t| (t.signature.clone(), t.timestamp))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn get_daily_pnl(
        &self,
        wallet: &str,
        day: DateTime<Utc>,
    ) -> AppResult<Option<DailyPnl>> {
        Ok(self
            .state
            .lock()
            .pnl
            .iter()
            .find(|p| p.wallet_address == wallet && p.date == day)
            .cloned())
    }

    async fn insert_daily_pnl(&self, row: &NewDailyPnl) -> AppResult<DailyPnl> {
        let mut state = self.state.lock();
        state.next_pnl_id += 1;
        let inserted = DailyPnl {
            id: state.next_pnl_id,
            user_id: row.user_id,
            wallet_address: row.wallet_address.clone(),
            date: row.date,
            start_balance: row.start_balance,
            end_balance: Some(row.end_balance),
            realized_pnl: Decimal::ZERO,
            total_trades: 0,
            last_trade_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.pnl.push(inserted.clone());
        Ok(inserted)
    }

    async fn update_daily_pnl(
        &self,
        wallet: &str,
        day: DateTime<Utc>,
        update: &PnlUpdate,
    ) -> AppResult<()> {
        let mut state = self.state.lock();
        if let Some(row) = state
            .pnl
            .iter_mut()
            .find(|p| p.wallet_address == wallet && p.date == day)
        {
            row.end_balance = Some(update.end_balance);
            row.realized_pnl = update.realized_pnl;
            row.total_trades = update.total_trades;
            row.last_trade_id = update.last_trade_id;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn last_daily_pnl(&self, wallet: &str) -> AppResult<Option<DailyPnl>> {
        Ok(self
            .state
            .lock()
            .pnl
            .iter()
            .filter(|p| p.wallet_address == wallet)
            .max_by_key(|p| p.date)
            .cloned())
    }

    async fn get_token(&self, mint: &str) -> AppResult<Option<TokenMeta>> {
        Ok(self
            .state
            .lock()
            .tokens
            .iter()
            .find(|t| t.address == mint)
            .cloned())
    }

    async fn upsert_token(&self, token: &TokenMeta) -> AppResult<TokenMeta> {
        let mut state = self.state.lock();

        if let Some(existing) = state.tokens.iter_mut().find(|t| t.address == token.address) {
            existing.symbol = token.symbol.clone();
            existing.name = token.name.clone();
            existing.decimals = token.decimals;
            existing.verified = token.verified;
            existing.last_price = token.last_price;
            existing.last_updated = token.last_updated;
            existing.metadata = token.metadata.clone();
            return Ok(existing.clone());
        }

        state.next_token_id += 1;
        let mut stored = token.clone();
        stored.id = state.next_token_id;
        state.tokens.push(stored.clone());
        Ok(stored)
    }

    async fn all_tokens(&self) -> AppResult<Vec<TokenMeta>> {
        Ok(self.state.lock().tokens.clone())
    }

    async fn set_token_price(&self, mint: &str, price_usd: Decimal) -> AppResult<()> {
        let mut state = self.state.lock();
        if let Some(token) = state.tokens.iter_mut().find(|t| t.address == mint) {
            token.last_price = Some(price_usd);
            token.last_updated = Some(Utc::now());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockChain

/// Scripted [`ChainClient`]; transactions are registered per wallet and
/// listed newest first, like the real backend.
#[derive(Default)]
pub struct MockChain {
    signatures: Mutex<HashMap<String, Vec<SignatureInfo>>>,
    txs: Mutex<HashMap<String, ParsedTx>>,
    balances: Mutex<HashMap<String, u64>>,
    token_accounts: Mutex<HashMap<String, Vec<TokenAccountBalance>>>,
    decimals: Mutex<HashMap<String, u8>>,
    failing_wallets: Mutex<Vec<String>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transaction for a wallet; newest registration lists first
    pub fn push_tx(&self, wallet: &str, signature: &str, tx: ParsedTx) {
        let info = SignatureInfo {
            signature: signature.to_string(),
            block_time: tx.block_time,
            err: tx.meta.err.clone(),
            slot: 0,
        };
        self.signatures
            .lock()
            .entry(wallet.to_string())
            .or_default()
            .insert(0, info);
        self.txs.lock().insert(signature.to_string(), tx);
    }

    /// Register a transaction body without touching the signature list
    pub fn set_tx(&self, signature: &str, tx: ParsedTx) {
        self.txs.lock().insert(signature.to_string(), tx);
    }

    /// Register a signature whose transaction the node will not return
    pub fn push_unfetchable(&self, wallet: &str, signature: &str, block_time: i64) {
        let info = SignatureInfo {
            signature: signature.to_string(),
            block_time: Some(block_time),
            err: None,
            slot: 0,
        };
        self.signatures
            .lock()
            .entry(wallet.to_string())
            .or_default()
            .insert(0, info);
    }

    pub fn set_balance(&self, wallet: &str, lamports: u64) {
        self.balances.lock().insert(wallet.to_string(), lamports);
    }

    pub fn set_decimals(&self, mint: &str, decimals: u8) {
        self.decimals.lock().insert(mint.to_string(), decimals);
    }

    /// Make `getSignaturesForAddress` fail for a wallet
    pub fn fail_wallet(&self, wallet: &str) {
        self.failing_wallets.lock().push(wallet.to_string());
    }

    pub fn unfail_wallet(&self, wallet: &str) {
        self.failing_wallets.lock().retain(|w| w != wallet);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, address: &str) -> AppResult<u64> {
        Ok(self.balances.lock().get(address).copied().unwrap_or(0))
    }

    async fn get_parsed_token_accounts(
        &self,
        owner: &str,
    ) -> AppResult<Vec<TokenAccountBalance>> {
        Ok(self
            .token_accounts
            .lock()
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> AppResult<Vec<SignatureInfo>> {
        if self.failing_wallets.lock().iter().any(|w| w == address) {
            return Err(AppError::Rpc("node unavailable".into()));
        }

        let mut sigs = self
            .signatures
            .lock()
            .get(address)
            .cloned()
            .unwrap_or_default();
        sigs.truncate(limit);
        Ok(sigs)
    }

    async fn get_parsed_transaction(&self, signature: &str) -> AppResult<Option<ParsedTx>> {
        Ok(self.txs.lock().get(signature).cloned())
    }

    async fn get_mint_decimals(&self, mint: &str) -> AppResult<Option<u8>> {
        Ok(self.decimals.lock().get(mint).copied())
    }
}

// ---------------------------------------------------------------------------
// Transaction builders

pub fn token_balance(index: usize, mint: &str, owner: &str, amount: f64) -> TokenBalance {
    TokenBalance {
        account_index: index,
        mint: mint.to_string(),
        owner: Some(owner.to_string()),
        ui_token_amount: UiTokenAmount {
            ui_amount: Some(amount),
            decimals: 6,
            amount: String::new(),
        },
    }
}

/// Build a parsed transaction with the wallet as fee payer at index 0
pub fn make_tx(
    wallet: &str,
    block_time: i64,
    pre_lamports: u64,
    post_lamports: u64,
    pre_tokens: Vec<TokenBalance>,
    post_tokens: Vec<TokenBalance>,
) -> ParsedTx {
    ParsedTx {
        block_time: Some(block_time),
        meta: TxMeta {
            err: None,
            fee: 5_000,
            pre_balances: vec![pre_lamports, 2_039_280],
            post_balances: vec![post_lamports, 2_039_280],
            pre_token_balances: pre_tokens,
            post_token_balances: post_tokens,
        },
        message: TxMessage {
            account_keys: vec![
                AccountKey {
                    pubkey: wallet.to_string(),
                },
                AccountKey {
                    pubkey: "TokenAccount11111111111111111111111111111111".to_string(),
                },
            ],
        },
    }
}

pub fn failed_tx(wallet: &str, block_time: i64) -> ParsedTx {
    let mut tx = make_tx(wallet, block_time, 1_000_000_000, 999_995_000, vec![], vec![]);
    tx.meta.err = Some(serde_json::json!({"InstructionError": [0, "Custom"]}));
    tx
}

/// A ready-made buy for tests that need a persisted trade
pub fn sample_new_trade(wallet: &str, signature: &str) -> NewTrade {
    NewTrade {
        signature: signature.to_string(),
        user_id: None,
        wallet_address: wallet.to_string(),
        token_a: "MintAAA11111111111111111111111111111111111".to_string(),
        token_b: wallet_pulse::constants::mints::SOL.to_string(),
        trade_type: wallet_pulse::models::TradeType::Buy,
        amount_a: Decimal::from(500),
        amount_b: Decimal::from_str_exact("0.1").unwrap(),
        trade_pnl: Decimal::from_str_exact("-0.1").unwrap(),
        platform: "unknown".to_string(),
        tx_fees: None,
        raw_data: None,
        timestamp: today(),
    }
}

/// Arc coercion helpers so tests read like the production wiring
pub fn as_store(store: &Arc<MemStore>) -> Arc<dyn Store> {
    store.clone()
}

pub fn as_chain(chain: &Arc<MockChain>) -> Arc<dyn ChainClient> {
    chain.clone()
}

pub fn as_clock(clock: &Arc<FixedClock>) -> Arc<dyn Clock> {
    clock.clone()
}
