//! Wallet activity monitor
//!
//! Drives the full pipeline on a fixed cadence: reconcile the active wallet
//! roster against the store, discover new signatures per wallet, dedupe
//! them, fetch and classify each transaction, persist the resulting trades,
//! feed the PnL aggregator, and emit typed events for the push hub.

pub mod classifier;

use crate::chain::types::SignatureInfo;
use crate::chain::ChainClient;
use crate::clock::{same_day, Clock};
use crate::config::MonitorConfig;
use crate::constants::LAMPORTS_PER_SOL;
use crate::error::{AppError, AppResult};
use crate::events::{BalanceUpdate, EventBus, MonitorEvent, TokenHolding};
use crate::models::trade::decimal_from_f64;
use crate::models::NewTrade;
use crate::pnl::DailyPnlTracker;
use crate::store::Store;
use chrono::DateTime;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-wallet tracking state
#[derive(Debug, Clone)]
struct WalletState {
    user_id: i64,
    last_seen_signature: Option<String>,
}

/// Polls active wallets and turns raw transactions into classified trades
pub struct Monitor {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainClient>,
    clock: Arc<dyn Clock>,
    pnl: Arc<DailyPnlTracker>,
    events: EventBus,
    config: MonitorConfig,
    /// Active roster, reconciled against the store every cycle
    wallets: RwLock<HashMap<String, WalletState>>,
    /// Signatures already observed by this process
    seen: RwLock<LruCache<String, ()>>,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainClient>,
        clock: Arc<dyn Clock>,
        pnl: Arc<DailyPnlTracker>,
        events: EventBus,
        config: MonitorConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.seen_capacity)
            .unwrap_or_else(|| NonZeroUsize::new(10_000).expect("nonzero capacity"));

        Self {
            store,
            chain,
            clock,
            pnl,
            events,
            config,
            wallets: RwLock::new(HashMap::new()),
            seen: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Attach a listener to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Load the initial roster; called once before the cycle loop starts
    pub async fn initialize(&self) -> AppResult<()> {
        self.reconcile_wallets().await?;
        let count = self.wallets.read().await.len();
        info!(wallet_count = count, "Monitor initialized");
        Ok(())
    }

    /// Spawn the cycle loop; cancel the token to stop it
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Cycle loop. Overruns skip ticks rather than queueing a second cycle.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.poll_interval_secs,
            "Monitor cycle loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Monitor shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One full cycle: reconcile the roster, then poll every active wallet.
    /// A wallet's failure never stops the others.
    pub async fn run_cycle(&self) {
        if let Err(e) = self.reconcile_wallets().await {
            warn!(error = %e, "Wallet reconciliation failed, polling previous roster");
        }

        let roster: Vec<(String, i64)> = {
            let wallets = self.wallets.read().await;
            wallets
                .iter()
                .map(|(address, state)| (address.clone(), state.user_id))
                .collect()
        };

        for (wallet, user_id) in roster {
            if let Err(e) = self.poll_wallet(&wallet, user_id).await {
                warn!(wallet = %wallet, error = %e, "Wallet poll failed");
            }
        }
    }

    /// Sync the active map with the store's live users
    ///
    /// A newly-live wallet gets its recent persisted signatures preloaded
    /// into the seen set so restart does not replay old trades. Dropped
    /// wallets leave the map; their seen signatures stay cached.
    async fn reconcile_wallets(&self) -> AppResult<()> {
        let live = self.store.list_live_users().await?;

        let mut wallets = self.wallets.write().await;

        for user in &live {
            if wallets.contains_key(&user.wallet_address) {
                continue;
            }

            let persisted = self
                .store
                .latest_signatures_for_wallet(&user.wallet_address, self.config.seen_preload_limit)
                .await?;

            let newest = persisted.first().map(|(sig, _)| sig.clone());
            {
                let mut seen = self.seen.write().await;
                for (sig, _) in &persisted {
                    seen.put(sig.clone(), ());
                }
            }

            debug!(
                wallet = %user.wallet_address,
                preloaded = persisted.len(),
                "Tracking new live wallet"
            );

            wallets.insert(
                user.wallet_address.clone(),
                WalletState {
                    user_id: user.id,
                    last_seen_signature: newest,
                },
            );
        }

        let live_set: std::collections::HashSet<&str> =
            live.iter().map(|u| u.wallet_address.as_str()).collect();
        wallets.retain(|address, _| {
            let keep = live_set.contains(address.as_str());
            if !keep {
                debug!(wallet = %address, "Wallet no longer live, dropping from roster");
            }
            keep
        });

        Ok(())
    }

    /// Poll one wallet for new signatures and process them oldest-first
    async fn poll_wallet(&self, wallet: &str, user_id: i64) -> AppResult<()> {
        let mut signatures = self
            .chain
            .get_signatures_for_address(wallet, self.config.signature_limit)
            .await?;

        let Some(newest) = signatures.first().map(|s| s.signature.clone()) else {
            return Ok(());
        };

        {
            let wallets = self.wallets.read().await;
            if let Some(state) = wallets.get(wallet) {
                if state.last_seen_signature.as_deref() == Some(newest.as_str()) {
                    return Ok(());
                }
            }
        }

        {
            let mut wallets = self.wallets.write().await;
            if let Some(state) = wallets.get_mut(wallet) {
                state.last_seen_signature = Some(newest);
            }
        }

        // Oldest first, so PnL folds trades in chain order
        signatures.sort_by_key(|s| s.block_time.unwrap_or(0));

        let mut persisted_any = false;
        for info in &signatures {
            match self.process_signature(wallet, user_id, info).await {
                Ok(persisted) => persisted_any |= persisted,
                Err(e) => {
                    // Transient failures retry on later cycles; anything
                    // else is cached so one bad signature cannot wedge the
                    // wallet.
                    match &e {
                        AppError::Rpc(_) | AppError::Database(_) => {
                            warn!(wallet = %wallet, signature = %info.signature, error = %e,
                                  "Signature processing failed, will retry");
                        }
                        _ => {
                            warn!(wallet = %wallet, signature = %info.signature, error = %e,
                                  "Signature processing failed, caching");
                            self.mark_seen(&info.signature).await;
                        }
                    }
                }
            }
        }

        if persisted_any {
            if let Err(e) = self.emit_balance(wallet).await {
                warn!(wallet = %wallet, error = %e, "Balance refresh failed");
            }
        }

        Ok(())
    }

    /// Process a single signature; returns whether a trade was persisted
    async fn process_signature(
        &self,
        wallet: &str,
        user_id: i64,
        info: &SignatureInfo,
    ) -> AppResult<bool> {
        let signature = info.signature.as_str();

        if self.has_seen(signature).await {
            return Ok(false);
        }

        if self
            .store
            .find_trade_by_signature(signature)
            .await?
            .is_some()
        {
            self.mark_seen(signature).await;
            return Ok(false);
        }

        let Some(block_time) = info.block_time else {
            debug!(signature = signature, "No block time, caching");
            self.mark_seen(signature).await;
            return Ok(false);
        };

        let Some(timestamp) = DateTime::from_timestamp(block_time, 0) else {
            self.mark_seen(signature).await;
            return Ok(false);
        };

        // Only today's activity counts toward today's PnL
        if !same_day(timestamp, self.clock.now()) {
            debug!(signature = signature, "Outside current day, caching");
            self.mark_seen(signature).await;
            return Ok(false);
        }

        let Some(tx) = self.chain.get_parsed_transaction(signature).await? else {
            // Node has not indexed it yet; leave uncached for a retry
            debug!(signature = signature, "Transaction not available yet");
            return Ok(false);
        };

        if tx.meta.err.is_some() {
            debug!(signature = signature, "Transaction failed on-chain, caching");
            self.mark_seen(signature).await;
            return Ok(false);
        }

        let Some(index) = tx.account_index(wallet) else {
            debug!(signature = signature, "Wallet not in account keys, caching");
            self.mark_seen(signature).await;
            return Ok(false);
        };

        let sol_change = tx.sol_change(index);
        let deltas = classifier::token_deltas(&tx, wallet);

        if deltas.is_empty() {
            // Fee-only or pure SOL movement
            self.mark_seen(signature).await;
            return Ok(false);
        }

        let actions = classifier::classify(&deltas, sol_change);
        if actions.is_empty() {
            self.mark_seen(signature).await;
            return Ok(false);
        }

        let raw_data = serde_json::to_value(&tx).ok();
        // The fee is charged to the fee payer, account index 0
        let tx_fees =
            (index == 0).then(|| decimal_from_f64(tx.meta.fee as f64 / LAMPORTS_PER_SOL, 9));
        let post_sol = tx.post_sol(index);

        let mut persisted = false;
        for action in actions {
            let new_trade = NewTrade {
                signature: signature.to_string(),
                user_id: Some(user_id),
                wallet_address: wallet.to_string(),
                token_a: action.token_a.clone(),
                token_b: action.token_b.clone(),
                trade_type: action.trade_type,
                amount_a: decimal_from_f64(action.amount_a, 9),
                amount_b: decimal_from_f64(action.amount_b, 9),
                trade_pnl: decimal_from_f64(action.trade_pnl, 6),
                platform: action.platform.to_string(),
                tx_fees,
                raw_data: raw_data.clone(),
                timestamp,
            };

            let trade = self.store.upsert_trade(&new_trade).await?;

            info!(
                wallet = %wallet,
                signature = signature,
                trade_type = %action.trade_type,
                token = %action.token_a,
                trade_pnl = action.trade_pnl,
                "Recorded trade"
            );

            let _ = self.events.send(MonitorEvent::Trade {
                wallet: wallet.to_string(),
                trade: trade.clone(),
            });

            if action.trade_type.is_swap() {
                self.pnl
                    .apply_trade(
                        wallet,
                        Some(user_id),
                        post_sol,
                        action.trade_pnl,
                        Some(trade.id),
                    )
                    .await?;
            }

            persisted = true;
        }

        if persisted {
            self.store.touch_last_active(user_id).await?;
        }

        self.mark_seen(signature).await;
        Ok(persisted)
    }

    /// Fetch the wallet's current balances and emit a Balance event
    async fn emit_balance(&self, wallet: &str) -> AppResult<()> {
        let lamports = self.chain.get_balance(wallet).await?;
        let accounts = self.chain.get_parsed_token_accounts(wallet).await?;

        let update = BalanceUpdate {
            sol_balance: lamports as f64 / LAMPORTS_PER_SOL,
            tokens: accounts
                .into_iter()
                .map(|a| TokenHolding {
                    mint: a.mint,
                    ui_amount: a.ui_amount,
                })
                .collect(),
            timestamp: self.clock.now(),
        };

        let _ = self.events.send(MonitorEvent::Balance {
            wallet: wallet.to_string(),
            update,
        });

        Ok(())
    }

    async fn has_seen(&self, signature: &str) -> bool {
        let seen = self.seen.write().await;
        seen.contains(signature)
    }

    async fn mark_seen(&self, signature: &str) {
        let mut seen = self.seen.write().await;
        seen.put(signature.to_string(), ());
    }
}
