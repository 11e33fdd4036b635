//! Token metadata registry
//!
//! Read-through cache over the `tokens` table: cache hit, then database,
//! then on-chain enrichment. Unknown mints get a synthesized symbol from the
//! first and last three characters of the address so the dashboard always
//! has something to render.

use crate::chain::ChainClient;
use crate::constants::mints;
use crate::error::AppResult;
use crate::models::TokenMeta;
use crate::store::Store;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-through token metadata cache with DB persistence
pub struct TokenRegistry {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainClient>,
    cache: RwLock<HashMap<String, TokenMeta>>,
}

impl TokenRegistry {
    pub fn new(store: Arc<dyn Store>, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            store,
            chain,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Prime the cache with every persisted token row; called at startup
    pub async fn load_all(&self) -> AppResult<usize> {
        let tokens = self.store.all_tokens().await?;
        let count = tokens.len();

        let mut cache = self.cache.write();
        for token in tokens {
            cache.insert(token.address.clone(), token);
        }

        Ok(count)
    }

    /// Resolve metadata for a mint: cache, then DB, then synthesis
    pub async fn get(&self, mint: &str) -> AppResult<TokenMeta> {
        {
            let cache = self.cache.read();
            if let Some(token) = cache.get(mint) {
                return Ok(token.clone());
            }
        }

        if let Some(token) = self.store.get_token(mint).await? {
            self.cache.write().insert(mint.to_string(), token.clone());
            return Ok(token);
        }

        let token = self.synthesize(mint).await?;
        self.cache.write().insert(mint.to_string(), token.clone());
        Ok(token)
    }

    /// Update the stored price; refreshes the cached row if present
    pub async fn set_price(&self, mint: &str, price_usd: Decimal) -> AppResult<()> {
        self.store.set_token_price(mint, price_usd).await?;

        let mut cache = self.cache.write();
        if let Some(token) = cache.get_mut(mint) {
            token.last_price = Some(price_usd);
            token.last_updated = Some(Utc::now());
        }

        Ok(())
    }

    /// Number of cached mints
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Build a row for a mint the database has never seen and persist it
    async fn synthesize(&self, mint: &str) -> AppResult<TokenMeta> {
        let (symbol, name, decimals, verified) = if mint == mints::SOL {
            ("SOL".to_string(), "Solana".to_string(), Some(9), true)
        } else {
            // Decimals are the only metadata the mint account itself carries
            let decimals = match self.chain.get_mint_decimals(mint).await {
                Ok(d) => d.map(i32::from),
                Err(e) => {
                    warn!(mint = mint, error = %e, "Mint decimals lookup failed");
                    None
                }
            };

            let symbol = TokenMeta::fallback_symbol(mint);
            (symbol.clone(), symbol, decimals, false)
        };

        debug!(mint = mint, symbol = %symbol, "Synthesizing token metadata");

        let token = TokenMeta {
            id: 0,
            address: mint.to_string(),
            symbol,
            name,
            decimals,
            verified,
            last_price: None,
            last_updated: Some(Utc::now()),
            metadata: None,
        };

        self.store.upsert_token(&token).await
    }
}
