//! Solana RPC implementation of [`ChainClient`]
//!
//! Wraps the blocking `solana-client` RPC client; every call runs on the
//! blocking pool and passes through the rate limiter first.

use super::limiter::RpcRateLimiter;
use super::types::{ParsedTx, SignatureInfo, TokenAccountBalance};
use super::ChainClient;
use crate::constants::programs;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use solana_account_decoder::UiAccountData;
use solana_client::rpc_client::{GetConfirmedSignaturesForAddress2Config, RpcClient};
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// RPC-backed chain client
pub struct RpcChainClient {
    client: Arc<RpcClient>,
    limiter: Arc<RpcRateLimiter>,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, timeout_secs: u64, rate_limit_per_second: u32) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            rpc_url.to_string(),
            Duration::from_secs(timeout_secs),
            CommitmentConfig::confirmed(),
        );

        Self {
            client: Arc::new(client),
            limiter: Arc::new(RpcRateLimiter::new(rate_limit_per_second)),
        }
    }

    /// Run a blocking RPC call on the blocking pool, rate-limited
    async fn blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<RpcClient>) -> AppResult<T> + Send + 'static,
    {
        self.limiter.acquire().await;
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || f(client))
            .await
            .map_err(|e| AppError::Internal(format!("RPC task join error: {}", e)))?
    }
}

fn parse_pubkey(address: &str) -> AppResult<Pubkey> {
    Pubkey::from_str(address).map_err(|e| AppError::Rpc(format!("invalid address: {}", e)))
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, address: &str) -> AppResult<u64> {
        let pubkey = parse_pubkey(address)?;
        self.blocking(move |client| {
            client
                .get_balance(&pubkey)
                .map_err(|e| AppError::Rpc(format!("getBalance failed: {}", e)))
        })
        .await
    }

    async fn get_parsed_token_accounts(&self, owner: &str) -> AppResult<Vec<TokenAccountBalance>> {
        let owner_pubkey = parse_pubkey(owner)?;
        let program = parse_pubkey(programs::SPL_TOKEN)?;

        self.blocking(move |client| {
            let accounts = client
                .get_token_accounts_by_owner(&owner_pubkey, TokenAccountsFilter::ProgramId(program))
                .map_err(|e| AppError::Rpc(format!("getTokenAccountsByOwner failed: {}", e)))?;

            let mut balances = Vec::with_capacity(accounts.len());
            for keyed in accounts {
                let UiAccountData::Json(parsed) = keyed.account.data else {
                    continue;
                };
                let info = &parsed.parsed["info"];
                let Some(mint) = info["mint"].as_str() else {
                    continue;
                };
                let ui_amount = info["tokenAmount"]["uiAmount"].as_f64().unwrap_or(0.0);
                balances.push(TokenAccountBalance {
                    mint: mint.to_string(),
                    ui_amount,
                });
            }

            Ok(balances)
        })
        .await
    }

    async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> AppResult<Vec<SignatureInfo>> {
        let pubkey = parse_pubkey(address)?;

        self.blocking(move |client| {
            let config = GetConfirmedSignaturesForAddress2Config {
                limit: Some(limit),
                ..Default::default()
            };

            let statuses = client
                .get_signatures_for_address_with_config(&pubkey, config)
                .map_err(|e| AppError::Rpc(format!("getSignaturesForAddress failed: {}", e)))?;

            Ok(statuses
                .into_iter()
                .map(|s| SignatureInfo {
                    signature: s.signature,
                    block_time: s.block_time,
                    err: s.err.and_then(|e| serde_json::to_value(e).ok()),
                    slot: s.slot,
                })
                .collect())
        })
        .await
    }

    async fn get_parsed_transaction(&self, signature: &str) -> AppResult<Option<ParsedTx>> {
        let sig = Signature::from_str(signature)
            .map_err(|e| AppError::Rpc(format!("invalid signature: {}", e)))?;

        self.blocking(move |client| {
            let config = RpcTransactionConfig {
                encoding: Some(UiTransactionEncoding::JsonParsed),
                commitment: Some(CommitmentConfig::confirmed()),
                max_supported_transaction_version: Some(0),
            };

            let tx = match client.get_transaction_with_config(&sig, config) {
                Ok(tx) => tx,
                // The node reports an unknown signature as an error
                Err(e) if e.to_string().contains("not found") => return Ok(None),
                Err(e) => return Err(AppError::Rpc(format!("getTransaction failed: {}", e))),
            };

            let value = serde_json::to_value(&tx)
                .map_err(|e| AppError::Parse(format!("transaction not serializable: {}", e)))?;

            ParsedTx::from_rpc_value(&value).map(Some)
        })
        .await
    }

    async fn get_mint_decimals(&self, mint: &str) -> AppResult<Option<u8>> {
        let pubkey = parse_pubkey(mint)?;

        self.blocking(move |client| {
            let account = match client.get_account(&pubkey) {
                Ok(account) => account,
                Err(e) if e.to_string().contains("AccountNotFound") => return Ok(None),
                Err(e) => return Err(AppError::Rpc(format!("getAccount failed: {}", e))),
            };

            // SPL mint layout: mint_authority (36) | supply (8) | decimals (1) | ...
            if account.data.len() < 82 {
                return Ok(None);
            }

            Ok(Some(account.data[44]))
        })
        .await
    }
}
