//! Chain access layer
//!
//! The monitor and token registry talk to the blockchain through the
//! [`ChainClient`] trait; [`RpcChainClient`] is the production
//! implementation. Tests script the trait directly.

pub mod limiter;
pub mod rpc;
pub mod types;

pub use limiter::RpcRateLimiter;
pub use rpc::RpcChainClient;
pub use types::{ParsedTx, SignatureInfo, TokenAccountBalance, TokenBalance};

use crate::error::AppResult;
use async_trait::async_trait;

/// Read access to the blockchain node
///
/// All failures surface as [`crate::error::AppError::Rpc`]; payloads that
/// cannot be interpreted surface as `Parse`.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current balance of `address` in lamports
    async fn get_balance(&self, address: &str) -> AppResult<u64>;

    /// Token accounts owned by `owner` with their UI-scaled balances
    async fn get_parsed_token_accounts(&self, owner: &str)
        -> AppResult<Vec<TokenAccountBalance>>;

    /// Most recent signatures touching `address`, newest first
    async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: usize,
    ) -> AppResult<Vec<SignatureInfo>>;

    /// Fetch and parse one transaction; `None` when the node does not know it
    async fn get_parsed_transaction(&self, signature: &str) -> AppResult<Option<ParsedTx>>;

    /// Decimals of an SPL mint, read from the raw mint account
    async fn get_mint_decimals(&self, mint: &str) -> AppResult<Option<u8>>;
}
