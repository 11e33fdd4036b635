//! Owned views of RPC payloads
//!
//! The classifier works on these types rather than on the `solana-client`
//! response structs, so the pipeline can be driven from JSON fixtures. The
//! field layout mirrors the `jsonParsed` transaction encoding.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One entry from `getSignaturesForAddress`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub slot: u64,
}

/// One token account from `getParsedTokenAccounts`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountBalance {
    pub mint: String,
    pub ui_amount: f64,
}

/// A parsed confirmed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTx {
    #[serde(default)]
    pub block_time: Option<i64>,
    pub meta: TxMeta,
    pub message: TxMessage,
}

/// Transaction status metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub post_token_balances: Vec<TokenBalance>,
}

/// One pre/post token balance entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

impl TokenBalance {
    /// UI-scaled amount; zero when the node omitted `uiAmount`
    pub fn amount(&self) -> f64 {
        self.ui_token_amount.ui_amount.unwrap_or(0.0)
    }

    pub fn owned_by(&self, wallet: &str) -> bool {
        self.owner.as_deref() == Some(wallet)
    }
}

/// Scaled token amount as reported by the node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    #[serde(default)]
    pub ui_amount: Option<f64>,
    pub decimals: u8,
    #[serde(default)]
    pub amount: String,
}

/// Transaction message (account list)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMessage {
    pub account_keys: Vec<AccountKey>,
}

/// One static account key; `jsonParsed` adds signer/writable flags we ignore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountKey {
    pub pubkey: String,
}

impl ParsedTx {
    /// Index of `wallet` in the account list, if present
    pub fn account_index(&self, wallet: &str) -> Option<usize> {
        self.message
            .account_keys
            .iter()
            .position(|k| k.pubkey == wallet)
    }

    /// Lamport delta for the account at `index`, in SOL
    pub fn sol_change(&self, index: usize) -> f64 {
        let pre = self.meta.pre_balances.get(index).copied().unwrap_or(0);
        let post = self.meta.post_balances.get(index).copied().unwrap_or(0);
        (post as f64 - pre as f64) / crate::constants::LAMPORTS_PER_SOL
    }

    /// Post-transaction SOL balance for the account at `index`
    pub fn post_sol(&self, index: usize) -> f64 {
        self.meta.post_balances.get(index).copied().unwrap_or(0) as f64
            / crate::constants::LAMPORTS_PER_SOL
    }

    /// Reshape a `getTransaction` response into a [`ParsedTx`]
    ///
    /// The RPC response nests the payload as
    /// `{slot, blockTime, transaction: {transaction: {message}, meta}}`.
    pub fn from_rpc_value(value: &Value) -> AppResult<Self> {
        let envelope = value
            .get("transaction")
            .ok_or_else(|| AppError::Parse("response missing transaction envelope".into()))?;

        let meta = envelope
            .get("meta")
            .cloned()
            .ok_or_else(|| AppError::Parse("transaction missing meta".into()))?;

        let message = envelope
            .get("transaction")
            .and_then(|t| t.get("message"))
            .cloned()
            .ok_or_else(|| AppError::Parse("transaction missing message".into()))?;

        let reshaped = json!({
            "blockTime": value.get("blockTime").cloned().unwrap_or(Value::Null),
            "meta": normalize_meta(meta),
            "message": message,
        });

        serde_json::from_value(reshaped)
            .map_err(|e| AppError::Parse(format!("malformed parsed transaction: {}", e)))
    }
}

/// The node reports absent token-balance lists as `null`; map them to `[]`
fn normalize_meta(mut meta: Value) -> Value {
    for key in ["preTokenBalances", "postTokenBalances"] {
        if meta.get(key).map(Value::is_null).unwrap_or(true) {
            meta[key] = json!([]);
        }
    }
    meta
}
