//! Balance-delta transaction classification
//!
//! Works purely on pre/post balances: the wallet's lamport delta gives the
//! SOL leg, per-account token balance deltas give the token leg. A token
//! delta with a matching opposite SOL move is a swap; without one it is a
//! plain transfer.

use crate::chain::types::{ParsedTx, TokenBalance};
use crate::constants::{mints, DUST_THRESHOLD};
use crate::models::TradeType;

/// Net change of one token across the wallet's token accounts
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDelta {
    pub mint: String,
    /// Signed UI-scaled change; positive means the wallet received tokens
    pub change: f64,
}

/// One classified action derived from a token delta
#[derive(Debug, Clone)]
pub struct Classified {
    pub trade_type: TradeType,
    /// Traded token mint
    pub token_a: String,
    /// Wrapped SOL for swaps, `token_a` for transfers
    pub token_b: String,
    /// Token amount, always positive
    pub amount_a: f64,
    /// SOL amount for swaps, token amount for transfers
    pub amount_b: f64,
    /// Signed: negative on buys, positive on sells, zero on transfers
    pub trade_pnl: f64,
    pub platform: &'static str,
}

/// Token balance deltas for accounts owned by `wallet`
///
/// Each post balance pairs with the pre balance at the same account index.
/// A pre balance owned by the wallet with no post counterpart is a full
/// exit: the account was emptied and closed within the transaction.
pub fn token_deltas(tx: &ParsedTx, wallet: &str) -> Vec<TokenDelta> {
    let mut deltas = Vec::new();

    for post in &tx.meta.post_token_balances {
        if !post.owned_by(wallet) {
            continue;
        }

        let pre_amount = pre_at_index(tx, post.account_index)
            .map(TokenBalance::amount)
            .unwrap_or(0.0);
        let change = post.amount() - pre_amount;

        if change.abs() > DUST_THRESHOLD {
            deltas.push(TokenDelta {
                mint: post.mint.clone(),
                change,
            });
        }
    }

    for pre in &tx.meta.pre_token_balances {
        if !pre.owned_by(wallet) || pre.amount() <= 0.0 {
            continue;
        }

        let has_post = tx
            .meta
            .post_token_balances
            .iter()
            .any(|p| p.account_index == pre.account_index);

        if !has_post && pre.amount() > DUST_THRESHOLD {
            deltas.push(TokenDelta {
                mint: pre.mint.clone(),
                change: -pre.amount(),
            });
        }
    }

    deltas
}

fn pre_at_index(tx: &ParsedTx, index: usize) -> Option<&TokenBalance> {
    tx.meta
        .pre_token_balances
        .iter()
        .find(|b| b.account_index == index)
}

/// Classify each token delta against the wallet's SOL move
///
/// SOL deltas below the dust threshold are treated as fees, not as a swap
/// leg, so a pure token transfer with only a fee debit still classifies as
/// deposit/withdrawal. Wrapped-SOL deltas are skipped entirely: that
/// movement is already captured by the lamport delta.
pub fn classify(deltas: &[TokenDelta], sol_change: f64) -> Vec<Classified> {
    let sol = if sol_change.abs() < DUST_THRESHOLD {
        0.0
    } else {
        sol_change
    };

    let mut actions = Vec::new();

    for delta in deltas {
        if delta.mint == mints::SOL {
            continue;
        }

        let classified = if delta.change > 0.0 && sol < 0.0 {
            Classified {
                trade_type: TradeType::Buy,
                token_a: delta.mint.clone(),
                token_b: mints::SOL.to_string(),
                amount_a: delta.change.abs(),
                amount_b: sol.abs(),
                trade_pnl: -sol.abs(),
                platform: "unknown",
            }
        } else if delta.change < 0.0 && sol > 0.0 {
            Classified {
                trade_type: TradeType::Sell,
                token_a: delta.mint.clone(),
                token_b: mints::SOL.to_string(),
                amount_a: delta.change.abs(),
                amount_b: sol.abs(),
                trade_pnl: sol.abs(),
                platform: "unknown",
            }
        } else {
            let trade_type = if delta.change > 0.0 {
                TradeType::Deposit
            } else {
                TradeType::Withdrawal
            };
            Classified {
                trade_type,
                token_a: delta.mint.clone(),
                token_b: delta.mint.clone(),
                amount_a: delta.change.abs(),
                amount_b: delta.change.abs(),
                trade_pnl: 0.0,
                platform: "transfer",
            }
        };

        actions.push(classified);
    }

    actions
}
