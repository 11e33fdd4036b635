//! Push protocol frames
//!
//! Line-delimited JSON over the WebSocket: `{"type": KIND, "data": …}`.
//! Client-originated kinds are the subscribe pair; everything else flows
//! server to client.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Frame kinds on the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    SubscribeWallet,
    UnsubscribeWallet,
    TradeUpdate,
    BalanceUpdate,
    PnlUpdate,
    UsersList,
    UsersUpdate,
    Error,
}

/// One protocol frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(kind: MessageKind, data: impl Serialize) -> Self {
        Self {
            kind,
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            data: json!({ "message": message.into() }),
        }
    }

    /// Acknowledgement for a subscribe/unsubscribe request
    pub fn ack(kind: MessageKind, wallet: &str) -> Self {
        Self {
            kind,
            data: json!({ "walletAddress": wallet, "success": true }),
        }
    }

    pub fn parse(text: &str) -> AppResult<Self> {
        serde_json::from_str(text).map_err(|_| AppError::Protocol("Invalid message format".into()))
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Payload of a subscribe/unsubscribe request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub wallet_address: String,
}
