//! Push hub routing and protocol tests

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use wallet_pulse::events::{BalanceUpdate, MonitorEvent};
use wallet_pulse::hub::protocol::{Frame, MessageKind};
use wallet_pulse::hub::Hub;
use wallet_pulse::store::Store;
use wallet_pulse::token::TokenRegistry;

const W1: &str = "WaLLet1111111111111111111111111111111111111";
const W2: &str = "WaLLet2222222222222222222222222222222222222";

struct Setup {
    store: Arc<MemStore>,
    hub: Arc<Hub>,
}

fn setup() -> Setup {
    let store = Arc::new(MemStore::new());
    let chain = Arc::new(MockChain::new());
    let clock = Arc::new(FixedClock::new(today()));
    let registry = Arc::new(TokenRegistry::new(as_store(&store), as_chain(&chain)));
    let hub = Arc::new(Hub::new(as_store(&store), registry, as_clock(&clock)));
    Setup { store, hub }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(text) = rx.try_recv() {
        frames.push(Frame::parse(&text).unwrap());
    }
    frames
}

fn subscribe_frame(wallet: &str) -> String {
    json!({ "type": "SUBSCRIBE_WALLET", "data": { "walletAddress": wallet } }).to_string()
}

async fn trade_event(store: &Arc<MemStore>, wallet: &str, signature: &str) -> MonitorEvent {
    let trade = store
        .upsert_trade(&sample_new_trade(wallet, signature))
        .await
        .unwrap();
    MonitorEvent::Trade {
        wallet: wallet.to_string(),
        trade,
    }
}

#[tokio::test]
async fn test_users_list_sent_on_connect() {
    let s = setup();
    s.store.add_user("alice", W1, true);
    s.store.add_user("bob", W2, false);

    let (_, mut rx) = s.hub.register().await.unwrap();

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, MessageKind::UsersList);

    // Every known user is listed, live or not
    let snapshots = frames[0].data.as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
}

#[tokio::test]
async fn test_subscribe_acknowledged() {
    let s = setup();
    let (id, mut rx) = s.hub.register().await.unwrap();
    drain(&mut rx);

    s.hub.handle_text(id, &subscribe_frame(W1)).await;

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, MessageKind::SubscribeWallet);
    assert_eq!(frames[0].data["walletAddress"], W1);
    assert_eq!(frames[0].data["success"], true);
}

#[tokio::test]
async fn test_fanout_respects_subscriptions() {
    let s = setup();
    s.store.add_user("alice", W1, true);
    s.store.add_user("bob", W2, true);

    let (a, mut rx_a) = s.hub.register().await.unwrap();
    let (b, mut rx_b) = s.hub.register().await.unwrap();

    s.hub.handle_text(a, &subscribe_frame(W1)).await;
    s.hub.handle_text(b, &subscribe_frame(W1)).await;
    s.hub.handle_text(b, &subscribe_frame(W2)).await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    let event = trade_event(&s.store, W2, "sig-w2").await;
    s.hub.dispatch(event).await;

    // A is not subscribed to W2: only the broadcast snapshot arrives
    let frames_a = drain(&mut rx_a);
    assert_eq!(frames_a.len(), 1);
    assert_eq!(frames_a[0].kind, MessageKind::UsersUpdate);
    assert_eq!(frames_a[0].data["user"]["walletAddress"], W2);

    // B gets the per-wallet update plus the broadcast
    let frames_b = drain(&mut rx_b);
    assert_eq!(frames_b.len(), 2);
    assert_eq!(frames_b[0].kind, MessageKind::TradeUpdate);
    assert_eq!(frames_b[0].data["walletAddress"], W2);
    assert_eq!(frames_b[0].data["trade"]["signature"], "sig-w2");
    assert_eq!(frames_b[1].kind, MessageKind::UsersUpdate);
}

#[tokio::test]
async fn test_unsubscribe_stops_per_wallet_updates() {
    let s = setup();
    s.store.add_user("alice", W1, true);

    let (id, mut rx) = s.hub.register().await.unwrap();
    s.hub.handle_text(id, &subscribe_frame(W1)).await;
    drain(&mut rx);

    let unsubscribe =
        json!({ "type": "UNSUBSCRIBE_WALLET", "data": { "walletAddress": W1 } }).to_string();
    s.hub.handle_text(id, &unsubscribe).await;

    let ack = drain(&mut rx);
    assert_eq!(ack[0].kind, MessageKind::UnsubscribeWallet);
    assert_eq!(ack[0].data["success"], true);

    let event = trade_event(&s.store, W1, "sig-w1").await;
    s.hub.dispatch(event).await;

    // Only the broadcast snapshot, no TRADE_UPDATE
    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, MessageKind::UsersUpdate);
}

#[tokio::test]
async fn test_malformed_json_keeps_connection_open() {
    let s = setup();
    let (id, mut rx) = s.hub.register().await.unwrap();
    drain(&mut rx);

    s.hub.handle_text(id, "{definitely not json").await;

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, MessageKind::Error);
    assert_eq!(frames[0].data["message"], "Invalid message format");

    // The connection survives and subsequent requests work
    assert_eq!(s.hub.client_count(), 1);
    s.hub.handle_text(id, &subscribe_frame(W1)).await;
    let frames = drain(&mut rx);
    assert_eq!(frames[0].kind, MessageKind::SubscribeWallet);
}

#[tokio::test]
async fn test_unknown_frame_kind_reports_error() {
    let s = setup();
    let (id, mut rx) = s.hub.register().await.unwrap();
    drain(&mut rx);

    let frame = json!({ "type": "TRADE_UPDATE", "data": {} }).to_string();
    s.hub.handle_text(id, &frame).await;

    let frames = drain(&mut rx);
    assert_eq!(frames[0].kind, MessageKind::Error);
    assert!(frames[0].data["message"]
        .as_str()
        .unwrap()
        .contains("Unknown message type"));
}

#[tokio::test]
async fn test_subscribe_without_wallet_reports_error() {
    let s = setup();
    let (id, mut rx) = s.hub.register().await.unwrap();
    drain(&mut rx);

    let frame = json!({ "type": "SUBSCRIBE_WALLET", "data": {} }).to_string();
    s.hub.handle_text(id, &frame).await;

    let frames = drain(&mut rx);
    assert_eq!(frames[0].kind, MessageKind::Error);
}

#[tokio::test]
async fn test_balance_and_pnl_updates_routed_to_subscribers() {
    let s = setup();
    s.store.add_user("alice", W1, true);

    let (id, mut rx) = s.hub.register().await.unwrap();
    s.hub.handle_text(id, &subscribe_frame(W1)).await;
    drain(&mut rx);

    s.hub
        .dispatch(MonitorEvent::Balance {
            wallet: W1.to_string(),
            update: BalanceUpdate {
                sol_balance: 1.5,
                tokens: vec![],
                timestamp: today(),
            },
        })
        .await;

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].kind, MessageKind::BalanceUpdate);
    assert_eq!(frames[0].data["balance"]["solBalance"], 1.5);
    assert_eq!(frames[1].kind, MessageKind::UsersUpdate);
}

#[tokio::test]
async fn test_unregister_removes_client() {
    let s = setup();
    let (id, _rx) = s.hub.register().await.unwrap();
    assert_eq!(s.hub.client_count(), 1);

    s.hub.unregister(id);
    assert_eq!(s.hub.client_count(), 0);
}

#[tokio::test]
async fn test_event_for_unknown_wallet_sends_no_snapshot() {
    let s = setup();
    let (id, mut rx) = s.hub.register().await.unwrap();
    s.hub.handle_text(id, &subscribe_frame(W1)).await;
    drain(&mut rx);

    // No user row for W1: subscribers still get the per-wallet frame, but
    // there is no snapshot to broadcast
    let event = trade_event(&s.store, W1, "sig-orphan").await;
    s.hub.dispatch(event).await;

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, MessageKind::TradeUpdate);
}

#[tokio::test]
async fn test_snapshot_resolves_token_metadata() {
    let s = setup();
    s.store.add_user("alice", W1, true);

    let (id, mut rx) = s.hub.register().await.unwrap();
    s.hub.handle_text(id, &subscribe_frame(W1)).await;
    drain(&mut rx);

    let event = trade_event(&s.store, W1, "sig-meta").await;
    s.hub.dispatch(event).await;

    let frames = drain(&mut rx);
    let users_update = frames
        .iter()
        .find(|f| f.kind == MessageKind::UsersUpdate)
        .unwrap();

    // Wrapped SOL resolves to the fixed symbol
    assert_eq!(
        users_update.data["lastTrade"]["tokenBMeta"]["symbol"],
        "SOL"
    );
    // The unknown mint gets a synthesized first3...last3 symbol
    let token_a = users_update.data["lastTrade"]["tokenAMeta"]["symbol"]
        .as_str()
        .unwrap();
    assert!(token_a.contains("..."));
}
