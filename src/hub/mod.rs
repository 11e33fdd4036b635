//! Push hub
//!
//! Fans monitor events out to WebSocket subscribers. Each connection holds a
//! set of subscribed wallets; per-wallet update frames go to subscribers
//! only, while every event also triggers a `USERS_UPDATE` broadcast carrying
//! the affected wallet's full snapshot, which is how the dashboard re-ranks
//! traders.

pub mod protocol;
pub mod snapshot;

use crate::clock::Clock;
use crate::error::AppResult;
use crate::events::MonitorEvent;
use crate::store::Store;
use crate::token::TokenRegistry;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use protocol::{Frame, MessageKind, SubscribeRequest};
use serde_json::json;
use snapshot::build_snapshot;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-connection state
struct Client {
    tx: mpsc::UnboundedSender<String>,
    wallets: HashSet<String>,
}

/// Connection registry and event router
pub struct Hub {
    store: Arc<dyn Store>,
    registry: Arc<TokenRegistry>,
    clock: Arc<dyn Clock>,
    clients: Mutex<HashMap<u64, Client>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<TokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection; the `USERS_LIST` frame is the first queued
    /// message on the returned receiver
    pub async fn register(&self) -> AppResult<(u64, mpsc::UnboundedReceiver<String>)> {
        let users_list = self.users_list_frame().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(users_list.to_text());

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.lock().insert(
            id,
            Client {
                tx,
                wallets: HashSet::new(),
            },
        );

        debug!(client_id = id, "Subscriber connected");
        Ok((id, rx))
    }

    /// Drop a connection; its subscriptions die with it
    pub fn unregister(&self, id: u64) {
        self.clients.lock().remove(&id);
        debug!(client_id = id, "Subscriber disconnected");
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Handle one incoming text frame from a client
    pub async fn handle_text(&self, id: u64, text: &str) {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(_) => {
                self.send_to(id, &Frame::error("Invalid message format"));
                return;
            }
        };

        match frame.kind {
            MessageKind::SubscribeWallet => self.handle_subscribe(id, frame, true),
            MessageKind::UnsubscribeWallet => self.handle_subscribe(id, frame, false),
            other => {
                let kind = serde_json::to_value(other)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                self.send_to(id, &Frame::error(format!("Unknown message type: {}", kind)));
            }
        }
    }

    fn handle_subscribe(&self, id: u64, frame: Frame, subscribe: bool) {
        let request: SubscribeRequest = match serde_json::from_value(frame.data) {
            Ok(request) => request,
            Err(_) => {
                self.send_to(id, &Frame::error("walletAddress is required"));
                return;
            }
        };

        let wallet = request.wallet_address;
        {
            let mut clients = self.clients.lock();
            if let Some(client) = clients.get_mut(&id) {
                if subscribe {
                    client.wallets.insert(wallet.clone());
                } else {
                    client.wallets.remove(&wallet);
                }
            }
        }

        debug!(client_id = id, wallet = %wallet, subscribe = subscribe, "Subscription changed");
        self.send_to(id, &Frame::ack(frame.kind, &wallet));
    }

    /// Route one monitor event: a per-wallet update to subscribers, then a
    /// `USERS_UPDATE` snapshot broadcast to everyone
    pub async fn dispatch(&self, event: MonitorEvent) {
        let wallet = event.wallet().to_string();

        let update = match &event {
            MonitorEvent::Trade { trade, .. } => Frame::new(
                MessageKind::TradeUpdate,
                json!({ "walletAddress": wallet, "trade": trade }),
            ),
            MonitorEvent::Balance { update, .. } => Frame::new(
                MessageKind::BalanceUpdate,
                json!({ "walletAddress": wallet, "balance": update }),
            ),
            MonitorEvent::Pnl { pnl, .. } => Frame::new(
                MessageKind::PnlUpdate,
                json!({ "walletAddress": wallet, "pnl": pnl }),
            ),
        };

        self.send_to_subscribers(&wallet, &update);
        self.broadcast_snapshot(&wallet).await;
    }

    /// Consume the monitor event stream until cancelled
    pub async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<MonitorEvent>,
        cancel: CancellationToken,
    ) {
        info!("Push hub dispatcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Push hub dispatcher shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) => self.dispatch(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Push hub lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    async fn broadcast_snapshot(&self, wallet: &str) {
        let user = match self.store.user_by_wallet(wallet).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "User lookup failed for snapshot");
                return;
            }
        };

        match build_snapshot(&self.store, &self.registry, &self.clock, user).await {
            Ok(snapshot) => {
                let frame = Frame::new(MessageKind::UsersUpdate, &snapshot);
                self.send_to_all(&frame);
            }
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "Snapshot assembly failed");
            }
        }
    }

    /// Snapshot every known user, ordered by last activity
    async fn users_list_frame(&self) -> AppResult<Frame> {
        let users = self.store.all_users_by_last_active().await?;

        let mut snapshots = Vec::with_capacity(users.len());
        for user in users {
            let wallet = user.wallet_address.clone();
            match build_snapshot(&self.store, &self.registry, &self.clock, user).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(wallet = %wallet, error = %e, "Skipping snapshot in users list");
                }
            }
        }

        Ok(Frame::new(MessageKind::UsersList, &snapshots))
    }

    fn send_to(&self, id: u64, frame: &Frame) {
        let clients = self.clients.lock();
        if let Some(client) = clients.get(&id) {
            // A closed channel means the socket is going away; drop silently
            let _ = client.tx.send(frame.to_text());
        }
    }

    fn send_to_subscribers(&self, wallet: &str, frame: &Frame) {
        let text = frame.to_text();
        let clients = self.clients.lock();
        for client in clients.values() {
            if client.wallets.contains(wallet) {
                let _ = client.tx.send(text.clone());
            }
        }
    }

    fn send_to_all(&self, frame: &Frame) {
        let text = frame.to_text();
        let clients = self.clients.lock();
        for client in clients.values() {
            let _ = client.tx.send(text.clone());
        }
    }
}

/// Router exposing the push channel at `/ws`
pub fn router(hub: Arc<Hub>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(hub)
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, hub))
}

/// Bridge one socket to the hub
///
/// Every exit path unregisters the client and lets the socket drop.
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (id, mut rx) = match hub.register().await {
        Ok(registered) => registered,
        Err(e) => {
            warn!(error = %e, "Subscriber registration failed");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let hub_recv = hub.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => hub_recv.handle_text(id, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    hub.unregister(id);
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("clients", &self.client_count())
            .finish()
    }
}
