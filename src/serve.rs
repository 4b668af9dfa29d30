//! Live streaming server — pushes block, stats, and daily-series updates
//! over a WebSocket, one subscriber per connection.
//!
//! A connection hosts up to three independent channels (`NEW_BLOCKS`,
//! `STATS`, `DAILY_TRX`), each a self-rescheduling polling task: the next
//! tick is scheduled only after the current tick's fetch settles, so a slow
//! provider never produces overlapping in-flight fetches on one channel.
//! Closing the connection aborts every channel task.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::{
        WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::rpc::{BlockId, ExplorerClient};
use crate::serialize::to_wire;
use crate::stats;
use crate::types::{Block, FeeData};

/// Base poll interval for the new-blocks channel.
const NEW_BLOCKS_POLL: Duration = Duration::from_millis(500);
/// Backoff ceiling while the head is not advancing.
const NEW_BLOCKS_POLL_MAX: Duration = Duration::from_secs(8);
/// Stats snapshot interval.
const STATS_POLL: Duration = Duration::from_secs(7);
/// Daily-series refresh interval.
const DAILY_TRX_POLL: Duration = Duration::from_secs(12 * 60 * 60);

/// The chain lookups a streaming channel needs. Implemented by
/// [`ExplorerClient`]; tests drive the channel loops with scripted fakes.
pub trait ChainSource: Send + Sync + 'static {
    fn head_number(&self) -> impl Future<Output = Option<u64>> + Send;
    fn latest_block(&self) -> impl Future<Output = Option<Block>> + Send;
    fn transaction_count(&self, number: u64) -> impl Future<Output = Option<u64>> + Send;
    fn fee_data(&self) -> impl Future<Output = Option<FeeData>> + Send;
}

impl ChainSource for ExplorerClient {
    async fn head_number(&self) -> Option<u64> {
        self.get_block_number().await
    }

    async fn latest_block(&self) -> Option<Block> {
        self.get_block(BlockId::Latest, false).await
    }

    async fn transaction_count(&self, number: u64) -> Option<u64> {
        self.get_block_transaction_count(BlockId::Number(number)).await
    }

    async fn fee_data(&self) -> Option<FeeData> {
        self.get_fee_data().await
    }
}

/// Inbound subscription request. Unknown `type` tags fail to parse and are
/// ignored by the connection loop.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum InitMessage {
    #[serde(rename = "INIT")]
    NewBlocks {
        #[serde(rename = "rpcUrl")]
        rpc_url: String,
    },
    #[serde(rename = "STATS_INIT")]
    Stats {
        #[serde(rename = "rpcUrl")]
        rpc_url: String,
    },
    #[serde(rename = "DAILY_TRX_INIT")]
    DailyTrx {
        #[serde(rename = "rpcUrl")]
        rpc_url: String,
    },
}

impl InitMessage {
    fn rpc_url(&self) -> &str {
        match self {
            InitMessage::NewBlocks { rpc_url }
            | InitMessage::Stats { rpc_url }
            | InitMessage::DailyTrx { rpc_url } => rpc_url,
        }
    }

    fn channel(&self) -> Channel {
        match self {
            InitMessage::NewBlocks { .. } => Channel::NewBlocks,
            InitMessage::Stats { .. } => Channel::Stats,
            InitMessage::DailyTrx { .. } => Channel::DailyTrx,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    NewBlocks,
    Stats,
    DailyTrx,
}

/// Tracks the last-observed head; a push is warranted only on a strict
/// advance.
#[derive(Debug)]
pub struct HeadTracker {
    last: u64,
}

impl HeadTracker {
    pub fn new(baseline: u64) -> Self {
        Self { last: baseline }
    }

    /// Record an observed head. Returns true iff it advanced past the
    /// previous one.
    pub fn observe(&mut self, head: u64) -> bool {
        if head > self.last {
            self.last = head;
            true
        } else {
            false
        }
    }
}

/// Build the new-block push frame: the serialized block merged with its
/// transaction count.
pub fn block_push_payload(block: &Block, transactions_count: u64) -> eyre::Result<serde_json::Value> {
    let mut value = to_wire(block)?;
    value["transactionsCount"] = json!(transactions_count);
    Ok(value)
}

/// Run the streaming server.
pub async fn run(bind: &str, port: u16) -> eyre::Result<()> {
    let app = Router::new().route("/ws", get(ws_handler));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("Streaming server at ws://{addr}/ws");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade) -> impl axum::response::IntoResponse {
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(socket: WebSocket) {
    info!("Client connected");
    let (mut sink, mut stream) = socket.split();

    // Channel tasks push frames here; one writer task owns the sink.
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let _ = tx
        .send(json!({"message": "Connected to WebSocket"}).to_string())
        .await;

    let mut channels: HashMap<Channel, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let init: InitMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                debug!("Ignoring unrecognized message: {e}");
                continue;
            }
        };

        let client = match ExplorerClient::new(init.rpc_url()) {
            Ok(c) => c,
            Err(e) => {
                warn!("Rejecting init with bad rpcUrl: {e}");
                let _ = tx
                    .send(json!({"type": "ERROR", "error": format!("invalid rpcUrl: {e}")}).to_string())
                    .await;
                continue;
            }
        };

        let channel = init.channel();
        // Re-init replaces the running channel.
        if let Some(old) = channels.remove(&channel) {
            old.abort();
        }

        let out = tx.clone();
        let handle = match channel {
            Channel::NewBlocks => tokio::spawn(new_blocks_channel(client, out)),
            Channel::Stats => tokio::spawn(stats_channel(client, out)),
            Channel::DailyTrx => tokio::spawn(daily_trx_channel(out)),
        };
        channels.insert(channel, handle);
        debug!("Channel {channel:?} active");
    }

    for (_, handle) in channels {
        handle.abort();
    }
    drop(tx);
    let _ = writer.await;
    info!("Client disconnected");
}

/// Poll the chain head and push each block that advances it, with its
/// transaction count merged in. Backs off while the head is quiet.
async fn new_blocks_channel<S: ChainSource>(source: S, out: mpsc::Sender<String>) {
    let Some(baseline) = source.head_number().await else {
        warn!("New-blocks channel could not reach the chain head");
        let _ = out
            .send(json!({"type": "ERROR", "error": "could not fetch chain head"}).to_string())
            .await;
        return;
    };

    let mut tracker = HeadTracker::new(baseline);
    let mut wait = NEW_BLOCKS_POLL;

    loop {
        tokio::time::sleep(wait).await;

        let Some(block) = source.latest_block().await else {
            continue;
        };
        let Some(number) = block.number() else {
            continue;
        };

        if !tracker.observe(number) {
            wait = (wait * 2).min(NEW_BLOCKS_POLL_MAX);
            continue;
        }
        wait = NEW_BLOCKS_POLL;

        let count = match source.transaction_count(number).await {
            Some(c) => c,
            None => block.tx_count() as u64,
        };

        match block_push_payload(&block, count) {
            Ok(payload) => {
                if out.send(payload.to_string()).await.is_err() {
                    return;
                }
            }
            Err(e) => debug!("Failed to serialize block push: {e}"),
        }
    }
}

/// Push a fresh stats snapshot every tick. A failed fee fetch skips the
/// tick (the adapter already logged it), never fatal to the channel.
async fn stats_channel<S: ChainSource>(source: S, out: mpsc::Sender<String>) {
    loop {
        tokio::time::sleep(STATS_POLL).await;

        let Some(fee) = source.fee_data().await else {
            continue;
        };
        let snapshot = stats::stats_from_gas_price(fee.gas_price);
        match to_wire(&json!({"type": "STATS_UPDATE", "stats": snapshot})) {
            Ok(frame) => {
                if out.send(frame.to_string()).await.is_err() {
                    return;
                }
            }
            Err(e) => debug!("Failed to serialize stats push: {e}"),
        }
    }
}

/// Push the one-year series immediately, then refresh on a long interval.
async fn daily_trx_channel(out: mpsc::Sender<String>) {
    loop {
        let series = stats::daily_tx_series();
        let frame = json!({"type": "DAILY_TRX_UPDATE", "data": series}).to_string();
        if out.send(frame).await.is_err() {
            return;
        }
        tokio::time::sleep(DAILY_TRX_POLL).await;
    }
}
