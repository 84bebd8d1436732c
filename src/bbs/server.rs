use anyhow::Result;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use super::blackjack::{Blackjack, RandomDeck};
use super::commands::Settings;
use super::ingress::{self, Inbound, TextEvent};
use super::nodes::NodeDirectory;
use super::outbox::Outbound;
use super::router::Router;
use super::scheduler::{
    start_scheduler, MessageCategory, MessageEnvelope, OutgoingMessage, Priority, SchedulerHandle,
};
use crate::config::{format_node_id, Config};
use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::games::{GameStore, MemoryGameStore, SledGameStore};
use crate::storage::Storage;

/// # BBS Server
///
/// Owns the [`Router`] and wires it to a transport:
///
/// ```text
/// ┌─────────────┐   TextEvent   ┌──────────┐  dispatch  ┌──────────┐
/// │  transport  │──────────────▶│ ingress  │───────────▶│  Router  │
/// └─────────────┘               └──────────┘            └──────────┘
///        ▲                                                    │ Outbox
///        │ OutgoingMessage  ┌───────────┐   chunk + priority  │
///        └──────────────────│ scheduler │◀────────────────────┘
///                           └───────────┘
/// ```
///
/// Without an attached outgoing channel the server runs in mock mode: every
/// outbound chunk is recorded in `test_messages` as `(destination, text)`,
/// with `"BCAST"` standing in for broadcasts.
///
/// ## Usage
///
/// ```rust,no_run
/// use relaybbs::bbs::BbsServer;
/// use relaybbs::config::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config.toml").await?;
///     let mut server = BbsServer::new(config).await?;
///     server.handle_direct(0x1234, "h").await?;
///     for (to, text) in server.test_messages() {
///         println!("{} <- {}", to, text);
///     }
///     Ok(())
/// }
/// ```
pub struct BbsServer {
    config: Config,
    router: Router,
    scheduler: Option<SchedulerHandle>,
    own_id: Option<u32>,
    peers: Vec<u32>,
    max_message_size: usize,
    test_messages: Vec<(String, String)>,
}

/// Split `text` into pieces of at most `max_bytes`, preferring newline
/// boundaries and never splitting a UTF-8 sequence.
pub fn chunk_utf8(text: &str, max_bytes: usize) -> Vec<String> {
    if text.len() <= max_bytes || max_bytes == 0 {
        return vec![text.to_string()];
    }
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_bytes {
            chunks.push(remaining.to_string());
            break;
        }
        let mut end = max_bytes;
        while end > 0 && !remaining.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // single char wider than the budget
            end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }
        let slice = &remaining[..end];
        if let Some(pos) = slice.rfind('\n') {
            // only break on a newline in the back half of the window
            if pos > 0 && pos + 1 >= end / 2 {
                chunks.push(slice[..pos].to_string());
                remaining = &remaining[pos + 1..];
                continue;
            }
        }
        chunks.push(slice.to_string());
        remaining = &remaining[end..];
    }
    chunks
}

fn open_game_store(config: &Config) -> Box<dyn GameStore> {
    let path = config.blackjack_db_path();
    match SledGameStore::open(&path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(
                "Blackjack store at {} unavailable ({}); game records will not persist",
                path.display(),
                e
            );
            Box::new(MemoryGameStore::new())
        }
    }
}

impl BbsServer {
    /// Open storage and the game store described by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        let storage = Storage::new(&config.storage.data_dir).await?;
        let game = Blackjack::new(open_game_store(&config), Box::new(RandomDeck));
        let nodes = NodeDirectory::from_seeds(&config.nodes);
        let router = Router::new(
            storage,
            nodes,
            config.peer_ids(),
            Self::settings_from(&config),
            Box::new(game),
        );
        Ok(Self::with_router(config, router))
    }

    /// Build around an existing router (custom deck, in-memory store).
    pub fn with_router(config: Config, router: Router) -> Self {
        let own_id = config.own_node_id();
        let peers = router.peers().to_vec();
        if own_id.is_none() {
            warn!("bbs.node_id is not set; direct messages cannot be recognized");
        }
        let max_message_size = config.storage.max_message_size;
        Self {
            config,
            router,
            scheduler: None,
            own_id,
            peers,
            max_message_size,
            test_messages: Vec::new(),
        }
    }

    pub fn settings_from(config: &Config) -> Settings {
        Settings {
            bbs_name: config.bbs.name.clone(),
            urgent_board: config.bbs.urgent_board.clone(),
            blackjack_enabled: config.games.blackjack_enabled,
        }
    }

    /// Leave mock mode: start the scheduler feeding `outgoing`.
    pub fn attach_outgoing(&mut self, outgoing: mpsc::UnboundedSender<OutgoingMessage>) {
        let handle = start_scheduler(self.config.scheduler.to_runtime(), outgoing);
        self.scheduler = Some(handle);
    }

    pub fn scheduler_handle(&self) -> Option<SchedulerHandle> {
        self.scheduler.clone()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn test_messages(&self) -> &Vec<(String, String)> {
        &self.test_messages
    }

    pub fn take_test_messages(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.test_messages)
    }

    /// Classify one inbound packet and act on it.
    pub async fn route_text_event(&mut self, ev: TextEvent) -> Result<()> {
        self.router.nodes_mut().touch(ev.source);
        match ingress::classify(&ev, self.own_id, &self.peers) {
            Inbound::Sync => {
                let outbox = self.router.dispatch(ev.source, &ev.content, true).await;
                self.deliver(outbox.into_items(), ev.channel);
            }
            Inbound::Interactive => {
                let outbox = self.router.dispatch(ev.source, &ev.content, false).await;
                self.deliver(outbox.into_items(), ev.channel);
            }
            Inbound::Ignored => {}
        }
        Ok(())
    }

    /// Treat `text` as a direct message from `from`, skipping ingress checks.
    pub async fn handle_direct(&mut self, from: u32, text: &str) -> Result<()> {
        self.router.nodes_mut().touch(from);
        let outbox = self.router.dispatch(from, text, false).await;
        self.deliver(outbox.into_items(), 0);
        Ok(())
    }

    /// Apply one sync line as if `peer` had sent it.
    pub async fn handle_sync(&mut self, peer: u32, line: &str) -> Result<()> {
        let outbox = self.router.dispatch(peer, line, true).await;
        self.deliver(outbox.into_items(), 0);
        Ok(())
    }

    fn deliver(&mut self, items: Vec<Outbound>, channel: u32) {
        let mut replicated = 0u64;
        for item in items {
            let (to, text, category, priority) = match item {
                Outbound::Reply { to, text } => {
                    (Some(to), text, MessageCategory::Direct, Priority::High)
                }
                Outbound::Replicate { to, text } => {
                    replicated += 1;
                    (Some(to), text, MessageCategory::Replication, Priority::Normal)
                }
                Outbound::Broadcast { text } => (None, text, MessageCategory::Broadcast, Priority::Low),
            };
            // sync records are single-line by construction; never split them
            let parts = if category == MessageCategory::Replication {
                vec![text]
            } else {
                chunk_utf8(&text, self.max_message_size)
            };
            for part in parts {
                self.send(to, channel, part, category, priority);
            }
        }
        if replicated > 0 {
            metrics::add_sync_sent(replicated);
        }
    }

    fn send(
        &mut self,
        to: Option<u32>,
        channel: u32,
        content: String,
        category: MessageCategory,
        priority: Priority,
    ) {
        match &self.scheduler {
            Some(handle) => {
                debug!(
                    "queue {:?} to {}: {}",
                    category,
                    to.map(format_node_id).unwrap_or_else(|| "BCAST".into()),
                    escape_log(&content)
                );
                let msg = OutgoingMessage {
                    to_node: to,
                    channel,
                    content,
                };
                handle.enqueue(MessageEnvelope::new(category, priority, Duration::ZERO, msg));
            }
            None => {
                let dest = match to {
                    Some(id) => format_node_id(id),
                    None => "BCAST".to_string(),
                };
                self.test_messages.push((dest, content));
            }
        }
    }

    /// Main loop: one loopback frame per input line until EOF or Ctrl+C.
    pub async fn run<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(
            "BBS '{}' started as {} with {} peer(s)",
            self.config.bbs.name,
            self.own_id
                .map(format_node_id)
                .unwrap_or_else(|| "<unset>".into()),
            self.peers.len()
        );
        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            match ingress::parse_frame(&line) {
                                Some(ev) => self.route_text_event(ev).await?,
                                None => warn!("Unparseable frame: {}", escape_log(&line)),
                            }
                        }
                        None => {
                            info!("Input closed");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C");
                    break;
                }
            }
        }
        self.shutdown().await
    }

    pub async fn show_status(&self) -> Result<()> {
        let counts = self.router.storage().counts();
        println!("=== Relay BBS Status ===");
        println!("BBS Name: {}", self.config.bbs.name);
        println!(
            "Node ID: {}",
            self.own_id
                .map(format_node_id)
                .unwrap_or_else(|| "not configured".into())
        );
        println!(
            "Peers: {}",
            if self.peers.is_empty() {
                "none".to_string()
            } else {
                self.peers
                    .iter()
                    .map(|p| format_node_id(*p))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        );
        println!("Active Sessions: {}", self.router.session_count());
        println!("Bulletins: {}", counts.bulletins);
        println!("Mail: {}", counts.mail);
        println!("Channels: {}", counts.channels);
        println!("JS8Call Messages: {}", counts.js8);
        let snap = metrics::snapshot();
        println!(
            "Sync: applied={} duplicate={} absent={} dropped={} sent={}",
            snap.sync_applied, snap.sync_duplicate, snap.sync_absent, snap.sync_dropped, snap.sync_sent
        );
        Ok(())
    }

    /// Drain the scheduler and stop.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down BBS server...");
        if let Some(handle) = self.scheduler.take() {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
            while tokio::time::Instant::now() < deadline {
                match handle.snapshot().await {
                    Some(stats) if stats.queued > 0 => {
                        tokio::time::sleep(Duration::from_millis(100)).await
                    }
                    _ => break,
                }
            }
            if let Some(stats) = handle.snapshot().await {
                if stats.queued > 0 {
                    warn!("{} queued message(s) discarded at shutdown", stats.queued);
                }
            }
            handle.shutdown().await;
        }
        info!("BBS server shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_utf8("hello", 200), vec!["hello".to_string()]);
    }

    #[test]
    fn chunks_respect_budget_and_boundaries() {
        let text = "é".repeat(150);
        let chunks = chunk_utf8(&text, 201);
        assert!(chunks.iter().all(|c| c.len() <= 201));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn prefers_newlines() {
        let text = format!("{}\n{}", "a".repeat(150), "b".repeat(100));
        let chunks = chunk_utf8(&text, 200);
        assert_eq!(chunks[0], "a".repeat(150));
        assert_eq!(chunks[1], "b".repeat(100));
    }
}
