//! # BBS Core
//!
//! Everything between a decoded text packet and the frames sent back out.
//!
//! ## Components
//!
//! - [`server`] - lifecycle, ingress wiring, chunking and scheduling of replies
//! - [`ingress`] - sync / interactive / ignored classification
//! - [`router`] - per-sender dispatch: game, quick command, menu table, step handler
//! - [`session`] - per-sender conversational state
//! - [`menus`] - routing tables and menu texts
//! - [`quick`] - one-shot `,,`-delimited commands
//! - [`commands`] - handlers for every menu action and multi-step flow
//! - [`subsession`] / [`blackjack`] - the nested game session
//! - [`scheduler`] - outbound pacing queue
//!
//! ```text
//! ┌─────────────────┐
//! │  BbsServer      │ ← classify, deliver, pace
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Router         │ ← sessions, tables, sub-session
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Handlers       │ ← storage, outbox (replies, replication, broadcasts)
//! └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relaybbs::bbs::BbsServer;
//! use relaybbs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut server = BbsServer::new(config).await?;
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     server.run(stdin).await
//! }
//! ```

pub mod blackjack;
pub mod commands;
pub mod fortune;
pub mod ingress;
pub mod menus;
pub mod nodes;
pub mod outbox;
pub mod quick;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod subsession;

pub use server::BbsServer;
