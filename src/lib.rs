//! # Relay BBS - store-and-forward bulletin board for mesh radio networks
//!
//! A menu-driven BBS that users reach by direct message, with bulletins,
//! private mail, a channel directory, JS8Call message browsing, a few
//! utilities and a blackjack game. Several BBS nodes on one mesh keep their
//! content in step by exchanging pipe-delimited sync records.
//!
//! ## Features
//!
//! - **Menu sessions**: per-sender state machine with single-letter navigation and a global `x` exit.
//! - **Quick commands**: `SM,,`, `CM`, `PB,,`, `CB,,`, `CHP,,`, `CHL` work from any context.
//! - **Replication**: idempotent `BULLETIN|`, `MAIL|`, `DELETE_BULLETIN|`, `DELETE_MAIL|`, `CHANNEL|` records.
//! - **Blackjack**: nested sub-session with per-player persisted hands.
//! - **Paced output**: replies are chunked to the radio frame budget and scheduled by priority.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relaybbs::config::Config;
//! use relaybbs::bbs::BbsServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut server = BbsServer::new(config).await?;
//!     server.handle_direct(0x0a0b0c0d, "b").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bbs`] - server, router, sessions, handlers and the blackjack sub-session
//! - [`sync`] - sync record codec and idempotent apply
//! - [`storage`] - bulletins, mail, channels, JS8Call messages, game records
//! - [`config`] - TOML configuration and node id helpers
//! - [`validation`] - field sanitizing and board names
//! - [`metrics`] - process-wide counters

pub mod bbs;
pub mod config;
pub mod logutil;
pub mod metrics;
pub mod storage;
pub mod sync;
pub mod validation;
