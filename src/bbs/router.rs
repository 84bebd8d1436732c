//! # Dispatcher
//!
//! Single entry point for every inbound message that survived ingress
//! classification. A message is routed to exactly one of:
//!
//! ```text
//!                      ┌────────────┐
//!   is_sync ──────────▶│ sync apply │  (never touches sessions)
//!                      └────────────┘
//!                      ┌────────────┐   ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//!   interactive ──────▶│ sub-session│──▶│ quick command│──▶│ routing     │──▶│ multi-step    │
//!                      │ (game)     │   │ (sm,, cm ..) │   │ table       │   │ handler / help│
//!                      └────────────┘   └──────────────┘   └─────────────┘   └───────────────┘
//! ```
//!
//! Precedence: an active game consumes everything except the exit token; quick
//! commands beat menus and steps; anything unrecognized lands on help.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relaybbs::bbs::router::Router;
//! use relaybbs::bbs::blackjack::{Blackjack, RandomDeck};
//! use relaybbs::bbs::commands::Settings;
//! use relaybbs::bbs::nodes::NodeDirectory;
//! use relaybbs::storage::{games::MemoryGameStore, Storage};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Storage::new("./data").await?;
//!     let game = Blackjack::new(Box::new(MemoryGameStore::new()), Box::new(RandomDeck));
//!     let mut router = Router::new(storage, NodeDirectory::new(), vec![], Settings::default(), Box::new(game));
//!     let out = router.dispatch(0x1234, "q", false).await;
//!     println!("{:?}", out.replies_to(0x1234));
//!     Ok(())
//! }
//! ```

use log::{debug, error, info, warn};

use super::commands::{self, Context, Settings};
use super::menus::{self, Handler, StateAction, StatelessAction, TableId};
use super::nodes::NodeDirectory;
use super::outbox::Outbox;
use super::quick::{self, QuickCommand};
use super::session::{Menu, SessionState, SessionStore};
use super::subsession::{SubSession, SubSessionReply};
use crate::config::format_node_id;
use crate::logutil::{escape_log, sync_preview};
use crate::metrics;
use crate::storage::Storage;
use crate::sync::{self, SyncRecord};

/// Global exit token.
pub const EXIT_TOKEN: &str = "x";

const APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// Lower-case and trim; a two-character input ending in the exit token
/// collapses to its first character (held-key artifacts).
pub fn normalize(message: &str) -> String {
    let lower = message.trim().to_lowercase();
    let mut chars = lower.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(first), Some('x'), None) => first.to_string(),
        _ => lower,
    }
}

/// Where step (d) of dispatch sends a message.
enum Route {
    Table(TableId),
    Js8call { step: u8 },
    GroupMessages { step: u8, groups: Vec<String> },
}

fn resolve_route(session: Option<&SessionState>) -> Route {
    match session {
        Some(SessionState::Menu(menu)) => Route::Table(menus::menu_table(*menu)),
        Some(SessionState::BulletinMenu) => Route::Table(TableId::BulletinBoard),
        Some(SessionState::BulletinAction { .. }) => Route::Table(TableId::BoardAction),
        Some(SessionState::Js8callMenu { step }) => Route::Js8call { step: *step },
        Some(SessionState::GroupMessages { step, groups }) => Route::GroupMessages {
            step: *step,
            groups: groups.clone(),
        },
        _ => Route::Table(TableId::Main),
    }
}

pub struct Router {
    storage: Storage,
    sessions: SessionStore,
    nodes: NodeDirectory,
    peers: Vec<u32>,
    settings: Settings,
    game: Box<dyn SubSession>,
}

impl Router {
    pub fn new(
        storage: Storage,
        nodes: NodeDirectory,
        peers: Vec<u32>,
        settings: Settings,
        game: Box<dyn SubSession>,
    ) -> Self {
        Self {
            storage,
            sessions: SessionStore::new(),
            nodes,
            peers,
            settings,
            game,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Direct storage access for feeds outside the dispatcher (JS8Call log import).
    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn session(&self, sender: u32) -> Option<&SessionState> {
        self.sessions.get(sender)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn nodes_mut(&mut self) -> &mut NodeDirectory {
        &mut self.nodes
    }

    pub fn peers(&self) -> &[u32] {
        &self.peers
    }

    /// Process one inbound message and return what should be sent.
    pub async fn dispatch(&mut self, sender: u32, message: &str, is_sync: bool) -> Outbox {
        let mut outbox = Outbox::new();
        if is_sync {
            self.apply_sync(sender, message, &mut outbox).await;
        } else {
            debug!("from {:08x}: {}", sender, escape_log(message));
            self.nodes.touch(sender);
            self.interactive(sender, message, &mut outbox).await;
        }
        outbox
    }

    async fn apply_sync(&mut self, sender: u32, message: &str, outbox: &mut Outbox) {
        let line = message.trim();
        let record = match SyncRecord::parse(line) {
            Ok(r) => r,
            Err(e) => {
                metrics::inc_sync_dropped();
                warn!(
                    target: "relaybbs::sync",
                    "dropping sync from {:08x}: {} ({})",
                    sender,
                    e,
                    sync_preview(line)
                );
                return;
            }
        };
        match sync::apply(&record, &mut self.storage, &self.settings.urgent_board).await {
            Ok(report) => {
                if let Some(text) = report.notify {
                    outbox.broadcast(text);
                }
            }
            Err(e) => {
                metrics::inc_sync_dropped();
                error!(
                    target: "relaybbs::sync",
                    "apply failed for {} from {:08x}: {}",
                    record.kind(),
                    sender,
                    e
                );
            }
        }
    }

    async fn interactive(&mut self, sender: u32, message: &str, outbox: &mut Outbox) {
        let original = message.trim();
        let normalized = normalize(message);
        let player = format_node_id(sender);
        let in_game = self.sessions.get(sender).map(SessionState::is_game).unwrap_or(false);

        let Router {
            storage,
            sessions,
            nodes,
            peers,
            settings,
            game,
        } = self;
        let game: &mut dyn SubSession = &mut **game;
        let mut cx = Context {
            storage,
            sessions,
            nodes: &*nodes,
            peers: peers.as_slice(),
            settings: &*settings,
            outbox,
        };

        if in_game {
            if normalized == EXIT_TOKEN {
                leave_game(game, &player);
                commands::help(&mut cx, sender, Menu::Main);
                return;
            }
            match game.handle(&player, original) {
                SubSessionReply::Reply(text) => {
                    cx.outbox.reply(sender, text);
                    return;
                }
                SubSessionReply::Exit => {
                    leave_game(game, &player);
                    commands::help(&mut cx, sender, Menu::Main);
                    return;
                }
                SubSessionReply::Decline => {}
            }
        }

        let result = match quick::parse(&normalized, original) {
            Some(cmd) => run_quick(&mut cx, sender, cmd).await,
            None => route(&mut cx, game, sender, original, &normalized).await,
        };
        if let Err(e) = result {
            warn!("handler error for {:08x}: {}", sender, e);
            cx.outbox.reply(sender, APOLOGY);
        }
        // Routed out of the game by a menu token or help fallback.
        if in_game && !cx.sessions.get(sender).map(SessionState::is_game).unwrap_or(false) {
            leave_game(game, &player);
        }
    }
}

fn leave_game(game: &mut dyn SubSession, player: &str) {
    game.end(player);
    let counter = metrics::record_game_exit(game.slug());
    info!(
        target: "relaybbs::games",
        "{} left {} (active {})",
        player,
        game.slug(),
        counter.currently_active
    );
}

async fn run_quick(cx: &mut Context<'_>, sender: u32, cmd: QuickCommand) -> anyhow::Result<()> {
    debug!("quick command from {:08x}: {:?}", sender, cmd);
    match cmd {
        QuickCommand::SendMail {
            recipient,
            subject,
            content,
        } => commands::send_mail_quick(cx, sender, &recipient, &subject, &content).await?,
        QuickCommand::CheckMail => commands::check_mail(cx, sender),
        QuickCommand::PostBulletin {
            board,
            subject,
            content,
        } => commands::post_bulletin_quick(cx, sender, &board, &subject, &content).await?,
        QuickCommand::CheckBulletin { board } => commands::check_bulletin(cx, sender, &board),
        QuickCommand::PostChannel { name, url } => {
            commands::post_channel_quick(cx, sender, &name, &url).await?
        }
        QuickCommand::ListChannels => {
            commands::list_channels(cx, sender, SessionState::ListChannels)
        }
        QuickCommand::Usage(text) => cx.outbox.reply(sender, text),
    }
    Ok(())
}

/// Menu tables, then multi-step handlers, then help.
async fn route(
    cx: &mut Context<'_>,
    game: &mut dyn SubSession,
    sender: u32,
    original: &str,
    normalized: &str,
) -> anyhow::Result<()> {
    let session = cx.sessions.get(sender).cloned();

    let table_id = match resolve_route(session.as_ref()) {
        Route::Table(id) => id,
        Route::Js8call { step } => {
            commands::js8call_step(cx, sender, original, step);
            return Ok(());
        }
        Route::GroupMessages { step, groups } => {
            commands::group_message_step(cx, sender, original, step, &groups);
            return Ok(());
        }
    };

    if normalized == EXIT_TOKEN {
        commands::help(cx, sender, Menu::Main);
        return Ok(());
    }

    if let Some(handler) = menus::table(table_id).lookup(normalized) {
        match handler {
            Handler::Stateless(action) => run_stateless(cx, game, sender, action),
            Handler::StateAware(action) => run_state_aware(cx, sender, action, session.as_ref()),
        }
        return Ok(());
    }

    let Some(session) = session else {
        commands::help(cx, sender, Menu::Main);
        return Ok(());
    };

    match session {
        SessionState::Mail { step, draft } => {
            commands::mail_step(cx, sender, original, step, draft).await?
        }
        SessionState::CheckMail { step: 1, ids, .. } => {
            commands::read_mail(cx, sender, original, ids)
        }
        SessionState::CheckMail {
            step: 2, selected, ..
        } => commands::confirm_delete_mail(cx, sender, original, selected).await?,
        SessionState::CheckBulletin { ids } => {
            commands::read_checked_bulletin(cx, sender, original, &ids)
        }
        SessionState::CheckChannel | SessionState::ListChannels => {
            commands::read_channel(cx, sender, original)
        }
        SessionState::Stats => commands::stats_step(cx, sender, original),
        SessionState::ChannelDirectory { step, draft_name } => {
            commands::channel_directory_step(cx, sender, original, step, draft_name).await?
        }
        // Bulletin flows each live at one fixed step.
        SessionState::BulletinRead { ids, .. } => {
            commands::bulletin_read_step(cx, sender, original, &ids)
        }
        SessionState::BulletinPost { board } => {
            commands::bulletin_subject_step(cx, sender, original, board)
        }
        SessionState::BulletinPostContent {
            board,
            subject,
            lines,
        } => commands::bulletin_content_step(cx, sender, original, board, subject, lines).await?,
        SessionState::Js8callMenu { step } => {
            commands::js8call_step(cx, sender, original, step)
        }
        SessionState::GroupMessages { step, groups } => {
            commands::group_message_step(cx, sender, original, step, &groups)
        }
        _ => commands::help(cx, sender, Menu::Main),
    }
    Ok(())
}

fn run_stateless(
    cx: &mut Context<'_>,
    game: &mut dyn SubSession,
    sender: u32,
    action: StatelessAction,
) {
    match action {
        StatelessAction::QuickHelp => commands::quick_help(cx, sender),
        StatelessAction::ShowMenu(menu) => commands::help(cx, sender, menu),
        StatelessAction::Mail => commands::mail_menu(cx, sender),
        StatelessAction::Bulletins => commands::bulletin_menu(cx, sender),
        StatelessAction::ChannelDirectory => commands::channel_directory(cx, sender),
        StatelessAction::Js8call => commands::js8call_menu(cx, sender),
        StatelessAction::Stats => commands::stats(cx, sender),
        StatelessAction::Fortune => commands::fortune(cx, sender),
        StatelessAction::WallOfShame => commands::wall_of_shame(cx, sender),
        StatelessAction::SelectBoard(board) => commands::select_board(cx, sender, board),
        StatelessAction::Blackjack => enter_game(cx, game, sender),
    }
}

fn run_state_aware(
    cx: &mut Context<'_>,
    sender: u32,
    action: StateAction,
    session: Option<&SessionState>,
) {
    let Some(SessionState::BulletinAction { board }) = session else {
        commands::help(cx, sender, Menu::Main);
        return;
    };
    match action {
        StateAction::ReadBoard => commands::read_board(cx, sender, board),
        StateAction::PostBoard => commands::post_board(cx, sender, board),
    }
}

fn enter_game(cx: &mut Context<'_>, game: &mut dyn SubSession, sender: u32) {
    if !cx.settings.blackjack_enabled {
        commands::help(cx, sender, Menu::Main);
        return;
    }
    let player = format_node_id(sender);
    let counter = metrics::record_game_entry(game.slug());
    info!(
        target: "relaybbs::games",
        "{} entered {} (active {})",
        player,
        game.slug(),
        counter.currently_active
    );
    cx.sessions.set(sender, SessionState::BlackjackGame);
    cx.outbox.reply(sender, game.intro(&player));
}
