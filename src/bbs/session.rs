//! Per-sender interactive session state.
//!
//! A session is a tagged union: the variant names the command family that
//! owns the conversation and carries exactly the fields its steps need.
//! Absence of a session is equivalent to sitting at the main menu.
//!
//! ```text
//!   (none) ──help──▶ Menu(Main) ──b──▶ Menu(Bbs) ──m──▶ Mail{step 1}
//!                        ▲                              │
//!                        └────────────── x ─────────────┘
//! ```

use std::collections::HashMap;

use log::trace;

/// Top-level menu contexts reachable through `help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Menu {
    Main,
    Bbs,
    Utilities,
    Games,
}

impl Menu {
    pub fn as_str(self) -> &'static str {
        match self {
            Menu::Main => "main",
            Menu::Bbs => "bbs",
            Menu::Utilities => "utilities",
            Menu::Games => "games",
        }
    }
}

/// In-progress mail composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailDraft {
    pub recipient_id: Option<u32>,
    pub recipient_short_name: String,
    pub subject: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Menu(Menu),
    /// Choosing a board.
    BulletinMenu,
    /// A board is selected; read or post.
    BulletinAction {
        board: String,
    },
    BulletinRead {
        board: String,
        ids: Vec<String>,
    },
    /// Waiting for the subject of a new bulletin.
    BulletinPost {
        board: String,
    },
    /// Collecting bulletin body lines until `END`.
    BulletinPostContent {
        board: String,
        subject: String,
        lines: Vec<String>,
    },
    Mail {
        step: u8,
        draft: MailDraft,
    },
    CheckMail {
        step: u8,
        ids: Vec<String>,
        selected: Option<String>,
    },
    CheckBulletin {
        ids: Vec<String>,
    },
    CheckChannel,
    ListChannels,
    Stats,
    ChannelDirectory {
        step: u8,
        draft_name: Option<String>,
    },
    Js8callMenu {
        step: u8,
    },
    GroupMessages {
        step: u8,
        groups: Vec<String>,
    },
    /// The card game sub-session owns input.
    BlackjackGame,
}

impl SessionState {
    /// Command family name, used in logs.
    pub fn command(&self) -> &'static str {
        match self {
            SessionState::Menu(_) => "MENU",
            SessionState::BulletinMenu => "BULLETIN_MENU",
            SessionState::BulletinAction { .. } => "BULLETIN_ACTION",
            SessionState::BulletinRead { .. } => "BULLETIN_READ",
            SessionState::BulletinPost { .. } => "BULLETIN_POST",
            SessionState::BulletinPostContent { .. } => "BULLETIN_POST_CONTENT",
            SessionState::Mail { .. } => "MAIL",
            SessionState::CheckMail { .. } => "CHECK_MAIL",
            SessionState::CheckBulletin { .. } => "CHECK_BULLETIN",
            SessionState::CheckChannel => "CHECK_CHANNEL",
            SessionState::ListChannels => "LIST_CHANNELS",
            SessionState::Stats => "STATS",
            SessionState::ChannelDirectory { .. } => "CHANNEL_DIRECTORY",
            SessionState::Js8callMenu { .. } => "JS8CALL_MENU",
            SessionState::GroupMessages { .. } => "GROUP_MESSAGES",
            SessionState::BlackjackGame => "BLACKJACK_GAME",
        }
    }

    /// Current step. Single-stage states report 1.
    pub fn step(&self) -> u8 {
        match self {
            SessionState::Mail { step, .. }
            | SessionState::CheckMail { step, .. }
            | SessionState::ChannelDirectory { step, .. }
            | SessionState::Js8callMenu { step }
            | SessionState::GroupMessages { step, .. } => *step,
            _ => 1,
        }
    }

    pub fn is_game(&self) -> bool {
        matches!(self, SessionState::BlackjackGame)
    }
}

/// Sessions keyed by sender node id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<u32, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sender: u32) -> Option<&SessionState> {
        self.sessions.get(&sender)
    }

    pub fn set(&mut self, sender: u32, state: SessionState) {
        trace!("session {:08x} -> {}", sender, state.command());
        self.sessions.insert(sender, state);
    }

    pub fn clear(&mut self, sender: u32) {
        self.sessions.remove(&sender);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_relative_to_command() {
        let s = SessionState::Mail {
            step: 3,
            draft: MailDraft::default(),
        };
        assert_eq!(s.step(), 3);
        assert_eq!(s.command(), "MAIL");
        assert_eq!(SessionState::CheckChannel.step(), 1);
    }

    #[test]
    fn store_set_get_clear() {
        let mut store = SessionStore::new();
        assert!(store.get(7).is_none());
        store.set(7, SessionState::BlackjackGame);
        assert!(store.get(7).map(SessionState::is_game).unwrap_or(false));
        store.clear(7);
        assert!(store.is_empty());
    }
}
