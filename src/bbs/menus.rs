//! Routing tables and menu text.
//!
//! Each menu context has an immutable token table. Entries are tagged as
//! stateless (the handler needs nothing from the session) or state-aware (the
//! dispatcher hands over the current session, e.g. to learn the selected board).
//! Every table carries the `x` exit token.

use super::session::Menu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatelessAction {
    QuickHelp,
    ShowMenu(Menu),
    Mail,
    Bulletins,
    ChannelDirectory,
    Js8call,
    Stats,
    Fortune,
    WallOfShame,
    Blackjack,
    SelectBoard(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    ReadBoard,
    PostBoard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Stateless(StatelessAction),
    StateAware(StateAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableId {
    Main,
    Bbs,
    Utilities,
    Games,
    BulletinBoard,
    BoardAction,
}

pub struct RoutingTable {
    pub id: TableId,
    entries: &'static [(&'static str, Handler)],
}

impl RoutingTable {
    pub fn lookup(&self, token: &str) -> Option<Handler> {
        self.entries
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, h)| *h)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }
}

use Handler::{StateAware, Stateless};
use StatelessAction as A;

const EXIT: (&str, Handler) = ("x", Stateless(A::ShowMenu(Menu::Main)));

static MAIN: RoutingTable = RoutingTable {
    id: TableId::Main,
    entries: &[
        ("q", Stateless(A::QuickHelp)),
        ("b", Stateless(A::ShowMenu(Menu::Bbs))),
        ("u", Stateless(A::ShowMenu(Menu::Utilities))),
        ("g", Stateless(A::ShowMenu(Menu::Games))),
        EXIT,
    ],
};

static BBS: RoutingTable = RoutingTable {
    id: TableId::Bbs,
    entries: &[
        ("m", Stateless(A::Mail)),
        ("b", Stateless(A::Bulletins)),
        ("c", Stateless(A::ChannelDirectory)),
        ("j", Stateless(A::Js8call)),
        EXIT,
    ],
};

static UTILITIES: RoutingTable = RoutingTable {
    id: TableId::Utilities,
    entries: &[
        ("s", Stateless(A::Stats)),
        ("f", Stateless(A::Fortune)),
        ("w", Stateless(A::WallOfShame)),
        EXIT,
    ],
};

static GAMES: RoutingTable = RoutingTable {
    id: TableId::Games,
    entries: &[("b", Stateless(A::Blackjack)), EXIT],
};

static BULLETIN_BOARD: RoutingTable = RoutingTable {
    id: TableId::BulletinBoard,
    entries: &[
        ("g", Stateless(A::SelectBoard("General"))),
        ("i", Stateless(A::SelectBoard("Info"))),
        ("n", Stateless(A::SelectBoard("News"))),
        ("u", Stateless(A::SelectBoard("Urgent"))),
        EXIT,
    ],
};

static BOARD_ACTION: RoutingTable = RoutingTable {
    id: TableId::BoardAction,
    entries: &[
        ("r", StateAware(StateAction::ReadBoard)),
        ("p", StateAware(StateAction::PostBoard)),
        EXIT,
    ],
};

pub fn table(id: TableId) -> &'static RoutingTable {
    match id {
        TableId::Main => &MAIN,
        TableId::Bbs => &BBS,
        TableId::Utilities => &UTILITIES,
        TableId::Games => &GAMES,
        TableId::BulletinBoard => &BULLETIN_BOARD,
        TableId::BoardAction => &BOARD_ACTION,
    }
}

pub fn menu_table(menu: Menu) -> TableId {
    match menu {
        Menu::Main => TableId::Main,
        Menu::Bbs => TableId::Bbs,
        Menu::Utilities => TableId::Utilities,
        Menu::Games => TableId::Games,
    }
}

pub fn menu_text(menu: Menu) -> &'static str {
    match menu {
        Menu::Main => "Main Menu\n[Q]uick Commands\n[B]BS\n[U]tilities\n[G]ames\nE[X]IT",
        Menu::Bbs => "BBS Menu\n[M]ail\n[B]ulletins\n[C]hannel Dir\n[J]S8CALL\nE[X]IT",
        Menu::Utilities => "Utilities Menu\n[S]tats\n[F]ortune\n[W]all of Shame\nE[X]IT",
        Menu::Games => "Games Menu\n[B]lackjack\nE[X]IT",
    }
}

pub const BOARD_MENU: &str = "Bulletin Boards\n[G]eneral\n[I]nfo\n[N]ews\n[U]rgent\nE[X]IT";

pub fn board_action_text(board: &str) -> String {
    format!("{} Board\n[R]ead\n[P]ost\nE[X]IT", board)
}

pub const QUICK_HELP: &str = "Quick Commands\n\
SM,,{short},,{subject},,{message}\n\
CM - check mail\n\
PB,,{board},,{subject},,{message}\n\
CB,,{board}\n\
CHP,,{name},,{url}\n\
CHL - list channels\n\
X - main menu";

pub const STATS_MENU: &str = "Stats\n[N]odes\n[H]ardware\n[R]oles\nE[X]IT";
pub const CHANNEL_DIR_MENU: &str = "Channel Directory\n[V]iew\n[P]ost\nE[X]IT";
pub const JS8_MENU: &str =
    "JS8Call Menu\n[G]roup Messages\n[S]tation Messages\n[U]rgent Messages\nE[X]IT";
pub const MAIL_MENU: &str = "Mail\n[R]ead\n[S]end\nE[X]IT";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TableId; 6] = [
        TableId::Main,
        TableId::Bbs,
        TableId::Utilities,
        TableId::Games,
        TableId::BulletinBoard,
        TableId::BoardAction,
    ];

    #[test]
    fn every_table_exits_to_main() {
        for id in ALL {
            assert_eq!(
                table(id).lookup("x"),
                Some(Handler::Stateless(StatelessAction::ShowMenu(Menu::Main))),
                "{id:?}"
            );
        }
    }

    #[test]
    fn token_sets_match_menus() {
        let tokens = |id| table(id).tokens().collect::<Vec<_>>().join("");
        assert_eq!(tokens(TableId::Main), "qbugx");
        assert_eq!(tokens(TableId::Bbs), "mbcjx");
        assert_eq!(tokens(TableId::Utilities), "sfwx");
        assert_eq!(tokens(TableId::Games), "bx");
        assert_eq!(tokens(TableId::BulletinBoard), "ginux");
        assert_eq!(tokens(TableId::BoardAction), "rpx");
    }

    #[test]
    fn board_actions_are_state_aware() {
        assert!(matches!(
            table(TableId::BoardAction).lookup("r"),
            Some(Handler::StateAware(StateAction::ReadBoard))
        ));
        assert!(table(TableId::Main).lookup("r").is_none());
    }
}
