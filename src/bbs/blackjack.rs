//! Blackjack sub-session.
//!
//! ```text
//!   NO_GAME ──deal──▶ PLAYING ──hit (≤21)──▶ PLAYING
//!      ▲                 │
//!      └── hit (>21) ────┤
//!      └── stay ─────────┤   dealer draws to ≥17, compare, record removed
//!      └── x ────────────┘   record removed, no text (caller shows menu)
//! ```
//!
//! Cards are point values: `2..=10`, three extra tens for face cards and `11`
//! for the ace. A two-card 21 is a distinguished [`Score::Blackjack`]. Game
//! state lives in a [`GameStore`] keyed by player, so a restart mid-hand resumes.
//!
//! Store failures never surface as errors to the player; they read as "no game
//! in progress".

use std::collections::VecDeque;
use std::fmt;

use log::{debug, warn};
use rand::seq::SliceRandom;

use super::subsession::{SubSession, SubSessionReply};
use crate::storage::games::{GameRecord, GameStore};

/// One shoe's worth of point values; drawn with replacement.
pub const CARDS: [u8; 13] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10, 10, 11];

const DEALER_STANDS_AT: u32 = 17;
const NO_GAME: &str = "No game in progress. Please start a new game from the menu.";
const PROMPT: &str = "Reply 'hit' or 'stay'.";
const AGAIN: &str = "Type 'deal' to start new game, or [X] to Exit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Two cards totalling 21. Beats every ordinary total.
    Blackjack,
    Points(u32),
}

impl Score {
    pub fn is_bust(self) -> bool {
        matches!(self, Score::Points(p) if p > 21)
    }

    fn stands(self) -> bool {
        match self {
            Score::Blackjack => true,
            Score::Points(p) => p >= DEALER_STANDS_AT,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Blackjack => f.write_str("Blackjack"),
            Score::Points(p) => write!(f, "{}", p),
        }
    }
}

/// Score a hand. Aces are demoted from 11 to 1, one at a time, while the
/// total exceeds 21.
pub fn score(cards: &[u8]) -> Score {
    let mut total: u32 = cards.iter().map(|c| u32::from(*c)).sum();
    if total == 21 && cards.len() == 2 {
        return Score::Blackjack;
    }
    let mut aces = cards.iter().filter(|c| **c == 11).count();
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    Score::Points(total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PlayerBust,
    DealerBust,
    Draw,
    PlayerBlackjack,
    DealerBlackjack,
    PlayerWins,
    DealerWins,
}

impl Outcome {
    pub fn message(self) -> &'static str {
        match self {
            Outcome::PlayerBust | Outcome::DealerWins => "You lose!",
            Outcome::DealerBust => "Dealer busted. You win!",
            Outcome::Draw => "It's a draw!",
            Outcome::PlayerBlackjack => "Blackjack! You win!",
            Outcome::DealerBlackjack => "Dealer has Blackjack! You lose!",
            Outcome::PlayerWins => "You win!",
        }
    }
}

/// Settle a finished hand. Checks run in a fixed precedence: player bust,
/// dealer bust, tie, player blackjack, dealer blackjack, higher total.
pub fn compare(player: Score, dealer: Score) -> Outcome {
    if player.is_bust() {
        return Outcome::PlayerBust;
    }
    if dealer.is_bust() {
        return Outcome::DealerBust;
    }
    if player == dealer {
        return Outcome::Draw;
    }
    match (player, dealer) {
        (Score::Blackjack, _) => Outcome::PlayerBlackjack,
        (_, Score::Blackjack) => Outcome::DealerBlackjack,
        (Score::Points(p), Score::Points(d)) if p > d => Outcome::PlayerWins,
        _ => Outcome::DealerWins,
    }
}

/// Source of cards.
pub trait Deck: Send {
    fn draw(&mut self) -> u8;
}

/// Uniform draw from [`CARDS`] with replacement.
#[derive(Debug, Default)]
pub struct RandomDeck;

impl Deck for RandomDeck {
    fn draw(&mut self) -> u8 {
        *CARDS.choose(&mut rand::thread_rng()).unwrap_or(&10)
    }
}

/// Predetermined cards, then 2s once exhausted.
#[derive(Debug, Default)]
pub struct StackedDeck {
    cards: VecDeque<u8>,
}

impl StackedDeck {
    pub fn new(cards: impl IntoIterator<Item = u8>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }
}

impl Deck for StackedDeck {
    fn draw(&mut self) -> u8 {
        self.cards.pop_front().unwrap_or(2)
    }
}

pub struct Blackjack {
    store: Box<dyn GameStore>,
    deck: Box<dyn Deck>,
}

impl Blackjack {
    pub fn new(store: Box<dyn GameStore>, deck: Box<dyn Deck>) -> Self {
        Self { store, deck }
    }

    fn deal(&mut self, player: &str) -> String {
        let player_cards = vec![self.deck.draw(), self.deck.draw()];
        let dealer_cards = vec![self.deck.draw()];
        let record = GameRecord::new(player_cards, dealer_cards);
        if let Err(e) = self.store.save(player, &record) {
            warn!(target: "relaybbs::games", "blackjack save failed for {}: {}", player, e);
            return NO_GAME.to_string();
        }
        debug!(target: "relaybbs::games", "blackjack deal for {}: {:?}", player, record.player_cards);
        format!(
            "{}: Your cards: {:?} (score: {}).\nDealer shows: {}. {}",
            player,
            record.player_cards,
            score(&record.player_cards),
            record.dealer_cards[0],
            PROMPT
        )
    }

    fn hit(&mut self, player: &str, mut record: GameRecord) -> String {
        record.player_cards.push(self.deck.draw());
        let s = score(&record.player_cards);
        if s.is_bust() {
            self.discard(player);
            return format!(
                "{}: You went over 21 with {:?} (score: {}). You lose!\n{}",
                player, record.player_cards, s, AGAIN
            );
        }
        if let Err(e) = self.store.save(player, &record) {
            warn!(target: "relaybbs::games", "blackjack save failed for {}: {}", player, e);
            return NO_GAME.to_string();
        }
        format!(
            "{}: Your cards: {:?} (score: {}). {}",
            player, record.player_cards, s, PROMPT
        )
    }

    fn stay(&mut self, player: &str, mut record: GameRecord) -> String {
        while !score(&record.dealer_cards).stands() {
            record.dealer_cards.push(self.deck.draw());
        }
        let player_score = score(&record.player_cards);
        let dealer_score = score(&record.dealer_cards);
        self.discard(player);
        debug!(
            target: "relaybbs::games",
            "blackjack settled for {}: player {} dealer {}",
            player, player_score, dealer_score
        );
        format!(
            "{}: Your final cards: {:?} (score: {})\nDealer's cards: {:?} (score: {})\n{}\n{}",
            player,
            record.player_cards,
            player_score,
            record.dealer_cards,
            dealer_score,
            compare(player_score, dealer_score).message(),
            AGAIN
        )
    }

    fn discard(&mut self, player: &str) {
        if let Err(e) = self.store.remove(player) {
            warn!(target: "relaybbs::games", "blackjack remove failed for {}: {}", player, e);
        }
    }
}

impl SubSession for Blackjack {
    fn slug(&self) -> &'static str {
        "blackjack"
    }

    fn intro(&self, _player: &str) -> String {
        "Welcome to Blackjack!\nType 'deal' to start a hand, or [X] to Exit.".to_string()
    }

    fn handle(&mut self, player: &str, text: &str) -> SubSessionReply {
        let input = text.trim().to_lowercase();
        if input == "deal" {
            return SubSessionReply::Reply(self.deal(player));
        }
        let record = match self.store.load(player) {
            Ok(Some(r)) => r,
            Ok(None) => return SubSessionReply::Decline,
            Err(e) => {
                warn!(target: "relaybbs::games", "blackjack load failed for {}: {}", player, e);
                return SubSessionReply::Reply(NO_GAME.to_string());
            }
        };
        match input.as_str() {
            "hit" => SubSessionReply::Reply(self.hit(player, record)),
            "stay" => SubSessionReply::Reply(self.stay(player, record)),
            "x" => {
                self.discard(player);
                SubSessionReply::Exit
            }
            _ => SubSessionReply::Reply(format!(
                "{}: Invalid move. Your cards: {:?} (score: {}).\nDealer shows: {}. {}",
                player,
                record.player_cards,
                score(&record.player_cards),
                record.dealer_cards.first().copied().unwrap_or_default(),
                PROMPT
            )),
        }
    }

    fn end(&mut self, player: &str) {
        self.discard(player);
    }
}
