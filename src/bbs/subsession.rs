//! Nested sub-sessions.
//!
//! While a user's top-level session sits in a designated state, the router
//! offers every message to the active [`SubSession`] first. The sub-session
//! answers with one of three outcomes; only [`SubSessionReply::Reply`] stops
//! further dispatch.

/// Outcome of offering one message to a sub-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubSessionReply {
    /// Handled; send this text to the player.
    Reply(String),
    /// Not an input this sub-session handles right now.
    Decline,
    /// The player left; the caller shows the outer menu.
    Exit,
}

pub trait SubSession: Send {
    /// Stable identifier used for logs and metrics.
    fn slug(&self) -> &'static str;

    /// Greeting sent when a player enters.
    fn intro(&self, player: &str) -> String;

    fn handle(&mut self, player: &str, text: &str) -> SubSessionReply;

    /// Drop any per-player state. Called when the player leaves via the exit token.
    fn end(&mut self, player: &str);
}
