//! Ingress adapter: decides whether an inbound text is sync traffic, an
//! interactive command, or noise.
//!
//! * From a configured peer and starting with a sync prefix → [`Inbound::Sync`].
//! * From a configured peer otherwise → ignored (peers do not use menus).
//! * From anyone else, addressed directly to this node → [`Inbound::Interactive`].
//! * Everything else (channel chatter, broadcasts, other nodes' DMs) → ignored.
//!
//! The loopback transport used by `relaybbs start` frames one event per line:
//!
//! ```text
//! in:  <from>\t<to>\t<text>      (ids as !hex or decimal; to may be "BCAST")
//! out: <to|BCAST>\t<text>
//! ```
//!
//! Embedded newlines travel as the two characters `\n`.

use log::debug;

use super::scheduler::OutgoingMessage;
use crate::config::{format_node_id, parse_node_id};
use crate::logutil::escape_log;
use crate::sync::is_sync_message;

/// Broadcast / group destinations that never count as a direct message.
pub const BROADCAST_ADDRS: [u32; 3] = [0, 255, u32::MAX];

/// A decoded text packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub source: u32,
    /// `None` for packets without a destination (treated as broadcast).
    pub dest: Option<u32>,
    pub channel: u32,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Sync,
    Interactive,
    Ignored,
}

pub fn is_direct_to(dest: Option<u32>, own_id: Option<u32>) -> bool {
    match (dest, own_id) {
        (Some(d), Some(own)) => d == own && !BROADCAST_ADDRS.contains(&d),
        _ => false,
    }
}

/// Classify an event against this node's identity and its peer set.
pub fn classify(event: &TextEvent, own_id: Option<u32>, peers: &[u32]) -> Inbound {
    if peers.contains(&event.source) {
        if is_sync_message(&event.content) {
            return Inbound::Sync;
        }
        debug!(
            "ignoring non-sync message from BBS peer {}",
            format_node_id(event.source)
        );
        return Inbound::Ignored;
    }
    if is_direct_to(event.dest, own_id) {
        return Inbound::Interactive;
    }
    debug!(
        "ignoring message from {} on channel {}: {}",
        format_node_id(event.source),
        event.channel,
        escape_log(&event.content)
    );
    Inbound::Ignored
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn escape(text: &str) -> String {
    text.replace('\n', "\\n")
}

/// Parse one loopback line. Returns `None` for blank or malformed lines.
pub fn parse_frame(line: &str) -> Option<TextEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.splitn(3, '\t');
    let source = parse_node_id(parts.next()?)?;
    let to = parts.next()?.trim();
    let content = parts.next()?;
    if content.trim().is_empty() {
        return None;
    }
    let dest = if to.eq_ignore_ascii_case("bcast") {
        None
    } else {
        Some(parse_node_id(to)?)
    };
    Some(TextEvent {
        source,
        dest,
        channel: 0,
        content: unescape(content),
    })
}

/// Render an outgoing message as a loopback line.
pub fn format_frame(msg: &OutgoingMessage) -> String {
    let to = match msg.to_node {
        Some(id) => format_node_id(id),
        None => "BCAST".to_string(),
    };
    format!("{}\t{}", to, escape(&msg.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(source: u32, dest: Option<u32>, content: &str) -> TextEvent {
        TextEvent {
            source,
            dest,
            channel: 0,
            content: content.into(),
        }
    }

    const OWN: Option<u32> = Some(0x100);
    const PEERS: [u32; 1] = [0x200];

    #[test]
    fn peers_only_send_sync() {
        assert_eq!(classify(&ev(0x200, OWN, "DELETE_MAIL|m1"), OWN, &PEERS), Inbound::Sync);
        assert_eq!(classify(&ev(0x200, None, "CHANNEL|a|b"), OWN, &PEERS), Inbound::Sync);
        assert_eq!(classify(&ev(0x200, OWN, "m"), OWN, &PEERS), Inbound::Ignored);
    }

    #[test]
    fn users_must_address_this_node() {
        assert_eq!(classify(&ev(0x300, OWN, "m"), OWN, &PEERS), Inbound::Interactive);
        assert_eq!(classify(&ev(0x300, None, "m"), OWN, &PEERS), Inbound::Ignored);
        assert_eq!(classify(&ev(0x300, Some(0x101), "m"), OWN, &PEERS), Inbound::Ignored);
        assert_eq!(classify(&ev(0x300, Some(u32::MAX), "m"), OWN, &PEERS), Inbound::Ignored);
        // Sync-looking text from a stranger is just a user command.
        assert_eq!(
            classify(&ev(0x300, OWN, "BULLETIN|a|b|c|d|e"), OWN, &PEERS),
            Inbound::Interactive
        );
    }

    #[test]
    fn unknown_own_id_accepts_nothing_interactive() {
        assert_eq!(classify(&ev(0x300, Some(0), "m"), None, &PEERS), Inbound::Ignored);
        assert!(!is_direct_to(Some(255), Some(255)));
    }

    #[test]
    fn frames() {
        let e = parse_frame("!00000300\t256\thello\\nworld\n").unwrap();
        assert_eq!(e.source, 0x300);
        assert_eq!(e.dest, Some(256));
        assert_eq!(e.content, "hello\nworld");
        assert_eq!(parse_frame("1\tBCAST\thi").unwrap().dest, None);
        assert!(parse_frame("garbage").is_none());
        assert!(parse_frame("1\t2\t  ").is_none());

        let out = OutgoingMessage {
            to_node: None,
            channel: 0,
            content: "a\nb".into(),
        };
        assert_eq!(format_frame(&out), "BCAST\ta\\nb");
    }
}
