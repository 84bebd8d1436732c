//! Messages produced by one dispatch pass.
//!
//! The router never talks to the transport. It fills an [`Outbox`]; the server
//! drains it into the scheduler with a priority per kind.

use crate::sync::SyncRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Direct message to a user.
    Reply { to: u32, text: String },
    /// Sync record for a peer BBS node.
    Replicate { to: u32, text: String },
    /// Public broadcast.
    Broadcast { text: String },
}

#[derive(Debug, Default, Clone)]
pub struct Outbox {
    items: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&mut self, to: u32, text: impl Into<String>) {
        self.items.push(Outbound::Reply {
            to,
            text: text.into(),
        });
    }

    pub fn broadcast(&mut self, text: impl Into<String>) {
        self.items.push(Outbound::Broadcast { text: text.into() });
    }

    /// Queue `record` for every peer.
    pub fn replicate(&mut self, peers: &[u32], record: &SyncRecord) {
        let line = record.encode();
        for peer in peers {
            self.items.push(Outbound::Replicate {
                to: *peer,
                text: line.clone(),
            });
        }
    }

    pub fn items(&self) -> &[Outbound] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Outbound> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reply texts addressed to `to`, in order.
    pub fn replies_to(&self, to: u32) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|o| match o {
                Outbound::Reply { to: t, text } if *t == to => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|o| match o {
                Outbound::Broadcast { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn replications(&self) -> Vec<(u32, &str)> {
        self.items
            .iter()
            .filter_map(|o| match o {
                Outbound::Replicate { to, text } => Some((*to, text.as_str())),
                _ => None,
            })
            .collect()
    }
}
