//! # Peer replication
//!
//! BBS nodes keep their replicas converged by sending each other pipe-delimited
//! records as direct messages:
//!
//! ```text
//! BULLETIN|<board>|<authorShortName>|<subject>|<content>|<uniqueId>
//! MAIL|<senderId>|<senderShortName>|<recipientId>|<subject>|<content>|<uniqueId>
//! DELETE_BULLETIN|<uniqueId>
//! DELETE_MAIL|<uniqueId>
//! CHANNEL|<channelName>|<channelUrl>
//! ```
//!
//! Delivery is at-least-once at best, so [`apply`] is idempotent: creates are
//! keyed by the unique id (channels by name + url) and deletes of absent records
//! are no-ops. The content field may itself contain `|`; the unique id is split
//! off from the right.

use anyhow::Result;
use log::{debug, info};
use thiserror::Error;

use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::{Applied, Storage};

/// Record type tags, in classification priority order.
pub const SYNC_PREFIXES: [&str; 5] = [
    "BULLETIN|",
    "MAIL|",
    "DELETE_BULLETIN|",
    "DELETE_MAIL|",
    "CHANNEL|",
];

/// True when `text` starts with one of the literal sync prefixes.
pub fn is_sync_message(text: &str) -> bool {
    SYNC_PREFIXES.iter().any(|p| text.starts_with(p))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("unrecognized sync prefix")]
    UnknownPrefix,

    #[error("malformed {kind} record: expected {expected} fields, found {found}")]
    Malformed {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("empty {0} in {1} record")]
    EmptyField(&'static str, &'static str),

    #[error("invalid node id '{0}' in MAIL record")]
    BadNodeId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRecord {
    Bulletin {
        board: String,
        author_short_name: String,
        subject: String,
        content: String,
        unique_id: String,
    },
    Mail {
        sender_id: u32,
        sender_short_name: String,
        recipient_id: u32,
        subject: String,
        content: String,
        unique_id: String,
    },
    DeleteBulletin {
        unique_id: String,
    },
    DeleteMail {
        unique_id: String,
    },
    Channel {
        name: String,
        url: String,
    },
}

/// Split `body` into `lead` fields from the left, then the remainder into
/// `(content, unique_id)` from the right.
fn split_lead_and_tail<'a>(
    body: &'a str,
    lead: usize,
    kind: &'static str,
) -> Result<(Vec<&'a str>, &'a str, &'a str), SyncError> {
    let expected = lead + 2;
    let mut parts: Vec<&str> = body.splitn(lead + 1, '|').collect();
    if parts.len() < lead + 1 {
        return Err(SyncError::Malformed {
            kind,
            expected,
            found: parts.len(),
        });
    }
    let rest = parts.pop().unwrap_or_default();
    let Some((content, unique_id)) = rest.rsplit_once('|') else {
        return Err(SyncError::Malformed {
            kind,
            expected,
            found: lead + 1,
        });
    };
    if unique_id.is_empty() {
        return Err(SyncError::EmptyField("unique id", kind));
    }
    Ok((parts, content, unique_id))
}

fn single_id(body: &str, kind: &'static str) -> Result<String, SyncError> {
    // Original senders never append extra fields, but tolerate trailing ones.
    let id = body.split('|').next().unwrap_or_default();
    if id.is_empty() {
        return Err(SyncError::EmptyField("unique id", kind));
    }
    Ok(id.to_string())
}

fn node_field(raw: &str) -> Result<u32, SyncError> {
    crate::config::parse_node_id(raw).ok_or_else(|| SyncError::BadNodeId(raw.to_string()))
}

impl SyncRecord {
    /// Parse a sync line. Prefixes are matched literally and case-sensitively.
    pub fn parse(line: &str) -> Result<SyncRecord, SyncError> {
        if let Some(body) = line.strip_prefix("BULLETIN|") {
            let (lead, content, unique_id) = split_lead_and_tail(body, 3, "BULLETIN")?;
            return Ok(SyncRecord::Bulletin {
                board: lead[0].to_string(),
                author_short_name: lead[1].to_string(),
                subject: lead[2].to_string(),
                content: content.to_string(),
                unique_id: unique_id.to_string(),
            });
        }
        if let Some(body) = line.strip_prefix("MAIL|") {
            let (lead, content, unique_id) = split_lead_and_tail(body, 4, "MAIL")?;
            return Ok(SyncRecord::Mail {
                sender_id: node_field(lead[0])?,
                sender_short_name: lead[1].to_string(),
                recipient_id: node_field(lead[2])?,
                subject: lead[3].to_string(),
                content: content.to_string(),
                unique_id: unique_id.to_string(),
            });
        }
        if let Some(body) = line.strip_prefix("DELETE_BULLETIN|") {
            return Ok(SyncRecord::DeleteBulletin {
                unique_id: single_id(body, "DELETE_BULLETIN")?,
            });
        }
        if let Some(body) = line.strip_prefix("DELETE_MAIL|") {
            return Ok(SyncRecord::DeleteMail {
                unique_id: single_id(body, "DELETE_MAIL")?,
            });
        }
        if let Some(body) = line.strip_prefix("CHANNEL|") {
            let Some((name, url)) = body.split_once('|') else {
                return Err(SyncError::Malformed {
                    kind: "CHANNEL",
                    expected: 2,
                    found: 1,
                });
            };
            if name.is_empty() || url.is_empty() {
                return Err(SyncError::EmptyField("name or url", "CHANNEL"));
            }
            return Ok(SyncRecord::Channel {
                name: name.to_string(),
                url: url.to_string(),
            });
        }
        Err(SyncError::UnknownPrefix)
    }

    /// Encode to the wire form. Node ids are written in decimal.
    pub fn encode(&self) -> String {
        match self {
            SyncRecord::Bulletin {
                board,
                author_short_name,
                subject,
                content,
                unique_id,
            } => format!(
                "BULLETIN|{}|{}|{}|{}|{}",
                board, author_short_name, subject, content, unique_id
            ),
            SyncRecord::Mail {
                sender_id,
                sender_short_name,
                recipient_id,
                subject,
                content,
                unique_id,
            } => format!(
                "MAIL|{}|{}|{}|{}|{}|{}",
                sender_id, sender_short_name, recipient_id, subject, content, unique_id
            ),
            SyncRecord::DeleteBulletin { unique_id } => format!("DELETE_BULLETIN|{}", unique_id),
            SyncRecord::DeleteMail { unique_id } => format!("DELETE_MAIL|{}", unique_id),
            SyncRecord::Channel { name, url } => format!("CHANNEL|{}|{}", name, url),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncRecord::Bulletin { .. } => "BULLETIN",
            SyncRecord::Mail { .. } => "MAIL",
            SyncRecord::DeleteBulletin { .. } => "DELETE_BULLETIN",
            SyncRecord::DeleteMail { .. } => "DELETE_MAIL",
            SyncRecord::Channel { .. } => "CHANNEL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record changed local state.
    Applied,
    /// A create whose key was already present.
    Duplicate,
    /// A delete whose record was already gone.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcome: ApplyOutcome,
    /// Broadcast text to send to all nodes, if this apply warrants one.
    pub notify: Option<String>,
}

impl ApplyReport {
    fn quiet(outcome: ApplyOutcome) -> Self {
        Self {
            outcome,
            notify: None,
        }
    }
}

fn outcome_of(applied: Applied) -> ApplyOutcome {
    match applied {
        Applied::Inserted => ApplyOutcome::Applied,
        Applied::Duplicate => ApplyOutcome::Duplicate,
    }
}

/// Public notice for a new bulletin on the urgent board.
pub fn urgent_notice(author: &str, subject: &str, board: &str) -> String {
    format!(
        "NEW URGENT BULLETIN\nFrom: {}\nTitle: {}\nDM 'CB,,{}' to view",
        author, subject, board
    )
}

/// Apply one record to local storage.
///
/// The urgent broadcast is only requested when the bulletin was newly stored,
/// so replays never repeat the notification.
pub async fn apply(
    record: &SyncRecord,
    storage: &mut Storage,
    urgent_board: &str,
) -> Result<ApplyReport> {
    let report = match record {
        SyncRecord::Bulletin {
            board,
            author_short_name,
            subject,
            content,
            unique_id,
        } => {
            let (_, applied) = storage
                .add_bulletin(board, author_short_name, subject, content, Some(unique_id))
                .await?;
            let notify = (applied.is_new() && board.eq_ignore_ascii_case(urgent_board))
                .then(|| urgent_notice(author_short_name, subject, board));
            ApplyReport {
                outcome: outcome_of(applied),
                notify,
            }
        }
        SyncRecord::Mail {
            sender_id,
            sender_short_name,
            recipient_id,
            subject,
            content,
            unique_id,
        } => {
            let (_, applied) = storage
                .add_mail(
                    *sender_id,
                    sender_short_name,
                    *recipient_id,
                    subject,
                    content,
                    Some(unique_id),
                )
                .await?;
            ApplyReport::quiet(outcome_of(applied))
        }
        SyncRecord::DeleteBulletin { unique_id } => {
            if storage.delete_bulletin(unique_id).await? {
                ApplyReport::quiet(ApplyOutcome::Applied)
            } else {
                ApplyReport::quiet(ApplyOutcome::Absent)
            }
        }
        SyncRecord::DeleteMail { unique_id } => {
            // The record may vanish between lookup and delete under re-delivery;
            // both paths end as a no-op.
            match storage.mail_recipient(unique_id) {
                Some(recipient) if storage.delete_mail(unique_id, recipient).await? => {
                    ApplyReport::quiet(ApplyOutcome::Applied)
                }
                _ => ApplyReport::quiet(ApplyOutcome::Absent),
            }
        }
        SyncRecord::Channel { name, url } => {
            ApplyReport::quiet(outcome_of(storage.add_channel(name, url).await?))
        }
    };

    match report.outcome {
        ApplyOutcome::Applied => {
            metrics::inc_sync_applied();
            info!(
                target: "relaybbs::sync",
                "applied {} {}",
                record.kind(),
                escape_log(&record_key(record))
            );
        }
        ApplyOutcome::Duplicate => {
            metrics::inc_sync_duplicate();
            debug!(
                target: "relaybbs::sync",
                "duplicate {} {} ignored",
                record.kind(),
                escape_log(&record_key(record))
            );
        }
        ApplyOutcome::Absent => {
            metrics::inc_sync_absent();
            debug!(
                target: "relaybbs::sync",
                "{} {} already absent",
                record.kind(),
                escape_log(&record_key(record))
            );
        }
    }
    Ok(report)
}

/// Idempotency key of a record, for logs.
fn record_key(record: &SyncRecord) -> String {
    match record {
        SyncRecord::Bulletin { unique_id, .. }
        | SyncRecord::Mail { unique_id, .. }
        | SyncRecord::DeleteBulletin { unique_id }
        | SyncRecord::DeleteMail { unique_id } => unique_id.clone(),
        SyncRecord::Channel { name, url } => format!("{} {}", name, url),
    }
}
