//! # Storage Module - Data Persistence Layer
//!
//! Local replica of the bulletin boards, mail, channel directory and JS8Call
//! log. The same operations back both local user actions and the replication
//! apply layer in [`crate::sync`], so every create takes an optional caller
//! supplied unique id and is idempotent on it.
//!
//! ## Layout
//!
//! ```text
//! data/
//! ├── bulletins.json
//! ├── mail.json
//! ├── channels.json
//! ├── js8call.json
//! └── blackjack/      ← sled tree for game records (see [`games`])
//! ```
//!
//! Tables are loaded into memory at startup and rewritten on every mutation
//! with an exclusive `fs2` lock and an atomic temp-file rename.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relaybbs::storage::Storage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut storage = Storage::new("./data").await?;
//!     let (bulletin, _) = storage
//!         .add_bulletin("General", "ALCE", "Net tonight", "19:00 on LongFast", None)
//!         .await?;
//!     println!("stored {}", bulletin.unique_id);
//!     Ok(())
//! }
//! ```

pub mod games;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const BULLETINS_FILE: &str = "bulletins.json";
const MAIL_FILE: &str = "mail.json";
const CHANNELS_FILE: &str = "channels.json";
const JS8_FILE: &str = "js8call.json";

/// Result of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Duplicate,
}

impl Applied {
    pub fn is_new(self) -> bool {
        self == Applied::Inserted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bulletin {
    pub unique_id: String,
    pub board: String,
    pub sender_short_name: String,
    pub subject: String,
    pub content: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mail {
    pub unique_id: String,
    pub sender_id: u32,
    pub sender_short_name: String,
    pub recipient_id: u32,
    pub subject: String,
    pub content: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub url: String,
}

/// A message heard by the JS8Call client attached to this node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Js8Message {
    pub callsign: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub text: String,
    #[serde(default)]
    pub urgent: bool,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageCounts {
    pub bulletins: usize,
    pub mail: usize,
    pub channels: usize,
    pub js8: usize,
}

/// Main storage interface
pub struct Storage {
    data_dir: PathBuf,
    bulletins: Vec<Bulletin>,
    mail: Vec<Mail>,
    channels: Vec<Channel>,
    js8: Vec<Js8Message>,
}

impl Storage {
    /// Open storage rooted at `data_dir`, creating the directory if needed.
    pub async fn new(data_dir: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", data_dir, e))?;
        let root = PathBuf::from(data_dir);
        let storage = Storage {
            bulletins: Self::load_table(&root.join(BULLETINS_FILE)).await?,
            mail: Self::load_table(&root.join(MAIL_FILE)).await?,
            channels: Self::load_table(&root.join(CHANNELS_FILE)).await?,
            js8: Self::load_table(&root.join(JS8_FILE)).await?,
            data_dir: root,
        };
        debug!(
            "storage opened at {} ({:?})",
            storage.data_dir.display(),
            storage.counts()
        );
        Ok(storage)
    }

    /// Return the base data directory path used by this storage instance
    pub fn base_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn counts(&self) -> StorageCounts {
        StorageCounts {
            bulletins: self.bulletins.len(),
            mail: self.mail.len(),
            channels: self.channels.len(),
            js8: self.js8.len(),
        }
    }

    async fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        match fs::read_to_string(path).await {
            Ok(data) => {
                // Guard against any accidental leading NULs
                let cleaned = data.trim_start_matches('\0');
                if cleaned.trim().is_empty() {
                    return Ok(Vec::new());
                }
                serde_json::from_str(cleaned)
                    .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(anyhow!("Failed reading {}: {}", path.display(), e)),
        }
    }

    async fn persist<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<()> {
        let path = self.data_dir.join(file);
        let content = serde_json::to_string_pretty(rows)
            .map_err(|e| anyhow!("Failed to serialize {}: {}", file, e))?;
        Self::write_file_locked(&path, &content).await
    }

    /// Write `content` to `path` under an exclusive lock via temp file + rename.
    async fn write_file_locked(path: &Path, content: &str) -> Result<()> {
        use std::fs::{self, File, OpenOptions};
        use std::io::Write;

        // fs2 locks are synchronous; files here are small.
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("table.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => {
                    return Err(anyhow!("Failed to create temp file for {}: {}", base, e))
                }
            }
        };

        fs::rename(&tmp_path, path)?;
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        drop(lock_file);
        Ok(())
    }

    fn new_unique_id() -> String {
        Uuid::new_v4().to_string()
    }

    // ---- bulletins ----

    /// Store a bulletin. With `unique_id = None` a fresh id is generated; an id
    /// that is already present returns the stored record and `Applied::Duplicate`.
    pub async fn add_bulletin(
        &mut self,
        board: &str,
        sender_short_name: &str,
        subject: &str,
        content: &str,
        unique_id: Option<&str>,
    ) -> Result<(Bulletin, Applied)> {
        if let Some(existing) = unique_id.and_then(|id| self.bulletin(id)) {
            return Ok((existing.clone(), Applied::Duplicate));
        }
        let bulletin = Bulletin {
            unique_id: unique_id.map(str::to_string).unwrap_or_else(Self::new_unique_id),
            board: board.to_string(),
            sender_short_name: sender_short_name.to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
            date: Utc::now(),
        };
        let mut rows = self.bulletins.clone();
        rows.push(bulletin.clone());
        self.persist(BULLETINS_FILE, &rows).await?;
        self.bulletins = rows;
        Ok((bulletin, Applied::Inserted))
    }

    /// Bulletins on `board` (case-insensitive), newest first.
    pub fn bulletins_on(&self, board: &str) -> Vec<Bulletin> {
        let mut out: Vec<Bulletin> = self
            .bulletins
            .iter()
            .filter(|b| b.board.eq_ignore_ascii_case(board))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out
    }

    pub fn bulletin(&self, unique_id: &str) -> Option<&Bulletin> {
        self.bulletins.iter().find(|b| b.unique_id == unique_id)
    }

    /// Remove a bulletin. Returns `false` when it was already absent.
    pub async fn delete_bulletin(&mut self, unique_id: &str) -> Result<bool> {
        if self.bulletin(unique_id).is_none() {
            return Ok(false);
        }
        let mut rows = self.bulletins.clone();
        rows.retain(|b| b.unique_id != unique_id);
        self.persist(BULLETINS_FILE, &rows).await?;
        self.bulletins = rows;
        Ok(true)
    }

    // ---- mail ----

    pub async fn add_mail(
        &mut self,
        sender_id: u32,
        sender_short_name: &str,
        recipient_id: u32,
        subject: &str,
        content: &str,
        unique_id: Option<&str>,
    ) -> Result<(Mail, Applied)> {
        if let Some(existing) = unique_id.and_then(|id| self.mail(id)) {
            return Ok((existing.clone(), Applied::Duplicate));
        }
        let mail = Mail {
            unique_id: unique_id.map(str::to_string).unwrap_or_else(Self::new_unique_id),
            sender_id,
            sender_short_name: sender_short_name.to_string(),
            recipient_id,
            subject: subject.to_string(),
            content: content.to_string(),
            date: Utc::now(),
        };
        let mut rows = self.mail.clone();
        rows.push(mail.clone());
        self.persist(MAIL_FILE, &rows).await?;
        self.mail = rows;
        Ok((mail, Applied::Inserted))
    }

    /// Mail addressed to `recipient_id`, newest first.
    pub fn mail_for(&self, recipient_id: u32) -> Vec<Mail> {
        let mut out: Vec<Mail> = self
            .mail
            .iter()
            .filter(|m| m.recipient_id == recipient_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out
    }

    pub fn mail(&self, unique_id: &str) -> Option<&Mail> {
        self.mail.iter().find(|m| m.unique_id == unique_id)
    }

    /// Recipient lookup used by mail-delete replication; `None` when the record is gone.
    pub fn mail_recipient(&self, unique_id: &str) -> Option<u32> {
        self.mail(unique_id).map(|m| m.recipient_id)
    }

    /// Delete mail matching both id and recipient. Returns `false` when nothing matched.
    pub async fn delete_mail(&mut self, unique_id: &str, recipient_id: u32) -> Result<bool> {
        let mut rows = self.mail.clone();
        rows.retain(|m| !(m.unique_id == unique_id && m.recipient_id == recipient_id));
        if rows.len() == self.mail.len() {
            return Ok(false);
        }
        self.persist(MAIL_FILE, &rows).await?;
        self.mail = rows;
        Ok(true)
    }

    // ---- channel directory ----

    /// Add a channel, deduplicated by the exact `(name, url)` pair.
    pub async fn add_channel(&mut self, name: &str, url: &str) -> Result<Applied> {
        if self.channels.iter().any(|c| c.name == name && c.url == url) {
            return Ok(Applied::Duplicate);
        }
        let mut rows = self.channels.clone();
        rows.push(Channel {
            name: name.to_string(),
            url: url.to_string(),
        });
        self.persist(CHANNELS_FILE, &rows).await?;
        self.channels = rows;
        Ok(Applied::Inserted)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    // ---- JS8Call log ----

    pub async fn add_js8_message(
        &mut self,
        callsign: &str,
        group: Option<&str>,
        text: &str,
        urgent: bool,
    ) -> Result<()> {
        let mut rows = self.js8.clone();
        rows.push(Js8Message {
            callsign: callsign.to_string(),
            group: group.map(str::to_string),
            text: text.to_string(),
            urgent,
            date: Utc::now(),
        });
        self.persist(JS8_FILE, &rows).await?;
        self.js8 = rows;
        Ok(())
    }

    /// Distinct group names, sorted.
    pub fn js8_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.js8.iter().filter_map(|m| m.group.clone()).collect();
        groups.sort();
        groups.dedup();
        groups
    }

    pub fn js8_group_messages(&self, group: &str) -> Vec<&Js8Message> {
        self.js8
            .iter()
            .filter(|m| m.group.as_deref() == Some(group))
            .collect()
    }

    pub fn js8_station_messages(&self) -> Vec<&Js8Message> {
        self.js8
            .iter()
            .filter(|m| m.group.is_none() && !m.urgent)
            .collect()
    }

    pub fn js8_urgent_messages(&self) -> Vec<&Js8Message> {
        self.js8.iter().filter(|m| m.urgent).collect()
    }
}
