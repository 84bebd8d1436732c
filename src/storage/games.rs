//! Per-player game record store.
//!
//! Card game state is keyed by player identity and lives behind [`GameStore`]
//! so the sub-session never touches a process-wide file. The production
//! implementation is a sled tree with bincode values; tests use
//! [`MemoryGameStore`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const TREE_BLACKJACK: &str = "blackjack";
pub const GAME_RECORD_SCHEMA_VERSION: u8 = 1;

/// Errors that can arise while reading or writing game records.
#[derive(Debug, Error)]
pub enum GameStoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema mismatch: expected {expected}, got {found}")]
    SchemaMismatch { expected: u8, found: u8 },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub schema_version: u8,
    pub player_cards: Vec<u8>,
    pub dealer_cards: Vec<u8>,
    pub status: GameStatus,
}

impl GameRecord {
    pub fn new(player_cards: Vec<u8>, dealer_cards: Vec<u8>) -> Self {
        Self {
            schema_version: GAME_RECORD_SCHEMA_VERSION,
            player_cards,
            dealer_cards,
            status: GameStatus::Playing,
        }
    }
}

/// Player identities are case-insensitive in every store.
pub fn player_key(player: &str) -> String {
    player.to_ascii_lowercase()
}

/// Key/value access to game records, one per player.
pub trait GameStore: Send {
    fn load(&self, player: &str) -> Result<Option<GameRecord>, GameStoreError>;
    fn save(&self, player: &str, record: &GameRecord) -> Result<(), GameStoreError>;
    /// Remove the player's record; absent records are not an error.
    fn remove(&self, player: &str) -> Result<(), GameStoreError>;
}

/// Sled-backed game records.
pub struct SledGameStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledGameStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameStoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let tree = db.open_tree(TREE_BLACKJACK)?;
        Ok(Self { _db: db, tree })
    }

    fn key(player: &str) -> Vec<u8> {
        format!("players:{}", player_key(player)).into_bytes()
    }
}

impl GameStore for SledGameStore {
    fn load(&self, player: &str) -> Result<Option<GameRecord>, GameStoreError> {
        let Some(bytes) = self.tree.get(Self::key(player))? else {
            return Ok(None);
        };
        let record: GameRecord = bincode::deserialize(&bytes)?;
        if record.schema_version != GAME_RECORD_SCHEMA_VERSION {
            return Err(GameStoreError::SchemaMismatch {
                expected: GAME_RECORD_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    fn save(&self, player: &str, record: &GameRecord) -> Result<(), GameStoreError> {
        let bytes = bincode::serialize(record)?;
        self.tree.insert(Self::key(player), bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    fn remove(&self, player: &str) -> Result<(), GameStoreError> {
        self.tree.remove(Self::key(player))?;
        self.tree.flush()?;
        Ok(())
    }
}

/// In-memory game records for tests and diskless runs.
#[derive(Default)]
pub struct MemoryGameStore {
    records: Mutex<HashMap<String, GameRecord>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn load(&self, player: &str) -> Result<Option<GameRecord>, GameStoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| GameStoreError::Unavailable(e.to_string()))?;
        Ok(guard.get(&player_key(player)).cloned())
    }

    fn save(&self, player: &str, record: &GameRecord) -> Result<(), GameStoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| GameStoreError::Unavailable(e.to_string()))?;
        guard.insert(player_key(player), record.clone());
        Ok(())
    }

    fn remove(&self, player: &str) -> Result<(), GameStoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| GameStoreError::Unavailable(e.to_string()))?;
        guard.remove(&player_key(player));
        Ok(())
    }
}

/// Shared store handle.
impl<T: GameStore + Sync> GameStore for std::sync::Arc<T> {
    fn load(&self, player: &str) -> Result<Option<GameRecord>, GameStoreError> {
        (**self).load(player)
    }

    fn save(&self, player: &str, record: &GameRecord) -> Result<(), GameStoreError> {
        (**self).save(player, record)
    }

    fn remove(&self, player: &str) -> Result<(), GameStoreError> {
        (**self).remove(player)
    }
}
