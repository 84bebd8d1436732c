//! Process-wide counters for replication traffic and game sub-sessions.
//! Read with [`snapshot`]; the `status` command and periodic server logs print them.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static SYNC_APPLIED: AtomicU64 = AtomicU64::new(0);
static SYNC_DUPLICATE: AtomicU64 = AtomicU64::new(0);
static SYNC_ABSENT: AtomicU64 = AtomicU64::new(0);
static SYNC_DROPPED: AtomicU64 = AtomicU64::new(0);
static SYNC_SENT: AtomicU64 = AtomicU64::new(0);

static GAME_COUNTERS: OnceLock<Mutex<HashMap<String, GameCounter>>> = OnceLock::new();

pub fn inc_sync_applied() {
    SYNC_APPLIED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sync_duplicate() {
    SYNC_DUPLICATE.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sync_absent() {
    SYNC_ABSENT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_sync_dropped() {
    SYNC_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn add_sync_sent(n: u64) {
    SYNC_SENT.fetch_add(n, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GameCounter {
    pub entries: u64,
    pub exits: u64,
    pub currently_active: u64,
    pub concurrent_peak: u64,
}

fn game_counter_lock() -> &'static Mutex<HashMap<String, GameCounter>> {
    GAME_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_game_entry(slug: &str) -> GameCounter {
    let mut guard = game_counter_lock()
        .lock()
        .expect("game counter mutex poisoned");
    let counter = guard.entry(slug.to_string()).or_default();
    counter.entries = counter.entries.saturating_add(1);
    counter.currently_active = counter.currently_active.saturating_add(1);
    if counter.currently_active > counter.concurrent_peak {
        counter.concurrent_peak = counter.currently_active;
    }
    *counter
}

pub fn record_game_exit(slug: &str) -> GameCounter {
    let mut guard = game_counter_lock()
        .lock()
        .expect("game counter mutex poisoned");
    let counter = guard.entry(slug.to_string()).or_default();
    counter.exits = counter.exits.saturating_add(1);
    counter.currently_active = counter.currently_active.saturating_sub(1);
    *counter
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub sync_applied: u64,
    pub sync_duplicate: u64,
    pub sync_absent: u64,
    pub sync_dropped: u64,
    pub sync_sent: u64,
    pub games: HashMap<String, GameCounter>,
}

pub fn snapshot() -> Snapshot {
    let games = game_counter_lock()
        .lock()
        .map(|g| g.clone())
        .unwrap_or_default();
    Snapshot {
        sync_applied: SYNC_APPLIED.load(Ordering::Relaxed),
        sync_duplicate: SYNC_DUPLICATE.load(Ordering::Relaxed),
        sync_absent: SYNC_ABSENT.load(Ordering::Relaxed),
        sync_dropped: SYNC_DROPPED.load(Ordering::Relaxed),
        sync_sent: SYNC_SENT.load(Ordering::Relaxed),
        games,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_counter_tracks_peak() {
        let slug = "metrics-test-slug";
        record_game_entry(slug);
        let c = record_game_entry(slug);
        assert_eq!(c.currently_active, 2);
        let c = record_game_exit(slug);
        assert_eq!(c.currently_active, 1);
        assert_eq!(c.concurrent_peak, 2);
        assert_eq!(snapshot().games.get(slug).map(|g| g.exits), Some(1));
    }
}
