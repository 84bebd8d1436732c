//! Test utilities & fixtures.
//! Builds a router over a temp-dir storage, a shared in-memory game store and
//! a stacked deck, with a small seeded node directory.

use std::sync::Arc;

use relaybbs::bbs::blackjack::{Blackjack, StackedDeck};
use relaybbs::bbs::commands::Settings;
use relaybbs::bbs::nodes::{NodeDirectory, NodeInfo};
use relaybbs::bbs::router::Router;
use relaybbs::storage::games::MemoryGameStore;
use relaybbs::storage::Storage;
use tempfile::TempDir;

#[allow(dead_code)]
pub const ALICE: u32 = 0x1111_0001;
#[allow(dead_code)]
pub const BOB: u32 = 0x2222_0002;
#[allow(dead_code)]
pub const PEER: u32 = 0x0000_0b0b;

pub struct Fixture {
    pub router: Router,
    #[allow(dead_code)]
    pub games: Arc<MemoryGameStore>,
    // keeps the data dir alive for the test's duration
    pub dir: TempDir,
}

fn node(id: u32, short: &str, battery: Option<u8>) -> NodeInfo {
    NodeInfo {
        id,
        short_name: short.to_string(),
        long_name: format!("{} long", short),
        hw_model: Some("TBEAM".to_string()),
        role: Some("CLIENT".to_string()),
        battery_level: battery,
    }
}

/// Router with peers `[PEER]` and the given cards stacked in the deck.
#[allow(dead_code)]
pub async fn fixture_with_cards(cards: &[u8]) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(dir.path().to_str().expect("utf8 path"))
        .await
        .expect("storage");
    let mut nodes = NodeDirectory::new();
    nodes.upsert(node(ALICE, "ALCE", Some(85)));
    nodes.upsert(node(BOB, "BOB", Some(12)));
    let games = Arc::new(MemoryGameStore::new());
    let game = Blackjack::new(
        Box::new(games.clone()),
        Box::new(StackedDeck::new(cards.iter().copied())),
    );
    let router = Router::new(storage, nodes, vec![PEER], Settings::default(), Box::new(game));
    Fixture { router, games, dir }
}

#[allow(dead_code)]
pub async fn fixture() -> Fixture {
    fixture_with_cards(&[]).await
}

/// Send `text` from `from` and return the replies addressed back to `from`.
#[allow(dead_code)]
pub async fn say(router: &mut Router, from: u32, text: &str) -> Vec<String> {
    let out = router.dispatch(from, text, false).await;
    out.replies_to(from).into_iter().map(str::to_string).collect()
}
