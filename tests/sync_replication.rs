//! Replication apply through the router: idempotence, notifications, no-op deletes.

mod common;

use common::{fixture, ALICE, BOB, PEER};
use relaybbs::bbs::session::{Menu, SessionState};
use relaybbs::storage::Storage;

const URGENT_LINE: &str = "BULLETIN|Urgent|Alice|Fire|Drop everything|u-1";

#[tokio::test]
async fn urgent_bulletin_stored_once_and_announced_once() {
    let mut fx = fixture().await;
    let first = fx.router.dispatch(PEER, URGENT_LINE, true).await;
    assert_eq!(
        first.broadcasts(),
        vec!["NEW URGENT BULLETIN\nFrom: Alice\nTitle: Fire\nDM 'CB,,Urgent' to view"]
    );
    let stored = fx.router.storage().bulletin("u-1").expect("stored");
    assert_eq!(stored.subject, "Fire");
    assert_eq!(stored.content, "Drop everything");
    assert_eq!(stored.sender_short_name, "Alice");

    let second = fx.router.dispatch(PEER, URGENT_LINE, true).await;
    assert!(second.is_empty());
    assert_eq!(fx.router.storage().bulletins_on("Urgent").len(), 1);
}

#[tokio::test]
async fn replay_of_every_create_kind_is_idempotent() {
    let mut fx = fixture().await;
    let lines = [
        "BULLETIN|General|ALCE|Net|Tonight 19:00|b-1".to_string(),
        format!("MAIL|{}|ALCE|{}|Hi|see you|m-1", ALICE, BOB),
        "CHANNEL|Local Net|https://meshtastic.org/e/#abc".to_string(),
    ];
    for line in &lines {
        fx.router.dispatch(PEER, line, true).await;
    }
    let once = fx.router.storage().counts();
    for line in &lines {
        let out = fx.router.dispatch(PEER, line, true).await;
        assert!(out.is_empty(), "{line}");
    }
    assert_eq!(fx.router.storage().counts(), once);
    assert_eq!(once.bulletins, 1);
    assert_eq!(once.mail, 1);
    assert_eq!(once.channels, 1);
}

#[tokio::test]
async fn delete_mail_for_unknown_id_is_silent_noop() {
    let mut fx = fixture().await;
    let before = fx.router.storage().counts();
    let out = fx.router.dispatch(PEER, "DELETE_MAIL|m-9", true).await;
    assert!(out.is_empty());
    assert_eq!(fx.router.storage().counts(), before);
}

#[tokio::test]
async fn deletes_remove_replicated_records() {
    let mut fx = fixture().await;
    let mail = format!("MAIL|{}|ALCE|{}|Hi|body|m-2", ALICE, BOB);
    fx.router.dispatch(PEER, &mail, true).await;
    fx.router.dispatch(PEER, "BULLETIN|News|ALCE|Swap|Sat|b-2", true).await;
    assert_eq!(fx.router.storage().mail_recipient("m-2"), Some(BOB));

    fx.router.dispatch(PEER, "DELETE_MAIL|m-2", true).await;
    fx.router.dispatch(PEER, "DELETE_BULLETIN|b-2", true).await;
    assert!(fx.router.storage().mail("m-2").is_none());
    assert!(fx.router.storage().bulletin("b-2").is_none());

    // second delete is a no-op
    let out = fx.router.dispatch(PEER, "DELETE_BULLETIN|b-2", true).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn content_may_contain_pipes() {
    let mut fx = fixture().await;
    fx.router
        .dispatch(PEER, "BULLETIN|Info|ALCE|Freqs|2m|70cm|6m|b-3", true)
        .await;
    let b = fx.router.storage().bulletin("b-3").expect("stored");
    assert_eq!(b.content, "2m|70cm|6m");
}

#[tokio::test]
async fn malformed_sync_is_dropped_without_reply_or_session() {
    let mut fx = fixture().await;
    for line in ["BULLETIN|General|only", "MAIL|x|y|z|s|c|m", "DELETE_MAIL|", "CHANNEL|nourl"] {
        let out = fx.router.dispatch(PEER, line, true).await;
        assert!(out.is_empty(), "{line}");
    }
    assert!(fx.router.session(PEER).is_none());
    assert_eq!(fx.router.storage().counts().bulletins, 0);
}

#[tokio::test]
async fn sync_never_touches_sender_session() {
    let mut fx = fixture().await;
    fx.router.dispatch(ALICE, "u", false).await;
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Utilities)));
    fx.router
        .dispatch(ALICE, "BULLETIN|General|ALCE|A|B|b-4", true)
        .await;
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Utilities)));
    assert!(fx.router.storage().bulletin("b-4").is_some());
}

#[tokio::test]
async fn local_posts_replicate_to_peers() {
    let mut fx = fixture().await;
    let out = fx
        .router
        .dispatch(ALICE, "PB,,urgent,,Flood,,Bridge closed", false)
        .await;
    let reps = out.replications();
    assert_eq!(reps.len(), 1);
    assert_eq!(reps[0].0, PEER);
    assert!(reps[0].1.starts_with("BULLETIN|Urgent|ALCE|Flood|Bridge closed|"));
    assert_eq!(out.broadcasts().len(), 1);

    // Replaying our own record on another node is a duplicate there too.
    let line = reps[0].1.to_string();
    let unique_id = line.rsplit('|').next().unwrap().to_string();
    let again = fx.router.dispatch(PEER, &line, true).await;
    assert!(again.is_empty());
    assert!(fx.router.storage().bulletin(&unique_id).is_some());
}

#[tokio::test]
async fn redelivery_after_failed_write_stores_and_announces() {
    let mut fx = fixture().await;
    let table = fx.dir.path().join("bulletins.json");
    std::fs::create_dir(&table).unwrap();

    let first = fx.router.dispatch(PEER, URGENT_LINE, true).await;
    assert!(first.is_empty());
    assert!(fx.router.storage().bulletin("u-1").is_none());

    std::fs::remove_dir(&table).unwrap();
    let again = fx.router.dispatch(PEER, URGENT_LINE, true).await;
    assert_eq!(again.broadcasts().len(), 1);

    let reopened = Storage::new(fx.dir.path().to_str().unwrap()).await.unwrap();
    assert!(reopened.bulletin("u-1").is_some());
}

#[tokio::test]
async fn failed_local_post_is_neither_kept_nor_replicated() {
    let mut fx = fixture().await;
    std::fs::create_dir(fx.dir.path().join("bulletins.json")).unwrap();
    let out = fx
        .router
        .dispatch(ALICE, "PB,,general,,Swap,,Saturday", false)
        .await;
    assert_eq!(
        out.replies_to(ALICE),
        vec!["Sorry, something went wrong. Please try again."]
    );
    assert!(out.replications().is_empty());
    assert!(fx.router.storage().bulletins_on("General").is_empty());
}
