//! Menu-driven mail: compose, read, delete with replication.

mod common;

use common::{fixture, say, ALICE, BOB, PEER};
use relaybbs::bbs::session::{Menu, SessionState};

#[tokio::test]
async fn compose_mail_through_the_menus() {
    let mut fx = fixture().await;
    assert_eq!(say(&mut fx.router, ALICE, "b").await.len(), 1);
    assert_eq!(say(&mut fx.router, ALICE, "m").await, vec!["Mail\n[R]ead\n[S]end\nE[X]IT"]);
    assert_eq!(
        say(&mut fx.router, ALICE, "s").await,
        vec!["What is the short name of the recipient?"]
    );
    assert_eq!(
        say(&mut fx.router, ALICE, "nobody").await,
        vec!["Node 'nobody' not found. Enter a short name:"]
    );
    assert_eq!(
        say(&mut fx.router, ALICE, "Bob").await,
        vec!["What is the subject of your message?"]
    );
    say(&mut fx.router, ALICE, "Antenna").await;
    // body arrives over several messages
    assert!(say(&mut fx.router, ALICE, "The new yagi is up.").await.is_empty());
    let out = fx.router.dispatch(ALICE, "Come by.\nEND", false).await;
    assert_eq!(out.replies_to(ALICE), vec!["Mail sent to BOB. Send another? Y/N"]);
    assert_eq!(out.replies_to(BOB).len(), 1);
    assert_eq!(out.replications().len(), 1);

    let inbox = fx.router.storage().mail_for(BOB);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].content, "The new yagi is up.\nCome by.");
    assert_eq!(inbox[0].sender_short_name, "ALCE");

    say(&mut fx.router, ALICE, "n").await;
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Main)));
}

#[tokio::test]
async fn read_and_delete_mail_replicates_delete() {
    let mut fx = fixture().await;
    fx.router
        .dispatch(PEER, &format!("MAIL|{}|BOB|{}|Keys|Under the mat|m-7", BOB, ALICE), true)
        .await;
    say(&mut fx.router, ALICE, "cm").await;
    say(&mut fx.router, ALICE, "1").await;
    let out = fx.router.dispatch(ALICE, "y", false).await;
    let replies = out.replies_to(ALICE);
    assert_eq!(replies[0], "The message has been deleted.");
    assert_eq!(out.replications(), vec![(PEER, "DELETE_MAIL|m-7")]);
    assert!(fx.router.storage().mail("m-7").is_none());
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Main)));
}

#[tokio::test]
async fn keeping_mail_leaves_it_stored() {
    let mut fx = fixture().await;
    fx.router
        .dispatch(PEER, &format!("MAIL|{}|BOB|{}|Keys|Under the mat|m-8", BOB, ALICE), true)
        .await;
    say(&mut fx.router, ALICE, "cm").await;
    say(&mut fx.router, ALICE, "1").await;
    let out = fx.router.dispatch(ALICE, "n", false).await;
    assert_eq!(out.replies_to(ALICE)[0], "The message has been kept.");
    assert!(out.replications().is_empty());
    assert!(fx.router.storage().mail("m-8").is_some());
}

#[tokio::test]
async fn empty_mailbox_returns_to_main() {
    let mut fx = fixture().await;
    let replies = say(&mut fx.router, BOB, "CM").await;
    assert_eq!(replies[0], "There are no messages in your mailbox.");
    assert!(replies[1].starts_with("Relay BBS\nMain Menu"));
}

#[tokio::test]
async fn out_of_range_selection_falls_back_to_help() {
    let mut fx = fixture().await;
    fx.router
        .dispatch(PEER, &format!("MAIL|{}|BOB|{}|A|B|m-9", BOB, ALICE), true)
        .await;
    say(&mut fx.router, ALICE, "cm").await;
    let replies = say(&mut fx.router, ALICE, "5").await;
    assert!(replies[0].starts_with("Relay BBS\nMain Menu"));
    assert!(fx.router.storage().mail("m-9").is_some());
}
