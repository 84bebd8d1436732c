//! Quick commands from any session state.

mod common;

use common::{fixture, fixture_with_cards, say, ALICE, BOB, PEER};
use relaybbs::bbs::session::SessionState;

#[tokio::test]
async fn send_mail_quick_stores_notifies_and_replicates() {
    let mut fx = fixture().await;
    let out = fx
        .router
        .dispatch(ALICE, "SM,,bob,,Field Day,,Bring the 2m rig, please", false)
        .await;
    assert_eq!(out.replies_to(ALICE), vec!["Mail has been sent to BOB."]);
    assert_eq!(
        out.replies_to(BOB),
        vec!["You have a new mail message from ALCE. Reply CM to read it."]
    );
    let reps = out.replications();
    assert_eq!(reps.len(), 1);
    let prefix = format!("MAIL|{}|ALCE|{}|Field Day|Bring the 2m rig, please|", ALICE, BOB);
    assert!(reps[0].1.starts_with(&prefix), "{}", reps[0].1);

    let inbox = fx.router.storage().mail_for(BOB);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].subject, "Field Day");
}

#[tokio::test]
async fn send_mail_quick_rejects_unknown_recipient_and_bad_shape() {
    let mut fx = fixture().await;
    assert_eq!(
        say(&mut fx.router, ALICE, "sm,,zzz,,Hi,,there").await,
        vec!["Node 'zzz' not found."]
    );
    assert_eq!(
        say(&mut fx.router, ALICE, "sm,,bob").await,
        vec!["Usage: SM,,{short name},,{subject},,{message}"]
    );
    assert_eq!(fx.router.storage().counts().mail, 0);
}

#[tokio::test]
async fn check_mail_mid_game_without_a_hand() {
    let mut fx = fixture().await;
    fx.router
        .dispatch(PEER, &format!("MAIL|{}|BOB|{}|Ping|pong|m-1", BOB, ALICE), true)
        .await;
    say(&mut fx.router, ALICE, "g").await;
    say(&mut fx.router, ALICE, "b").await;
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::BlackjackGame));

    let replies = say(&mut fx.router, ALICE, "CM").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("You have 1 mail messages:\n[1] BOB - Ping"));
    assert!(matches!(
        fx.router.session(ALICE),
        Some(SessionState::CheckMail { step: 1, .. })
    ));

    let read = say(&mut fx.router, ALICE, "1").await;
    assert!(read[0].contains("From: BOB\nSubject: Ping\n\npong"));
    assert!(read[0].ends_with("Delete this message? Y/N"));
}

#[tokio::test]
async fn active_hand_consumes_quick_commands() {
    // player 10, 7; dealer 9
    let mut fx = fixture_with_cards(&[10, 7, 9]).await;
    say(&mut fx.router, ALICE, "g").await;
    say(&mut fx.router, ALICE, "b").await;
    say(&mut fx.router, ALICE, "deal").await;
    let replies = say(&mut fx.router, ALICE, "cm").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("Invalid move"), "{}", replies[0]);
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::BlackjackGame));
}

#[tokio::test]
async fn quick_commands_interrupt_multi_step_flows() {
    let mut fx = fixture().await;
    for step in ["b", "b", "g", "p", "Subject line", "first body line"] {
        say(&mut fx.router, ALICE, step).await;
    }
    assert!(matches!(
        fx.router.session(ALICE),
        Some(SessionState::BulletinPostContent { .. })
    ));
    let replies = say(&mut fx.router, ALICE, "chl").await;
    assert_eq!(replies[0], "No channels available in the directory.");
    assert_eq!(fx.router.storage().counts().bulletins, 0);
}

#[tokio::test]
async fn post_and_check_bulletin() {
    let mut fx = fixture().await;
    let posted = say(&mut fx.router, ALICE, "PB,,news,,Swap meet,,Saturday 9am").await;
    assert_eq!(posted, vec!["Your bulletin has been posted to News."]);
    assert_eq!(
        say(&mut fx.router, ALICE, "pb,,nowhere,,a,,b").await,
        vec!["Unknown board. Boards: General, Info, News, Urgent"]
    );

    let listing = say(&mut fx.router, BOB, "cb,,NEWS").await;
    assert_eq!(
        listing,
        vec!["News bulletins:\n[1] ALCE - Swap meet\nReply with the number to read, X to exit."]
    );
    let shown = say(&mut fx.router, BOB, "1").await;
    assert!(shown[0].starts_with("Swap meet\nFrom: ALCE\nDate: "));
    assert!(shown[0].ends_with("\n\nSaturday 9am"));

    assert_eq!(say(&mut fx.router, BOB, "cb,,general").await, vec!["No bulletins in General."]);
}

#[tokio::test]
async fn channel_post_dedups_and_lists() {
    let mut fx = fixture().await;
    let url = "https://meshtastic.org/e/#CgMSAQESBggBQANIAQ";
    let first = fx
        .router
        .dispatch(ALICE, &format!("CHP,,Valley Net,,{}", url), false)
        .await;
    assert_eq!(first.replications(), vec![(PEER, format!("CHANNEL|Valley Net|{}", url).as_str())]);
    let again = fx
        .router
        .dispatch(ALICE, &format!("chp,,Valley Net,,{}", url), false)
        .await;
    assert!(again.replications().is_empty());
    assert_eq!(fx.router.storage().channels().len(), 1);

    assert_eq!(
        say(&mut fx.router, BOB, "CHL").await,
        vec!["Channel Directory:\n[1] Valley Net\nReply with the number to view the URL."]
    );
    assert_eq!(say(&mut fx.router, BOB, "1").await, vec![format!("Valley Net\n{}", url)]);

    assert_eq!(
        say(&mut fx.router, ALICE, "chp,,Bad,,ftp://x").await,
        vec!["invalid channel URL."]
    );
}
