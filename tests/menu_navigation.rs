//! Menu routing: exit from every context, trailing-exit collapse, help fallback.

mod common;

use common::{fixture, say, ALICE, BOB, PEER};
use relaybbs::bbs::session::{Menu, SessionState};

async fn walk(router: &mut relaybbs::bbs::router::Router, from: u32, path: &[&str]) {
    for step in path {
        router.dispatch(from, step, false).await;
    }
}

#[tokio::test]
async fn exit_returns_to_main_from_every_context() {
    let mut fx = fixture().await;
    // content so that list/read contexts can be entered
    fx.router
        .dispatch(PEER, &format!("MAIL|{}|BOB|{}|Hi|there|m-1", BOB, ALICE), true)
        .await;
    fx.router
        .dispatch(PEER, "CHANNEL|Local|https://example.org/c", true)
        .await;
    fx.router
        .dispatch(PEER, "BULLETIN|News|BOB|Swap|Sat|b-1", true)
        .await;

    let paths: &[&[&str]] = &[
        &[],
        &["b"],
        &["u"],
        &["g"],
        &["b", "b"],
        &["b", "b", "n"],
        &["b", "b", "n", "r"],
        &["b", "b", "n", "p"],
        &["b", "b", "n", "p", "Subject"],
        &["b", "m"],
        &["b", "m", "s"],
        &["b", "c"],
        &["b", "c", "p"],
        &["b", "j"],
        &["u", "s"],
        &["g", "b"],
        &["g", "b", "deal"],
        &["cm"],
        &["cm", "1"],
        &["cb,,news"],
        &["chl"],
        &["b", "c", "v"],
    ];
    for path in paths {
        walk(&mut fx.router, ALICE, path).await;
        let replies = say(&mut fx.router, ALICE, "X").await;
        assert_eq!(
            fx.router.session(ALICE),
            Some(&SessionState::Menu(Menu::Main)),
            "after {:?}",
            path
        );
        let last = replies.last().expect("menu reply");
        assert!(last.starts_with("Relay BBS\nMain Menu"), "after {:?}: {}", path, last);
    }
}

#[tokio::test]
async fn trailing_exit_collapses_in_every_context() {
    let mut fx = fixture().await;
    let cases: &[(&[&str], &str)] = &[
        (&[], "b"),
        (&[], "u"),
        (&["b"], "m"),
        (&["b"], "b"),
        (&["u"], "s"),
        (&["b", "b"], "n"),
        (&["b", "b", "g"], "p"),
        (&["b", "j"], "s"),
    ];
    for (path, token) in cases {
        walk(&mut fx.router, ALICE, path).await;
        walk(&mut fx.router, BOB, path).await;
        let plain = say(&mut fx.router, ALICE, token).await;
        let doubled = say(&mut fx.router, BOB, &format!("{}x", token.to_uppercase())).await;
        assert_eq!(plain, doubled, "{:?} {}", path, token);
        assert_eq!(fx.router.session(ALICE), fx.router.session(BOB), "{:?} {}", path, token);
        walk(&mut fx.router, ALICE, &["x"]).await;
        walk(&mut fx.router, BOB, &["x"]).await;
    }
}

#[tokio::test]
async fn unknown_input_falls_back_to_main_menu() {
    let mut fx = fixture().await;
    let replies = say(&mut fx.router, ALICE, "what is this").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Relay BBS\nMain Menu"));
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Main)));

    walk(&mut fx.router, ALICE, &["u"]).await;
    say(&mut fx.router, ALICE, "zzz").await;
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Main)));
}

#[tokio::test]
async fn submenus_show_their_text() {
    let mut fx = fixture().await;
    assert_eq!(
        say(&mut fx.router, ALICE, "b").await,
        vec!["BBS Menu\n[M]ail\n[B]ulletins\n[C]hannel Dir\n[J]S8CALL\nE[X]IT"]
    );
    assert_eq!(
        say(&mut fx.router, ALICE, "b").await,
        vec!["Bulletin Boards\n[G]eneral\n[I]nfo\n[N]ews\n[U]rgent\nE[X]IT"]
    );
    assert_eq!(
        say(&mut fx.router, ALICE, "i").await,
        vec!["Info Board\n[R]ead\n[P]ost\nE[X]IT"]
    );
    assert_eq!(
        fx.router.session(ALICE),
        Some(&SessionState::BulletinAction {
            board: "Info".into()
        })
    );
}

#[tokio::test]
async fn utilities_fortune_and_wall_of_shame() {
    let mut fx = fixture().await;
    walk(&mut fx.router, ALICE, &["u"]).await;
    let fortune = say(&mut fx.router, ALICE, "f").await;
    assert_eq!(fortune.len(), 1);
    assert!(!fortune[0].is_empty());
    let shame = say(&mut fx.router, ALICE, "w").await;
    assert_eq!(shame, vec!["Devices with battery levels below 20%:\nBOB - 12%"]);
    // still in the utilities menu
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Utilities)));

    walk(&mut fx.router, ALICE, &["s"]).await;
    let nodes = say(&mut fx.router, ALICE, "n").await;
    assert_eq!(nodes[0], "Total nodes seen: 2");
    assert_eq!(fx.router.session(ALICE), Some(&SessionState::Menu(Menu::Main)));
}
