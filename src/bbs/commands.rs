//! # Command handlers
//!
//! One function per menu entry or multi-step command. Handlers read and write
//! the sender's [`SessionState`] and queue replies in the pass [`Outbox`]; they
//! never send anything themselves.
//!
//! Local creates and deletes are replicated to every configured peer with the
//! same sync record the peers' apply layer consumes:
//!
//! ```text
//! user ── pb,,News,,Net,,19:00 ──▶ store ──▶ BULLETIN|News|ALCE|Net|19:00|<uuid> ──▶ peers
//! ```
//!
//! Storage failures propagate as `anyhow::Error`; the router logs them and
//! answers with a generic apology.

use anyhow::Result;
use log::{debug, info};

use super::menus::{
    board_action_text, menu_text, BOARD_MENU, CHANNEL_DIR_MENU, JS8_MENU, MAIL_MENU, QUICK_HELP,
    STATS_MENU,
};
use super::nodes::NodeDirectory;
use super::outbox::Outbox;
use super::router::normalize;
use super::session::{MailDraft, Menu, SessionState, SessionStore};
use crate::logutil::escape_log;
use crate::storage::{Bulletin, Js8Message, Mail, Storage};
use crate::sync::{urgent_notice, SyncRecord};
use crate::validation::{
    canonical_board, sanitize_body, sanitize_field, validate_channel_url, BOARDS, MAX_BODY_BYTES,
    MAX_FIELD_BYTES,
};

/// Node-level settings handlers need.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bbs_name: String,
    pub urgent_board: String,
    pub blackjack_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bbs_name: "Relay BBS".to_string(),
            urgent_board: "Urgent".to_string(),
            blackjack_enabled: true,
        }
    }
}

/// Everything a handler may touch during one dispatch pass.
pub struct Context<'a> {
    pub storage: &'a mut Storage,
    pub sessions: &'a mut SessionStore,
    pub nodes: &'a NodeDirectory,
    pub peers: &'a [u32],
    pub settings: &'a Settings,
    pub outbox: &'a mut Outbox,
}

/// Marks the end of a multi-line body.
const END_MARKER: &str = "end";

/// Parse a 1-based list selection.
fn selection(text: &str, len: usize) -> Option<usize> {
    match text.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

/// Append body lines to `lines`; returns true once the end marker was seen.
fn collect_body(text: &str, lines: &mut Vec<String>) -> bool {
    for line in text.lines() {
        if line.trim().eq_ignore_ascii_case(END_MARKER) {
            return true;
        }
        lines.push(line.to_string());
    }
    false
}

fn format_bulletin(b: &Bulletin) -> String {
    format!(
        "{}\nFrom: {}\nDate: {}\n\n{}",
        b.subject,
        b.sender_short_name,
        b.date.format("%Y-%m-%d %H:%M"),
        b.content
    )
}

fn format_mail(m: &Mail) -> String {
    format!(
        "Date: {}\nFrom: {}\nSubject: {}\n\n{}",
        m.date.format("%Y-%m-%d %H:%M"),
        m.sender_short_name,
        m.subject,
        m.content
    )
}

fn format_js8(messages: &[&Js8Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.callsign, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---- menus ----

/// Set the session to `menu` and send its text.
pub fn help(cx: &mut Context<'_>, sender: u32, menu: Menu) {
    cx.sessions.set(sender, SessionState::Menu(menu));
    let text = match menu {
        Menu::Main => format!("{}\n{}", cx.settings.bbs_name, menu_text(menu)),
        _ => menu_text(menu).to_string(),
    };
    cx.outbox.reply(sender, text);
}

pub fn quick_help(cx: &mut Context<'_>, sender: u32) {
    cx.sessions.set(sender, SessionState::Menu(Menu::Main));
    cx.outbox.reply(sender, QUICK_HELP);
}

// ---- mail ----

pub fn mail_menu(cx: &mut Context<'_>, sender: u32) {
    cx.sessions.set(
        sender,
        SessionState::Mail {
            step: 1,
            draft: MailDraft::default(),
        },
    );
    cx.outbox.reply(sender, MAIL_MENU);
}

/// Store a mail, replicate it and tell the recipient.
async fn deliver_mail(
    cx: &mut Context<'_>,
    sender: u32,
    recipient_id: u32,
    subject: &str,
    content: &str,
) -> Result<()> {
    let sender_short = cx.nodes.short_name(sender);
    let (mail, _) = cx
        .storage
        .add_mail(sender, &sender_short, recipient_id, subject, content, None)
        .await?;
    info!(
        "mail {} from {:08x} to {:08x}: {}",
        mail.unique_id,
        sender,
        recipient_id,
        escape_log(subject)
    );
    cx.outbox.replicate(
        cx.peers,
        &SyncRecord::Mail {
            sender_id: sender,
            sender_short_name: mail.sender_short_name.clone(),
            recipient_id,
            subject: mail.subject.clone(),
            content: mail.content.clone(),
            unique_id: mail.unique_id.clone(),
        },
    );
    cx.outbox.reply(
        recipient_id,
        format!(
            "You have a new mail message from {}. Reply CM to read it.",
            sender_short
        ),
    );
    Ok(())
}

/// Mail composition, steps 1-5.
pub async fn mail_step(
    cx: &mut Context<'_>,
    sender: u32,
    text: &str,
    step: u8,
    mut draft: MailDraft,
) -> Result<()> {
    let input = text.trim();
    match step {
        1 => match normalize(input).as_str() {
            "r" => check_mail(cx, sender),
            "s" => {
                cx.sessions.set(sender, SessionState::Mail { step: 2, draft });
                cx.outbox
                    .reply(sender, "What is the short name of the recipient?");
            }
            _ => help(cx, sender, Menu::Main),
        },
        2 => match cx.nodes.find_by_short_name(input) {
            Some(id) => {
                draft.recipient_id = Some(id);
                draft.recipient_short_name = cx.nodes.short_name(id);
                cx.sessions.set(sender, SessionState::Mail { step: 3, draft });
                cx.outbox.reply(sender, "What is the subject of your message?");
            }
            None => {
                cx.outbox.reply(
                    sender,
                    format!("Node '{}' not found. Enter a short name:", input),
                );
            }
        },
        3 => match sanitize_field(input, MAX_FIELD_BYTES) {
            Ok(subject) => {
                draft.subject = subject;
                cx.sessions.set(sender, SessionState::Mail { step: 4, draft });
                cx.outbox.reply(
                    sender,
                    "Send your message. Put END on its own line to finish.",
                );
            }
            Err(e) => cx.outbox.reply(sender, format!("Subject {}. Subject:", e)),
        },
        4 => {
            let finished = collect_body(text, &mut draft.body);
            if !finished {
                cx.sessions.set(sender, SessionState::Mail { step: 4, draft });
                return Ok(());
            }
            let body = match sanitize_body(&draft.body.join("\n"), MAX_BODY_BYTES) {
                Ok(b) => b,
                Err(e) => {
                    cx.outbox
                        .reply(sender, format!("Message {}, mail discarded.", e));
                    help(cx, sender, Menu::Main);
                    return Ok(());
                }
            };
            let Some(recipient_id) = draft.recipient_id else {
                help(cx, sender, Menu::Main);
                return Ok(());
            };
            deliver_mail(cx, sender, recipient_id, &draft.subject, &body).await?;
            cx.outbox.reply(
                sender,
                format!(
                    "Mail sent to {}. Send another? Y/N",
                    draft.recipient_short_name
                ),
            );
            cx.sessions.set(
                sender,
                SessionState::Mail {
                    step: 5,
                    draft: MailDraft::default(),
                },
            );
        }
        5 => {
            if input.eq_ignore_ascii_case("y") {
                cx.sessions.set(sender, SessionState::Mail { step: 2, draft });
                cx.outbox
                    .reply(sender, "What is the short name of the recipient?");
            } else {
                help(cx, sender, Menu::Main);
            }
        }
        _ => help(cx, sender, Menu::Main),
    }
    Ok(())
}

pub fn check_mail(cx: &mut Context<'_>, sender: u32) {
    let mail = cx.storage.mail_for(sender);
    if mail.is_empty() {
        cx.outbox.reply(sender, "There are no messages in your mailbox.");
        help(cx, sender, Menu::Main);
        return;
    }
    let mut text = format!("You have {} mail messages:", mail.len());
    for (i, m) in mail.iter().enumerate() {
        text.push_str(&format!("\n[{}] {} - {}", i + 1, m.sender_short_name, m.subject));
    }
    text.push_str("\nReply with the number to read, X to exit.");
    cx.sessions.set(
        sender,
        SessionState::CheckMail {
            step: 1,
            ids: mail.into_iter().map(|m| m.unique_id).collect(),
            selected: None,
        },
    );
    cx.outbox.reply(sender, text);
}

/// Check-mail step 1: show the selected message and ask about deleting it.
pub fn read_mail(cx: &mut Context<'_>, sender: u32, text: &str, ids: Vec<String>) {
    let Some(idx) = selection(text, ids.len()) else {
        help(cx, sender, Menu::Main);
        return;
    };
    let Some(mail) = cx.storage.mail(&ids[idx]).cloned() else {
        cx.outbox.reply(sender, "That message is no longer available.");
        help(cx, sender, Menu::Main);
        return;
    };
    cx.outbox.reply(
        sender,
        format!("{}\n\nDelete this message? Y/N", format_mail(&mail)),
    );
    cx.sessions.set(
        sender,
        SessionState::CheckMail {
            step: 2,
            ids,
            selected: Some(mail.unique_id),
        },
    );
}

/// Check-mail step 2: delete on `y`, replicating the delete.
pub async fn confirm_delete_mail(
    cx: &mut Context<'_>,
    sender: u32,
    text: &str,
    selected: Option<String>,
) -> Result<()> {
    match selected {
        Some(unique_id) if text.trim().eq_ignore_ascii_case("y") => {
            if cx.storage.delete_mail(&unique_id, sender).await? {
                cx.outbox
                    .replicate(cx.peers, &SyncRecord::DeleteMail { unique_id });
                cx.outbox.reply(sender, "The message has been deleted.");
            } else {
                cx.outbox.reply(sender, "That message is already gone.");
            }
        }
        Some(_) => cx.outbox.reply(sender, "The message has been kept."),
        None => {}
    }
    help(cx, sender, Menu::Main);
    Ok(())
}

// ---- bulletins ----

pub fn bulletin_menu(cx: &mut Context<'_>, sender: u32) {
    cx.sessions.set(sender, SessionState::BulletinMenu);
    cx.outbox.reply(sender, BOARD_MENU);
}

pub fn select_board(cx: &mut Context<'_>, sender: u32, board: &str) {
    cx.sessions.set(
        sender,
        SessionState::BulletinAction {
            board: board.to_string(),
        },
    );
    cx.outbox.reply(sender, board_action_text(board));
}

fn bulletin_listing(bulletins: &[Bulletin], board: &str) -> String {
    let mut text = format!("{} bulletins:", board);
    for (i, b) in bulletins.iter().enumerate() {
        text.push_str(&format!("\n[{}] {} - {}", i + 1, b.sender_short_name, b.subject));
    }
    text.push_str("\nReply with the number to read, X to exit.");
    text
}

/// Board action `r`: list the board and wait for a selection.
pub fn read_board(cx: &mut Context<'_>, sender: u32, board: &str) {
    let bulletins = cx.storage.bulletins_on(board);
    if bulletins.is_empty() {
        cx.outbox
            .reply(sender, format!("No bulletins in {}.", board));
        select_board(cx, sender, board);
        return;
    }
    cx.outbox.reply(sender, bulletin_listing(&bulletins, board));
    cx.sessions.set(
        sender,
        SessionState::BulletinRead {
            board: board.to_string(),
            ids: bulletins.into_iter().map(|b| b.unique_id).collect(),
        },
    );
}

/// Board action `p`: ask for a subject.
pub fn post_board(cx: &mut Context<'_>, sender: u32, board: &str) {
    cx.sessions.set(
        sender,
        SessionState::BulletinPost {
            board: board.to_string(),
        },
    );
    cx.outbox
        .reply(sender, "What is the subject of your bulletin? Keep it short.");
}

/// Show the bulletin at a 1-based position in `ids`. Returns false for a bad selection.
fn show_bulletin(cx: &mut Context<'_>, sender: u32, text: &str, ids: &[String]) -> bool {
    let Some(idx) = selection(text, ids.len()) else {
        return false;
    };
    match cx.storage.bulletin(&ids[idx]) {
        Some(b) => {
            let body = format_bulletin(b);
            cx.outbox.reply(sender, body);
        }
        None => cx
            .outbox
            .reply(sender, "That bulletin is no longer available."),
    }
    true
}

/// Bulletin read (step 3): show a selection and stay on the list.
pub fn bulletin_read_step(cx: &mut Context<'_>, sender: u32, text: &str, ids: &[String]) {
    if !show_bulletin(cx, sender, text, ids) {
        help(cx, sender, Menu::Main);
    }
}

/// Bulletin post (step 4): subject received, ask for content.
pub fn bulletin_subject_step(cx: &mut Context<'_>, sender: u32, text: &str, board: String) {
    match sanitize_field(text, MAX_FIELD_BYTES) {
        Ok(subject) => {
            cx.sessions.set(
                sender,
                SessionState::BulletinPostContent {
                    board,
                    subject,
                    lines: Vec::new(),
                },
            );
            cx.outbox.reply(
                sender,
                "Send the contents of your bulletin. Put END on its own line to finish.",
            );
        }
        Err(e) => cx.outbox.reply(sender, format!("Subject {}. Subject:", e)),
    }
}

/// Store a bulletin, replicate it, and broadcast if it landed on the urgent board.
async fn publish_bulletin(
    cx: &mut Context<'_>,
    sender: u32,
    board: &str,
    subject: &str,
    content: &str,
) -> Result<()> {
    let author = cx.nodes.short_name(sender);
    let (bulletin, _) = cx
        .storage
        .add_bulletin(board, &author, subject, content, None)
        .await?;
    info!(
        "bulletin {} on {} by {:08x}: {}",
        bulletin.unique_id,
        board,
        sender,
        escape_log(subject)
    );
    cx.outbox.replicate(
        cx.peers,
        &SyncRecord::Bulletin {
            board: bulletin.board.clone(),
            author_short_name: bulletin.sender_short_name.clone(),
            subject: bulletin.subject.clone(),
            content: bulletin.content.clone(),
            unique_id: bulletin.unique_id.clone(),
        },
    );
    if board.eq_ignore_ascii_case(&cx.settings.urgent_board) {
        cx.outbox.broadcast(urgent_notice(&author, subject, board));
    }
    Ok(())
}

/// Bulletin post content (step 5): collect lines until `END`, then publish.
pub async fn bulletin_content_step(
    cx: &mut Context<'_>,
    sender: u32,
    text: &str,
    board: String,
    subject: String,
    mut lines: Vec<String>,
) -> Result<()> {
    if !collect_body(text, &mut lines) {
        cx.sessions.set(
            sender,
            SessionState::BulletinPostContent {
                board,
                subject,
                lines,
            },
        );
        return Ok(());
    }
    match sanitize_body(&lines.join("\n"), MAX_BODY_BYTES) {
        Ok(content) => {
            publish_bulletin(cx, sender, &board, &subject, &content).await?;
            cx.outbox
                .reply(sender, format!("Your bulletin has been posted to {}.", board));
        }
        Err(e) => cx
            .outbox
            .reply(sender, format!("Bulletin {}, not posted.", e)),
    }
    help(cx, sender, Menu::Main);
    Ok(())
}

/// Quick `cb,,board`.
pub fn check_bulletin(cx: &mut Context<'_>, sender: u32, board: &str) {
    let Ok(board) = canonical_board(board) else {
        cx.outbox.reply(
            sender,
            format!("Unknown board. Boards: {}", BOARDS.join(", ")),
        );
        return;
    };
    let bulletins = cx.storage.bulletins_on(board);
    if bulletins.is_empty() {
        cx.outbox
            .reply(sender, format!("No bulletins in {}.", board));
        return;
    }
    cx.outbox.reply(sender, bulletin_listing(&bulletins, board));
    cx.sessions.set(
        sender,
        SessionState::CheckBulletin {
            ids: bulletins.into_iter().map(|b| b.unique_id).collect(),
        },
    );
}

/// Check-bulletin step 1.
pub fn read_checked_bulletin(cx: &mut Context<'_>, sender: u32, text: &str, ids: &[String]) {
    if !show_bulletin(cx, sender, text, ids) {
        help(cx, sender, Menu::Main);
    }
}

/// Quick `pb,,board,,subject,,content`.
pub async fn post_bulletin_quick(
    cx: &mut Context<'_>,
    sender: u32,
    board: &str,
    subject: &str,
    content: &str,
) -> Result<()> {
    let Ok(board) = canonical_board(board) else {
        cx.outbox.reply(
            sender,
            format!("Unknown board. Boards: {}", BOARDS.join(", ")),
        );
        return Ok(());
    };
    let subject = match sanitize_field(subject, MAX_FIELD_BYTES) {
        Ok(s) => s,
        Err(e) => {
            cx.outbox.reply(sender, format!("Subject {}.", e));
            return Ok(());
        }
    };
    let content = match sanitize_body(content, MAX_BODY_BYTES) {
        Ok(c) => c,
        Err(e) => {
            cx.outbox.reply(sender, format!("Bulletin {}.", e));
            return Ok(());
        }
    };
    publish_bulletin(cx, sender, board, &subject, &content).await?;
    cx.outbox
        .reply(sender, format!("Your bulletin has been posted to {}.", board));
    Ok(())
}

/// Quick `sm,,short,,subject,,content`.
pub async fn send_mail_quick(
    cx: &mut Context<'_>,
    sender: u32,
    recipient: &str,
    subject: &str,
    content: &str,
) -> Result<()> {
    let Some(recipient_id) = cx.nodes.find_by_short_name(recipient) else {
        cx.outbox
            .reply(sender, format!("Node '{}' not found.", recipient));
        return Ok(());
    };
    let subject = match sanitize_field(subject, MAX_FIELD_BYTES) {
        Ok(s) => s,
        Err(e) => {
            cx.outbox.reply(sender, format!("Subject {}.", e));
            return Ok(());
        }
    };
    let content = match sanitize_body(content, MAX_BODY_BYTES) {
        Ok(c) => c,
        Err(e) => {
            cx.outbox.reply(sender, format!("Message {}.", e));
            return Ok(());
        }
    };
    deliver_mail(cx, sender, recipient_id, &subject, &content).await?;
    cx.outbox.reply(
        sender,
        format!("Mail has been sent to {}.", cx.nodes.short_name(recipient_id)),
    );
    Ok(())
}

// ---- channel directory ----

pub fn channel_directory(cx: &mut Context<'_>, sender: u32) {
    cx.sessions.set(
        sender,
        SessionState::ChannelDirectory {
            step: 1,
            draft_name: None,
        },
    );
    cx.outbox.reply(sender, CHANNEL_DIR_MENU);
}

async fn add_channel(cx: &mut Context<'_>, sender: u32, name: &str, url: &str) -> Result<()> {
    let name = match sanitize_field(name, MAX_FIELD_BYTES) {
        Ok(n) => n,
        Err(e) => {
            cx.outbox.reply(sender, format!("Channel name {}.", e));
            return Ok(());
        }
    };
    let url = match validate_channel_url(url) {
        Ok(u) => u,
        Err(e) => {
            cx.outbox.reply(sender, format!("{}.", e));
            return Ok(());
        }
    };
    if cx.storage.add_channel(&name, &url).await?.is_new() {
        debug!("channel '{}' added by {:08x}", escape_log(&name), sender);
        cx.outbox.replicate(
            cx.peers,
            &SyncRecord::Channel {
                name: name.clone(),
                url,
            },
        );
    }
    cx.outbox
        .reply(sender, format!("Channel '{}' has been added to the directory.", name));
    Ok(())
}

/// Channel directory steps: 1 view/post, 2 name, 3 url.
pub async fn channel_directory_step(
    cx: &mut Context<'_>,
    sender: u32,
    text: &str,
    step: u8,
    draft_name: Option<String>,
) -> Result<()> {
    let input = text.trim();
    match (step, draft_name) {
        (1, _) => match normalize(input).as_str() {
            "v" => list_channels(cx, sender, SessionState::CheckChannel),
            "p" => {
                cx.sessions.set(
                    sender,
                    SessionState::ChannelDirectory {
                        step: 2,
                        draft_name: None,
                    },
                );
                cx.outbox.reply(sender, "Name your channel for the directory:");
            }
            _ => help(cx, sender, Menu::Main),
        },
        (2, _) => {
            cx.sessions.set(
                sender,
                SessionState::ChannelDirectory {
                    step: 3,
                    draft_name: Some(input.to_string()),
                },
            );
            cx.outbox.reply(sender, "Send a message with your channel URL:");
        }
        (3, Some(name)) => {
            if validate_channel_url(input).is_err() {
                cx.outbox
                    .reply(sender, "That is not a valid URL. Channel URL:");
                cx.sessions.set(
                    sender,
                    SessionState::ChannelDirectory {
                        step: 3,
                        draft_name: Some(name),
                    },
                );
                return Ok(());
            }
            add_channel(cx, sender, &name, input).await?;
            help(cx, sender, Menu::Main);
        }
        _ => help(cx, sender, Menu::Main),
    }
    Ok(())
}

/// Quick `chp,,name,,url`.
pub async fn post_channel_quick(
    cx: &mut Context<'_>,
    sender: u32,
    name: &str,
    url: &str,
) -> Result<()> {
    add_channel(cx, sender, name, url).await
}

/// List channels numbered and enter `next` (check-channel or list-channels).
pub fn list_channels(cx: &mut Context<'_>, sender: u32, next: SessionState) {
    let channels = cx.storage.channels();
    if channels.is_empty() {
        cx.outbox.reply(sender, "No channels available in the directory.");
        help(cx, sender, Menu::Main);
        return;
    }
    let mut text = String::from("Channel Directory:");
    for (i, c) in channels.iter().enumerate() {
        text.push_str(&format!("\n[{}] {}", i + 1, c.name));
    }
    text.push_str("\nReply with the number to view the URL.");
    cx.sessions.set(sender, next);
    cx.outbox.reply(sender, text);
}

/// Check-channel / list-channels step 1.
pub fn read_channel(cx: &mut Context<'_>, sender: u32, text: &str) {
    let channels = cx.storage.channels();
    match selection(text, channels.len()) {
        Some(idx) => {
            let c = &channels[idx];
            let reply = format!("{}\n{}", c.name, c.url);
            cx.outbox.reply(sender, reply);
        }
        None => help(cx, sender, Menu::Main),
    }
}

// ---- utilities ----

pub fn stats(cx: &mut Context<'_>, sender: u32) {
    cx.sessions.set(sender, SessionState::Stats);
    cx.outbox.reply(sender, STATS_MENU);
}

pub fn stats_step(cx: &mut Context<'_>, sender: u32, text: &str) {
    let reply = match normalize(text).as_str() {
        "n" => Some(format!("Total nodes seen: {}", cx.nodes.len())),
        "h" => Some(breakdown("Hardware Models", cx.nodes.hardware_breakdown())),
        "r" => Some(breakdown("Roles", cx.nodes.role_breakdown())),
        _ => None,
    };
    if let Some(reply) = reply {
        cx.outbox.reply(sender, reply);
    }
    help(cx, sender, Menu::Main);
}

fn breakdown(title: &str, rows: Vec<(String, usize)>) -> String {
    let mut text = format!("{}:", title);
    if rows.is_empty() {
        text.push_str("\nNo data");
    }
    for (name, count) in rows {
        text.push_str(&format!("\n{}: {}", name, count));
    }
    text
}

pub fn fortune(cx: &mut Context<'_>, sender: u32) {
    cx.outbox.reply(sender, super::fortune::get_fortune());
}

pub fn wall_of_shame(cx: &mut Context<'_>, sender: u32) {
    let low = cx.nodes.low_battery();
    let text = if low.is_empty() {
        "No nodes with low battery. Everyone is charged up!".to_string()
    } else {
        let mut text = String::from("Devices with battery levels below 20%:");
        for n in low {
            text.push_str(&format!(
                "\n{} - {}%",
                n.short_name,
                n.battery_level.unwrap_or_default()
            ));
        }
        text
    };
    cx.outbox.reply(sender, text);
}

// ---- JS8Call ----

pub fn js8call_menu(cx: &mut Context<'_>, sender: u32) {
    cx.sessions.set(sender, SessionState::Js8callMenu { step: 1 });
    cx.outbox.reply(sender, JS8_MENU);
}

/// JS8Call menu. Receives every message while the menu is open, exit token included.
pub fn js8call_step(cx: &mut Context<'_>, sender: u32, text: &str, step: u8) {
    if step != 1 {
        help(cx, sender, Menu::Main);
        return;
    }
    match normalize(text).as_str() {
        "g" => {
            let groups = cx.storage.js8_groups();
            if groups.is_empty() {
                cx.outbox.reply(sender, "No group messages available.");
                return;
            }
            let mut listing = String::from("Select a group:");
            for (i, g) in groups.iter().enumerate() {
                listing.push_str(&format!("\n[{}] {}", i + 1, g));
            }
            cx.sessions
                .set(sender, SessionState::GroupMessages { step: 1, groups });
            cx.outbox.reply(sender, listing);
        }
        "s" => {
            let msgs = cx.storage.js8_station_messages();
            let reply = if msgs.is_empty() {
                "No station messages available.".to_string()
            } else {
                format_js8(&msgs)
            };
            cx.outbox.reply(sender, reply);
        }
        "u" => {
            let msgs = cx.storage.js8_urgent_messages();
            let reply = if msgs.is_empty() {
                "No urgent messages available.".to_string()
            } else {
                format_js8(&msgs)
            };
            cx.outbox.reply(sender, reply);
        }
        _ => help(cx, sender, Menu::Main),
    }
}

/// Group selection: show one group's messages, then return to the main menu.
pub fn group_message_step(
    cx: &mut Context<'_>,
    sender: u32,
    text: &str,
    step: u8,
    groups: &[String],
) {
    if step == 1 {
        if let Some(idx) = selection(text, groups.len()) {
            let group = &groups[idx];
            let msgs = cx.storage.js8_group_messages(group);
            let reply = if msgs.is_empty() {
                format!("No messages in {}.", group)
            } else {
                format!("Messages for {}:\n{}", group, format_js8(&msgs))
            };
            cx.outbox.reply(sender, reply);
        } else if !text.trim().eq_ignore_ascii_case("x") {
            cx.outbox.reply(sender, "Invalid group selection.");
        }
    }
    help(cx, sender, Menu::Main);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selections_are_one_based() {
        assert_eq!(selection("1", 3), Some(0));
        assert_eq!(selection(" 3 ", 3), Some(2));
        assert_eq!(selection("0", 3), None);
        assert_eq!(selection("4", 3), None);
        assert_eq!(selection("two", 3), None);
    }

    #[test]
    fn body_collection_stops_at_end_marker() {
        let mut lines = Vec::new();
        assert!(!collect_body("first line", &mut lines));
        assert!(collect_body("second\nEnd\nignored", &mut lines));
        assert_eq!(lines, vec!["first line", "second"]);
    }
}
