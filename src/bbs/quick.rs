//! Quick-command shortcuts.
//!
//! Matched by literal prefix on the lower-cased input, independent of session
//! state, in a fixed priority order. Field values come from the original text so
//! case is preserved. `,,` separates fields; the final field keeps any further
//! `,,` it contains.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickCommand {
    SendMail {
        recipient: String,
        subject: String,
        content: String,
    },
    CheckMail,
    PostBulletin {
        board: String,
        subject: String,
        content: String,
    },
    CheckBulletin {
        board: String,
    },
    PostChannel {
        name: String,
        url: String,
    },
    ListChannels,
    /// A recognized prefix with the wrong number of fields.
    Usage(&'static str),
}

const SEND_MAIL_USAGE: &str = "Usage: SM,,{short name},,{subject},,{message}";
const POST_BULLETIN_USAGE: &str = "Usage: PB,,{board},,{subject},,{message}";
const CHECK_BULLETIN_USAGE: &str = "Usage: CB,,{board}";
const POST_CHANNEL_USAGE: &str = "Usage: CHP,,{name},,{url}";

/// Split `original` into exactly `n` `,,`-separated fields (prefix included).
/// Empty fields count as missing.
fn fields(original: &str, n: usize) -> Option<Vec<String>> {
    let parts: Vec<String> = original
        .splitn(n, ",,")
        .map(|p| p.trim().to_string())
        .collect();
    if parts.len() == n && parts.iter().skip(1).all(|p| !p.is_empty()) {
        Some(parts)
    } else {
        None
    }
}

/// Recognize a quick command. `normalized` is the lower-cased, trimmed input;
/// `original` the trimmed input with case preserved.
pub fn parse(normalized: &str, original: &str) -> Option<QuickCommand> {
    if normalized.starts_with("sm,,") {
        return Some(match fields(original, 4) {
            Some(mut f) => QuickCommand::SendMail {
                content: f.remove(3),
                subject: f.remove(2),
                recipient: f.remove(1),
            },
            None => QuickCommand::Usage(SEND_MAIL_USAGE),
        });
    }
    if normalized.starts_with("cm") {
        return Some(QuickCommand::CheckMail);
    }
    if normalized.starts_with("pb,,") {
        return Some(match fields(original, 4) {
            Some(mut f) => QuickCommand::PostBulletin {
                content: f.remove(3),
                subject: f.remove(2),
                board: f.remove(1),
            },
            None => QuickCommand::Usage(POST_BULLETIN_USAGE),
        });
    }
    if normalized.starts_with("cb,,") {
        return Some(match fields(original, 2) {
            Some(mut f) => QuickCommand::CheckBulletin { board: f.remove(1) },
            None => QuickCommand::Usage(CHECK_BULLETIN_USAGE),
        });
    }
    if normalized.starts_with("chp,,") {
        return Some(match fields(original, 3) {
            Some(mut f) => QuickCommand::PostChannel {
                url: f.remove(2),
                name: f.remove(1),
            },
            None => QuickCommand::Usage(POST_CHANNEL_USAGE),
        });
    }
    if normalized.starts_with("chl") {
        return Some(QuickCommand::ListChannels);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Option<QuickCommand> {
        let t = s.trim();
        parse(&t.to_lowercase(), t)
    }

    #[test]
    fn send_mail_keeps_case_and_trailing_separators() {
        assert_eq!(
            p("SM,,Bob,,Hello There,,see you,,soon"),
            Some(QuickCommand::SendMail {
                recipient: "Bob".into(),
                subject: "Hello There".into(),
                content: "see you,,soon".into(),
            })
        );
    }

    #[test]
    fn bare_prefixes() {
        assert_eq!(p("cm"), Some(QuickCommand::CheckMail));
        assert_eq!(p("CHL"), Some(QuickCommand::ListChannels));
        assert_eq!(
            p("cb,,urgent"),
            Some(QuickCommand::CheckBulletin {
                board: "urgent".into()
            })
        );
    }

    #[test]
    fn short_forms_get_usage() {
        assert_eq!(p("sm,,bob"), Some(QuickCommand::Usage(SEND_MAIL_USAGE)));
        assert_eq!(p("cb,,"), Some(QuickCommand::Usage(CHECK_BULLETIN_USAGE)));
        assert_eq!(p("chp,,name"), Some(QuickCommand::Usage(POST_CHANNEL_USAGE)));
    }

    #[test]
    fn menu_tokens_are_not_quick_commands() {
        for t in ["m", "b", "x", "c", "sm", "pb", "ch"] {
            assert_eq!(p(t), None, "{t}");
        }
    }
}
