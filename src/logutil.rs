//! Logging helpers that keep user text and peer sync payloads on a single log line.

const MAX_PREVIEW: usize = 300;

/// Escape a string for single-line logging.
///
/// Newlines, carriage returns, tabs and backslashes are written as their escape
/// sequences; any other control character becomes `\xNN`. Input longer than
/// 300 characters is cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    escape_with_limit(s, MAX_PREVIEW)
}

/// Short preview of a sync record for log lines: the type tag plus the last
/// field (normally the unique id), without the free-text body.
pub fn sync_preview(line: &str) -> String {
    let mut fields = line.split('|');
    let tag = fields.next().unwrap_or("");
    match line.rsplit_once('|') {
        Some((_, last)) if line.matches('|').count() > 1 => {
            format!("{}|…|{}", escape_with_limit(tag, 24), escape_with_limit(last, 64))
        }
        _ => escape_with_limit(line, 96),
    }
}

fn escape_with_limit(s: &str, limit: usize) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(s.len().min(limit) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= limit {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
