//! Input sanitation for user-supplied fields.
//!
//! Fields that travel inside pipe-delimited sync records (board, subject, names)
//! must not contain `|`; free-text bodies may, because the codec splits the
//! trailing unique id from the right.

/// Validation errors with messages short enough to send back over the mesh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field is empty")]
    Empty,

    #[error("too long (max {max} bytes)")]
    TooLong { max: usize },

    #[error("invalid channel URL")]
    InvalidUrl,

    #[error("unknown board")]
    InvalidBoard,
}

/// Boards offered by the bulletin menu, in menu order.
pub const BOARDS: [&str; 4] = ["General", "Info", "News", "Urgent"];

pub const MAX_FIELD_BYTES: usize = 64;
pub const MAX_BODY_BYTES: usize = 1000;

/// Strip control characters (other than newline) and trim surrounding whitespace.
fn strip_controls(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitize a single-line field that is embedded in a sync record.
pub fn sanitize_field(input: &str, max_bytes: usize) -> Result<String, ValidationError> {
    let cleaned: String = strip_controls(input)
        .replace(['\n', '|'], " ")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return Err(ValidationError::Empty);
    }
    if cleaned.len() > max_bytes {
        return Err(ValidationError::TooLong { max: max_bytes });
    }
    Ok(cleaned)
}

/// Sanitize a free-text body. Newlines and pipes are preserved.
pub fn sanitize_body(input: &str, max_bytes: usize) -> Result<String, ValidationError> {
    let cleaned = strip_controls(input);
    if cleaned.is_empty() {
        return Err(ValidationError::Empty);
    }
    if cleaned.len() > max_bytes {
        return Err(ValidationError::TooLong { max: max_bytes });
    }
    Ok(cleaned)
}

/// Resolve a user-typed board name to its canonical spelling (case-insensitive).
pub fn canonical_board(input: &str) -> Result<&'static str, ValidationError> {
    let wanted = input.trim();
    BOARDS
        .iter()
        .copied()
        .find(|b| b.eq_ignore_ascii_case(wanted))
        .ok_or(ValidationError::InvalidBoard)
}

/// Accept channel URLs that look like Meshtastic share links or plain http(s) URLs.
pub fn validate_channel_url(input: &str) -> Result<String, ValidationError> {
    let url = sanitize_field(input, 512)?;
    let lower = url.to_ascii_lowercase();
    if (lower.starts_with("https://") || lower.starts_with("http://"))
        && !url.contains(char::is_whitespace)
        && url.len() > "https://".len()
    {
        Ok(url)
    } else {
        Err(ValidationError::InvalidUrl)
    }
}
