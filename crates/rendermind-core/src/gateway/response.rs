//! Splitting raw responses into conversational text and code.

/// Substituted when no text precedes the code.
pub const FALLBACK_MESSAGE: &str = "I've generated the code for you! ✨";

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResponse {
    pub message: String,
    pub code: String,
    /// Whether a fenced block was found.
    pub fenced: bool,
}

/// Split on the first fenced code block.
///
/// Text before the fence is the message and the fence body is the code. Only
/// the first block is honoured. Without a fence the whole response is the
/// code and [`FALLBACK_MESSAGE`] is used.
pub fn split_response(raw: &str) -> SplitResponse {
    let Some(start) = raw.find(FENCE) else {
        return SplitResponse {
            message: FALLBACK_MESSAGE.to_string(),
            code: raw.trim().to_string(),
            fenced: false,
        };
    };

    let before = raw[..start].trim();
    let after = &raw[start + FENCE.len()..];
    let body = match after.find('\n') {
        Some(nl) if is_language_tag(&after[..nl]) => &after[nl + 1..],
        _ => after,
    };
    let code = match body.find(FENCE) {
        Some(end) => &body[..end],
        None => body,
    };

    SplitResponse {
        message: if before.is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            before.to_string()
        },
        code: code.trim().to_string(),
        fenced: true,
    }
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#' | '.'))
}
