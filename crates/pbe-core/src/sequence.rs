use regex::Regex;
use std::sync::LazyLock;

use crate::constants::ABSENT_TOKEN;

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,]+").unwrap());
static BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\[\]\s,]*)\]$").unwrap());

/// Parse a token sequence.
///
/// Tokens are separated by whitespace or commas and `_` is the absent token:
/// `"a _ b"` and `"a,_,b"` both give `["a", "", "b"]`. The bracketed block form
/// `"[a_b]"` reads one token per character.
pub fn parse_sequence(text: &str) -> Vec<String> {
    let text = text.trim();
    if let Some(caps) = BLOCK.captures(text) {
        return caps[1].chars().map(|c| token(&c.to_string())).collect();
    }
    SEPARATOR
        .split(text)
        .filter(|t| !t.is_empty())
        .map(token)
        .collect()
}

fn token(raw: &str) -> String {
    if raw == ABSENT_TOKEN {
        String::new()
    } else {
        raw.to_string()
    }
}

/// Render a sequence, absent tokens as `_`. Single-character sequences use
/// the block form `[a_b]`, anything else is space separated.
pub fn render_sequence(tokens: &[String]) -> String {
    let shown: Vec<&str> = tokens
        .iter()
        .map(|t| if t.is_empty() { ABSENT_TOKEN } else { t.as_str() })
        .collect();
    if shown.iter().all(|t| t.chars().count() == 1) {
        format!("[{}]", shown.concat())
    } else {
        shown.join(" ")
    }
}
