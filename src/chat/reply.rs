//! Raw completion text → `ChatReply`

use crate::llm::ChatError;
use crate::state_machine::{ChatReply, Mood};
use regex::Regex;
use std::sync::LazyLock;

/// `mood:WOW` or `<mood:wow>`; prose like "my mood: sad" is not a marker
static MOOD_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<?\bmood:([a-z]+)>?").expect("mood marker pattern is valid")
});

/// Extract the mood tag and the word-capped visible text.
///
/// The first marker naming a known mood wins; every marker is stripped
/// from the text whether recognized or not. No marker means `Think`.
/// Text is cut to the first `word_budget` whitespace-delimited words,
/// rejoined with single spaces, without an ellipsis.
///
/// # Errors
///
/// `MalformedResponse` when nothing visible is left after stripping.
pub fn parse_reply(raw: &str, word_budget: usize) -> Result<ChatReply, ChatError> {
    let mood = MOOD_MARKER
        .captures_iter(raw)
        .find_map(|caps| caps.get(1).and_then(|m| Mood::from_token(m.as_str())))
        .unwrap_or_default();

    let visible = MOOD_MARKER.replace_all(raw, " ");
    let text = truncate_words(&visible, word_budget);

    if text.is_empty() {
        return Err(ChatError::malformed("Reply had no visible text"));
    }

    Ok(ChatReply { mood, text })
}

/// First `budget` whitespace-delimited words joined by single spaces
fn truncate_words(text: &str, budget: usize) -> String {
    text.split_whitespace()
        .take(budget)
        .collect::<Vec<_>>()
        .join(" ")
}
