//! Transcript acceptance filtering.
//!
//! Providers return artifacts for non-speech audio: empty strings,
//! bracketed annotations like "(beeping sound)" or "[MUSIC]", or
//! one-word fragments. A rejected transcript is a no-op for the session
//! — no turn is created and the pipeline stays listening.

use crate::defaults;

/// Strips non-speech annotations in any language.
///
/// Providers wrap annotations in `[…]`, `*…*`, or `(…)` — these never
/// contain real speech. Unmatched opening delimiters are kept as-is.
pub fn clean_transcript(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            '[' | '(' | '*' => {
                let close = match ch {
                    '[' => ']',
                    '(' => ')',
                    '*' => '*',
                    _ => unreachable!(),
                };
                chars.next(); // consume opener
                let mut buf = String::new();
                let mut found_close = false;
                while let Some(&inner) = chars.peek() {
                    if inner == close {
                        chars.next(); // consume closer
                        found_close = true;
                        break;
                    }
                    buf.push(inner);
                    chars.next();
                }
                if !found_close {
                    // Unmatched opener — keep original characters
                    result.push(ch);
                    result.push_str(&buf);
                }
            }
            _ => {
                result.push(ch);
                chars.next();
            }
        }
    }

    // Collapse multiple spaces into one, then trim
    let mut prev_space = false;
    let collapsed: String = result
        .chars()
        .filter(|&c| {
            if c == ' ' {
                if prev_space {
                    return false;
                }
                prev_space = true;
            } else {
                prev_space = false;
            }
            true
        })
        .collect();
    collapsed.trim().to_string()
}

/// Counts words containing at least one alphabetic character.
fn alphabetic_word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| word.chars().any(|c| c.is_alphabetic()))
        .count()
}

/// Applies the acceptance filter to raw provider text.
///
/// Returns the cleaned text if it qualifies as real speech, or `None`
/// when the transcript should be treated as "no utterance":
/// - empty or whitespace-only after annotation removal
/// - fewer than two words containing alphabetic characters
pub fn accept_transcript(text: &str) -> Option<String> {
    let cleaned = clean_transcript(text);

    if cleaned.is_empty() {
        return None;
    }

    if alphabetic_word_count(&cleaned) < defaults::MIN_TRANSCRIPT_WORDS {
        return None;
    }

    Some(cleaned)
}
