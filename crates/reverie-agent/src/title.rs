// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation titles derived from the first user message.

use chrono::NaiveDate;

/// Longest title before truncation, in characters, excluding the ellipsis.
pub const MAX_TITLE_CHARS: usize = 40;

/// Messages with fewer words get a dated placeholder title.
const MIN_TITLE_WORDS: usize = 3;

const ELLIPSIS: &str = "...";

/// Title for a conversation whose first user message is `message`.
///
/// Short messages ("Hi") yield `Conversation - <date>`. Longer ones are
/// truncated at a word boundary with an ellipsis.
pub fn generate_title(message: &str, today: NaiveDate) -> String {
    let words: Vec<&str> = message.split_whitespace().collect();
    if words.len() < MIN_TITLE_WORDS {
        return format!("Conversation - {}", today.format("%b %-d, %Y"));
    }

    let normalized = words.join(" ");
    if normalized.chars().count() <= MAX_TITLE_CHARS {
        return normalized;
    }

    let mut title = String::new();
    for word in &words {
        let extra = if title.is_empty() { 0 } else { 1 };
        if title.chars().count() + extra + word.chars().count() > MAX_TITLE_CHARS {
            break;
        }
        if extra == 1 {
            title.push(' ');
        }
        title.push_str(word);
    }

    // A single oversized first word is cut mid-word.
    if title.is_empty() {
        title = normalized.chars().take(MAX_TITLE_CHARS).collect();
    }

    let trimmed = title.trim_end_matches(|c: char| c.is_ascii_punctuation());
    let title = if trimmed.is_empty() { title.as_str() } else { trimmed };
    format!("{title}{ELLIPSIS}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn greeting_gets_dated_title() {
        assert_eq!(generate_title("Hi", today()), "Conversation - Mar 7, 2026");
        assert_eq!(generate_title("   ", today()), "Conversation - Mar 7, 2026");
    }

    #[test]
    fn short_message_is_kept_whole() {
        assert_eq!(
            generate_title("Rough  day at\nwork", today()),
            "Rough day at work"
        );
    }

    #[test]
    fn long_message_is_cut_at_word_boundary() {
        let title = generate_title(
            "My thoughts on personal growth and development this year",
            today(),
        );
        assert_eq!(title, "My thoughts on personal growth and...");
        assert!(title.contains("thoughts"));
    }

    #[test]
    fn trailing_punctuation_is_dropped_before_ellipsis() {
        let title = generate_title(
            "Today was long, tiring, frustrating, overwhelming and sad",
            today(),
        );
        assert_eq!(title, "Today was long, tiring, frustrating...");
    }

    #[test]
    fn oversized_first_word_is_cut() {
        let word = "a".repeat(60);
        let title = generate_title(&format!("{word} and more"), today());
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS + ELLIPSIS.len());
    }

    proptest! {
        #[test]
        fn title_is_bounded_and_non_empty(message in "\\PC{0,200}") {
            let title = generate_title(&message, today());
            prop_assert!(!title.trim().is_empty());
            prop_assert!(title.chars().count() <= MAX_TITLE_CHARS + ELLIPSIS.len());
        }

        #[test]
        fn word_cut_titles_are_message_prefixes(words in prop::collection::vec("[a-z]{1,12}", 3..30)) {
            let message = words.join(" ");
            let title = generate_title(&message, today());
            let stem = title.strip_suffix(ELLIPSIS).unwrap_or(&title);
            prop_assert!(message.starts_with(stem));
        }
    }
}
