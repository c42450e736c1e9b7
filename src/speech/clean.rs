//! Text normalization applied before speech fingerprinting and synthesis.
//!
//! Cleaning runs *before* the cache key is computed, so replies that differ
//! only in markdown decoration, links or spacing share one audio file.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum characters handed to the synthesis service.
pub const MAX_SPEECH_CHARS: usize = 1000;

/// Appended when text is cut at [`MAX_SPEECH_CHARS`].
pub const ELLIPSIS: &str = "...";

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)```").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.*?)`").unwrap());
static STRAY_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*`]+").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static ROLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^assistant\s*:\s*").unwrap());

/// Normalize reply text for speech.
///
/// Strips fenced-code markers (keeping the code), bold/italic and inline-code
/// markers, URLs, collapses whitespace, and removes any leading
/// `Assistant:` labels. `clean_for_speech(clean_for_speech(x)) ==
/// clean_for_speech(x)` for every input.
pub fn clean_for_speech(text: &str) -> String {
    let text = CODE_FENCE.replace_all(text, "$1");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    // Unpaired markers would otherwise survive one pass and vanish on the next.
    let text = STRAY_MARKERS.replace_all(&text, "");
    let text = URL.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");

    let mut text = text.trim();
    while let Some(m) = ROLE_PREFIX.find(text) {
        text = text[m.end()..].trim_start();
    }
    text.to_string()
}

/// Cut `text` to at most `max_chars` characters, appending [`ELLIPSIS`]
/// when anything was dropped. Counts characters, not bytes, so Devanagari
/// replies are never split inside a code point.
pub fn truncate_for_speech(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            log::warn!(
                "Text too long ({} chars), truncating to {}",
                text.chars().count(),
                max_chars
            );
            format!("{}{}", &text[..byte_idx], ELLIPSIS)
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_variants_clean_identically() {
        assert_eq!(
            clean_for_speech("**Battery** is `93%`."),
            clean_for_speech("Battery is 93%.")
        );
        assert_eq!(clean_for_speech("**Battery** is `93%`."), "Battery is 93%.");
    }

    #[test]
    fn test_italic_and_code_fence() {
        assert_eq!(clean_for_speech("*Check* the fuse"), "Check the fuse");
        assert_eq!(
            clean_for_speech("Run:\n```bash\nreset battery\n```\nthen wait"),
            "Run: reset battery then wait"
        );
    }

    #[test]
    fn test_role_prefix_and_urls() {
        assert_eq!(
            clean_for_speech("Assistant: See https://smv.example/help for help"),
            "See for help"
        );
        assert_eq!(clean_for_speech("assistant:  Assistant: hi"), "hi");
        // Only a leading label is removed.
        assert_eq!(
            clean_for_speech("Ask the Assistant: anything"),
            "Ask the Assistant: anything"
        );
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(clean_for_speech("  a \n\n b\t c  "), "a b c");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "**Battery** is `93%`.",
            "***odd*** markers ** left",
            "http://x.example Assistant: hello",
            "`unterminated code",
            "```\nfence only",
            "Namaste! I am your SMV E-rickshaw assistant.\n\n1. **Stop** the vehicle.",
            "",
            "   ",
        ];
        for s in samples {
            let once = clean_for_speech(s);
            assert_eq!(clean_for_speech(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "a".repeat(1500);
        let out = truncate_for_speech(&text, MAX_SPEECH_CHARS);
        assert!(out.chars().count() <= MAX_SPEECH_CHARS + ELLIPSIS.len());
        assert!(out.ends_with(ELLIPSIS));
        assert_eq!(out.chars().count(), 1003);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_for_speech("Battery is low.", 1000), "Battery is low.");
        let exact = "b".repeat(1000);
        assert_eq!(truncate_for_speech(&exact, 1000), exact);
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "बैटरी".repeat(300);
        let out = truncate_for_speech(&text, 10);
        assert_eq!(out.chars().count(), 13);
    }
}
