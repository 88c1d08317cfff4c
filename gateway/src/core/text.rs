//! Prosody-friendly text cleanup before speech synthesis.
//!
//! Dialogue backends answer in chat-style markdown. Read aloud, markup is
//! either pronounced ("asterisk") or swallowed in ways that break cadence, so
//! [`sanitize`] reduces the text to plain sentences.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::orchestration::normalize::TYPE_TAG;

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("static link pattern"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*#+\s*").expect("static heading pattern"));
static TERMINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?…]$").expect("static terminal pattern"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.!?…])").expect("static punctuation pattern"));
static SPACE_AFTER_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s+").expect("static paren pattern"));
static SPACE_BEFORE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\)").expect("static paren pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static space pattern"));

/// Upper bound on cleanup passes; real input settles in two.
const MAX_PASSES: usize = 8;

/// Clean text for speech synthesis.
///
/// Deterministic and idempotent. Non-empty output always ends in `.`, `!`, `?` or `…`.
pub fn sanitize(text: &str) -> String {
    let mut current = sanitize_pass(text);
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn sanitize_pass(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = TYPE_TAG.replace_all(text, "");
    let s = s.replace("\\n", "\n").replace("\r\n", "\n");
    let s = MARKDOWN_LINK.replace_all(&s, "$1");
    let s = s.replace("**", "").replace("__", "").replace('`', "");
    let s = strip_emphasis(&s);
    let s = HEADING.replace_all(&s, "");

    let s = s
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if TERMINAL.is_match(line) {
                line.to_string()
            } else {
                format!("{line}.")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let s = SPACE_BEFORE_PUNCT.replace_all(&s, "$1");
    let s = SPACE_AFTER_OPEN.replace_all(&s, "(");
    let s = SPACE_BEFORE_CLOSE.replace_all(&s, ")");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Drop single `*`/`_` emphasis markers, keeping those inside words (`snake_case`).
fn strip_emphasis(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '*' || c == '_' {
            let before = i
                .checked_sub(1)
                .and_then(|j| chars.get(j))
                .is_some_and(|p| is_word(*p));
            let after = chars.get(i + 1).is_some_and(|n| is_word(*n));
            if !(before && after) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_and_terminal_period() {
        assert_eq!(sanitize("Hai! **Apa kabar**"), "Hai! Apa kabar.");
    }

    #[test]
    fn test_full_markdown_document() {
        let input = "# Judul\n\nIni *penting* ya\r\nLihat [situs](https://contoh.id) ( ok )";
        assert_eq!(
            sanitize(input),
            "Judul. Ini penting ya. Lihat situs (ok)."
        );
    }

    #[test]
    fn test_escaped_newlines_become_sentences() {
        assert_eq!(sanitize("Baris satu\\nBaris dua!"), "Baris satu. Baris dua!");
    }

    #[test]
    fn test_type_tag_removed() {
        assert_eq!(sanitize("[[type:empathic]] Tenang ya"), "Tenang ya.");
    }

    #[test]
    fn test_code_and_underscores() {
        assert_eq!(sanitize("Pakai `snake_case` dan _miring_"), "Pakai snake_case dan miring.");
    }

    #[test]
    fn test_punctuation_spacing() {
        assert_eq!(sanitize("Halo , apa kabar ?"), "Halo, apa kabar?");
        assert_eq!(sanitize("Tunggu sebentar …"), "Tunggu sebentar…");
        assert_eq!(sanitize("a\t\t b"), "a b.");
    }

    #[test]
    fn test_empty_and_markup_only() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n\\n "), "");
        assert_eq!(sanitize("**"), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Hai! **Apa kabar**",
            "[[a](b)](c)",
            "# A\n## B\n* item satu\n* item dua",
            "Lihat [x](y) lalu ( tanya ) ,ya",
            "teks_dengan__garis ___ bawah",
            "Titik . . . banyak",
            "***tebal miring***",
            "satu\r\n\r\ndua\\n\\ntiga?",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_non_empty_output_ends_with_terminal_mark() {
        for input in ["halo", "(catatan)", "kata terakhir ,", "# judul saja"] {
            let out = sanitize(input);
            assert!(
                out.ends_with(['.', '!', '?', '…']),
                "{input:?} -> {out:?}"
            );
        }
    }
}
