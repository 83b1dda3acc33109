//! Text Normalizer: turns pasted or extracted CV text into clean, one-item-per-line text.

use std::sync::LazyLock;

use regex::Regex;

static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|h[1-6])\s*>").expect("valid break tag regex")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("valid markup tag regex"));

static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid inline whitespace regex"));

const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
];

/// Normalizes raw CV text. Pure and infallible; idempotent on its own output.
///
/// - markup line breaks become newlines, every other tag is dropped
/// - CRLF / CR become `\n`
/// - whitespace runs inside a line collapse to one space
/// - digit-only lines (page numbers) are removed
/// - lines are trimmed and empty lines dropped, order preserved
pub fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    // Decoding an entity can reveal a new tag, so strip until nothing changes.
    // Every pass that changes the text also shortens it, which bounds the loop.
    let mut text = unified;
    loop {
        let next = strip_markup(&text);
        if next == text {
            break;
        }
        text = next;
    }

    text.lines()
        .map(|line| INLINE_WHITESPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty() && !is_digit_artifact(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_markup(text: &str) -> String {
    let mut decoded = text.to_string();
    for (entity, replacement) in ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }
    let with_breaks = BREAK_TAG.replace_all(&decoded, "\n");
    ANY_TAG.replace_all(&with_breaks, "").into_owned()
}

fn is_digit_artifact(line: &str) -> bool {
    line.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_breaks_become_newlines() {
        let raw = "<p>Jane Doe</p><p>Sales Manager<br/>Acme Ltd</p>";
        assert_eq!(normalize(raw), "Jane Doe\nSales Manager\nAcme Ltd");
    }

    #[test]
    fn test_inline_tags_are_removed() {
        assert_eq!(
            normalize("<strong>Grew</strong> revenue <em>20%</em>"),
            "Grew revenue 20%"
        );
    }

    #[test]
    fn test_line_endings_unified() {
        assert_eq!(normalize("a\r\nb\rc\n"), "a\nb\nc");
    }

    #[test]
    fn test_digit_only_lines_removed() {
        let raw = "Jane Doe\n1\nEXPERIENCE\n  12  \n2019-2022";
        assert_eq!(normalize(raw), "Jane Doe\nEXPERIENCE\n2019-2022");
    }

    #[test]
    fn test_whitespace_collapsed_and_blank_lines_dropped() {
        let raw = "  Jane \t  Doe  \n\n\n   \nLondon";
        assert_eq!(normalize(raw), "Jane Doe\nLondon");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(normalize("Sales &amp; Marketing&nbsp;Lead"), "Sales & Marketing Lead");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = "Jane Doe\njane@x.com\nEXPERIENCE";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Jane Doe\njane@x.com\nEXPERIENCE\nSales Manager\n2019-2022\n- Grew revenue 20%",
            "<div>Profile</div>\r\n3\r\n&lt;br&gt;Hello&amp;lt;b&amp;gt;world",
            "   \n\n  42 \n  - bullet  \t point ",
            "",
            "a < b and c > d",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\n\r\n  \n"), "");
    }
}
