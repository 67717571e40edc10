//! Text normalization for scraped article and corpus text.
//!
//! Each pass is a function `&str -> String` applied in sequence, so the result
//! is stable under repeated application for ordinary (not double-escaped) text.

use scraper::Html;
use unicode_normalization::UnicodeNormalization;

/// Normalize a scraped string.
///
/// 1. Unescape HTML entities
/// 2. Replace non-breaking spaces, drop zero-width characters
/// 3. NFKD-decompose
/// 4. Map typographic quotes, dashes and ellipses to ASCII
/// 5. Collapse whitespace runs and trim
///
/// Empty input yields an empty string.
pub fn normalize_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    let mut result = unescape_entities(s);
    result = replace_special_spaces(&result);
    result = result.nfkd().collect();
    result = asciify_punctuation(&result);
    collapse_whitespace(&result)
}

// ---------------------------------------------------------------------------
// Pass 1: HTML entities
// ---------------------------------------------------------------------------

/// Decode named, decimal and hexadecimal character references using the
/// full HTML5 entity table. Unknown names are left untouched.
///
/// Raw `<` is escaped before parsing so markup-like text stays text.
pub fn unescape_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let fragment = Html::parse_fragment(&s.replace('<', "&lt;"));
    fragment.root_element().text().collect()
}

// ---------------------------------------------------------------------------
// Pass 2: special spaces
// ---------------------------------------------------------------------------

fn replace_special_spaces(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            '\u{a0}' | '\u{202f}' | '\u{2007}' => Some(' '),
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}' | '\u{feff}' => None,
            other => Some(other),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 4: typographic punctuation
// ---------------------------------------------------------------------------

fn asciify_punctuation(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Pass 5: whitespace
// ---------------------------------------------------------------------------

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\t "), "");
    }

    #[test]
    fn plain_ascii_passes_through() {
        let s = "The Dead Sea is 396 m below sea level.";
        assert_eq!(normalize_text(s), s);
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(normalize_text("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(normalize_text("&lt;b&gt;"), "<b>");
        assert_eq!(normalize_text("caf&#233;"), normalize_text("café"));
        assert_eq!(normalize_text("&#x41;BC"), "ABC");
        assert_eq!(normalize_text("&bogus; stays"), "&bogus; stays");
        assert_eq!(normalize_text("R&D < 5 & x"), "R&D < 5 & x");
    }

    #[test]
    fn unescapes_full_entity_table() {
        assert_eq!(unescape_entities("Cam&otilde;es"), "Camões");
        assert_eq!(unescape_entities("S&atilde;o Paulo"), "São Paulo");
        assert_eq!(unescape_entities("&Agrave; la recherche"), "À la recherche");
        assert_eq!(unescape_entities("&aelig;"), "æ");
        assert_eq!(unescape_entities("Dvo&rcaron;&aacute;k"), "Dvořák");
        assert_eq!(normalize_text("Dvo&rcaron;&aacute;k"), normalize_text("Dvořák"));
        assert_eq!(unescape_entities("&lt;li&gt; &amp; <li>"), "<li> & <li>");
    }

    #[test]
    fn replaces_special_spaces() {
        assert_eq!(normalize_text("a\u{a0}b\u{202f}c"), "a b c");
        assert_eq!(normalize_text("zero\u{200b}width"), "zerowidth");
        assert_eq!(normalize_text("x&nbsp;y"), "x y");
    }

    #[test]
    fn maps_typographic_punctuation() {
        assert_eq!(
            normalize_text("\u{201c}Flannery O\u{2019}Connor\u{201d} \u{2013} 1925\u{2014}1964\u{2026}"),
            "\"Flannery O'Connor\" - 1925-1964..."
        );
        assert_eq!(normalize_text("O&rsquo;Connor"), "O'Connor");
    }

    #[test]
    fn decomposes_accents() {
        let out = normalize_text("García Márquez");
        assert_eq!(out, "Garci\u{301}a Ma\u{301}rquez");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_text("  a \n\n b\t\tc  "), "a b c");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Gabriel García Márquez (1927\u{2013}2014)",
            "  \u{201c}magical realism\u{201d}&nbsp;and Macondo ",
            "<li><span class=\"label\">Poe</span> &amp; the raven</li>",
            "plain text",
            "",
        ];
        for s in samples {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "not idempotent for {s:?}");
        }
    }
}
