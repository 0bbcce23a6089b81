//! Message text transform
//!
//! Pure string functions applied to message text before display.
//! [`render_markup`] produces markup that is safe to insert unescaped: every
//! markup-significant character coming from the text is escaped before the
//! substitution rules add their own tags.
//!
//! Rules, applied in order:
//! 1. literal `\uXXXX` escapes (and UTF-16 surrogate pairs) decode to the character
//! 2. `& < > " '` are escaped
//! 3. `**x**` becomes `<b>x</b>`
//! 4. literal `\n` escapes and real line breaks become `<br>`

use regex::{Captures, Regex};
use std::sync::LazyLock;

static SURROGATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\u([dD][89abAB][0-9a-fA-F]{2})\\u([dD][c-fC-F][0-9a-fA-F]{2})")
        .expect("surrogate pair pattern")
});

static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").expect("unicode escape pattern"));

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^\n]+?)\*\*").expect("bold pattern"));

const LINE_BREAK: &str = "<br>";

/// Render message text as sanitized markup.
pub fn render_markup(text: &str) -> String {
    let decoded = decode_unicode_escapes(text);
    let escaped = escape_html(&decoded);
    let bolded = BOLD.replace_all(&escaped, "<b>$1</b>");
    replace_line_breaks(&bolded, LINE_BREAK)
}

/// Render message text for a plain-text surface such as a terminal.
///
/// Same rules as [`render_markup`] without escaping: bold markers are
/// dropped and line breaks stay line breaks.
pub fn render_plain(text: &str) -> String {
    let decoded = decode_unicode_escapes(text);
    let unbolded = BOLD.replace_all(&decoded, "$1");
    unbolded.replace("\\n", "\n").replace("\r\n", "\n")
}

/// Decode literal `\uXXXX` escapes. Code points that are not valid chars
/// (lone surrogates) are left as written.
pub fn decode_unicode_escapes(text: &str) -> String {
    let pairs = SURROGATE_PAIR.replace_all(text, |caps: &Captures| {
        let high = parse_hex(&caps[1]);
        let low = parse_hex(&caps[2]);
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(combined).map_or_else(|| caps[0].to_string(), String::from)
    });

    UNICODE_ESCAPE
        .replace_all(&pairs, |caps: &Captures| {
            char::from_u32(parse_hex(&caps[1])).map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Escape characters with meaning in markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn replace_line_breaks(text: &str, marker: &str) -> String {
    text.replace("\\n", marker)
        .replace("\r\n", marker)
        .replace('\n', marker)
}

// Only called on regex captures of exactly four hex digits
fn parse_hex(digits: &str) -> u32 {
    u32::from_str_radix(digits, 16).unwrap_or(0)
}
