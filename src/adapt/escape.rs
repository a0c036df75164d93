//! Escape strategies for outgoing response text

use crate::capability::EscapeHandling;
use std::fmt::Write;

/// Markdown characters escaped by [`EscapeHandling::Markdown`]
const MARKDOWN_METACHARACTERS: &[char] = &[
    '\\', '`', '*', '_', '{', '}', '[', ']', '<', '>', '#', '|', '~', '!',
];

/// Apply an escape strategy to text
///
/// - `none` returns the text unchanged
/// - `minimal` rewrites control characters other than newline and tab as
///   `\uXXXX`
/// - `standard` additionally escapes backslashes and double quotes
/// - `json` applies JSON string escaping without the enclosing quotes
/// - `markdown` backslash-escapes markdown metacharacters
///
/// # Examples
///
/// ```
/// use clientfit::adapt::escape_text;
/// use clientfit::capability::EscapeHandling;
///
/// assert_eq!(escape_text("say \"hi\"", EscapeHandling::Standard), "say \\\"hi\\\"");
/// assert_eq!(escape_text("*bold*", EscapeHandling::Markdown), "\\*bold\\*");
/// ```
pub fn escape_text(text: &str, mode: EscapeHandling) -> String {
    match mode {
        EscapeHandling::None => text.to_string(),
        EscapeHandling::Minimal => escape_with(text, false),
        EscapeHandling::Standard => escape_with(text, true),
        EscapeHandling::Json => escape_json(text),
        EscapeHandling::Markdown => escape_markdown(text),
    }
}

fn escape_with(text: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' | '\t' => out.push(c),
            '\\' if quotes => out.push_str("\\\\"),
            '"' if quotes => out.push_str("\\\""),
            c if c.is_control() => push_unicode_escape(&mut out, c),
            c => out.push(c),
        }
    }
    out
}

fn escape_json(text: &str) -> String {
    serde_json::to_string(text)
        .map(|quoted| quoted[1..quoted.len() - 1].to_string())
        .unwrap_or_else(|_| escape_with(text, true))
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_METACHARACTERS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_unicode_escape(out: &mut String, c: char) {
    let _ = write!(out, "\\u{:04x}", c as u32);
}
