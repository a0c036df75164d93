//! Response size limiting

/// Marker appended to every truncated response
pub const TRUNCATION_NOTICE: &str =
    "\n\n[Response truncated: output exceeded the client's size limit]";

/// Space reserved below the limit for the notice
pub const TRUNCATION_MARGIN: usize = 100;

/// Fraction of the window in which a newline is preferred as cut point
const NEWLINE_WINDOW: f64 = 0.2;

/// Bound text to `max_size` bytes
///
/// Text within the limit is returned unchanged. Longer text is cut near
/// `max_size - 100`, at the last newline when it falls within the final
/// 20% of the kept window, and always ends with [`TRUNCATION_NOTICE`].
/// Returns the text and whether it was truncated.
///
/// # Examples
///
/// ```
/// use clientfit::adapt::{apply_size_limit, TRUNCATION_NOTICE};
///
/// let (text, truncated) = apply_size_limit(&"x".repeat(2_000), 1_000);
/// assert!(truncated);
/// assert!(text.ends_with(TRUNCATION_NOTICE));
/// assert!(text.len() <= 1_000);
/// ```
pub fn apply_size_limit(text: &str, max_size: usize) -> (String, bool) {
    if text.len() <= max_size {
        return (text.to_string(), false);
    }

    let window = floor_char_boundary(text, max_size.saturating_sub(TRUNCATION_MARGIN));
    let kept = &text[..window];
    let threshold = (window as f64 * (1.0 - NEWLINE_WINDOW)) as usize;
    let cut = match kept.rfind('\n') {
        Some(pos) if pos >= threshold => pos,
        _ => window,
    };

    let mut out = String::with_capacity(cut + TRUNCATION_NOTICE.len());
    out.push_str(&text[..cut]);
    out.push_str(TRUNCATION_NOTICE);
    (out, true)
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
