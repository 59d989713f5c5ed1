//! HTML entity escaping for untrusted slot values.

/// Escape the five HTML-significant characters in `input`.
///
/// `&` `<` `>` `"` `'` become entity references; everything else passes
/// through unchanged. Applied exactly once per render, so a value that
/// already contains `&amp;` comes out as `&amp;amp;` - escaping is lossless,
/// not idempotent.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
