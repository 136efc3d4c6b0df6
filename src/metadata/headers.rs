//! Core metadata header parsing (`METADATA` / `PKG-INFO`).
//!
//! The format is an RFC 822 style header block. Parsing stops at the first
//! empty line, after which newer metadata versions put the long description.

/// Every `(name, value)` header pair in file order. Continuation lines are
/// joined to the previous value with a newline.
pub fn parse_headers(text: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }

        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    headers
}

/// All values of a multi-valued header; the name compares case-insensitively.
pub fn header_values(text: &str, name: &str) -> Vec<String> {
    parse_headers(text)
        .into_iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
        .collect()
}

/// The non-empty `Requires-Dist` values.
pub fn requires_dist(text: &str) -> Vec<String> {
    header_values(text, "Requires-Dist")
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect()
}
