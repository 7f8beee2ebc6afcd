//! Utility functions shared by Glance crates.

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Operates on character boundaries so multi-byte text (emoji, CJK) never splits.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

/// Take the first `max_chars` characters of a string without any suffix.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Sanitize a string for safe logging (redact sensitive patterns).
pub fn sanitize_for_log(s: &str) -> String {
    let patterns: &[(&str, &str)] = &[
        (r"(?i)([?&]key=)[^&\s]+", "${1}***REDACTED***"),
        (r"(?i)(api[_-]?key|apikey)[=:]\s*\S{20,}", "$1=***REDACTED***"),
        (r"(?i)(token|secret|bearer)\s*[=:]?\s*\S{10,}", "$1 ***REDACTED***"),
        (r"sk-[a-zA-Z0-9_-]{20,}", "***REDACTED_API_KEY***"),
        (r"AIza[0-9A-Za-z_-]{30,}", "***REDACTED_API_KEY***"),
    ];

    let mut result = s.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            result = re.replace_all(&result, *replacement).to_string();
        }
    }
    result
}

/// Collapse runs of blank lines and trim each line.
///
/// Used on raw page text so summaries are not padded with layout whitespace.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_break = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            pending_break = !result.is_empty();
            continue;
        }
        if !result.is_empty() {
            result.push_str(if pending_break { "\n\n" } else { "\n" });
        }
        result.push_str(line);
        pending_break = false;
    }
    result
}

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
