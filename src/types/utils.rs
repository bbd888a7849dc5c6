//! Shared helpers for logging and display.

use std::fmt::Display;

/// Filter and log errors from an iterator of Results.
///
/// Row-mapping errors are dropped from the result set, but logged so it is
/// visible what was discarded.
///
/// # Example
/// ```ignore
/// let values: Vec<_> = rows
///     .filter_map(|r| log_filter_error(r, "reading file record"))
///     .collect();
/// ```
pub fn log_filter_error<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!("{}: {}", context, e);
            None
        }
    }
}

/// Shorten text to `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_error() {
        let rows: Vec<Result<i32, String>> = vec![Ok(1), Err("bad row".into()), Ok(3)];
        let kept: Vec<_> = rows
            .into_iter()
            .filter_map(|r| log_filter_error(r, "reading"))
            .collect();
        assert_eq!(kept, vec![1, 3]);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello…");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll…");
    }
}
