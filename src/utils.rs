use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Shortens `message` to at most `max_width` grapheme clusters, ending it
/// with `…` when something was cut.
///
/// # Panics
///
/// If `max_width` is below 2, as the ellipsis needs one column of its own.
///
/// ```rust
/// use sitemap_search::utils::truncate_message;
///
/// assert_eq!(truncate_message("https://example.com/sitemap.xml", 12), "https://exa…");
/// assert_eq!(truncate_message("short", 12), "short");
/// ```
pub fn truncate_message(message: &str, max_width: usize) -> String {
    assert!(
        max_width >= 2,
        "max_width must be at least 2 to accommodate the ellipsis"
    );

    let mut graphemes = message.graphemes(true);
    let head: String = graphemes.by_ref().take(max_width - 1).collect();
    match (graphemes.next(), graphemes.next()) {
        (None, _) => head,
        (Some(last), None) => head + last,
        (Some(_), Some(_)) => head + "…",
    }
}

/// clap value parser for `--basic-auth`: accepts `username:password` with
/// both halves non-empty. The password may itself contain colons.
pub fn validate_basic_auth(val: &str) -> Result<String, String> {
    match val.split_once(':') {
        Some((user, password)) if !user.is_empty() && !password.is_empty() => Ok(val.to_string()),
        Some(_) => Err(String::from(
            "Invalid format: must be `username:password` with non-empty values",
        )),
        None => Err(String::from("Invalid format: must be `username:password`")),
    }
}

pub fn ms(duration: Duration) -> String {
    format!("{:.2}ms", duration.as_secs_f64() * 1000.0)
}
