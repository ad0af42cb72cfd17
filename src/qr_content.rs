/// Helpers for the text carried by a QR code: classification, filenames, display
use crate::history::EntryKind;
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("url prefix pattern"));

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("filename pattern"));

const FILENAME_STEM_LEN: usize = 30;

/// Classify encoded text. Anything starting with http:// or https://
/// (any case) is a URL, everything else is plain text.
pub fn classify(text: &str) -> EntryKind {
    if URL_PREFIX.is_match(text) {
        EntryKind::Url
    } else {
        EntryKind::Text
    }
}

/// Parse decoded text as a URL that is safe to open in a new tab.
///
/// Only http(s) URLs with a host qualify, so `javascript:` and friends
/// never reach `tabs.create`.
pub fn openable_url(text: &str) -> Option<Url> {
    let trimmed = text.trim();
    if !URL_PREFIX.is_match(trimmed) {
        return None;
    }

    Url::parse(trimmed)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

/// Filename for a downloaded QR image, e.g. `qrcode-https---example-com.png`
pub fn download_filename(text: &str) -> String {
    let stem: String = UNSAFE_FILENAME_CHARS
        .replace_all(text, "-")
        .chars()
        .take(FILENAME_STEM_LEN)
        .collect();
    format!("qrcode-{}.png", stem)
}

/// Shorten text for list rows and captions, ending in "..." when cut
pub fn display_title(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// `dd/mm/yyyy hh:mm` in the browser's local time zone
pub fn format_timestamp(millis: i64) -> String {
    format_timestamp_in(millis, &Local)
}

pub fn format_timestamp_in<Tz: TimeZone>(millis: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_millis_opt(millis).single() {
        Some(date) => date.format("%d/%m/%Y %H:%M").to_string(),
        None => String::from("-"),
    }
}

/// UTC calendar date used in export filenames
pub fn iso_date_stamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

/// Full ISO-8601 instant in UTC with millisecond precision
pub fn iso_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as epoch millis (`Date.now()` on wasm)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `<prefix>-YYYY-MM-DD.json`
pub fn export_filename(prefix: &str, millis: i64) -> String {
    format!("{}-{}.json", prefix, iso_date_stamp(millis))
}
