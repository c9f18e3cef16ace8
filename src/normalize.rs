use chrono::{Local, NaiveDateTime};
use tracing::warn;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILENAME_TIMESTAMP_FORMAT: &str = "%y%m%d%H%M";
const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Split an author string into `(lastname, firstname)`.
///
/// `"Doe, Jane"` splits on the first comma, `"Jane Marie Doe"` takes the last
/// word as the last name. Suffixes and multi-word surnames are not handled.
pub fn parse_author_name(author: &str) -> (String, String) {
    if let Some((last, first)) = author.split_once(',') {
        return (last.trim().to_string(), first.trim().to_string());
    }

    let parts: Vec<&str> = author.split_whitespace().collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => (last.to_string(), rest.join(" ")),
        _ => (author.trim().to_string(), String::new()),
    }
}

/// `2023-07-04 08:15:00` → `2307040815`, falling back to the current time.
pub fn to_filename_timestamp(datetime: &str) -> String {
    to_filename_timestamp_at(datetime, now())
}

/// `2023-07-04 08:15:00` → `2023-07-04`, falling back to today.
pub fn to_calendar_date(datetime: &str) -> String {
    to_calendar_date_at(datetime, now())
}

pub fn to_filename_timestamp_at(datetime: &str, now: NaiveDateTime) -> String {
    parse_or(datetime, now).format(FILENAME_TIMESTAMP_FORMAT).to_string()
}

pub fn to_calendar_date_at(datetime: &str, now: NaiveDateTime) -> String {
    parse_or(datetime, now).format(CALENDAR_DATE_FORMAT).to_string()
}

pub fn filename_timestamp(at: NaiveDateTime) -> String {
    at.format(FILENAME_TIMESTAMP_FORMAT).to_string()
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn parse_or(datetime: &str, now: NaiveDateTime) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(datetime, DATETIME_FORMAT).unwrap_or_else(|_| {
        warn!("Failed to parse datetime '{}', using current time", datetime);
        now
    })
}
