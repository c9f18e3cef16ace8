use crate::models::ParsedAnnotation;
use regex::Regex;
use std::sync::LazyLock;

static PAGE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Page\s+(\d+)\s+(?s:(.*))").expect("valid page regex"));

static TIMESTAMP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?s:(.*))\s+@\s+(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2})\s*$")
        .expect("valid timestamp regex")
});

/// Split KOReader's `Page 42 some text @ 2023-07-04 08:15:00` annotation
/// format into its parts. Text that doesn't start with `Page N` is returned
/// verbatim.
pub fn parse_annotation_text(text: &str) -> ParsedAnnotation {
    let Some(caps) = PAGE_PREFIX.captures(text) else {
        return ParsedAnnotation {
            page: None,
            text: text.to_string(),
            timestamp: None,
        };
    };

    let page = caps[1].to_string();
    let remainder = &caps[2];

    match TIMESTAMP_SUFFIX.captures(remainder) {
        Some(ts) => ParsedAnnotation {
            page: Some(page),
            text: ts[1].trim().to_string(),
            timestamp: Some(ts[2].to_string()),
        },
        None => ParsedAnnotation {
            page: Some(page),
            text: remainder.trim().to_string(),
            timestamp: None,
        },
    }
}
