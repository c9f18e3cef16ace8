pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Everything the converter knows about one book, normalized from the
/// decoded sidecar. Absent fields stay `None`; defaults are applied by the
/// accessors, not at parse time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookMetadata {
    pub stats: Stats,
    pub summary: Summary,
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub title: Option<String>,
    pub authors: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub rating: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bookmark {
    /// The highlighted passage.
    pub notes: Option<String>,
    /// Free-form user annotation, possibly `Page N ... @ timestamp`.
    pub text: Option<String>,
    pub datetime: Option<String>,
    /// Only known for the newer `annotations` layout.
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnnotation {
    pub page: Option<String>,
    pub text: String,
    pub timestamp: Option<String>,
}

impl BookMetadata {
    pub fn title(&self) -> &str {
        self.stats.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    pub fn authors(&self) -> &str {
        self.stats.authors.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }

    pub fn summary_note(&self) -> Option<&str> {
        non_blank(self.summary.note.as_deref())
    }

    /// Datetime of the first bookmark in source order.
    pub fn created_at(&self) -> Option<&str> {
        self.bookmarks.first().and_then(|b| b.datetime.as_deref())
    }

    /// Datetime of the last bookmark in source order.
    pub fn updated_at(&self) -> Option<&str> {
        self.bookmarks.last().and_then(|b| b.datetime.as_deref())
    }

    /// Bookmarks that render, in reverse source order.
    pub fn highlights(&self) -> impl Iterator<Item = &Bookmark> {
        self.bookmarks.iter().rev().filter(|b| b.highlight().is_some())
    }
}

impl Bookmark {
    pub fn highlight(&self) -> Option<&str> {
        non_blank(self.notes.as_deref())
    }

    pub fn annotation(&self) -> Option<&str> {
        non_blank(self.text.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark(notes: Option<&str>, datetime: Option<&str>) -> Bookmark {
        Bookmark {
            notes: notes.map(String::from),
            datetime: datetime.map(String::from),
            ..Bookmark::default()
        }
    }

    #[test]
    fn test_defaults_for_missing_stats() {
        let book = BookMetadata::default();

        assert_eq!(book.title(), "Unknown Title");
        assert_eq!(book.authors(), "Unknown Author");
        assert_eq!(book.created_at(), None);
        assert_eq!(book.summary_note(), None);
    }

    #[test]
    fn test_created_and_updated_are_positional() {
        let book = BookMetadata {
            bookmarks: vec![
                bookmark(Some("a"), Some("2023-05-01 10:00:00")),
                bookmark(Some("b"), Some("2022-01-01 10:00:00")),
                bookmark(Some("c"), Some("2023-01-01 10:00:00")),
            ],
            ..BookMetadata::default()
        };

        assert_eq!(book.created_at(), Some("2023-05-01 10:00:00"));
        assert_eq!(book.updated_at(), Some("2023-01-01 10:00:00"));
    }

    #[test]
    fn test_highlights_skip_blank_notes_and_reverse() {
        let book = BookMetadata {
            bookmarks: vec![
                bookmark(Some("first"), None),
                bookmark(None, None),
                bookmark(Some("   \n"), None),
                bookmark(Some("last"), None),
            ],
            ..BookMetadata::default()
        };

        let notes: Vec<_> = book.highlights().filter_map(|b| b.highlight()).collect();

        assert_eq!(notes, vec!["last", "first"]);
    }

    #[test]
    fn test_blank_summary_note_is_absent() {
        let book = BookMetadata {
            summary: Summary {
                rating: Some(4.0),
                note: Some("  ".to_string()),
            },
            ..BookMetadata::default()
        };

        assert_eq!(book.summary_note(), None);
    }
}
