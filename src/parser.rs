use crate::lua::{self, LuaTable, LuaValue};
use crate::models::{BookMetadata, Bookmark, Stats, Summary};
use tracing::debug;

#[derive(Debug, PartialEq)]
pub enum ParseError {
    InvalidLua(String),
    NotATable(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidLua(details) => {
                write!(f, "Failed to parse Lua: {}", details)
            }
            ParseError::NotATable(file) => {
                write!(f, "Metadata does not return a table: {}", file)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Decode a `metadata.*.lua` sidecar into typed metadata. Only an
/// undecodable chunk is an error; missing fields are left empty.
pub fn parse_metadata(content: &str, source_file: &str) -> Result<BookMetadata, ParseError> {
    let root = match lua::decode(content) {
        Ok(LuaValue::Table(table)) => table,
        Ok(_) => return Err(ParseError::NotATable(source_file.to_string())),
        Err(e) => return Err(ParseError::InvalidLua(format!("{}: {}", source_file, e))),
    };

    Ok(BookMetadata {
        stats: extract_stats(&root),
        summary: extract_summary(&root),
        bookmarks: extract_bookmarks(&root),
    })
}

fn extract_stats(root: &LuaTable) -> Stats {
    let stats = root.get_table("stats");
    let doc_props = root.get_table("doc_props");
    let lookup = |key: &str| {
        stats
            .and_then(|t| t.get_str(key))
            .or_else(|| doc_props.and_then(|t| t.get_str(key)))
            .map(String::from)
    };

    Stats {
        title: lookup("title"),
        authors: lookup("authors"),
    }
}

fn extract_summary(root: &LuaTable) -> Summary {
    let Some(summary) = root.get_table("summary") else {
        return Summary::default();
    };

    Summary {
        rating: summary.get_number("rating"),
        note: summary.get_str("note").map(String::from),
    }
}

fn extract_bookmarks(root: &LuaTable) -> Vec<Bookmark> {
    if let Some(bookmarks) = root.get_table("bookmarks") {
        return bookmarks
            .values()
            .filter_map(LuaValue::as_table)
            .map(legacy_bookmark)
            .collect();
    }

    if let Some(annotations) = root.get_table("annotations") {
        debug!("No bookmarks table, reading {} annotations", annotations.len());
        return annotations
            .values()
            .filter_map(LuaValue::as_table)
            .map(annotation_bookmark)
            .collect();
    }

    Vec::new()
}

fn legacy_bookmark(entry: &LuaTable) -> Bookmark {
    Bookmark {
        notes: entry.get_str("notes").map(String::from),
        text: entry.get_str("text").map(String::from),
        datetime: entry.get_str("datetime").map(String::from),
        page: None,
    }
}

// Newer KOReader keeps the passage in `text` and the user's note in `note`.
fn annotation_bookmark(entry: &LuaTable) -> Bookmark {
    Bookmark {
        notes: entry.get_str("text").map(String::from),
        text: entry.get_str("note").map(String::from),
        datetime: entry.get_str("datetime").map(String::from),
        page: entry.get("pageno").and_then(scalar_text),
    }
}

fn scalar_text(value: &LuaValue) -> Option<String> {
    match value {
        LuaValue::String(s) => Some(s.clone()),
        LuaValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
        LuaValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LUA: &str = r#"
-- we can read Lua syntax here!
return {
    ["bookmarks"] = {
        [1] = {
            ["datetime"] = "2023-01-01 10:00:00",
            ["notes"] = "First highlight",
            ["page"] = "/body/DocFragment[3]/body/p[2]/text().0",
        },
        [2] = {
            ["datetime"] = "2023-01-02 03:04:00",
            ["notes"] = "Second highlight",
            ["text"] = "Page 10 my thought @ 2023-01-02 03:04:00",
        },
        [3] = {
            ["datetime"] = "2023-01-03 09:00:00",
            ["page"] = 12,
        },
    },
    ["stats"] = {
        ["title"] = "Sample Book",
        ["authors"] = "Jane Doe",
        ["pages"] = 220,
    },
    ["summary"] = {
        ["rating"] = 4,
        ["note"] = "Worth a reread",
        ["status"] = "complete",
    },
}
"#;

    const ANNOTATIONS_LUA: &str = r#"
return {
    ["annotations"] = {
        [1] = {
            ["chapter"] = "Chapter 1",
            ["datetime"] = "2026-01-25 10:30:00",
            ["pageno"] = 42,
            ["text"] = "This is a highlighted text",
            ["note"] = "my note",
        },
    },
    ["doc_props"] = {
        ["title"] = "Test Book",
        ["authors"] = "Test Author",
    },
}
"#;

    const LUA_INVALID: &str = r#"
return { this is not valid lua [[[
"#;

    #[test]
    fn test_parse_valid_metadata() {
        let book = parse_metadata(SAMPLE_LUA, "test.lua").unwrap();

        assert_eq!(book.title(), "Sample Book");
        assert_eq!(book.authors(), "Jane Doe");
        assert_eq!(book.summary.rating, Some(4.0));
        assert_eq!(book.summary_note(), Some("Worth a reread"));
        assert_eq!(book.bookmarks.len(), 3);

        let second = &book.bookmarks[1];
        assert_eq!(second.notes.as_deref(), Some("Second highlight"));
        assert_eq!(
            second.text.as_deref(),
            Some("Page 10 my thought @ 2023-01-02 03:04:00")
        );
        assert_eq!(book.bookmarks[0].page, None);
        assert_eq!(book.bookmarks[2].notes, None);
    }

    #[test]
    fn test_created_and_updated_from_bookmarks() {
        let book = parse_metadata(SAMPLE_LUA, "test.lua").unwrap();

        assert_eq!(book.created_at(), Some("2023-01-01 10:00:00"));
        assert_eq!(book.updated_at(), Some("2023-01-03 09:00:00"));
    }

    #[test]
    fn test_parse_annotations_layout() {
        let book = parse_metadata(ANNOTATIONS_LUA, "new.lua").unwrap();

        assert_eq!(book.title(), "Test Book");
        assert_eq!(book.authors(), "Test Author");
        assert_eq!(book.bookmarks.len(), 1);

        let b = &book.bookmarks[0];
        assert_eq!(b.notes.as_deref(), Some("This is a highlighted text"));
        assert_eq!(b.text.as_deref(), Some("my note"));
        assert_eq!(b.page.as_deref(), Some("42"));
        assert_eq!(b.datetime.as_deref(), Some("2026-01-25 10:30:00"));
    }

    #[test]
    fn test_parse_empty_table_degrades() {
        let book = parse_metadata("return {}", "empty.lua").unwrap();

        assert_eq!(book, BookMetadata::default());
        assert_eq!(book.title(), "Unknown Title");
        assert_eq!(book.authors(), "Unknown Author");
    }

    #[test]
    fn test_parse_wrong_shapes_degrade() {
        let book = parse_metadata(
            r#"return { stats = "oops", summary = { rating = "five" }, bookmarks = { "x", { notes = "ok" } } }"#,
            "odd.lua",
        )
        .unwrap();

        assert_eq!(book.stats, Stats::default());
        assert_eq!(book.summary.rating, None);
        assert_eq!(book.bookmarks.len(), 1);
        assert_eq!(book.bookmarks[0].notes.as_deref(), Some("ok"));
    }

    #[test]
    fn test_parse_invalid_lua() {
        let result = parse_metadata(LUA_INVALID, "broken.lua");

        assert!(matches!(result, Err(ParseError::InvalidLua(_))));
    }

    #[test]
    fn test_parse_non_table_return() {
        let result = parse_metadata("return 42", "number.lua");

        assert_eq!(result, Err(ParseError::NotATable("number.lua".to_string())));
    }
}
