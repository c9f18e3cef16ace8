use crate::annotation::parse_annotation_text;
use crate::models::{BookMetadata, Bookmark};
use crate::normalize::{self, parse_author_name};
use crate::render_config::{RenderConfig, Templates};
use crate::template::{render, Vars};
use chrono::NaiveDateTime;
use tracing::debug;

/// A rendered note and the `YYMMDDHHMM` timestamp used to name it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNote {
    pub markdown: String,
    pub timestamp: String,
}

pub struct FrontMatter<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub lastname: &'a str,
    pub firstname: &'a str,
    pub rating: Option<String>,
    pub note: Option<&'a str>,
    pub date_created: Option<String>,
    pub date_updated: Option<String>,
}

pub struct Intro<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub lastname: &'a str,
    pub firstname: &'a str,
}

pub fn generate_markdown(book: &BookMetadata, config: &RenderConfig) -> RenderedNote {
    generate_markdown_at(book, config, normalize::now())
}

/// Render `book` with `now` standing in for the wall clock wherever a date
/// is missing or malformed.
pub fn generate_markdown_at(
    book: &BookMetadata,
    config: &RenderConfig,
    now: NaiveDateTime,
) -> RenderedNote {
    let templates = &config.templates;
    let title = book.title();
    let author = book.authors();
    let (lastname, firstname) = parse_author_name(author);

    let created_at = book.created_at();
    let updated_at = book.updated_at();

    let timestamp = match created_at {
        Some(dt) => normalize::to_filename_timestamp_at(dt, now),
        None => normalize::filename_timestamp(now),
    };

    let mut md = front_matter(
        &templates.yaml_frontmatter,
        &FrontMatter {
            title,
            author,
            lastname: &lastname,
            firstname: &firstname,
            rating: book.summary.rating.map(format_rating),
            note: book.summary_note(),
            date_created: created_at.map(|dt| normalize::to_calendar_date_at(dt, now)),
            date_updated: updated_at.map(|dt| normalize::to_calendar_date_at(dt, now)),
        },
    );

    md.push_str(&intro(
        &templates.intro,
        &Intro {
            title,
            author,
            lastname: &lastname,
            firstname: &firstname,
        },
    ));
    if let Some(note) = book.summary_note() {
        md.push_str("\n\n");
        md.push_str(&summary_note(&templates.summary_note, note));
    }
    md.push_str("\n\n");

    let mut blocks = String::new();
    let mut count = 0;
    for bookmark in book.highlights() {
        blocks.push_str(&highlight_block(templates, bookmark));
        count += 1;
    }
    debug!("Rendered {} highlight blocks for '{}'", count, title);

    md.push_str(blocks.trim());
    md.truncate(md.trim_end().len());

    RenderedNote {
        markdown: md,
        timestamp,
    }
}

pub fn front_matter(template: &str, fm: &FrontMatter<'_>) -> String {
    let vars = Vars::new()
        .text("title", fm.title)
        .text("author", fm.author)
        .text("lastname", fm.lastname)
        .text("firstname", fm.firstname)
        .optional("rating", fm.rating.as_deref())
        .optional("note", fm.note)
        .optional("date_created", fm.date_created.as_deref())
        .optional("date_updated", fm.date_updated.as_deref());
    render(template, &vars)
}

pub fn intro(template: &str, intro: &Intro<'_>) -> String {
    let vars = Vars::new()
        .text("title", intro.title)
        .text("author", intro.author)
        .text("lastname", intro.lastname)
        .text("firstname", intro.firstname);
    render(template, &vars)
}

pub fn summary_note(template: &str, note: &str) -> String {
    render(template, &Vars::new().text("note", note))
}

pub fn highlight(template: &str, text: &str) -> String {
    render(template, &Vars::new().text("text", text))
}

pub fn annotation(template: &str, text: &str, page: Option<&str>, time: Option<&str>) -> String {
    let vars = Vars::new()
        .text("annotation", text)
        .text("page", page_suffix(page))
        .text("time", time_suffix(time));
    render(template, &vars)
}

pub fn page_suffix(page: Option<&str>) -> String {
    match page {
        Some(p) if !p.is_empty() => format!(" (Seite {})", p),
        _ => String::new(),
    }
}

pub fn time_suffix(time: Option<&str>) -> String {
    match time {
        Some(t) if !t.is_empty() => format!(" @ {}", t),
        _ => String::new(),
    }
}

fn highlight_block(templates: &Templates, bookmark: &Bookmark) -> String {
    let mut block = String::new();
    let Some(text) = bookmark.highlight() else {
        return block;
    };

    block.push_str(&highlight(&templates.highlight, text));
    block.push_str("\n\n");

    if let Some(raw) = bookmark.annotation() {
        let parsed = parse_annotation_text(raw);
        let page = parsed.page.as_deref().or(bookmark.page.as_deref());
        block.push_str(&annotation(
            &templates.annotation,
            &parsed.text,
            page,
            parsed.timestamp.as_deref(),
        ));
        block.push_str("\n\n");
    }

    block.push_str(&templates.separator);
    block.push_str("\n\n");
    block
}

fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        rating.to_string()
    }
}
