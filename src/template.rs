//! `{placeholder}` substitution for the user-configurable output templates.
//!
//! Values are either plain text or optional. An absent optional renders as
//! an empty string; if that leaves its line as a bare `label:`, the line is
//! dropped, which is how front matter fields like `rating: {rating}`
//! disappear for unrated books. `{{` and `}}` render as literal braces.

use std::borrow::Cow;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    UnknownPlaceholder(String),
    UnmatchedBrace(usize),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::UnknownPlaceholder(name) => {
                write!(f, "Missing placeholder in template: '{}'", name)
            }
            TemplateError::UnmatchedBrace(pos) => {
                write!(f, "Unmatched brace in template at byte {}", pos)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Named values for one template call.
#[derive(Debug, Default)]
pub struct Vars<'a> {
    entries: Vec<(&'static str, Option<Cow<'a, str>>)>,
}

impl<'a> Vars<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, value: impl Into<Cow<'a, str>>) -> Self {
        self.entries.push((name, Some(value.into())));
        self
    }

    pub fn optional<V: Into<Cow<'a, str>>>(mut self, name: &'static str, value: Option<V>) -> Self {
        self.entries.push((name, value.map(Into::into)));
        self
    }

    fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_deref())
    }
}

enum Segment<'t> {
    Literal(&'t str),
    Placeholder(&'t str),
}

/// Fill `template` from `vars`. On an unknown placeholder or a stray brace
/// the template is logged and returned as-is.
pub fn render(template: &str, vars: &Vars<'_>) -> String {
    match try_render(template, vars) {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!("{}", e);
            template.to_string()
        }
    }
}

pub fn try_render(template: &str, vars: &Vars<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut line = String::new();
    let mut line_had_absent = false;

    for segment in tokenize(template)? {
        match segment {
            Segment::Literal(text) => {
                let mut pieces = text.split('\n');
                if let Some(first) = pieces.next() {
                    line.push_str(first);
                }
                for piece in pieces {
                    if !(line_had_absent && is_bare_label(&line)) {
                        out.push_str(&line);
                        out.push('\n');
                    }
                    line.clear();
                    line.push_str(piece);
                    line_had_absent = false;
                }
            }
            Segment::Placeholder(name) => match vars.get(name) {
                Some(Some(value)) => line.push_str(value),
                Some(None) => line_had_absent = true,
                None => return Err(TemplateError::UnknownPlaceholder(name.to_string())),
            },
        }
    }

    if !(line_had_absent && is_bare_label(&line)) {
        out.push_str(&line);
    }
    Ok(out)
}

// `rating:` or `  note: ` with nothing after the colon.
fn is_bare_label(line: &str) -> bool {
    line.trim()
        .strip_suffix(':')
        .is_some_and(|label| !label.is_empty() && !label.contains(':'))
}

fn tokenize(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                segments.push(Segment::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                segments.push(Segment::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let close = template[i + 1..]
                    .find(['{', '}'])
                    .map(|offset| i + 1 + offset)
                    .filter(|&end| bytes[end] == b'}')
                    .ok_or(TemplateError::UnmatchedBrace(i))?;
                segments.push(Segment::Literal(&template[literal_start..i]));
                segments.push(Segment::Placeholder(template[i + 1..close].trim()));
                i = close + 1;
                literal_start = i;
            }
            b'}' => return Err(TemplateError::UnmatchedBrace(i)),
            _ => i += 1,
        }
    }

    segments.push(Segment::Literal(&template[literal_start..]));
    Ok(segments)
}
