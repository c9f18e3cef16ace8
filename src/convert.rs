use crate::markdown::{generate_markdown, RenderedNote};
use crate::models::BookMetadata;
use crate::parser::{parse_metadata, ParseError};
use crate::render_config::RenderConfig;
use crate::template::{render, Vars};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug)]
pub enum ConvertError {
    InputNotFound(PathBuf),
    Read(PathBuf, std::io::Error),
    Decode(ParseError),
    Write(PathBuf, std::io::Error),
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::InputNotFound(path) => {
                write!(f, "Lua file not found: {}", path.display())
            }
            ConvertError::Read(path, e) => {
                write!(f, "Failed to read {}: {}", path.display(), e)
            }
            ConvertError::Decode(e) => write!(f, "{}", e),
            ConvertError::Write(path, e) => {
                write!(f, "Failed to save markdown to {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Read(_, e) | ConvertError::Write(_, e) => Some(e),
            ConvertError::Decode(e) => Some(e),
            ConvertError::InputNotFound(_) => None,
        }
    }
}

impl From<ParseError> for ConvertError {
    fn from(e: ParseError) -> Self {
        ConvertError::Decode(e)
    }
}

/// A converted book, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub book: BookMetadata,
    pub note: RenderedNote,
    pub filename: String,
}

pub fn read_metadata(path: &Path) -> Result<BookMetadata, ConvertError> {
    info!("Parsing Lua file: {}", path.display());

    if !path.exists() {
        return Err(ConvertError::InputNotFound(path.to_path_buf()));
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConvertError::Read(path.to_path_buf(), e))?;
    let book = parse_metadata(&content, &path.display().to_string())?;

    info!("Successfully parsed Lua file");
    Ok(book)
}

/// Read and render one sidecar, resolving its output file name.
pub fn convert(input: &Path, config: &RenderConfig) -> Result<Conversion, ConvertError> {
    let book = read_metadata(input)?;
    let note = generate_markdown(&book, config);
    let filename = output_filename(&config.output.filename_template, &book, &note);

    Ok(Conversion {
        book,
        note,
        filename,
    })
}

/// Expand the filename template. Available placeholders: `timestamp`,
/// `slug`, `title` and `author`. Book values are made safe to use as a single
/// path component, so a title can't point the file outside the output
/// directory.
pub fn output_filename(template: &str, book: &BookMetadata, note: &RenderedNote) -> String {
    let slug = slug::slugify(book.title());
    let vars = Vars::new()
        .text("timestamp", note.timestamp.as_str())
        .text("slug", slug)
        .text("title", path_component(book.title()))
        .text("author", path_component(book.authors()));
    render(template, &vars)
}

fn path_component(value: &str) -> String {
    let cleaned = value.replace(['/', '\\', '\0'], "-");
    if cleaned.chars().all(|c| c == '.') {
        return cleaned.replace('.', "_");
    }
    cleaned
}

pub fn save_markdown(markdown: &str, output_path: &Path) -> Result<(), ConvertError> {
    info!("Saving markdown to: {}", output_path.display());

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConvertError::Write(output_path.to_path_buf(), e))?;
    }

    std::fs::write(output_path, markdown)
        .map_err(|e| ConvertError::Write(output_path.to_path_buf(), e))
}

/// Convert `input` and write it to `output`, or to the templated file name in
/// the current directory. Returns the path written.
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    config: &RenderConfig,
) -> Result<PathBuf, ConvertError> {
    let conversion = convert(input, config)?;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(&conversion.filename);
            info!("Using templated output filename: {}", path.display());
            path
        }
    };

    save_markdown(&conversion.note.markdown, &output_path)?;
    Ok(output_path)
}
