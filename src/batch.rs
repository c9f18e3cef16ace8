use crate::convert::{convert, save_markdown, ConvertError};
use crate::render_config::RenderConfig;
use crate::report::Reporter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const SIDECAR_SUFFIX: &str = ".sdr";
pub const METADATA_FILE_NAME: &str = "metadata.epub.lua";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        count as f64 / self.total as f64 * 100.0
    }
}

enum Outcome {
    Converted(PathBuf),
    Skipped(PathBuf),
}

/// Every `*.sdr/metadata.epub.lua` below `books_path`, in file name order.
pub fn find_metadata_files(books_path: &Path) -> Vec<PathBuf> {
    WalkDir::new(books_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_dir() && e.file_name().to_string_lossy().ends_with(SIDECAR_SUFFIX)
        })
        .map(|e| e.path().join(METADATA_FILE_NAME))
        .filter(|p| p.is_file())
        .collect()
}

/// Convert every sidecar under `input_dir` into `output_dir`, one at a time.
/// Existing output files are left alone and counted as skipped. Only a
/// failure to create `output_dir` aborts the run.
pub fn batch_convert(
    input_dir: &Path,
    output_dir: &Path,
    config: &RenderConfig,
    reporter: &mut dyn Reporter,
) -> Result<BatchSummary, ConvertError> {
    info!("Searching for metadata files in: {}", input_dir.display());
    let files = find_metadata_files(input_dir);
    info!("Found {} metadata files", files.len());

    if files.is_empty() {
        reporter.no_files(input_dir);
        return Ok(BatchSummary::default());
    }

    std::fs::create_dir_all(output_dir)
        .map_err(|e| ConvertError::Write(output_dir.to_path_buf(), e))?;

    let mut summary = BatchSummary {
        total: files.len(),
        ..BatchSummary::default()
    };
    reporter.started(summary.total, output_dir);

    for file in &files {
        let book = book_label(file);
        reporter.processing(&book);

        match convert_into(file, output_dir, config) {
            Ok(Outcome::Converted(path)) => {
                summary.succeeded += 1;
                info!("Converted: {} -> {}", book, path.display());
                reporter.converted(&book, &path);
            }
            Ok(Outcome::Skipped(path)) => {
                summary.skipped += 1;
                debug!("File already exists, skipping: {}", path.display());
                reporter.skipped(&book, &path);
            }
            Err(e) => {
                summary.failed += 1;
                debug!("Failed to convert {}: {}", book, e);
                reporter.failed(&book, &e);
            }
        }
    }

    reporter.finished(&summary);
    Ok(summary)
}

fn convert_into(
    file: &Path,
    output_dir: &Path,
    config: &RenderConfig,
) -> Result<Outcome, ConvertError> {
    let conversion = convert(file, config)?;
    let output_path = output_dir.join(&conversion.filename);

    if output_path.exists() {
        return Ok(Outcome::Skipped(output_path));
    }

    save_markdown(&conversion.note.markdown, &output_path)?;
    Ok(Outcome::Converted(output_path))
}

fn book_label(file: &Path) -> String {
    file.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}
