use crate::batch::BatchSummary;
use crate::convert::ConvertError;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Receives batch progress. The batch driver never prints on its own.
pub trait Reporter {
    fn no_files(&mut self, _input_dir: &Path) {}
    fn started(&mut self, _total: usize, _output_dir: &Path) {}
    fn processing(&mut self, _book: &str) {}
    fn converted(&mut self, _book: &str, _output: &Path) {}
    fn skipped(&mut self, _book: &str, _output: &Path) {}
    fn failed(&mut self, _book: &str, _error: &ConvertError) {}
    fn finished(&mut self, _summary: &BatchSummary) {}
}

/// Reports nothing.
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Spinner while converting, summary table at the end.
pub struct ConsoleReporter {
    verbose: bool,
    pb: ProgressBar,
    output_dir: PathBuf,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {msg}")
            {
                pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
            }
            pb
        };

        ConsoleReporter {
            verbose,
            pb,
            output_dir: PathBuf::new(),
        }
    }

    fn line(&self, msg: String) {
        if self.pb.is_hidden() {
            println!("{}", msg);
        } else {
            self.pb.println(msg);
        }
    }
}

impl Reporter for ConsoleReporter {
    fn no_files(&mut self, input_dir: &Path) {
        println!(
            "No metadata.epub.lua files found in {}.",
            input_dir.display()
        );
    }

    fn started(&mut self, total: usize, output_dir: &Path) {
        self.output_dir = output_dir.to_path_buf();
        self.pb.set_length(total as u64);
        self.pb.set_message(format!("Converting {} files...", total));
        self.pb.enable_steady_tick(Duration::from_millis(80));
    }

    fn processing(&mut self, book: &str) {
        self.pb.set_message(format!("Processing {}...", book));
    }

    fn converted(&mut self, book: &str, output: &Path) {
        if self.verbose {
            self.line(format!("Converted: {} -> {}", book, output.display()));
        }
        self.pb.inc(1);
    }

    fn skipped(&mut self, book: &str, output: &Path) {
        if self.verbose {
            self.line(format!("Skipped:   {} ({} exists)", book, output.display()));
        }
        self.pb.inc(1);
    }

    fn failed(&mut self, book: &str, error: &ConvertError) {
        if self.verbose {
            self.line(format!("Failed:    {}: {}", book, error));
        }
        self.pb.inc(1);
    }

    fn finished(&mut self, summary: &BatchSummary) {
        self.pb.finish_and_clear();

        println!();
        println!("Batch Conversion Summary");
        for (label, count) in [
            ("Successful", summary.succeeded),
            ("Failed", summary.failed),
            ("Skipped", summary.skipped),
        ] {
            println!(
                "  {:<12}{:>6}  {:>5.1}%",
                label,
                count,
                summary.percentage(count)
            );
        }
        println!("  {:<12}{:>6}  {:>5}%", "Total", summary.total, 100);

        if summary.failed > 0 && !self.verbose {
            println!(
                "\n{} files failed to convert. Use --verbose for error details.",
                summary.failed
            );
        }
        if summary.succeeded > 0 {
            println!(
                "\nSuccessfully converted {} files to {}",
                summary.succeeded,
                self.output_dir.display()
            );
        }
    }
}
