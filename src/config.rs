use crate::render_config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "koreader-markdown")]
#[command(about = "Convert KOReader highlight metadata into Markdown notes")]
pub struct CliArgs {
    /// Path to a TOML file with output and template settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging and per-file batch output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Convert a single metadata.epub.lua file
    Convert {
        /// Path to the KOReader Lua metadata file
        lua_file: PathBuf,

        /// Output file path (defaults to the configured filename template)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert every .sdr/metadata.epub.lua below a books directory
    Batch {
        /// Books directory containing .sdr folders
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory for markdown files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hide the progress spinner
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Single {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        quiet: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub config_path: PathBuf,
    pub verbose: bool,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MissingBooksPath,
    MissingOutputDir,
    BooksPathNotFound(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingBooksPath => {
                write!(f, "No books directory: use --input or set BOOKS_PATH")
            }
            ConfigError::MissingOutputDir => {
                write!(f, "No output directory: use --output or set OUTPUT_DIR")
            }
            ConfigError::BooksPathNotFound(path) => {
                write!(f, "Input directory does not exist: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let cli = CliArgs::parse();
        Self::from_args(cli, |key| std::env::var(key).ok())
    }

    fn from_args(
        cli: CliArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let config_path = cli
            .config
            .or_else(|| env("KOREADER_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mode = match cli.command {
            CliCommand::Convert { lua_file, output } => Mode::Single {
                input: lua_file,
                output,
            },
            CliCommand::Batch {
                input,
                output,
                quiet,
            } => {
                let input_dir = input
                    .or_else(|| env("BOOKS_PATH").map(PathBuf::from))
                    .ok_or(ConfigError::MissingBooksPath)?;

                let output_dir = output
                    .or_else(|| env("OUTPUT_DIR").map(PathBuf::from))
                    .ok_or(ConfigError::MissingOutputDir)?;

                if !input_dir.is_dir() {
                    return Err(ConfigError::BooksPathNotFound(input_dir));
                }

                Mode::Batch {
                    input_dir,
                    output_dir,
                    quiet,
                }
            }
        };

        Ok(Config {
            mode,
            config_path,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn batch_cli(input: Option<PathBuf>, output: Option<&str>) -> CliArgs {
        CliArgs {
            config: None,
            verbose: false,
            command: CliCommand::Batch {
                input,
                output: output.map(PathBuf::from),
                quiet: false,
            },
        }
    }

    #[test]
    fn test_convert_defaults() {
        let cli = CliArgs::parse_from(["koreader-markdown", "convert", "metadata.epub.lua"]);

        let config = Config::from_args(cli, no_env).unwrap();

        assert_eq!(
            config.mode,
            Mode::Single {
                input: PathBuf::from("metadata.epub.lua"),
                output: None
            }
        );
        assert_eq!(config.config_path, PathBuf::from("koreader_converter.toml"));
        assert!(!config.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = CliArgs::parse_from([
            "koreader-markdown",
            "convert",
            "book.lua",
            "-o",
            "out.md",
            "-v",
            "--config",
            "custom.toml",
        ]);

        let config = Config::from_args(cli, no_env).unwrap();

        assert!(config.verbose);
        assert_eq!(config.config_path, PathBuf::from("custom.toml"));
        assert_eq!(
            config.mode,
            Mode::Single {
                input: PathBuf::from("book.lua"),
                output: Some(PathBuf::from("out.md"))
            }
        );
    }

    #[test]
    fn test_config_path_from_env() {
        let cli = CliArgs::parse_from(["koreader-markdown", "convert", "book.lua"]);

        let config = Config::from_args(cli, |key| {
            (key == "KOREADER_CONFIG").then(|| "/etc/koreader.toml".to_string())
        })
        .unwrap();

        assert_eq!(config.config_path, PathBuf::from("/etc/koreader.toml"));
    }

    #[test]
    fn test_batch_from_args() {
        let books = TempDir::new().unwrap();
        let cli = batch_cli(Some(books.path().to_path_buf()), Some("notes"));

        let config = Config::from_args(cli, no_env).unwrap();

        assert_eq!(
            config.mode,
            Mode::Batch {
                input_dir: books.path().to_path_buf(),
                output_dir: PathBuf::from("notes"),
                quiet: false
            }
        );
    }

    #[test]
    fn test_batch_paths_from_env() {
        let books = TempDir::new().unwrap();
        let books_path = books.path().to_string_lossy().into_owned();
        let cli = batch_cli(None, None);

        let config = Config::from_args(cli, |key| match key {
            "BOOKS_PATH" => Some(books_path.clone()),
            "OUTPUT_DIR" => Some("/tmp/notes".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(
            config.mode,
            Mode::Batch {
                input_dir: books.path().to_path_buf(),
                output_dir: PathBuf::from("/tmp/notes"),
                quiet: false
            }
        );
    }

    #[test]
    fn test_batch_missing_input_is_error() {
        let result = Config::from_args(batch_cli(None, Some("notes")), no_env);

        assert_eq!(result, Err(ConfigError::MissingBooksPath));
    }

    #[test]
    fn test_batch_missing_output_is_error() {
        let books = TempDir::new().unwrap();
        let cli = batch_cli(Some(books.path().to_path_buf()), None);

        let result = Config::from_args(cli, no_env);

        assert_eq!(result, Err(ConfigError::MissingOutputDir));
    }

    #[test]
    fn test_batch_input_must_exist() {
        let books = TempDir::new().unwrap();
        let missing = books.path().join("nope");
        let cli = batch_cli(Some(missing.clone()), Some("notes"));

        let result = Config::from_args(cli, no_env);

        assert_eq!(result, Err(ConfigError::BooksPathNotFound(missing)));
    }
}
