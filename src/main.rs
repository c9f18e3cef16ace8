use koreader_markdown::batch::batch_convert;
use koreader_markdown::config::{Config, Mode};
use koreader_markdown::convert::{convert_file, ConvertError};
use koreader_markdown::render_config::RenderConfig;
use koreader_markdown::report::ConsoleReporter;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Logging lives for this run only; RUST_LOG overrides the level.
    let level = if config.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::with_default(subscriber, || run(&config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), ConvertError> {
    let render_config = RenderConfig::load(&config.config_path);

    match &config.mode {
        Mode::Single { input, output } => {
            let written = convert_file(input, output.as_deref(), &render_config)?;
            println!("Markdown saved to: {}", written.display());
        }
        Mode::Batch {
            input_dir,
            output_dir,
            quiet,
        } => {
            println!("Input directory:  {}", input_dir.display());
            println!("Output directory: {}", output_dir.display());

            let mut reporter = ConsoleReporter::new(config.verbose, *quiet);
            batch_convert(input_dir, output_dir, &render_config, &mut reporter)?;
        }
    }

    Ok(())
}
