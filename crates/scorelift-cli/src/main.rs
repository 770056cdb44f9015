use clap::error::ErrorKind;
use clap::Parser;
use scorelift_core::Sentinel;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

const USAGE: &str = "scorelift <image_path> <output_dir>";

#[derive(Debug, Parser)]
#[command(
    name = "scorelift",
    version,
    about,
    override_usage = USAGE,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Image of a page of sheet music
    image_path: Option<PathBuf>,

    /// Directory the MusicXML file is written to
    output_dir: Option<PathBuf>,

    /// Path to the config file (default: ~/.config/scorelift/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Check that the OMR engine and its checkpoints are in place
    ///
    /// Runs the engine with --help and --version, then walks the models
    /// directory for checkpoint files (.onnx, .pkl) and reports which of the
    /// expected model subdirectories are populated.
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or initialise the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Create the config file with defaults if it does not exist
    Init,
    /// Print an example config file
    Example,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit();
        }
        Err(e) => {
            log::debug!("argument error: {e}");
            return usage_error();
        }
    };

    let config_path = cli.config;

    let result = match cli.command {
        Some(Commands::Status { json }) => commands::show_status(config_path, json).await,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config::show_config(config_path),
            ConfigAction::Path => commands::config::show_path(config_path),
            ConfigAction::Init => commands::config::init_config(),
            ConfigAction::Example => commands::config::show_example(),
        },
        None => {
            let (Some(image_path), Some(output_dir)) = (cli.image_path, cli.output_dir) else {
                return usage_error();
            };
            return if commands::run_process(image_path, output_dir, config_path).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn usage_error() -> ExitCode {
    println!("{}", Sentinel::Error.line(format!("Usage: {USAGE}")));
    ExitCode::FAILURE
}
