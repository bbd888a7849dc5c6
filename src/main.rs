use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pixelrelay")]
#[command(
    version,
    about = "Resilient image generation and file recall for chat bots"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a prompt
    Generate {
        #[arg(required = true, num_args = 1.., help = "Prompt text")]
        prompt: Vec<String>,
        #[arg(long, help = "Print the outcome as JSON")]
        json: bool,
    },

    /// Store files and index them for recall
    Upload {
        #[arg(required = true, help = "Files to upload")]
        files: Vec<PathBuf>,
        #[arg(long, short, default_value = "local", help = "Uploader id recorded with the files")]
        user: String,
        #[arg(long, help = "Link to the originating message")]
        link: Option<String>,
    },

    /// Search uploaded files by name or uploader
    Recall {
        #[arg(help = "Search keyword")]
        keyword: String,
        #[arg(long, short = 'n', help = "Maximum results (default: storage.recall_limit)")]
        limit: Option<usize>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Handle chat messages typed on stdin
    Chat {
        #[arg(long, short, default_value = "local", help = "Author id for typed messages")]
        user: String,
        #[arg(long, default_value = "pixelrelay", help = "Bot username for @mentions")]
        bot_name: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mpixelrelay encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate { prompt, json } => {
            let rt = Runtime::new()?;
            rt.block_on(pixelrelay::cli::commands::generate::run(
                &prompt.join(" "),
                json,
            ))?;
        }
        Commands::Upload { files, user, link } => {
            pixelrelay::cli::commands::upload::run(&files, &user, link.as_deref())?;
        }
        Commands::Recall {
            keyword,
            limit,
            format,
        } => {
            pixelrelay::cli::commands::recall::run(&keyword, limit, &format)?;
        }
        Commands::Chat { user, bot_name } => {
            let rt = Runtime::new()?;
            rt.block_on(pixelrelay::cli::commands::chat::run(&user, &bot_name))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                pixelrelay::cli::commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                pixelrelay::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    pixelrelay::cli::commands::config::init_global(force)?;
                } else {
                    pixelrelay::cli::commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
