#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easyfill::config::{DEFAULT_BACKEND_URL, DEFAULT_FRONTEND_URL, Settings};
use easyfill::errors::EasyfillError;
use easyfill::types::{AutofillMode, OutputFormat};

mod commands;

use crate::commands::config::ConfigCommands;
use crate::commands::fill::StreamOptions;
use crate::commands::utils::{BrowserArgs, PageArgs};

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "easyfill")]
#[command(about = "Fill web forms with AI suggestions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend serving autofill streams
    #[arg(long, global = true, env = "EASYFILL_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Frontend the user logs in to
    #[arg(long, global = true, env = "EASYFILL_FRONTEND_URL", default_value = DEFAULT_FRONTEND_URL)]
    frontend_url: String,

    /// State file (defaults to ~/.easyfill/storage.json)
    #[arg(long, global = true, env = "EASYFILL_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe the fillable fields of a page
    Fields {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        browser: BrowserArgs,

        /// Only the focused field
        #[arg(long)]
        focused: bool,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Fill a page from the backend or a recorded response
    Fill {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        browser: BrowserArgs,

        /// Replay a recorded response body instead of calling the backend
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Chunk size used when replaying
        #[arg(long, default_value = "64")]
        chunk_size: usize,

        /// User id (defaults to the one stored by `easyfill auth`)
        #[arg(long)]
        user_id: Option<String>,

        /// Only fill the focused field
        #[arg(long)]
        focused: bool,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Print the actions contained in a recorded response (`-` for stdin)
    Parse {
        input: String,

        /// Feed the parser in chunks of this many bytes
        #[arg(long, default_value = "64")]
        chunk_size: usize,
    },

    /// Log in through the frontend and store the user id
    Auth {
        #[command(flatten)]
        browser: BrowserArgs,

        /// Seconds to wait for the login to complete
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Fetch the user's documents
    Documents {
        /// User id (defaults to the stored one)
        #[arg(long)]
        user_id: Option<String>,

        /// Document ids to select
        #[arg(long, num_args = 1..)]
        select: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "simple")]
        format: OutputFormat,
    },

    /// Stored settings and state
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            // Convert to our error type to get proper exit code
            let easyfill_err: EasyfillError = err.into();

            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": easyfill_err.to_string(),
                "exit_code": easyfill_err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            eprintln!("Error: {}", easyfill_err);
            std::process::exit(easyfill_err.exit_code());
        }
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easyfill=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::new(&cli.backend_url, &cli.frontend_url, cli.store)?;

    match cli.command {
        Commands::Fields {
            page,
            browser,
            focused,
            format,
        } => commands::fields::handle_fields(page, browser, focused, format).await?,

        Commands::Fill {
            page,
            browser,
            replay,
            chunk_size,
            user_id,
            focused,
            format,
        } => {
            let stream = StreamOptions {
                replay,
                chunk_size,
                user_id,
                mode: if focused {
                    AutofillMode::Focused
                } else {
                    AutofillMode::Page
                },
            };
            commands::fill::handle_fill(&settings, page, browser, stream, format).await?
        }

        Commands::Parse { input, chunk_size } => {
            commands::parse::handle_parse(input, chunk_size).await?
        }

        Commands::Auth { browser, timeout } => {
            commands::auth::handle_auth(&settings, browser, timeout).await?
        }

        Commands::Documents {
            user_id,
            select,
            format,
        } => commands::documents::handle_documents(&settings, user_id, select, format).await?,

        Commands::Config { command } => commands::config::handle_config(&settings, command).await?,
    }

    Ok(())
}
