#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about = "A hot-reloading development bundle server", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Start the development server
    Serve {
        /// Entry chunk, relative to the project root
        #[arg(long, default_value = "src/index.js")]
        entry: PathBuf,

        /// URL prefix for bundled assets
        #[arg(long, default_value = "/static/")]
        public_path: String,

        /// Output name of the main chunk
        #[arg(long, default_value = "bundle.js")]
        output_name: String,

        /// Directory of static assets to serve from memory
        #[arg(long)]
        assets_dir: Option<PathBuf>,

        /// Disable hot reload (no client injection, no update channel)
        #[arg(long)]
        no_hot: bool,

        /// Log every request instead of staying quiet
        #[arg(long)]
        verbose_requests: bool,

        /// Resolve and print the binding without starting the server
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Serve {
            entry,
            public_path,
            output_name,
            assets_dir,
            no_hot,
            verbose_requests,
            dry_run,
        }) => {
            let action = commands::serve::ServeAction {
                cwd,
                entry,
                public_path,
                output_name,
                assets_dir,
                hot: !no_hot,
                quiet: !verbose_requests,
                dry_run,
                json: cli.json,
            };

            let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
            rt.block_on(commands::serve::run(action))
        }
    }
}
