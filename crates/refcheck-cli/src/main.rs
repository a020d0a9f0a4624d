#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "refcheck: reference history and coverage gaps for background checks",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (unless REFCHECK_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output. Same as `--format json`.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Directory holding `.refcheck/config.toml`. Defaults to the current
    /// directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Print the coverage window",
        long_about = "Print the trailing coverage window the reference history must account for.",
        after_help = "EXAMPLES:\n    # Window ending today\n    refcheck window\n\n    # Window ending on a fixed date\n    refcheck window --today 2025-06-15 --json"
    )]
    Window(cmd::window::WindowArgs),

    #[command(
        about = "List occupations and coverage gaps",
        long_about = "Order the occupation periods of a form snapshot and report every uncovered stretch long enough to need explaining.",
        after_help = "EXAMPLES:\n    # Report gaps\n    refcheck gaps --state form.json\n\n    # Add a Gap reference for every gap and print the new snapshot\n    refcheck gaps --state form.json --fill > filled.json"
    )]
    Gaps(cmd::gaps::GapsArgs),

    #[command(
        about = "Apply raw form input to a snapshot",
        long_about = "Rebuild every reference of a form snapshot from one raw input snapshot and print the result.",
        after_help = "EXAMPLES:\n    # Show which records changed\n    refcheck reconcile --state form.json --raw edit.json\n\n    # Print the reconciled snapshot\n    refcheck reconcile --state form.json --raw edit.json --json"
    )]
    Reconcile(cmd::reconcile::ReconcileArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("REFCHECK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "refcheck=debug,info"
        } else {
            "refcheck=info,warn"
        })
    });

    let format = env::var("REFCHECK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let root = match cli.root.clone() {
        Some(root) => root,
        None => env::current_dir()?,
    };
    debug!(root = %root.display(), ?output, "starting");

    let command_result = cmd::load_check_config(&root).and_then(|config| match &cli.command {
        Commands::Window(args) => cmd::window::run_window(args, output, &config),
        Commands::Gaps(args) => cmd::gaps::run_gaps(args, output, &config),
        Commands::Reconcile(args) => cmd::reconcile::run_reconcile(args, output, &config),
    });

    if let Err(err) = command_result {
        output::render_error(output, &CliError::from(&err))?;
        std::process::exit(1);
    }
    Ok(())
}
