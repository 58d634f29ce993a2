//! `rollcall` — reconcile membership-registry exports into mailing and
//! report lists.

mod exit_codes;
mod export;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Reconcile membership-registry exports into mailing and report lists"
)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation pipeline from a TOML config file
    #[command(after_help = "\
Examples:
  rollcall run pipeline.toml
  rollcall run pipeline.toml --json")]
    Run {
        /// Path to the pipeline .toml config file
        config: PathBuf,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a pipeline config without running
    Validate {
        /// Path to the pipeline .toml config file
        config: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, json } => run::cmd_run(&config, json),
        Commands::Validate { config } => run::cmd_validate(&config),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err.message);
        if let Some(hint) = err.hint {
            eprintln!("hint: {hint}");
        }
        std::process::exit(i32::from(err.code));
    }
}
