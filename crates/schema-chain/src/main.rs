//! schema-chain CLI
//!
//! Command-line tool for validating and listing alter chains.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use schema_chain::prelude::*;

/// Builds and validates ordered chains of SQL schema alters.
#[derive(Parser)]
#[command(name = "schema-chain")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the alter files.
    #[arg(short, long, env = "SCHEMA_CHAIN_DIR", default_value = ".")]
    dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the chain and report its head and tail.
    Check,

    /// List the chain, one line per ref.
    List {
        /// List from tail to head.
        #[arg(short, long)]
        reverse: bool,

        /// Only list alters that run in this environment.
        #[arg(short, long, env = "SCHEMA_CHAIN_ENV")]
        env: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the alter files to apply, in order.
    Plan {
        /// Apply up alters (head to tail) or down alters (tail to head).
        #[arg(long, value_enum, default_value_t = DirectionArg::Up)]
        direction: DirectionArg,

        /// Only include alters that run in this environment.
        #[arg(short, long, env = "SCHEMA_CHAIN_ENV")]
        env: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => Self::Up,
            DirectionArg::Down => Self::Down,
        }
    }
}

/// One row of `list` output.
#[derive(Serialize)]
struct ListEntry<'a> {
    #[serde(rename = "ref")]
    reference: &'a str,
    up: Option<&'a Path>,
    down: Option<&'a Path>,
    require_env: &'a [String],
    skip_env: &'a [String],
}

impl<'a> ListEntry<'a> {
    fn new(reference: &'a str, group: &'a AlterGroup) -> Self {
        Self {
            reference,
            up: group.up.as_ref().map(Alter::path),
            down: group.down.as_ref().map(Alter::path),
            require_env: &group.require_env,
            skip_env: &group.skip_env,
        }
    }

    fn gating(&self) -> String {
        if !self.require_env.is_empty() {
            format!(" [require-env: {}]", self.require_env.join(", "))
        } else if !self.skip_env.is_empty() {
            format!(" [skip-env: {}]", self.skip_env.join(", "))
        } else {
            String::new()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ChainError>() {
                Some(chain_err) => eprintln!("error[{}]: {chain_err}", chain_err.kind()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    debug!(dir = %cli.dir.display(), "Loading alter chain");
    let chain = load_chain(&cli.dir)?;

    match cli.command {
        Commands::Check => {
            println!(
                "OK: {} alters, head {}, tail {}",
                chain.len(),
                chain.head(),
                chain.tail()
            );
        }

        Commands::List { reverse, env, json } => {
            let walk = if reverse { chain.iter_rev() } else { chain.iter() };
            let entries: Vec<ListEntry<'_>> = walk
                .filter(|(_, group)| env.as_deref().is_none_or(|env| group.runs_in(env)))
                .map(|(reference, group)| ListEntry::new(reference, group))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let up = entry.up.map(|p| p.display().to_string()).unwrap_or_default();
                    println!("{:<12} {}{}", entry.reference, up, entry.gating());
                }
            }
        }

        Commands::Plan {
            direction,
            env,
            json,
        } => {
            let alters = chain.plan(direction.into(), env.as_deref());

            if json {
                println!("{}", serde_json::to_string_pretty(&alters)?);
            } else {
                for alter in alters {
                    println!("{}", alter.file_name.display());
                }
            }
        }
    }

    Ok(())
}
