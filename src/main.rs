//! # Contact Directory CLI (`cdir`)
//!
//! The `cdir` binary lists and searches contacts loaded from a spreadsheet,
//! reads and writes per-contact status, and starts the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! cdir --config ./config/cdir.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cdir list` | Print every record |
//! | `cdir search "<query>"` | Print records matching a query |
//! | `cdir columns` | Print the column names |
//! | `cdir status get <id>` | Print the status for a record identity |
//! | `cdir status set <id> <status>` | Record `contacted` / `not_contacted` |
//! | `cdir id --name --contact --email` | Print the identity for three values |
//! | `cdir stats` | Contacted / not-contacted totals |
//! | `cdir export` | Write matching records as CSV |
//! | `cdir serve` | Start the HTTP server |
//! | `cdir completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Find everyone in a department
//! cdir search "computer science"
//!
//! # Mark a contact as reached
//! cdir status set 3f1c...e9 contacted
//!
//! # Export a filtered list
//! cdir export --query "hall a" --output hall-a.csv
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use contact_directory::config;
use contact_directory::export::to_csv;
use contact_directory::{build_directory, server, Record, RecordIdentity};

const DEFAULT_CONFIG_PATH: &str = "./config/cdir.toml";

/// Contact Directory CLI: search spreadsheet contacts and track who has
/// been contacted.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the default file does not exist, built-in defaults and
/// environment overrides are used.
#[derive(Parser)]
#[command(
    name = "cdir",
    about = "Contact Directory: search spreadsheet contacts and track who has been contacted",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cdir.toml`.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print every record in spreadsheet order.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Search records.
    ///
    /// Case-insensitive substring match against every field. An empty query
    /// matches all records.
    Search {
        /// The search query string.
        query: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the column names of the loaded records.
    Columns,

    /// Read or write a contact status.
    Status {
        #[command(subcommand)]
        action: StatusAction,
    },

    /// Print the identity for a Name / Contact / Email triple.
    ///
    /// Missing values count as empty.
    Id {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        contact: String,
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Print contacted / not-contacted totals.
    Stats {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Export matching records as CSV.
    Export {
        /// Only export records matching this query.
        #[arg(long, default_value = "")]
        query: String,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` (or the `PORT` environment variable).
    Serve,

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

/// Status subcommands.
#[derive(Subcommand)]
enum StatusAction {
    /// Print the status recorded for an identity.
    Get {
        /// Record identity (see `cdir id`).
        id: String,
    },
    /// Record a status for an identity.
    Set {
        /// Record identity (see `cdir id`).
        id: String,
        /// `contacted` or `not_contacted`.
        status: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "cdir", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Id {
            name,
            contact,
            email,
        } => {
            println!("{}", RecordIdentity::from_parts(name, contact, email));
            return Ok(());
        }
        _ => {}
    }

    let allow_missing = cli.config == Path::new(DEFAULT_CONFIG_PATH);
    let cfg = config::load_config(&cli.config, allow_missing)?;
    let directory = build_directory(&cfg);

    match cli.command {
        Commands::List { json } => {
            print_records(directory.list_all()?.iter(), json)?;
        }
        Commands::Search { query, json } => {
            let hits = directory.search(&query)?;
            print_records(hits.into_iter(), json)?;
        }
        Commands::Columns => {
            for column in directory.columns()? {
                println!("{}", column);
            }
        }
        Commands::Status { action } => match action {
            StatusAction::Get { id } => {
                println!("{}", directory.get_status(&id));
            }
            StatusAction::Set { id, status } => {
                let status = directory.set_status(&id, &status)?;
                println!("{}", status);
            }
        },
        Commands::Stats { json } => {
            let stats = directory.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total:         {}", stats.total);
                println!("Contacted:     {}", stats.contacted);
                println!("Not contacted: {}", stats.not_contacted);
            }
        }
        Commands::Export { query, output } => {
            let columns = directory.record_set()?.columns().to_vec();
            let hits = directory.search(&query)?;
            let count = hits.len();
            let csv = to_csv(&columns, hits);
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported {} records to {}", count, path.display());
                }
                None => {
                    std::io::stdout().write_all(csv.as_bytes())?;
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg, Arc::new(directory)).await?;
        }
        Commands::Completions { .. } | Commands::Id { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

/// Prints records as JSON or as indented text blocks with their identity.
fn print_records<'a, I>(records: I, json: bool) -> anyhow::Result<()>
where
    I: Iterator<Item = &'a Record>,
{
    let records: Vec<&Record> = records.collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }
    for (i, record) in records.iter().enumerate() {
        println!("{}. id: {}", i + 1, RecordIdentity::of(record));
        for (name, value) in record.fields() {
            println!("    {}: {}", name, value);
        }
    }
    Ok(())
}
