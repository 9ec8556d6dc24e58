use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use family_core::{FamilyError, PersonService, default_root, ensure_initialized};

#[derive(Parser)]
#[command(
    name = "family-admin",
    about = "Manage a family tree and query ancestries"
)]
struct Cli {
    /// Workspace root (defaults to $FAMILY_ROOT or .family)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the workspace layout and default config
    Init,
    /// Print one person
    Find { name: String },
    /// Print everyone
    List,
    /// Merge a JSON array of people (file path, or - for stdin)
    Add { input: String },
    /// Print a person's ancestors
    Ascendancy { name: String },
    /// Dump the graph to a snapshot in the snapshot directory
    Backup { snapshot: String },
    /// Replace the graph with a snapshot from the snapshot directory
    Restore { snapshot: String },
    /// Delete everyone
    Clear,
}

// Exit statuses: 0 ok, 2 client error (not found / bad input), 1 anything else.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let client = e
                .downcast_ref::<FamilyError>()
                .is_some_and(FamilyError::is_client_error);
            if client {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.unwrap_or_else(default_root);
    tracing::debug!(root = %root.display(), "using workspace");
    let open = || PersonService::open(&root);

    match cli.cmd {
        Cmd::Init => {
            let report = ensure_initialized(&root)?;
            println!("root: {}", report.root.display());
            println!("created: {}", report.created.join(", "));
            println!("existed: {}", report.existed.join(", "));
        }
        Cmd::Find { name } => match open()?.find(&name)? {
            Some(person) => print_json(&person)?,
            None => return Err(FamilyError::NotFound(name).into()),
        },
        Cmd::List => print_json(&open()?.find_all()?)?,
        Cmd::Add { input } => {
            let payload = read_input(&input)?;
            let report = open()?.add_json(&payload)?;
            print_json(&report)?;
        }
        Cmd::Ascendancy { name } => print_json(&open()?.ascendancy(&name)?)?,
        Cmd::Backup { snapshot } => {
            let records = open()?.backup(&snapshot)?;
            println!("backed up {records} people to {snapshot}");
        }
        Cmd::Restore { snapshot } => {
            let records = open()?.restore(&snapshot)?;
            println!("restored {records} people from {snapshot}");
        }
        Cmd::Clear => {
            open()?.clear()?;
            println!("cleared");
        }
    }
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading batch from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(input).with_context(|| format!("reading batch from {input}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
