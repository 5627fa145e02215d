//! safesql — compile JSON filters and screen SQL from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Compile a filter
//! safesql compile '{"age": {"gte": 18}, "status": "ACTIVE"}'
//!
//! # From a file, as JSON
//! safesql compile --file filter.json --format json
//!
//! # Check raw SQL for stacked statements
//! safesql check "SELECT 1; DROP TABLE users"
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use safesql::prelude::*;
use safesql::{scan, Operator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "safesql")]
#[command(version)]
#[command(about = "Parameterized SQLite from JSON filters", long_about = None)]
#[command(after_help = "EXAMPLES:
    safesql compile '{\"status\": \"ACTIVE\", \"$t2\": {\"n\": {\"gte\": 100}}}'
    echo '{\"a.b\": {\"in\": [1, 2]}}' | safesql compile --format json
    safesql check \"SELECT * FROM users WHERE id = ?\"")]
struct Cli {
    /// Limits file (defaults to <config dir>/safesql/config.toml)
    #[arg(long, global = true, env = "SAFESQL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON filter into SQL and bindings
    Compile {
        /// The filter (reads stdin when neither this nor --file is given)
        filter: Option<String>,

        /// Read the filter from a file
        #[arg(short, long, conflicts_with = "filter")]
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Screen raw SQL for stacked statements and length
    Check {
        /// The SQL text
        sql: String,
    },
    /// Show the operator reference
    Operators,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "safesql=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SAFESQL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let limits = match &cli.config {
        Some(path) => Limits::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Limits::discover()?,
    };

    match &cli.command {
        Commands::Compile {
            filter,
            file,
            format,
        } => {
            let input = read_filter(filter.as_deref(), file.as_ref())?;
            compile(&input, &limits, *format, cli.verbose)
        }
        Commands::Check { sql } => check(sql, &limits),
        Commands::Operators => {
            show_operators();
            Ok(())
        }
    }
}

fn read_filter(arg: Option<&str>, file: Option<&PathBuf>) -> Result<String> {
    if let Some(text) = arg {
        return Ok(text.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read filter from stdin")?;
    Ok(buf)
}

fn compile(input: &str, limits: &Limits, format: OutputFormat, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!("{} {}", "Input:".dimmed(), input.trim().yellow());
    }

    let filter: FilterValue = serde_json::from_str(input).context("filter is not valid JSON")?;
    let compiled = compile_filter_with(&filter, limits)?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "text": compiled.text(),
                "values": compiled.values(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", compiled.text().white());

            if !compiled.values().is_empty() {
                println!();
                println!("{}", "Bindings:".cyan());
                for (i, value) in compiled.values().iter().enumerate() {
                    println!("  ?{} = {}", i + 1, value.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}

fn check(sql: &str, limits: &Limits) -> Result<()> {
    scan::screen(sql, limits.max_query_length)?;
    let placeholders = scan::count_placeholders(sql)?;
    println!(
        "{} single statement, {} placeholder(s)",
        "✓".green(),
        placeholders.to_string().cyan()
    );
    Ok(())
}

fn show_operators() {
    println!("{}", "safesql Operator Reference".cyan().bold());
    println!();
    println!(
        "{:8} {:25} {}",
        "Key".white().bold(),
        "SQL".white().bold(),
        "Operand".white().bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    for op in Operator::ALL {
        println!(
            "{:8} {:25} {}",
            op.name().cyan().bold(),
            op.sql().yellow(),
            op.operand().dimmed()
        );
    }

    println!();
    println!(
        "{}",
        "Combinators: and, or. Aliases: \"$t\": { ... }. JSON paths: \"col.key\".".dimmed()
    );
}
