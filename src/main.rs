// src/main.rs
mod cot;
mod extractors;
mod positioning;
mod storage;
mod utils;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cot::client;
use cot::models::ReportDocument;
use positioning::MarketFilter;
use storage::{StorageManager, StoragePolicy};
use utils::AppError;

/// Command Line Interface for the Commitments of Traders report parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding saved reports
    #[arg(long, env = "COT_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Save under this fixed file name instead of a new timestamped file
    #[arg(long, env = "COT_FIXED_NAME", global = true)]
    fixed_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse report text from a file (or stdin) and print it as JSON
    Parse {
        /// Report text file; "-" or omitted reads stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also save the parsed report to the data directory
        #[arg(short, long)]
        save: bool,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Download a report and parse it
    Fetch {
        /// URL of the published report (plain text or HTML page)
        #[arg(short, long)]
        url: String,

        /// Also save the parsed report to the data directory
        #[arg(short, long)]
        save: bool,
    },

    /// Print the most recently saved report
    Latest,

    /// Show non-commercial positioning from the most recently saved report
    Summary {
        /// Market to include (repeatable); defaults to the CME financial watch list
        #[arg(short, long = "market")]
        markets: Vec<String>,

        /// Include every market in the report
        #[arg(long, conflicts_with = "markets")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args);

    let policy = match &args.fixed_name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::Config("--fixed-name must not be empty".to_string()));
        }
        Some(name) => StoragePolicy::Fixed(name.clone()),
        None => StoragePolicy::Timestamped,
    };

    match args.command {
        Command::Parse { input, save, pretty } => {
            let text = read_input(input.as_deref())?;
            let report = parse_text(&text)?;
            print_report(&report, pretty)?;
            if save {
                save_report(&args.data_dir, policy, &report)?;
            }
        }
        Command::Fetch { url, save } => {
            let text = client::download_report(&url).await?;
            let report = parse_text(&text)?;
            print_report(&report, true)?;
            if save {
                save_report(&args.data_dir, policy, &report)?;
            }
        }
        Command::Latest => {
            let storage = StorageManager::new(&args.data_dir, policy)?;
            tracing::debug!("Looking up latest report in {}", storage.base_dir().display());
            let report = storage.load_latest()?;
            print_report(&report, true)?;
        }
        Command::Summary { markets, all } => {
            let storage = StorageManager::new(&args.data_dir, policy)?;
            let report = storage.load_latest()?;
            let filter = if all {
                MarketFilter::all()
            } else if markets.is_empty() {
                MarketFilter::default_markets()
            } else {
                MarketFilter::new(&markets)
            };

            let rows = positioning::summarize(&report, &filter);
            if rows.is_empty() {
                tracing::warn!("No sections in the latest report match the market filter");
            }
            print!("{}", positioning::render_table(report.as_of_date(), &rows));
        }
    }

    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<String, AppError> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            tracing::info!("Reading report text from {}", path.display());
            Ok(std::fs::read_to_string(path)?)
        }
        _ => {
            tracing::info!("Reading report text from stdin");
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Rejects blank input, then runs the parser.
fn parse_text(text: &str) -> Result<ReportDocument, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::EmptyInput);
    }
    let report = extractors::parse_report(text);
    tracing::info!("Parsed {} market sections", report.sections.len());
    Ok(report)
}

fn print_report(report: &ReportDocument, pretty: bool) -> Result<(), AppError> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    println!("{}", json);
    Ok(())
}

fn save_report(data_dir: &Path, policy: StoragePolicy, report: &ReportDocument) -> Result<(), AppError> {
    let storage = StorageManager::new(data_dir, policy)?;
    let saved = storage.save_report(report)?;
    tracing::info!("Data saved successfully: {}", saved.filename);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn blank_input_is_rejected_before_parsing() {
        assert!(matches!(parse_text("  \n\t\n"), Err(AppError::EmptyInput)));
        assert!(parse_text("WIDGET FUTURES Code-001").is_ok());
    }

    #[test]
    fn summary_flags_parse() {
        let args = Args::try_parse_from([
            "cot_extractor",
            "--data-dir",
            "/tmp/cot",
            "summary",
            "--market",
            "EURO FX - CHICAGO MERCANTILE EXCHANGE",
            "-m",
            "BITCOIN - CHICAGO MERCANTILE EXCHANGE",
        ])
        .unwrap();
        assert_eq!(args.data_dir, PathBuf::from("/tmp/cot"));
        match args.command {
            Command::Summary { markets, all } => {
                assert_eq!(markets.len(), 2);
                assert!(!all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn all_conflicts_with_markets() {
        let result = Args::try_parse_from(["cot_extractor", "summary", "--all", "-m", "EURO FX"]);
        assert!(result.is_err());
    }
}
