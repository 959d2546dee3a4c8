mod config;
mod db;
mod error;
mod models;
mod operations;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use config::Config;
use db::{SharedStore, StoreKind, open_store};
use error::{AppError, Result};
use operations::add::{create_transaction, parse_amount, parse_kind};
use operations::edit::{TransactionEdit, edit_transaction};
use operations::import::import_csv;
use operations::remove::{parse_id, remove_transaction};
use operations::summary::{Summary, ViewMode, category_breakdown, monthly_series, weekly_series};
use operations::text;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cashtrack", version, about = "Track income and expenses")]
struct Cli {
    /// Storage backend (overrides the config file)
    #[arg(long, global = true, value_enum)]
    store: Option<StoreKind>,

    /// Data file (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a new transaction
    Add {
        /// income or expense
        kind: String,
        amount: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Change fields of an existing transaction
    Edit {
        id: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a transaction by id
    Remove { id: String },
    /// Print transactions, optionally only those of one day
    List {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },
    /// Balance and spending so far this month and today
    Summary {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },
    /// Income and expense per day or week, plus the expense categories
    Series {
        #[arg(long, value_enum)]
        mode: Option<ViewMode>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },
    /// Known categories
    Categories,
    /// Append rows from a CSV file (kind,amount,category,note[,when])
    Import { path: PathBuf },
    /// Full-screen summary with charts
    Dashboard {
        #[arg(long, value_enum)]
        mode: Option<ViewMode>,
    },
    /// Full-screen transaction table
    Browse,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cashtrack=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    match input {
        None => Ok(Local::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date '{}'. Use YYYY-MM-DD.", raw))),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?.with_overrides(cli.store, cli.file);
    debug!(?config, "effective configuration");
    let store = SharedStore::new(open_store(config.store, &config.data_path())?);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    match cli.command {
        Command::Add { kind, amount, category, note } => {
            let kind = parse_kind(&kind)?;
            let amount = parse_amount(&amount)?;
            let now = Local::now().timestamp();
            let id = store.update(|log| create_transaction(log, kind, amount, &category, &note, now))?;
            println!("Added transaction {}", id);
        }
        Command::Edit { id, kind, amount, category, note } => {
            let id = parse_id(&id)?;
            let edit = TransactionEdit {
                kind: kind.as_deref().map(parse_kind).transpose()?,
                amount: amount.as_deref().map(parse_amount).transpose()?,
                category,
                note,
            };
            if edit.is_empty() {
                return Err(AppError::Validation(
                    "Nothing to change. Pass --kind, --amount, --category or --note.".to_string(),
                ));
            }
            store.update(|log| edit_transaction(log, id, edit))?;
            println!("Updated transaction {}", id);
        }
        Command::Remove { id } => {
            let id = parse_id(&id)?;
            let removed = store.update(|log| remove_transaction(log, id))?;
            println!("Removed transaction {} ({} {})", removed.id, removed.kind, text::format_amount(removed.amount));
        }
        Command::List { date } => {
            let log = store.load()?;
            let rows = match date {
                Some(raw) => log.on_date(parse_date(Some(&raw))?),
                None => log.transactions.iter().collect(),
            };
            print!("{}", text::render_transactions(&rows));
        }
        Command::Summary { date } => {
            let log = store.load()?;
            let today = parse_date(date.as_deref())?;
            print!("{}", text::render_summary(&Summary::compute(&log.transactions, today)));
        }
        Command::Series { mode, date } => {
            let log = store.load()?;
            let reference = parse_date(date.as_deref())?;
            let mode = mode.unwrap_or(config.default_mode);
            match mode {
                ViewMode::Weekly => print!("{}", text::render_series(&weekly_series(&log.transactions, reference))),
                ViewMode::Monthly => print!("{}", text::render_series(&monthly_series(&log.transactions, reference))),
            }
            println!();
            print!(
                "{}",
                text::render_breakdown(&category_breakdown(&log.transactions, reference, mode))
            );
        }
        Command::Categories => {
            for category in store.load()?.category_catalog() {
                println!("{}", category);
            }
        }
        Command::Import { path } => {
            let now = Local::now().timestamp();
            let count = store.update(|log| import_csv(log, &path, now))?;
            println!("Imported {} transactions.", count);
        }
        Command::Dashboard { mode } => {
            operations::dashboard::run_dashboard(&store, mode.unwrap_or(config.default_mode), poll_interval)?;
        }
        Command::Browse => {
            operations::browse::run_browse(&store, poll_interval)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cashtrack", "summary", "--store", "sqlite", "--file", "x.db"]).unwrap();
        assert_eq!(cli.store, Some(StoreKind::Sqlite));
        assert_eq!(cli.file, Some(PathBuf::from("x.db")));
        assert!(matches!(cli.command, Command::Summary { date: None }));
    }

    #[test]
    fn test_cli_add_defaults() {
        let cli = Cli::try_parse_from(["cashtrack", "add", "expense", "12.50", "--category", "Food"]).unwrap();
        match cli.command {
            Command::Add { kind, amount, category, note } => {
                assert_eq!(kind, "expense");
                assert_eq!(amount, "12.50");
                assert_eq!(category, "Food");
                assert_eq!(note, "");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_series_mode() {
        let cli = Cli::try_parse_from(["cashtrack", "series", "--mode", "monthly"]).unwrap();
        assert!(matches!(cli.command, Command::Series { mode: Some(ViewMode::Monthly), date: None }));
        assert!(Cli::try_parse_from(["cashtrack", "series", "--mode", "yearly"]).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(Some("2025-03-09")).unwrap(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        assert!(parse_date(Some("09/03/2025")).is_err());
        assert_eq!(parse_date(None).unwrap(), Local::now().date_naive());
    }
}
