//! Tontine Ledger CLI
//!
//! Replays a journal CSV (members, payments, bank deposits, project
//! stop/resume) and prints a report as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > statuses.csv
//! cargo run -- journal.csv overdue
//! cargo run -- journal.csv journal:2025-11
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `TONTINE_SETTINGS`: Path to a `key,value` settings CSV (defaults apply otherwise)
//! - `TONTINE_AS_OF`: Evaluate reports at this `YYYY-MM-DD` date instead of today

use log::info;
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;
use tontine_ledger::month::parse_date;
use tontine_ledger::{Ledger, ProjectConfig, Result, TontineError, YearMonth};

/// Report selected by the second CLI argument.
enum Report {
    Statuses,
    Overdue,
    Months,
    Totals,
    Journal(YearMonth),
}

impl Report {
    fn parse(arg: Option<&str>) -> Result<Self> {
        match arg.map(str::trim) {
            None | Some("status") => Ok(Report::Statuses),
            Some("overdue") => Ok(Report::Overdue),
            Some("months") => Ok(Report::Months),
            Some("totals") => Ok(Report::Totals),
            Some(other) => match other.strip_prefix("journal:") {
                Some(month) => Ok(Report::Journal(month.parse()?)),
                None => Err(TontineError::UnknownReport(other.to_string())),
            },
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(TontineError::MissingArgument);
    }

    let report = Report::parse(args.get(2).map(String::as_str))?;
    let config = load_config()?;
    let today = match env::var("TONTINE_AS_OF") {
        Ok(value) => parse_date(&value)?,
        Err(_) => chrono::Local::now().date_naive(),
    };

    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut ledger = Ledger::new(config);
    ledger.process_csv(reader)?;
    info!(
        "Reporting as of {}",
        ledger.config().effective_as_of(today)
    );

    let stdout = io::stdout();
    let handle = stdout.lock();
    match report {
        Report::Statuses => ledger.write_statuses(handle, today)?,
        Report::Overdue => ledger.write_overdue(handle, today)?,
        Report::Months => ledger.write_monthly_breakdown(handle, today)?,
        Report::Totals => ledger.write_totals(handle, today)?,
        Report::Journal(month) => ledger.write_month_journal(handle, month)?,
    }

    Ok(())
}

fn load_config() -> Result<ProjectConfig> {
    match env::var("TONTINE_SETTINGS") {
        Ok(path) => {
            let file = File::open(&path)?;
            info!("Loading settings from {}", path);
            ProjectConfig::from_settings_csv(BufReader::new(file))
        }
        Err(_) => Ok(ProjectConfig::default()),
    }
}
