//! Daily CLI - Command-line interface for Synheart Daily
//!
//! Runs the aggregators against a JSON health-store fixture.
//!
//! Commands:
//! - today: Aggregate the current date
//! - day: Aggregate a given date
//! - week: Aggregate the trailing week (or any number of days)
//! - permissions: Print authorization status per capability
//! - request-access: Request read access and print the refreshed status

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use synheart_daily::logging::LoggingConfig;
use synheart_daily::{
    AggregatorConfig, CalendarZone, Capability, DailyMetricsService, HealthDataError,
    InMemoryHealthStore, DAILY_VERSION,
};

/// Daily - Aggregate daily health metrics from a platform health store
#[derive(Parser)]
#[command(name = "daily")]
#[command(author = "Synheart AI Inc")]
#[command(version = DAILY_VERSION)]
#[command(about = "Aggregate daily steps and sleep into metrics records", long_about = None)]
struct Cli {
    /// Health store fixture (JSON, use - for stdin)
    #[arg(short, long, global = true, default_value = "-")]
    fixture: PathBuf,

    /// Cut days at this UTC offset instead of the system time zone
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset_seconds: Option<i32>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate today's metrics
    Today,

    /// Aggregate metrics for one date
    Day {
        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
    },

    /// Aggregate the trailing days ending today
    Week {
        /// Number of days (defaults to 7)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Print the authorization status of each capability
    Permissions,

    /// Request read access, then print the refreshed status
    RequestAccess,
}

#[derive(Serialize)]
struct PermissionLine {
    capability: Capability,
    label: &'static str,
    status: &'static str,
}

#[derive(Serialize)]
struct AccessReport {
    request_completed: bool,
    permissions: Vec<PermissionLine>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = LoggingConfig::from_env().init() {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), DailyCliError> {
    let store = Arc::new(load_store(&cli.fixture)?);

    let mut config = AggregatorConfig::from_env();
    if let Some(offset_seconds) = cli.utc_offset_seconds {
        config = config.with_zone(CalendarZone::Fixed { offset_seconds });
    }
    let service = DailyMetricsService::new(store, config);

    match cli.command {
        Commands::Today => {
            let record = service.fetch_todays_metrics().await?;
            print_json(&record, cli.pretty)
        }
        Commands::Day { date } => {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| DailyCliError::DateParse(format!("{date}: {e}")))?;
            let record = service.fetch_metrics(date).await?;
            print_json(&record, cli.pretty)
        }
        Commands::Week { days } => {
            let records = match days {
                Some(days) => {
                    service
                        .range()
                        .fetch_range(service.daily().today(), days)
                        .await?
                }
                None => service.fetch_weekly_metrics().await?,
            };
            print_json(&records, cli.pretty)
        }
        Commands::Permissions => print_json(&permission_lines(&service), cli.pretty),
        Commands::RequestAccess => {
            let request_completed = service.request_access().await;
            let report = AccessReport {
                request_completed,
                permissions: permission_lines(&service),
            };
            print_json(&report, cli.pretty)
        }
    }
}

fn load_store(path: &Path) -> Result<InMemoryHealthStore, DailyCliError> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)?
    };
    Ok(InMemoryHealthStore::from_json(&content)?)
}

fn permission_lines(service: &DailyMetricsService) -> Vec<PermissionLine> {
    Capability::REQUIRED
        .iter()
        .map(|&capability| PermissionLine {
            capability,
            label: capability.label(),
            status: service.status_text(capability),
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), DailyCliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

#[derive(Debug)]
enum DailyCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Health(HealthDataError),
    DateParse(String),
}

impl From<io::Error> for DailyCliError {
    fn from(e: io::Error) -> Self {
        DailyCliError::Io(e)
    }
}

impl From<serde_json::Error> for DailyCliError {
    fn from(e: serde_json::Error) -> Self {
        DailyCliError::Json(e)
    }
}

impl From<HealthDataError> for DailyCliError {
    fn from(e: HealthDataError) -> Self {
        DailyCliError::Health(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DailyCliError> for CliError {
    fn from(e: DailyCliError) -> Self {
        match e {
            DailyCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the fixture path and permissions".to_string()),
            },
            DailyCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the fixture JSON syntax".to_string()),
            },
            DailyCliError::Health(e) => CliError {
                code: "HEALTH_DATA_ERROR".to_string(),
                hint: Some(e.recovery_suggestion().to_string()),
                message: e.to_string(),
            },
            DailyCliError::DateParse(msg) => CliError {
                code: "DATE_PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Use YYYY-MM-DD".to_string()),
            },
        }
    }
}
