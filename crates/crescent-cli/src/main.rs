//! crescent — advisory scaling for event-driven traffic surges.
//!
//! # Usage
//!
//! ```text
//! crescent init
//! crescent train    --tenant test_ngo --input history.json
//! crescent forecast --tenant test_ngo --at 2026-02-26T15:00:00 --traffic 120 --current-units 3
//! crescent summary  --tenant test_ngo
//! crescent models   [--tenant test_ngo] [--delete]
//! crescent events list    --tenant test_ngo [--status pending]
//! crescent events approve --key <KEY> --by ops-lead
//! ```
//!
//! Nothing is ever scaled: `forecast` logs each recommendation as a pending
//! event for a human to approve or reject.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use crescent_state::{EventStatus, Verdict};
use clap::{Parser, Subcommand, ValueEnum};

mod advisory;
mod commands;

use commands::Context;

#[derive(Parser)]
#[command(
    name = "crescent",
    about = "Crescent — advisory scaling for calendar-driven traffic surges",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding the model store.
    #[arg(long, global = true, default_value = ".crescent")]
    data_dir: PathBuf,

    /// Configuration file. Missing file means built-in defaults.
    #[arg(long, global = true, default_value = "crescent.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a crescent.toml scaffold with every setting at its default.
    Init {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Train a tenant's forecaster from a JSON series and store a new version.
    ///
    /// The input is an array of {"timestamp": "...", "value": n} records;
    /// null values mark gaps.
    Train {
        #[arg(short, long)]
        tenant: String,
        #[arg(short, long)]
        input: PathBuf,
        /// Override [training].min_training_days.
        #[arg(long)]
        min_training_days: Option<u32>,
        /// Resolve the event period against this year instead of the data's.
        /// Also allows history that spans more than one calendar year.
        #[arg(long)]
        year: Option<i32>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Forecast upcoming surges with the tenant's latest model and log each
    /// recommendation as a pending scaling event.
    Forecast {
        #[arg(short, long)]
        tenant: String,
        /// Current time, e.g. 2026-02-26T15:00:00.
        #[arg(long)]
        at: NaiveDateTime,
        /// Current traffic level.
        #[arg(long)]
        traffic: f64,
        /// Replicas running now.
        #[arg(long, default_value = "1")]
        current_units: u32,
        /// Recent JSON series used to score data quality.
        #[arg(long)]
        history: Option<PathBuf>,
        /// Smallest replica change worth recommending.
        #[arg(long, default_value = "2")]
        min_unit_change: u32,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show what the tenant's latest model learned.
    Summary {
        #[arg(short, long)]
        tenant: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List stored model versions, or delete a tenant's versions.
    Models {
        #[arg(short, long)]
        tenant: Option<String>,
        /// Delete every version for --tenant.
        #[arg(long, requires = "tenant")]
        delete: bool,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Review logged scaling events and record approvals.
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },
}

#[derive(Subcommand)]
enum EventsAction {
    /// List a tenant's scaling events, newest first.
    List {
        #[arg(short, long)]
        tenant: String,
        #[arg(long, default_value_t = commands::events::DEFAULT_LIMIT)]
        limit: usize,
        /// Only show events in this state.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Approve a pending event and mark it executed now.
    Approve {
        /// Event key as shown by `events list`.
        #[arg(short, long)]
        key: String,
        /// Who approved it.
        #[arg(long)]
        by: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Reject a pending event.
    Reject {
        #[arg(short, long)]
        key: String,
        #[arg(long)]
        by: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for EventStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => EventStatus::Pending,
            StatusArg::Approved => EventStatus::Approved,
            StatusArg::Rejected => EventStatus::Rejected,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("crescent=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Commands::Init { path, force } = &cli.command {
        return commands::init::init(path, *force);
    }

    let ctx = Context::load(cli.data_dir, &cli.config)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Train {
            tenant,
            input,
            min_training_days,
            year,
            format,
        } => {
            let report = commands::train::run(
                &ctx,
                &commands::train::TrainArgs {
                    tenant: &tenant,
                    input: &input,
                    min_training_days,
                    year,
                    trained_at: None,
                },
            )?;
            commands::train::print(&report, format)
        }
        Commands::Forecast {
            tenant,
            at,
            traffic,
            current_units,
            history,
            min_unit_change,
            format,
        } => {
            let report = commands::forecast::run(
                &ctx,
                &commands::forecast::ForecastArgs {
                    tenant: &tenant,
                    at,
                    traffic,
                    current_units,
                    history: history.as_deref(),
                    min_unit_change,
                    recorded_at: None,
                },
            )?;
            commands::forecast::print(&report, format)
        }
        Commands::Summary { tenant, format } => {
            let report = commands::summary::run(&ctx, &tenant)?;
            commands::summary::print(&report, format)
        }
        Commands::Models {
            tenant,
            delete,
            format,
        } => commands::models::run(&ctx, tenant.as_deref(), delete, format),
        Commands::Events { action } => match action {
            EventsAction::List {
                tenant,
                limit,
                status,
                format,
            } => {
                let outcome =
                    commands::events::list(&ctx, &tenant, limit, status.map(EventStatus::from))?;
                commands::events::print(&outcome, format)
            }
            EventsAction::Approve { key, by, format } => {
                let outcome = commands::events::decide(&ctx, &key, Verdict::Approve, &by, None)?;
                commands::events::print(&outcome, format)
            }
            EventsAction::Reject { key, by, format } => {
                let outcome = commands::events::decide(&ctx, &key, Verdict::Reject, &by, None)?;
                commands::events::print(&outcome, format)
            }
        },
    }
}
