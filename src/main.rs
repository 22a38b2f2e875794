use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoLocal;

use revpipe_pipeline::{ExportType, KpiReport, PipelineContext, Runner, Scheduler};

/// Hotel revenue ingestion and KPI reporting pipeline
#[derive(Parser)]
#[command(name = "revpipe")]
#[command(version)]
#[command(about = "Hotel revenue ingestion and KPI reporting pipeline", long_about = None)]
struct Cli {
    /// Pipeline configuration JSON file
    #[arg(long, value_name = "FILE")]
    config_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one ingestion cycle and exit
    RunOnce,

    /// Run ingestion cycles on a fixed interval until signalled
    Schedule {
        /// Schedule interval in minutes
        #[arg(long, value_name = "N")]
        interval_minutes: u64,
    },

    /// Generate the KPI report for a hotel and date range
    Kpi {
        /// Start date in YYYY-MM-DD format
        #[arg(long, value_name = "YYYY-MM-DD")]
        start_date: NaiveDate,

        /// End date in YYYY-MM-DD format
        #[arg(long, value_name = "YYYY-MM-DD")]
        end_date: NaiveDate,

        /// ID of the hotel
        #[arg(long, value_name = "N")]
        hotel_id: i64,

        /// Comma separated date(s) to exclude from the KPI report
        #[arg(long, value_name = "DATES", value_delimiter = ',')]
        exclude_dates: Vec<NaiveDate>,

        /// Export type of the KPI report (CSV or HTML)
        #[arg(long, value_name = "TYPE", default_value = "CSV")]
        export_type: ExportType,

        /// Export path of the KPI report (defaults to the working directory)
        #[arg(long, value_name = "PATH")]
        export_path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Log lines carry a DD.MM.YYYY HH:MM:SS stamp and the level tag.
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%d.%m.%Y %H:%M:%S".to_string()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::RunOnce => {
            let context = PipelineContext::init(&cli.config_path, false)?;
            Runner::new(&context.config, context.engine.as_ref()).run()
        }
        Command::Schedule { interval_minutes } => {
            if interval_minutes < 1 {
                anyhow::bail!("--interval-minutes must be at least 1");
            }
            let context = PipelineContext::init(&cli.config_path, false)?;
            let runner = Runner::new(&context.config, context.engine.as_ref());
            let scheduler = Scheduler::new(interval_minutes, &context.config.archive_path);
            scheduler.start(&runner)
        }
        Command::Kpi {
            start_date,
            end_date,
            hotel_id,
            exclude_dates,
            export_type,
            export_path,
        } => {
            if end_date < start_date {
                anyhow::bail!("--end-date must not be before --start-date");
            }
            let context = PipelineContext::init(&cli.config_path, true)?;
            let report = KpiReport {
                start_date,
                end_date,
                hotel_id,
                exclude_dates,
                export_type,
                export_path: export_path.map_or_else(
                    || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
                    |path| path,
                ),
            };
            report.run(&context).map(|_| ())
        }
    }
}
