//! Surge - Hong Kong turnover-surge screener.
//!
//! Filters the HK market snapshot by turnover, then ranks candidates by
//! session-over-session turnover growth.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use surge_common::logging::{init_logging, init_logging_with_exclusions};
use surge_screener::config::AppConfig;
use surge_screener::screener::{
    render_top_turnover, CsvExporter, OutputConfig, ReportFormat, ScanOutcome, ScanReport,
    ScreenerEngine, ScreenerReport, SessionSelection,
};

#[derive(Parser, Debug)]
#[command(name = "surge")]
#[command(version)]
#[command(about = "Hong Kong turnover-surge screener", long_about = None)]
struct Cli {
    /// Explicit config file merged over ~/.surge/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full scan: snapshot filter, growth tiers, report
    Scan {
        /// Snapshot turnover threshold
        #[arg(long)]
        min_turnover: Option<f64>,

        /// Ratio cutoff for the 50% tier
        #[arg(long)]
        grow50: Option<f64>,

        /// Ratio cutoff for the 100% tier
        #[arg(long)]
        grow100: Option<f64>,

        /// Ratio cutoff for the 200% tier
        #[arg(long)]
        grow200: Option<f64>,

        /// Delay between history requests in milliseconds (0 disables)
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Session selection (latest, completed)
        #[arg(long)]
        session: Option<SessionSelection>,

        /// Directory for CSV output
        #[arg(long)]
        output_dir: Option<String>,

        /// Skip CSV output
        #[arg(long)]
        no_save: bool,

        /// Console format (text, markdown, json)
        #[arg(long)]
        format: Option<ReportFormat>,
    },

    /// Show the instruments with the highest snapshot turnover
    Top {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Print the effective configuration as JSON
    Config,

    /// Check that the configured data provider responds
    Health,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No-op when logging is already initialized
            init_logging("info", "pretty");
            error!(error = %format!("{:#}", e), "surge failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format;
    }

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    match cli.command {
        Commands::Scan {
            min_turnover,
            grow50,
            grow100,
            grow200,
            pacing_ms,
            session,
            output_dir,
            no_save,
            format,
        } => {
            let screener = &mut config.screener;
            if let Some(v) = min_turnover {
                screener.min_turnover = v;
            }
            if let Some(v) = grow50 {
                screener.tiers.grow50 = v;
            }
            if let Some(v) = grow100 {
                screener.tiers.grow100 = v;
            }
            if let Some(v) = grow200 {
                screener.tiers.grow200 = v;
            }
            if let Some(v) = pacing_ms {
                screener.pacing_ms = v;
            }
            if let Some(v) = session {
                screener.session.selection = v;
            }
            if let Some(v) = output_dir {
                screener.output.dir = v;
            }
            if no_save {
                screener.output.save_csv = false;
                screener.output.save_merged = false;
            }

            let format = match format {
                Some(f) => f,
                None => config
                    .screener
                    .output
                    .format
                    .parse()
                    .map_err(anyhow::Error::msg)?,
            };

            run_scan(config, format).await
        }
        Commands::Top { limit } => {
            config.validate().context("Invalid configuration")?;
            let engine = build_engine(&config);
            let quotes = engine.top_turnover(limit).await;
            print!("{}", render_top_turnover(&quotes));
            Ok(())
        }
        Commands::Config => {
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize configuration")?;
            println!("{}", json);
            Ok(())
        }
        Commands::Health => {
            let engine = build_engine(&config);
            engine
                .health_check()
                .await
                .context("Data provider health check failed")?;
            println!("{:?} provider OK", config.data_source.provider);
            Ok(())
        }
    }
}

fn build_engine(config: &AppConfig) -> ScreenerEngine {
    let (snapshot, history) = config.data_source.build_sources();
    ScreenerEngine::new(config.screener.clone(), snapshot, history)
}

async fn run_scan(config: AppConfig, format: ReportFormat) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let engine = build_engine(&config);
    let outcome = engine.run_scan().await;
    info!("{}", outcome.summary());

    let mut stdout = std::io::stdout().lock();
    present_scan(outcome, &config.screener.output, format, Local::now(), &mut stdout)
}

/// Export CSVs, then print the report even when the export failed.
fn present_scan(
    outcome: ScanOutcome,
    output: &OutputConfig,
    format: ReportFormat,
    now: DateTime<Local>,
    out: &mut impl Write,
) -> Result<()> {
    let exported = export_results(&outcome.report, output, now);

    let report = ScreenerReport::new(outcome, output.preview_rows);
    out.write_all(report.generate(format).as_bytes())
        .context("Failed to print report")?;

    exported
}

fn export_results(report: &ScanReport, output: &OutputConfig, now: DateTime<Local>) -> Result<()> {
    if !output.save_csv && !output.save_merged {
        return Ok(());
    }

    let exporter = CsvExporter::new(surge_common::config::expand_path(&output.dir));

    if output.save_csv {
        exporter.save_tiers(&report.tiers, now.date_naive())?;
    }
    if output.save_merged {
        exporter.save_merged(report, now)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clap::CommandFactory;
    use surge_screener::screener::{AnalysisResult, ResultReporter, TieredResults};

    fn outcome() -> ScanOutcome {
        let row = AnalysisResult {
            symbol: "00700".into(),
            name: "腾讯控股".into(),
            recent_turnover: 4.0e9,
            previous_turnover: 1.0e9,
            growth_ratio: 4.0,
            recent_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            previous_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        };
        let tiers = TieredResults {
            grow50: vec![row.clone()],
            grow100: vec![row.clone()],
            grow200: vec![row],
            ..Default::default()
        };
        let started = Utc.with_ymd_and_hms(2024, 6, 4, 8, 0, 0).unwrap();

        ScanOutcome {
            id: "scan_20240604_080000".into(),
            started_at: started,
            completed_at: started,
            duration_secs: 0.0,
            min_turnover: 30_000_000.0,
            average_candidate_turnover: Some(8.1e9),
            report: ResultReporter::build_report(&tiers, 1),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 4, 16, 30, 0).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_printed_when_export_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let output = OutputConfig {
            dir: blocker.join("results").display().to_string(),
            ..Default::default()
        };

        let mut buf = Vec::new();
        let result = present_scan(outcome(), &output, ReportFormat::Text, now(), &mut buf);

        assert!(result.is_err());
        assert!(String::from_utf8(buf).unwrap().contains("00700"));
    }

    #[test]
    fn test_present_scan_writes_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = OutputConfig {
            dir: dir.path().display().to_string(),
            ..Default::default()
        };

        let mut buf = Vec::new();
        present_scan(outcome(), &output, ReportFormat::Markdown, now(), &mut buf).unwrap();

        assert!(!buf.is_empty());
        assert!(dir.path().join("hk_turnover_growth_200pct_20240604.csv").exists());
    }
}
