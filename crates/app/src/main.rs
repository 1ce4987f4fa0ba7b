//! famex: turns bank and card CSV exports into family expense reports.
//!
//! ```bash
//! famex data/ --config config --output output
//! famex data/ --year 2025 --quarter 2 --json
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use famex_core::{DateRange, Quarter};
use famex_report::{filter_period, Processor, ReportConfig, ReportWriter, Reports};
use famex_rules::{PipelineStats, RulesEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod display;

/// Family expense report generator
#[derive(Parser, Debug)]
#[command(name = "famex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder with one subfolder of CSV exports per source
    data_folder: PathBuf,

    /// Configuration folder
    #[arg(short, long, default_value = "config")]
    config: PathBuf,

    /// Output folder for intermediate data and reports
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only report on this calendar year
    #[arg(long)]
    year: Option<i32>,

    /// Only report on this quarter (1-4) of --year
    #[arg(long, requires = "year", value_parser = clap::value_parser!(u8).range(1..=4))]
    quarter: Option<u8>,

    /// Print summary statistics as JSON instead of tables
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn period(&self) -> Result<Option<DateRange>> {
        let Some(year) = self.year else {
            return Ok(None);
        };
        let range = match self.quarter {
            Some(q) => {
                let quarter = Quarter::new(q).with_context(|| format!("Invalid quarter: {q}"))?;
                DateRange::quarter(year, quarter)
            }
            None => DateRange::year(year),
        };
        range.map(Some).with_context(|| format!("Invalid year: {year}"))
    }
}

/// Everything a successful run produced.
struct Run {
    pipeline: PipelineStats,
    reports: Reports,
    fixed_categories: Vec<String>,
    reports_dir: PathBuf,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Load, filter, apply rules, process and write reports. `None` when no
/// transaction survives.
fn run(cli: &Cli) -> Result<Option<Run>> {
    if !cli.data_folder.is_dir() {
        bail!("Data folder '{}' does not exist", cli.data_folder.display());
    }

    let config = ReportConfig::load(&cli.config).context("Failed to load report configuration")?;
    let engine = RulesEngine::from_dir(&cli.config).context("Failed to load rule configuration")?;

    let mut transactions = famex_import::load_all(&cli.data_folder, &config.account_owners)
        .context("Failed to load transaction data")?;
    tracing::info!("Total transactions loaded: {}", transactions.len());

    if let Some(range) = cli.period()? {
        transactions = filter_period(transactions, range);
    }

    let (transactions, pipeline) = engine.run(transactions);
    if transactions.is_empty() {
        return Ok(None);
    }

    let processor = Processor::new(config);
    let processed = processor
        .process(transactions, &cli.output)
        .context("Failed to save intermediate data")?;

    let settings = &processor.config().report_settings;
    let reports = Reports::build(&processed, settings);
    let writer = ReportWriter::reports(&cli.output).context("Failed to create reports folder")?;
    reports.write(&writer).context("Failed to write reports")?;

    Ok(Some(Run {
        pipeline,
        reports,
        fixed_categories: settings.fixed_categories.clone(),
        reports_dir: writer.dir().to_path_buf(),
    }))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = run(&cli).and_then(|outcome| match outcome {
        Some(run) if cli.json => display::print_json(&run),
        Some(run) => {
            display::print_run(&run);
            Ok(())
        }
        None => {
            tracing::warn!("No data to process after filtering");
            Ok(())
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use famex_core::Money;
    use std::fs;
    use std::path::Path;

    const CHECKING: &str = "Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #\n\
        CREDIT,06/27/2025,CLOCKWISE PAYROLL PPD ID: 1234,3000.00,ACH_CREDIT,3000.00,\n\
        DEBIT,06/28/2025,ATM WITHDRAWAL 000123 06/28,-750.00,ATM,2250.00,\n\
        DEBIT,07/02/2025,ATM WITHDRAWAL 000124 07/02,-60.00,ATM,2190.00,\n";

    const JOE_APPLE: &str = "Transaction Date,Clearing Date,Description,Merchant,Category,Type,Amount (USD),Purchased By\n\
        06/29/2025,06/30/2025,ACH DEPOSIT INTERNET TRANSFER,Payment,Payment,Payment,-500.00,Joe\n\
        06/30/2025,07/01/2025,UBER EATS ORDER #123,Uber Eats,Restaurants,Purchase,-32.50,Joe\n";

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/chase_checking/2025.csv", CHECKING);
        write(dir.path(), "data/joe_apple_card/2025-06.csv", JOE_APPLE);
        write(dir.path(), "config/exclusions.toml", include_str!("../../../config/exclusions.toml"));
        write(dir.path(), "config/rules.toml", include_str!("../../../config/rules.toml"));
        write(
            dir.path(),
            "config/category_mapping.toml",
            include_str!("../../../config/category_mapping.toml"),
        );
        write(
            dir.path(),
            "config/report_config.toml",
            include_str!("../../../config/report_config.toml"),
        );
        dir
    }

    fn cli(dir: &Path, extra: &[&str]) -> Cli {
        let data = dir.join("data");
        let config = dir.join("config");
        let output = dir.join("output");
        let mut args = vec![
            "famex".to_string(),
            data.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        Cli::parse_from(args)
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn quarter_requires_year() {
        assert!(Cli::try_parse_from(["famex", "data", "--quarter", "2"]).is_err());
        assert!(Cli::try_parse_from(["famex", "data", "--year", "2025", "--quarter", "5"]).is_err());
        assert!(Cli::try_parse_from(["famex", "data", "-v", "-q"]).is_err());
    }

    #[test]
    fn period_from_flags() {
        let cli = Cli::parse_from(["famex", "data", "--year", "2025", "--quarter", "3"]);
        let range = cli.period().unwrap().unwrap();
        assert_eq!(range.to_string(), "2025-07-01 to 2025-09-30");
        let cli = Cli::parse_from(["famex", "data"]);
        assert!(cli.period().unwrap().is_none());
    }

    #[test]
    fn end_to_end_run() {
        let dir = fixture();
        let run = run(&cli(dir.path(), &[])).unwrap().unwrap();

        assert_eq!(run.pipeline.input, 5);
        assert_eq!(run.pipeline.excluded, 1);
        assert_eq!(run.pipeline.output, 4);

        let summary = &run.reports.summary;
        assert_eq!(summary.total_income, Money::from_cents(300_000));
        assert_eq!(summary.total_expenses, Money::from_cents(-84_250));

        let output = dir.path().join("output");
        assert!(output.join("intermediate/processed_transactions.csv").exists());
        assert!(output.join("reports/cashflow_summary.csv").exists());
        assert!(output.join("reports/top_merchants_joe.csv").exists());

        let processed = fs::read_to_string(output.join("intermediate/processed_transactions.csv")).unwrap();
        assert!(processed.contains("Childcare"));
        assert!(processed.contains(",Income,"));
        assert!(processed.contains(",Uber,"));
        assert!(!processed.contains("INTERNET TRANSFER"));
    }

    #[test]
    fn quarter_filter_restricts_run() {
        let dir = fixture();
        let run = run(&cli(dir.path(), &["--year", "2025", "--quarter", "3"])).unwrap().unwrap();
        assert_eq!(run.pipeline.input, 1);
        assert_eq!(run.reports.summary.total_expenses, Money::from_cents(-6_000));
    }

    #[test]
    fn empty_period_is_not_an_error() {
        let dir = fixture();
        assert!(run(&cli(dir.path(), &["--year", "2019"])).unwrap().is_none());
    }

    #[test]
    fn missing_data_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope").display().to_string();
        let cli = Cli::parse_from(["famex", missing.as_str()]);
        let err = run(&cli).err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn malformed_rules_fail_the_run() {
        let dir = fixture();
        write(dir.path(), "config/rules.toml", "[[custom_rules]]\nname = \"No action\"\n");
        let err = run(&cli(dir.path(), &[])).err().unwrap();
        assert!(format!("{err:#}").contains("action.category"));
    }
}
