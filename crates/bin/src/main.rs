//! kabu CLI binary.
//!
//! Fetches J-Quants data into a local SQLite store and derives fiscal
//! summaries and dividend-yield assessments from it.

mod integration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use integration::config::AppConfig;
use integration::pipeline::{
    FetchOptions, connect, rebuild_summaries, run_daily, update_assessment, update_daily_quotes,
    update_listed_info, update_statements, update_statements_for_codes,
    update_statements_for_dates,
};
use integration::store_manager::open_store;
use kabu_analysis::PipelineContext;
use kabu_data::store::{AssessmentFilter, AssessmentOrder};
use kabu_data::{MarketCode, Store};
use kabu_output::{ExportFormat, Exporter, IssuerReport, render_listings, render_screen};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "kabu")]
#[command(about = "kabu: J-Quants data loader and dividend-yield screener", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database file (overrides KABU_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch upstream data or refresh derived tables
    Update {
        #[command(subcommand)]
        target: UpdateTarget,
    },

    /// Derive and query summaries and assessments
    Analyze {
        #[command(subcommand)]
        target: AnalyzeTarget,
    },

    /// Inspect the local store
    Show {
        #[command(subcommand)]
        target: ShowTarget,
    },
}

#[derive(Subcommand)]
enum UpdateTarget {
    /// Fetch the listed-company table
    ListedInfo {
        /// As-of date (YYYY-MM-DD or YYYYMMDD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Fetch daily quotes for one issuer and/or one date
    DailyQuotes {
        /// Issuer code (4 or 5 digits)
        #[arg(long)]
        code: Option<String>,

        /// Trade date (YYYY-MM-DD or YYYYMMDD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Fetch financial statements by issuer or by disclosure date
    Statements {
        /// Start issuer code; walks listed codes upward
        #[arg(long, required_unless_present = "date")]
        code: Option<String>,

        /// Start disclosure date; walks back one day at a time
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Number of issuers or days to fetch
        #[arg(long, default_value = "1")]
        count: usize,

        /// Seconds to wait between requests
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Listing, quotes and statements for recent days, then summaries and assessments
    Daily {
        /// Start date (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Number of days to walk back
        #[arg(long, default_value = "1")]
        count: usize,

        /// Seconds to wait between days
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Run the six assessment passes
    Assessment,
}

#[derive(Subcommand)]
enum AnalyzeTarget {
    /// Rebuild the fiscal summary table from statements
    Statements,

    /// List every assessment row
    Assessment {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// High-yield issuers trading well below their three-month high
    Query {
        /// Minimum dividend yield (%)
        #[arg(long, default_value = "4.0")]
        min_yield: f64,

        /// Maximum deviation from the three-month high (%)
        #[arg(long, default_value = "-10.0", allow_hyphen_values = true)]
        max_deviation_from_max: f64,

        /// Number of rows
        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Listed companies
    Listings {
        /// Number of rows
        #[arg(long, default_value = "20", conflicts_with = "all")]
        limit: usize,

        /// Show every row
        #[arg(long)]
        all: bool,
    },

    /// Market segments present in the listing table
    Markets,

    /// Everything stored for one issuer
    Issuer {
        /// Issuer code (4 or 5 digits)
        code: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Row counts per table
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    const fn export(self) -> Option<ExportFormat> {
        match self {
            Self::Text => None,
            Self::Json => Some(ExportFormat::PrettyJson),
            Self::Csv => Some(ExportFormat::Csv),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    kabu_data::parse::cli_date(s).map_err(|e| e.to_string())
}

/// Four-digit codes are stored with a trailing `0`.
fn normalize_code(code: &str) -> String {
    let code = code.trim();
    if code.len() == 4 {
        format!("{code}0")
    } else {
        code.to_string()
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> CliResult {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    let store = open_store(&config.database_path)?;
    let ctx = PipelineContext::for_today().with_excluded_market_code(&config.excluded_market_code);

    match cli.command {
        Commands::Update { target } => update(target, &config, &store, &ctx).await?,
        Commands::Analyze { target } => analyze(target, &store, &ctx)?,
        Commands::Show { target } => show(target, &store)?,
    }

    Ok(())
}

async fn update(
    target: UpdateTarget,
    config: &AppConfig,
    store: &Store,
    ctx: &PipelineContext,
) -> CliResult {
    let interval = |secs: Option<u64>| secs.map_or(config.request_interval, Duration::from_secs);

    match target {
        UpdateTarget::Assessment => update_assessment(store, ctx)?,
        UpdateTarget::ListedInfo { date } => {
            let client = connect(config).await?;
            let n = update_listed_info(&client, store, date).await?;
            println!("listed_info: {n} rows saved");
        }
        UpdateTarget::DailyQuotes { code, date } => {
            if code.is_none() && date.is_none() {
                return Err("daily-quotes needs --code, --date or both".into());
            }
            let client = connect(config).await?;
            let code = code.as_deref().map(normalize_code);
            let n = update_daily_quotes(&client, store, code.as_deref(), date).await?;
            println!("daily_quotes: {n} rows saved");
        }
        UpdateTarget::Statements {
            code,
            date,
            count,
            interval: secs,
        } => {
            let opts = FetchOptions {
                count,
                interval: interval(secs),
            };
            let client = connect(config).await?;
            let code = code.as_deref().map(normalize_code);

            match (code, date) {
                (Some(code), Some(date)) => {
                    if count > 1 {
                        return Err("--count above 1 needs either --code or --date, not both".into());
                    }
                    let n = update_statements(&client, store, Some(&code), Some(date)).await?;
                    println!("statements: {n} rows saved");
                }
                (Some(code), None) => {
                    let s = update_statements_for_codes(
                        &client,
                        store,
                        &code,
                        &config.excluded_market_code,
                        opts,
                    )
                    .await?;
                    println!(
                        "statements: {} issuers, {} failed, {} rows saved",
                        s.attempted, s.failed, s.saved
                    );
                }
                (None, Some(date)) => {
                    let s = update_statements_for_dates(&client, store, date, opts).await?;
                    println!(
                        "statements: {} days, {} failed, {} rows saved",
                        s.attempted, s.failed, s.saved
                    );
                }
                (None, None) => return Err("statements needs --code or --date".into()),
            }
        }
        UpdateTarget::Daily {
            date,
            count,
            interval: secs,
        } => {
            let opts = FetchOptions {
                count,
                interval: interval(secs),
            };
            let client = connect(config).await?;
            run_daily(&client, store, ctx, date.unwrap_or(ctx.today()), opts).await?;
        }
    }

    Ok(())
}

fn analyze(target: AnalyzeTarget, store: &Store, ctx: &PipelineContext) -> CliResult {
    match target {
        AnalyzeTarget::Statements => rebuild_summaries(store, ctx)?,
        AnalyzeTarget::Assessment { format, output } => {
            let rows = store.list_assessments(&AssessmentFilter::default())?;
            let text = match format.export() {
                Some(f) => rows.export_to_string(f)?,
                None => render_screen("Assessments", &rows),
            };
            emit(&text, output.as_deref())?;
        }
        AnalyzeTarget::Query {
            min_yield,
            max_deviation_from_max,
            limit,
            format,
            output,
        } => {
            let filter = AssessmentFilter {
                min_dividend_yield: Some(min_yield),
                max_deviation_from_max: Some(max_deviation_from_max),
                require_deviations: true,
                order: AssessmentOrder::DeviationFromMinAsc,
                limit: Some(limit),
            };
            let rows = store.list_assessments(&filter)?;
            let text = match format.export() {
                Some(f) => rows.export_to_string(f)?,
                None => {
                    let title = format!(
                        "Yield >= {min_yield:.1}%, {max_deviation_from_max:.1}% or further below the 3-month high, closest to the 3-month low first"
                    );
                    let mut table = render_screen(&title, &rows);
                    table.push_str(&format!("\n{} issuers\n", rows.len()));
                    table
                }
            };
            emit(&text, output.as_deref())?;
        }
    }

    Ok(())
}

fn show(target: ShowTarget, store: &Store) -> CliResult {
    match target {
        ShowTarget::Listings { limit, all } => {
            let issuers = store.list_listings((!all).then_some(limit))?;
            print!("{}", render_listings(&issuers));
        }
        ShowTarget::Markets => {
            println!("{:<6} {:<20} {:>8}", "Code", "Segment", "Issuers");
            for (code, name, count) in store.market_code_counts()? {
                let name = name
                    .or_else(|| MarketCode::from_code(&code).map(|m| m.name().to_string()))
                    .unwrap_or_else(|| "-".to_string());
                println!("{code:<6} {name:<20} {count:>8}");
            }
        }
        ShowTarget::Issuer { code, format } => {
            let report = IssuerReport::load(store, &normalize_code(&code), 10)?;
            if report.is_empty() {
                return Err(format!("no data for issuer {code}").into());
            }
            match format.export() {
                Some(f) => println!("{}", report.export_to_string(f)?),
                None => print!("{}", report.to_ascii_table()),
            }
        }
        ShowTarget::Stats => {
            let stats = store.get_stats()?;
            println!("listed_info:        {:>10}", stats.listed_issuers);
            println!("daily_quotes:       {:>10} ({} issuers)", stats.daily_quotes, stats.issuers_with_quotes);
            println!("statements:         {:>10}", stats.statements);
            println!("statements_summary: {:>10}", stats.summaries);
            println!("assessment:         {:>10}", stats.assessments);
        }
    }

    Ok(())
}

fn emit(text: &str, output: Option<&Path>) -> CliResult {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
