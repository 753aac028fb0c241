use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use retail_cli::{commands, resolve_target, Format, ResolvedTarget};
use retail_core::ReportKind;
use retail_datagen::SalesConfig;
use retail_store::SalesStore;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retail")]
#[command(about = "Retail sales enrichment and reporting", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to retail project root
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Target environment from retail.yml
    #[arg(long, global = true)]
    target: Option<String>,

    /// DuckDB database file path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log progress and SQL to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Backfill time period, weekday and month onto every sale
    Enrich,
    /// Run one report, or all of them
    Report(ReportArgs),
    /// List the report catalog
    List,
    /// Create the sales table and fill it with synthetic sales
    Generate(GenerateArgs),
}

#[derive(Args)]
struct ReportArgs {
    /// Report name from `retail list`, or `all`
    name: String,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write to a file instead of stdout (a directory when running all reports)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First sale date (YYYY-MM-DD)
    #[arg(long, default_value = "2019-01-01")]
    start_date: NaiveDate,

    /// Number of days sales are spread over
    #[arg(long, default_value_t = 90)]
    days: u32,

    /// Delete existing sales before inserting
    #[arg(long)]
    replace: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    match cli.command {
        Commands::List => list(),
        Commands::Enrich => enrich(&cli.common),
        Commands::Report(args) => report(&cli.common, args),
        Commands::Generate(args) => generate(&cli.common, args),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve(common: &CommonArgs) -> Result<ResolvedTarget> {
    let target = resolve_target(
        &common.project_dir,
        common.target.as_deref(),
        common.database.as_deref(),
    )
    .with_context(|| format!("Failed to resolve target from {:?}", common.project_dir))?;

    // stdout carries report output, which may be piped as CSV
    info!(database = %target.database.display(), table = %target.table, "resolved target");
    Ok(target)
}

fn list() -> Result<()> {
    let width = ReportKind::ALL
        .iter()
        .map(|kind| kind.name().len())
        .max()
        .unwrap_or(0);

    for kind in ReportKind::ALL {
        println!("{:width$}  {}", kind.name(), kind.description(), width = width);
    }
    Ok(())
}

fn enrich(common: &CommonArgs) -> Result<()> {
    let target = resolve(common)?;
    let mut store = commands::open_existing(&target)?;

    let summary = commands::enrich(&mut store)?;
    println!(
        "\n✓ Enriched {} rows in {:?}",
        summary.rows_enriched, summary.duration
    );
    Ok(())
}

fn report(common: &CommonArgs, args: ReportArgs) -> Result<()> {
    let kinds = commands::select_reports(&args.name)?;
    let target = resolve(common)?;
    let store = commands::open_existing(&target)?;

    let results = commands::run_reports(&store, &kinds)?;
    let several = results.len() > 1;

    for result in &results {
        let rendered = commands::render_result(result, args.format)?;

        match &args.output {
            Some(output) => {
                let path = commands::output_path(output, result.report.kind, several, args.format);
                commands::write_output(&path, &rendered)?;
                println!(
                    "✓ {} ({} rows) -> {}",
                    result.report.name(),
                    result.report.len(),
                    path.display()
                );
            }
            None => {
                if args.format == Format::Table {
                    println!(
                        "\n▶ {}: {}",
                        result.report.name(),
                        result.report.kind.description()
                    );
                    println!("{}", rendered);
                    println!(
                        "  {} rows from {} sales in {:?}",
                        result.report.len(),
                        result.source_rows,
                        result.duration
                    );
                } else {
                    if several {
                        eprintln!("# {}", result.report.name());
                    }
                    print!("{}", rendered);
                }
            }
        }
    }
    Ok(())
}

fn generate(common: &CommonArgs, args: GenerateArgs) -> Result<()> {
    let target = resolve(common)?;
    let mut store = commands::open(&target)?;

    let config = SalesConfig {
        seed: args.seed,
        start_date: args.start_date,
        days: args.days,
        rows: args.rows,
        ..SalesConfig::default()
    };

    let inserted = commands::generate(&mut store, config, args.replace)?;
    println!(
        "\n✓ Inserted {} sales ({} total in {})",
        inserted,
        store.row_count()?,
        store.table()
    );
    Ok(())
}
