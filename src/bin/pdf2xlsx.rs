use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use pdf_tables_to_xlsx::{
    ConversionReport, ConvertOptions, ExtractionStrategy, FormatProfile, LineMode, PageSelection,
    convert_pdf_to_xlsx, write_preview_csv,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdf2xlsx",
    version,
    about = "Consolidate the tables of a PDF into one formatted XLSX sheet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract every table and write the consolidated workbook.
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output XLSX path.
    #[arg(short, long)]
    output: PathBuf,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Number and date conventions of the sheet (pt-BR or en-US).
    #[arg(long)]
    locale: Option<String>,

    /// Name of the consolidated sheet.
    #[arg(long, default_value = pdf_tables_to_xlsx::DEFAULT_SHEET_NAME)]
    sheet_name: String,

    /// Extraction strategy as vertical/horizontal, e.g. lines/text. Repeatable;
    /// tried in the given order.
    #[arg(long = "strategy")]
    strategies: Vec<String>,

    /// Print the first consolidated rows as CSV on stdout.
    #[arg(long)]
    preview: bool,

    /// Print the conversion report as JSON on stdout.
    #[arg(long)]
    report_json: bool,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_strategy(value: &str) -> Result<ExtractionStrategy> {
    let (vertical, horizontal) = value.split_once('/').unwrap_or((value, value));
    let vertical = LineMode::from_str(vertical).map_err(|error| anyhow!(error))?;
    let horizontal = LineMode::from_str(horizontal).map_err(|error| anyhow!(error))?;
    Ok(ExtractionStrategy {
        vertical,
        horizontal,
    })
}

fn parse_options(args: &ConvertArgs) -> Result<ConvertOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let mut options = ConvertOptions {
        pages,
        sheet_name: args.sheet_name.clone(),
        format: FormatProfile::for_locale(args.locale.as_deref()),
        ..ConvertOptions::default()
    };
    if !args.strategies.is_empty() {
        options.strategies = args
            .strategies
            .iter()
            .map(|value| {
                parse_strategy(value).with_context(|| format!("failed to parse --strategy '{value}'"))
            })
            .collect::<Result<Vec<_>>>()?;
    }

    Ok(options)
}

fn log_report(report: &ConversionReport, verbose: bool) {
    eprintln!(
        "{} table(s) consolidated into {} row(s)",
        report.table_count, report.row_count
    );
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} page={:?} table={:?}: {}",
                warning.code, warning.page, warning.table_index, warning.message
            );
        }
    }
}

fn print_outputs(args: &ConvertArgs, report: &ConversionReport) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.preview && !report.columns.is_empty() {
        write_preview_csv(&mut out, &report.columns, &report.preview)
            .context("failed to print preview")?;
    }
    if args.report_json {
        serde_json::to_writer_pretty(&mut out, report).context("failed to print report")?;
        writeln!(out)?;
    }
    Ok(())
}

fn run_convert(args: &ConvertArgs) -> Result<ConversionReport> {
    let options = parse_options(args)?;
    let report = convert_pdf_to_xlsx(&args.input, &args.output, &options)
        .with_context(|| format!("failed to convert '{}'", args.input.display()))?;
    print_outputs(args, &report)?;
    Ok(report)
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdf_tables_to_xlsx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => match run_convert(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.table_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
