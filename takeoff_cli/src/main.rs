//! # Takeoff CLI
//!
//! Command-line surface over `takeoff_core`: import shape tables into a
//! catalog file, browse it, and price takeoff records exported by the
//! drawing tool.
//!
//! Stdout carries command output (tables, JSON, reports); logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use takeoff_core::catalog::{Catalog, ShapeQuery};
use takeoff_core::file_io::{load_catalog, load_settings, save_catalog, FileLock};
use takeoff_core::import::{import_file, LabelColumnPolicy};
use takeoff_core::quote::{save_report, summarize, write_report, GroupingMode, QuoteSummary};
use takeoff_core::settings::TakeoffSettings;
use takeoff_core::takeoff::TakeoffRecord;

#[derive(Parser)]
#[command(name = "takeoff")]
#[command(about = "Steel shape catalog and takeoff quote tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog file
    #[arg(long, global = true, default_value = "takeoff.shapes.json")]
    catalog: PathBuf,

    /// Settings file (pricing and import defaults)
    #[arg(long, global = true, default_value = "takeoff.settings.json")]
    settings: PathBuf,

    /// Name recorded in the catalog lock file
    #[arg(long, global = true)]
    user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a CSV or workbook shape table into the catalog
    Import(ImportArgs),
    /// List catalog shapes
    Query(QueryArgs),
    /// List classifications present in the catalog
    Classes,
    /// Remove every shape from the catalog
    Clear,
    /// Summarize takeoff records into priced quote lines
    Summarize(SummarizeArgs),
    /// Write a quote report file
    Export(ExportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Shape table to import (.csv, or .xlsx/.xlsm/.xls/.ods for workbooks)
    file: PathBuf,

    /// Refuse tables with no recognizable label column
    #[arg(long)]
    strict_labels: bool,

    /// Print the import report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Exact classification code (W, HSS, 2L, ...)
    #[arg(long = "class", default_value = "")]
    classification: String,

    /// Case-insensitive substring of label or alternate name
    #[arg(long, default_value = "")]
    search: String,

    /// Maximum rows (defaults to the settings value)
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SummarizeArgs {
    /// JSON array of takeoff records
    records: PathBuf,

    #[command(flatten)]
    pricing: PricingArgs,

    /// Print the summary as JSON instead of a report
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ExportArgs {
    /// JSON array of takeoff records
    records: PathBuf,

    /// Report file to write
    output: PathBuf,

    #[command(flatten)]
    pricing: PricingArgs,
}

#[derive(Args)]
struct PricingArgs {
    #[arg(long, value_enum)]
    grouping: Option<GroupingArg>,

    /// Material $ per linear foot
    #[arg(long)]
    material_rate: Option<f64>,

    /// Labor $ per linear foot
    #[arg(long)]
    labor_rate: Option<f64>,

    /// Material $ per pound
    #[arg(long)]
    price_per_lb: Option<f64>,

    /// Markup percent
    #[arg(long)]
    markup: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupingArg {
    Classification,
    Designation,
}

impl From<GroupingArg> for GroupingMode {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Classification => GroupingMode::Classification,
            GroupingArg::Designation => GroupingMode::Designation,
        }
    }
}

impl PricingArgs {
    fn apply(&self, settings: &mut TakeoffSettings) {
        let pricing = &mut settings.pricing;
        if let Some(grouping) = self.grouping {
            pricing.grouping = grouping.into();
        }
        if let Some(rate) = self.material_rate {
            pricing.material_rate_per_ft = rate;
        }
        if let Some(rate) = self.labor_rate {
            pricing.labor_rate_per_ft = rate;
        }
        if let Some(price) = self.price_per_lb {
            pricing.price_per_lb = price;
        }
        if let Some(markup) = self.markup {
            pricing.markup_percent = markup;
        }
    }
}

fn lock_user(cli_user: &Option<String>) -> String {
    cli_user
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "takeoff".to_string())
}

/// Load, modify and save the catalog while holding its lock
fn with_catalog_mut<T>(
    path: &Path,
    user: String,
    edit: impl FnOnce(&mut Catalog) -> Result<T>,
) -> Result<T> {
    let _lock = FileLock::acquire(path, user)?;
    let mut catalog = load_catalog(path).with_context(|| format!("loading catalog {}", path.display()))?;
    let out = edit(&mut catalog)?;
    save_catalog(&catalog, path).with_context(|| format!("saving catalog {}", path.display()))?;
    Ok(out)
}

fn read_records(path: &Path) -> Result<Vec<TakeoffRecord>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<TakeoffRecord> =
        serde_json::from_str(&text).with_context(|| format!("parsing takeoff records in {}", path.display()))?;
    log::debug!("Read {} takeoff records from {}", records.len(), path.display());
    Ok(records)
}

fn run_import(cli: &Cli, args: &ImportArgs, mut settings: TakeoffSettings) -> Result<()> {
    if args.strict_labels {
        settings.import.label_policy = LabelColumnPolicy::Strict;
    }

    let report = with_catalog_mut(&cli.catalog, lock_user(&cli.user), |catalog| {
        import_file(catalog, &args.file, &settings.import)
            .with_context(|| format!("importing {}", args.file.display()))
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Imported {} shapes ({} rows skipped) from {}",
            report.imported,
            report.skipped,
            args.file.display()
        );
        if report.label_fallback_used {
            println!("Note: no label column found, used the first column");
        }
    }
    Ok(())
}

fn run_query(cli: &Cli, args: &QueryArgs, settings: &TakeoffSettings) -> Result<()> {
    let catalog = load_catalog(&cli.catalog)?;
    let query = ShapeQuery::new()
        .classification(args.classification.as_str())
        .search(args.search.as_str())
        .limit(args.limit.unwrap_or(settings.query_limit));
    let rows = catalog.query(&query);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:<20} {:<6} {:>8} {:>8} {:>8}",
        "ID", "Label", "Alternate", "Class", "W", "d", "bf"
    );
    for row in &rows {
        println!(
            "{:<6} {:<20} {:<20} {:<6} {:>8.2} {:>8.2} {:>8.2}",
            row.id.0, row.label, row.alternate_name, row.classification, row.weight_per_ft, row.depth, row.flange_width
        );
    }
    println!("Showing {} of {} shapes", rows.len(), catalog.len());
    Ok(())
}

fn run_classes(cli: &Cli) -> Result<()> {
    let catalog = load_catalog(&cli.catalog)?;
    for code in catalog.classifications() {
        println!("{}", code);
    }
    Ok(())
}

fn run_clear(cli: &Cli) -> Result<()> {
    let removed = with_catalog_mut(&cli.catalog, lock_user(&cli.user), |catalog| {
        let count = catalog.len();
        catalog.clear();
        Ok(count)
    })?;
    println!("Removed {} shapes", removed);
    Ok(())
}

fn summarize_records(cli: &Cli, records: &Path, settings: &TakeoffSettings) -> Result<QuoteSummary> {
    let catalog = load_catalog(&cli.catalog)?;
    let records = read_records(records)?;
    Ok(summarize(&records, &settings.pricing, &catalog))
}

fn run_summarize(cli: &Cli, args: &SummarizeArgs, mut settings: TakeoffSettings) -> Result<()> {
    args.pricing.apply(&mut settings);
    let summary = summarize_records(cli, &args.records, &settings)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", write_report(&summary, &settings.pricing));
    }
    Ok(())
}

fn run_export(cli: &Cli, args: &ExportArgs, mut settings: TakeoffSettings) -> Result<()> {
    args.pricing.apply(&mut settings);
    let summary = summarize_records(cli, &args.records, &settings)?;
    save_report(&summary, &settings.pricing, &args.output)
        .with_context(|| format!("writing report {}", args.output.display()))?;
    println!(
        "Wrote {} quote lines to {} (total ${:.2})",
        summary.line_count(),
        args.output.display(),
        summary.grand_total
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let settings =
        load_settings(&cli.settings).with_context(|| format!("loading settings {}", cli.settings.display()))?;

    match &cli.command {
        Commands::Import(args) => run_import(cli, args, settings),
        Commands::Query(args) => run_query(cli, args, &settings),
        Commands::Classes => run_classes(cli),
        Commands::Clear => run_clear(cli),
        Commands::Summarize(args) => run_summarize(cli, args, settings),
        Commands::Export(args) => run_export(cli, args, settings),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_in(dir: &Path, args: &[&str]) -> Cli {
        let catalog = dir.join("test.shapes.json");
        let settings = dir.join("test.settings.json");
        let mut argv = vec![
            "takeoff".to_string(),
            "--catalog".to_string(),
            catalog.display().to_string(),
            "--settings".to_string(),
            settings.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_parses_pricing_overrides() {
        let cli = Cli::try_parse_from([
            "takeoff",
            "summarize",
            "records.json",
            "--grouping",
            "designation",
            "--price-per-lb",
            "0.9",
            "--markup",
            "15",
        ])
        .unwrap();

        let Commands::Summarize(args) = &cli.command else {
            panic!("expected summarize");
        };
        let mut settings = TakeoffSettings::default();
        args.pricing.apply(&mut settings);
        assert_eq!(settings.pricing.grouping, GroupingMode::Designation);
        assert_eq!(settings.pricing.price_per_lb, 0.9);
        assert_eq!(settings.pricing.markup_percent, 15.0);
        assert_eq!(settings.pricing.material_rate_per_ft, 0.0);
    }

    #[test]
    fn test_import_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("shapes.csv");
        fs::write(&csv, "AISC_Manual_Label,Type,W,d,bf\nW14X90,W,90,14.0,14.5\n").unwrap();

        let cli = cli_in(dir.path(), &["import", csv.to_str().unwrap()]);
        run(&cli).unwrap();

        let catalog = load_catalog(&dir.path().join("test.shapes.json")).unwrap();
        let id = catalog.find_by_designation("W14X90").unwrap().id;

        let records = dir.path().join("records.json");
        fs::write(
            &records,
            format!(r#"[{{"id": 1, "lengthInches": 120.0, "size": "W14X90", "shapeId": {}}}]"#, id),
        )
        .unwrap();
        let report = dir.path().join("quote.csv");

        let cli = cli_in(
            dir.path(),
            &["export", records.to_str().unwrap(), report.to_str().unwrap(), "--material-rate", "2"],
        );
        run(&cli).unwrap();

        let text = fs::read_to_string(&report).unwrap();
        assert!(text.contains("Other,W14X90,ShopFab,120.00,10.00,900.0,1,20.00,0.00,20.00"));
        assert!(text.contains("Total:,$20.00"));
    }

    #[test]
    fn test_import_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("aisc.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "AISC Shapes Database").unwrap();
        for (col, name) in ["Type", "AISC_Manual_Label", "W", "d", "bf"].iter().enumerate() {
            sheet.write_string(2, col as u16, *name).unwrap();
        }
        sheet.write_string(3, 0, "W").unwrap();
        sheet.write_string(3, 1, "W12X26").unwrap();
        sheet.write_number(3, 2, 26.0).unwrap();
        sheet.write_number(3, 3, 12.2).unwrap();
        sheet.write_number(3, 4, 6.49).unwrap();
        workbook.save(&xlsx).unwrap();

        run(&cli_in(dir.path(), &["import", xlsx.to_str().unwrap()])).unwrap();

        let catalog = load_catalog(&dir.path().join("test.shapes.json")).unwrap();
        let shape = catalog.find_by_designation("W12X26").unwrap();
        assert_eq!(catalog.property(shape.id, "W"), 26.0);
        assert_eq!(catalog.property(shape.id, "bf"), 6.49);
    }

    #[test]
    fn test_clear_keeps_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("shapes.csv");
        fs::write(&csv, "Label,Type,W,d,bf\nC10X30,C,30,10,3\n").unwrap();

        run(&cli_in(dir.path(), &["import", csv.to_str().unwrap()])).unwrap();
        run(&cli_in(dir.path(), &["clear"])).unwrap();

        let catalog = load_catalog(&dir.path().join("test.shapes.json")).unwrap();
        assert!(catalog.is_empty());
    }
}
