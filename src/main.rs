/// CLI: очистка, разведочный анализ и моделирование

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tjsp_ml::{
    compare_estimators, explore, run_cleaning, run_modeling, AppConfig, CleaningSummary,
    EstimatorKind, ExploratoryReport, ModelingReport, Table,
};
use tjsp_ml::preprocessing::EncodingStrategy;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-файл настроек; без него используются значения по умолчанию
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean the raw table and write the treated file
    Clean(CleanArgs),
    /// Summarize the cleaned table
    Explore(ExploreArgs),
    /// Train and evaluate a model on the cleaned table
    Model(ModelArgs),
    /// Clean, explore and model in one go
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct CleanArgs {
    /// Raw input table
    #[arg(long)]
    input: Option<PathBuf>,
    /// Cleaned output table
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ExploreArgs {
    /// Cleaned table
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ModelOptions {
    #[arg(long)]
    estimator: Option<EstimatorKind>,
    #[arg(long)]
    encoding: Option<EncodingStrategy>,
    /// Drop categorical predictors
    #[arg(long)]
    numeric_only: bool,
    /// Grid search with cross-validation before the final fit
    #[arg(long)]
    tune: bool,
    /// Evaluate every estimator on the same split
    #[arg(long)]
    compare: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    test_size: Option<f64>,
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Cleaned table
    #[arg(long)]
    input: Option<PathBuf>,
    #[command(flatten)]
    options: ModelOptions,
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Raw input table
    #[arg(long)]
    input: Option<PathBuf>,
    /// Cleaned output table
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    options: ModelOptions,
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Сводный отчет команды `run`
#[derive(Serialize)]
struct RunReport<'a> {
    cleaning: &'a CleaningSummary,
    exploration: &'a ExploratoryReport,
    modeling: &'a [ModelingReport],
}

fn main() -> Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Clean(args) => {
            let summary = clean(&config, args.input, args.output)?;
            write_report(args.report.as_deref(), &summary)?;
        }
        Command::Explore(args) => {
            let input = args.input.unwrap_or_else(|| config.paths.cleaned_output.clone());
            let report = explore_file(&config, &input)?;
            write_report(args.report.as_deref(), &report)?;
        }
        Command::Model(args) => {
            let input = args.input.unwrap_or_else(|| config.paths.cleaned_output.clone());
            let reports = model_file(&config, &input, &args.options)?;
            write_report(args.report.as_deref(), &reports)?;
        }
        Command::Run(args) => {
            let summary = clean(&config, args.input, args.output)?;
            let exploration = explore_file(&config, &summary.output)?;
            let reports = model_file(&config, &summary.output, &args.options)?;
            let report = RunReport {
                cleaning: &summary,
                exploration: &exploration,
                modeling: &reports,
            };
            write_report(args.report.as_deref(), &report)?;
        }
    }

    Ok(())
}

fn clean(config: &AppConfig, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<CleaningSummary> {
    let input = input.unwrap_or_else(|| config.paths.raw_input.clone());
    let output = output.unwrap_or_else(|| config.paths.cleaned_output.clone());
    let delimiter = config.paths.delimiter_byte()?;

    let summary = run_cleaning(&input, &output, delimiter, &config.cleaning)
        .with_context(|| format!("cleaning {} failed", input.display()))?;

    println!("Rows read:     {}", summary.rows_read);
    println!("Rows dropped:  {}", summary.rows_dropped);
    println!("Rows written:  {}", summary.rows_written);
    println!("Cells filled:  {}", summary.cells_filled);
    for column in &summary.derived_columns {
        println!(
            "  {} -> {}: {} parsed, {} missing",
            column.source, column.derived, column.parsed, column.missing
        );
    }
    println!("Saved to {}", summary.output.display());
    Ok(summary)
}

fn load_table(config: &AppConfig, path: &Path) -> Result<Table> {
    let delimiter = config.paths.delimiter_byte()?;
    Table::read_csv(path, delimiter).with_context(|| format!("failed to read {}", path.display()))
}

fn explore_file(config: &AppConfig, path: &Path) -> Result<ExploratoryReport> {
    let table = load_table(config, path)?;
    let report = explore(&table, &config.explore)?;
    print_exploration(&report);
    Ok(report)
}

fn model_file(config: &AppConfig, path: &Path, options: &ModelOptions) -> Result<Vec<ModelingReport>> {
    let table = load_table(config, path)?;

    let mut modeling = config.modeling.clone();
    if let Some(estimator) = options.estimator {
        modeling.estimator = estimator;
    }
    if let Some(encoding) = options.encoding {
        modeling.encoding = encoding;
    }
    if options.numeric_only {
        modeling.include_categoricals = false;
    }
    if options.tune {
        modeling.tune_hyperparameters = true;
    }
    if let Some(seed) = options.seed {
        modeling.seed = seed;
    }
    if let Some(test_size) = options.test_size {
        modeling.test_size = test_size;
    }

    let reports = if options.compare {
        compare_estimators(&table, &modeling)?
    } else {
        vec![run_modeling(&table, &modeling)?]
    };

    for report in &reports {
        print_modeling(report);
    }
    Ok(reports)
}

fn print_exploration(report: &ExploratoryReport) {
    println!("Rows: {}, columns: {}", report.n_rows, report.n_columns);

    println!("\nMissing values:");
    for m in report.missing.iter().filter(|m| m.missing > 0) {
        println!("  {:<30} {}", m.column, m.missing);
    }

    println!("\nNumeric columns:");
    for s in &report.numeric_summary {
        println!(
            "  {:<30} n={:<6} mean={:>10.2} std={:>10.2} min={:>10.2} max={:>10.2}",
            s.column,
            s.count,
            s.mean,
            s.std.unwrap_or(f64::NAN),
            s.min,
            s.max
        );
    }

    println!("\nCorrelation with target:");
    for c in &report.target_correlations {
        println!("  {:<30} {:>7.3}", c.column, c.pearson);
    }

    for g in &report.groups {
        println!("\n{} ({} groups), slowest with enough cases:", g.column, g.n_groups);
        for s in &g.slowest_filtered {
            println!("  {:<50} {:>8.1} months  ({} units)", s.group, s.mean_target, s.count);
        }
        println!("{}, largest:", g.column);
        for s in &g.largest {
            println!("  {:<50} {:>6}", s.group, s.count);
        }
    }

    if let Some(iad) = &report.demand_index {
        println!(
            "\nDemand index: mean {:.1}%, min {:.1}%, max {:.1}% over {} units",
            iad.mean, iad.min, iad.max, iad.count
        );
    }
}

fn print_modeling(report: &ModelingReport) {
    let encoding = report
        .encoding
        .map(|e| e.to_string())
        .unwrap_or_else(|| "numeric only".to_string());

    println!("\n{} ({}), {} train / {} test", report.estimator, encoding, report.n_train, report.n_test);
    println!("  MAE:  {:.2}", report.metrics.mae);
    println!("  RMSE: {:.2}", report.metrics.rmse);
    println!("  R2:   {:.4}", report.metrics.r2);

    if let Some(tuning) = &report.tuning {
        println!(
            "  Best of {} candidates ({} folds): {:?}, neg MAE {:.4}",
            tuning.candidates, tuning.folds, tuning.best_params, tuning.best_score
        );
    }

    if !report.feature_importances.is_empty() {
        println!("  Feature importances:");
        for f in report.feature_importances.iter().take(10) {
            println!("    {:<30} {:.4}", f.feature, f.importance);
        }
    }
}

fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))?;
    tracing::info!("Report saved to {}", path.display());
    Ok(())
}
