// Entry point and high-level CLI flow.
//
// - Option [1] loads the CSV and runs the cleaning stage, printing
//   diagnostics.
// - Option [2] ranks districts and PIN codes, writes the output tables and
//   a JSON summary, and previews each table on the console.
// - After generating reports, the user can go back to the menu or exit.
//   `--batch` runs both steps once without prompting.
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use enrollment_ranker::cache::PipelineCache;
use enrollment_ranker::config::{PipelineConfig, RankMetric};
use enrollment_ranker::types::RawTable;
use enrollment_ranker::util::{format_int, format_number};
use enrollment_ranker::{loader, output, reports};

#[derive(Parser, Debug)]
#[command(name = "enrollment_ranker", version, about = "Ranks districts and PIN codes by adult enrollment imbalance")]
struct Args {
    /// Enrollment CSV to analyze
    #[arg(short, long, default_value = "enrollment.csv")]
    input: PathBuf,

    /// Pipeline configuration (TOML); defaults apply when absent
    #[arg(short, long, default_value = "pipeline.toml")]
    config: PathBuf,

    /// Directory for the exported tables
    #[arg(short, long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Override the ranking metric (aer, aebi, caes)
    #[arg(long)]
    metric: Option<RankMetric>,

    /// Aggregate to monthly granularity before ranking
    #[arg(long)]
    aggregate_monthly: bool,

    /// Load and report once, without the interactive menu
    #[arg(long)]
    batch: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

// In-memory app state so the CSV is loaded once while reports can be
// generated many times; repeated runs with the same config come from the
// cache.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        table: None,
        cache: PipelineCache::new(),
    })
});

struct AppState {
    table: Option<RawTable>,
    cache: PipelineCache,
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = if args.config.exists() {
        println!("Loading configuration from: {}", args.config.display());
        PipelineConfig::load_from_file(&args.config)
            .with_context(|| format!("reading {}", args.config.display()))?
    } else {
        PipelineConfig::default()
    };
    if let Some(metric) = args.metric {
        config.rank_metric = metric;
    }
    if args.aggregate_monthly {
        config.aggregate_monthly = true;
    }
    config.validate()?;
    Ok(config)
}

/// Option [1]: load the CSV and report what cleaning will see. A reload
/// replaces the table and drops every cached run built from the old one.
fn handle_load(args: &Args) -> Result<()> {
    let (table, load_report) = loader::load_csv(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    println!(
        "Processing dataset... ({} rows loaded, {} unreadable)",
        format_int(load_report.total_rows),
        format_int(load_report.parse_errors)
    );
    enrollment_ranker::cleaning::check_schema(&table)
        .with_context(|| format!("cannot use {}", args.input.display()))?;
    println!();
    let mut state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    state.cache.clear();
    state.table = Some(table);
    Ok(())
}

/// Option [2]: run the pipeline, write every table and preview them.
fn handle_generate_reports(args: &Args, config: &PipelineConfig) -> Result<()> {
    let mut state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let AppState { table, cache } = &mut *state;
    let Some(table) = table.as_ref() else {
        bail!("No data loaded. Please load the CSV file first (option 1).");
    };

    println!("Generating reports...");
    let out = cache.get_or_run(table, config)?;

    let v = &out.validation;
    println!(
        "Cleaned {} rows into {} records ({} duplicates merged).",
        format_int(v.input_rows),
        format_int(v.output_rows),
        format_int(v.duplicate_rows)
    );
    if v.has_warnings() {
        println!(
            "Note: {} unparsed dates, {} invalid PIN codes, {} missing counts filled with 0.",
            format_int(v.unparsed_dates),
            format_int(v.invalid_pincodes),
            format_int(v.missing_counts)
        );
    }

    let written = output::write_all(&args.output_dir, &out)
        .with_context(|| format!("writing outputs to {}", args.output_dir.display()))?;
    println!("Outputs saved to {}\n", args.output_dir.display());

    println!("District Rankings (by {})\n", config.rank_metric.to_string().to_uppercase());
    output::preview_table_rows(&reports::district_rows(&out.districts), 5);

    println!(
        "PIN Code Rankings (minimum {} enrollments)\n",
        config.pin_min_enrollments
    );
    output::preview_table_rows(&reports::pincode_rows(&out.pincodes), 5);

    println!(
        "Priority Zones (AER < {}%, minimum {} enrollments)\n",
        format_number(config.zone_aer_threshold * 100.0, 1),
        config.zone_min_enrollments
    );
    output::preview_table_rows(&reports::priority_zone_rows(&out.priority_zones), 5);

    println!("Within-District Variation\n");
    output::preview_table_rows(&reports::variation_rows(&out.variation), 3);

    let summary = &out.executive_summary;
    println!("Summary Stats ({}):", output::SUMMARY_FILE);
    println!(
        "{{\"state\": \"{}\", \"total_enrollments\": {}, \"avg_aer_pct\": {}, \"children_per_adult\": {}}}\n",
        summary.state,
        format_int(summary.total_enrollments),
        format_number(summary.avg_aer * 100.0, 2),
        summary.children_per_adult
    );
    log::debug!("Wrote {:?}", written);
    Ok(())
}

/// `--batch`: load then report once; any failure ends the process with an
/// error status.
fn run_batch(args: &Args, config: &PipelineConfig) -> Result<()> {
    handle_load(args)?;
    handle_generate_reports(args, config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = load_config(&args)?;

    if args.batch {
        return run_batch(&args, &config);
    }

    loop {
        println!("Enrollment Imbalance Analysis:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        match read_choice().as_str() {
            "1" => {
                if let Err(e) = handle_load(&args) {
                    eprintln!("{:#}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&args, &config) {
                    eprintln!("Report generation failed: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
    Ok(())
}
