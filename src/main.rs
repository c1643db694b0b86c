// Entry point and CLI flow.
//
// Each subcommand runs one stage of the pipeline (or all of them), prints a
// short status report with table previews, and maps the outcome to an exit
// code: 0 on success, 2 when some input files were missing or unreadable,
// 1 on a fatal error.
use aadhaar_gaps::config::Config;
use aadhaar_gaps::output::preview_table;
use aadhaar_gaps::pipeline::{self, RunSummary};
use aadhaar_gaps::util::{format_int, format_number};
use aadhaar_gaps::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "aadhaar-gaps.toml";
const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "aadhaar-gaps", version)]
#[command(about = "Clean and merge Aadhaar transaction logs and compute coverage, readiness and integrity gaps")]
struct Cli {
    /// TOML configuration file (defaults to ./aadhaar-gaps.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, clean and merge the raw CSV extracts
    Clean,
    /// District coverage and enrollment/update quadrants (reads the merged CSV)
    Coverage,
    /// Youth biometric readiness per district (reads the merged CSV)
    Readiness,
    /// Pincode integrity flags and risk tiers (reads the merged CSV)
    Integrity,
    /// Every stage in order
    Run,
    /// Write the default configuration to the --config path
    InitConfig,
}

enum Outcome {
    Complete,
    Partial,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aadhaar_gaps=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// An explicit path must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load_from_file(p),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load_from_file(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn print_prepare(summary: &RunSummary) {
    println!("Processing dataset...");
    for t in &summary.tables {
        println!(
            "  {}: {} rows from {}/{} files ({} skipped), {} invalid-state rows removed, {} unparsed dates",
            t.load.kind,
            format_int(t.load.total_rows),
            t.load.files_loaded(),
            t.load.files.len(),
            format_int(t.load.skipped_rows),
            format_int(t.clean.invalid_state_rows),
            format_int(t.clean.null_dates),
        );
    }
    if let Some(m) = &summary.merge {
        println!(
            "  merged: {} rows, {} duplicate rows aggregated, {} undated rows excluded",
            format_int(m.rows_out),
            format_int(
                m.enrollment.duplicate_rows_collapsed
                    + m.biometric.duplicate_rows_collapsed
                    + m.demographic.duplicate_rows_collapsed
            ),
            format_int(m.null_date_rows_excluded()),
        );
        println!(
            "  national: {} enrollments, {} updates, UE ratio {}\n",
            format_int(m.national.enrollments),
            format_int(m.national.total_updates),
            format_number(m.national.ue_ratio, 2),
        );
    }
    if !summary.reference_checks.is_empty() {
        preview_table(
            "Reference totals",
            None,
            &summary.reference_checks,
            summary.reference_checks.len(),
        );
    }
    if summary.is_partial() {
        println!("Warning: some input files were missing or unreadable.\n");
    }
}

fn outcome(summary: &RunSummary) -> Outcome {
    if summary.is_partial() {
        Outcome::Partial
    } else {
        Outcome::Complete
    }
}

fn handle_clean(cfg: &Config) -> Result<Outcome> {
    let (_, summary) = pipeline::prepare(cfg)?;
    summary.write(cfg)?;
    print_prepare(&summary);
    println!("(Merged table exported to {})\n", cfg.paths.merged_csv().display());
    Ok(outcome(&summary))
}

fn handle_coverage(cfg: &Config) -> Result<Outcome> {
    let merged = pipeline::load_merged(cfg)?;
    let out = pipeline::coverage_stage(cfg, &merged)?;
    let s = &out.summary;
    println!(
        "Coverage: {} districts, {} coverage gap, {} crisis zone, {} low child enrollment",
        s.total_districts, s.coverage_gap_districts, s.crisis_zone_districts, s.low_child_districts
    );
    println!(
        "Medians: {} enrollments, {} updates; national child share {}%",
        format_number(s.median_enrollment, 0),
        format_number(s.median_updates, 0),
        format_number(s.national_child_pct, 1),
    );
    preview_table(
        "Crisis Zone Districts",
        Some("lowest enrollment first"),
        &out.top_crisis,
        PREVIEW_ROWS,
    );
    preview_table("States by UE Ratio", None, &out.states, PREVIEW_ROWS);
    println!("(Full tables exported to {})\n", cfg.paths.tables_dir.display());
    Ok(Outcome::Complete)
}

fn handle_readiness(cfg: &Config) -> Result<Outcome> {
    let merged = pipeline::load_merged(cfg)?;
    let out = pipeline::readiness_stage(cfg, &merged)?;
    let s = &out.summary;
    println!(
        "Readiness: {} districts, {} critical, {} high risk; median score {}%",
        s.total_districts,
        s.critical_districts,
        s.high_risk_districts,
        format_number(s.median_readiness, 2),
    );
    println!(
        "Estimated youth at risk: {}",
        format_int(s.total_at_risk_youth)
    );
    preview_table(
        "At-Risk Districts",
        Some("by estimated at-risk youth"),
        &out.top_at_risk,
        PREVIEW_ROWS,
    );
    println!("(Full tables exported to {})\n", cfg.paths.tables_dir.display());
    Ok(Outcome::Complete)
}

fn handle_integrity(cfg: &Config) -> Result<Outcome> {
    let merged = pipeline::load_merged(cfg)?;
    let out = pipeline::integrity_stage(cfg, &merged)?;
    let s = &out.summary;
    println!(
        "Integrity: {} of {} pincodes anomalous ({} critical, {} high, {} medium, {} low)",
        format_int(s.anomalous_pincodes),
        format_int(s.total_pincodes),
        s.critical,
        s.high,
        s.medium,
        s.low,
    );
    preview_table(
        "Highest-Risk Pincodes",
        None,
        &out.anomalies,
        PREVIEW_ROWS,
    );
    preview_table(
        "Districts by Anomalous Pincodes",
        None,
        &out.districts,
        PREVIEW_ROWS,
    );
    println!("(Full tables exported to {})\n", cfg.paths.tables_dir.display());
    Ok(Outcome::Complete)
}

fn handle_run(cfg: &Config) -> Result<Outcome> {
    let summary = pipeline::run_all(cfg)?;
    print_prepare(&summary);
    if let Some(c) = &summary.coverage {
        println!(
            "Coverage: {} districts, {} coverage gap, {} crisis zone",
            c.total_districts, c.coverage_gap_districts, c.crisis_zone_districts
        );
    }
    if let Some(r) = &summary.readiness {
        println!(
            "Readiness: {} critical, {} high risk, {} youth at risk",
            r.critical_districts,
            r.high_risk_districts,
            format_int(r.total_at_risk_youth)
        );
    }
    if let Some(i) = &summary.integrity {
        println!(
            "Integrity: {} anomalous pincodes, {} critical, {} clustered districts",
            format_int(i.anomalous_pincodes),
            i.critical,
            i.clustered_districts
        );
    }
    println!("\n(Outputs saved to {})\n", cfg.paths.tables_dir.display());
    Ok(outcome(&summary))
}

fn handle_init_config(path: Option<&Path>) -> Result<Outcome> {
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG));
    Config::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(Outcome::Complete)
}

fn dispatch(cmd: Command, config: Option<&Path>) -> Result<Outcome> {
    let load = || load_config(config);
    match cmd {
        Command::Clean => handle_clean(&load()?),
        Command::Coverage => handle_coverage(&load()?),
        Command::Readiness => handle_readiness(&load()?),
        Command::Integrity => handle_integrity(&load()?),
        Command::Run => handle_run(&load()?),
        Command::InitConfig => handle_init_config(config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = dispatch(cli.command, cli.config.as_deref());

    match result {
        Ok(Outcome::Complete) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => {
            info!("finished with missing inputs");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
