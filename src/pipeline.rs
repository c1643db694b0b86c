//! Stage sequencing: ingest, clean, dedup-then-merge, analyze.
//!
//! Each stage writes its artifacts under the configured directories and
//! returns its diagnostics so callers can report or assert on them.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::cleaner::{clean, CleanReport};
use crate::config::Config;
use crate::coverage::{analyze_coverage, CoverageAnalysis};
use crate::error::Result;
use crate::integrity::{analyze_integrity, IntegrityAnalysis};
use crate::loader::{load, LoadReport};
use crate::merge::{cross_check, merge, MergeReport};
use crate::output::{read_merged_csv, write_csv, write_json, write_records};
use crate::readiness::{analyze_readiness, ReadinessAnalysis};
use crate::types::{
    CoverageSummary, IntegritySummary, Measures, MergedRecord, RawBiometricRow,
    RawDemographicRow, RawEnrollmentRow, RawRow, ReadinessSummary, Record, ReferenceCheck,
};

/// Diagnostics of one record type through ingestion and cleaning.
#[derive(Debug, Clone, Serialize)]
pub struct TableDiagnostics {
    pub load: LoadReport,
    pub clean: CleanReport,
}

/// Everything a run learned about its inputs, written as `run_summary.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub tables: Vec<TableDiagnostics>,
    pub merge: Option<MergeReport>,
    pub reference_checks: Vec<ReferenceCheck>,
    pub coverage: Option<CoverageSummary>,
    pub readiness: Option<ReadinessSummary>,
    pub integrity: Option<IntegritySummary>,
}

impl RunSummary {
    /// True when any listed input file was missing or unreadable.
    pub fn is_partial(&self) -> bool {
        self.tables.iter().any(|t| t.load.is_partial())
    }

    pub fn write(&self, cfg: &Config) -> Result<()> {
        fs::create_dir_all(&cfg.paths.tables_dir)?;
        write_json(&cfg.paths.tables_dir.join("run_summary.json"), self)
    }
}

fn ingest<R: RawRow>(cfg: &Config) -> Result<(Vec<Record<R::Counts>>, TableDiagnostics)> {
    let kind = <R::Counts as Measures>::KIND;
    let (raw, load_report) = load::<R>(cfg.files.for_kind(kind), &cfg.paths.raw_dir)?;
    let (cleaned, clean_report) = clean(raw);
    let path = cfg.paths.cleaned_csv(kind);
    write_records(&path, &cleaned)?;
    info!(%kind, path = %path.display(), "saved cleaned table");
    Ok((
        cleaned,
        TableDiagnostics {
            load: load_report,
            clean: clean_report,
        },
    ))
}

/// Load and clean all three record types, merge them and save the merged CSV.
pub fn prepare(cfg: &Config) -> Result<(Vec<MergedRecord>, RunSummary)> {
    fs::create_dir_all(&cfg.paths.processed_dir)?;
    let (enrollment, enr_diag) = ingest::<RawEnrollmentRow>(cfg)?;
    let (biometric, bio_diag) = ingest::<RawBiometricRow>(cfg)?;
    let (demographic, demo_diag) = ingest::<RawDemographicRow>(cfg)?;

    let (merged, merge_report) = merge(&enrollment, &biometric, &demographic);
    let reference_checks = cross_check(&merge_report.national, &cfg.reference);
    let path = cfg.paths.merged_csv();
    write_csv(&path, &merged)?;
    info!(rows = merged.len(), path = %path.display(), "saved merged table");

    let summary = RunSummary {
        tables: vec![enr_diag, bio_diag, demo_diag],
        merge: Some(merge_report),
        reference_checks,
        ..RunSummary::default()
    };
    Ok((merged, summary))
}

/// The merged table saved by a previous [`prepare`].
pub fn load_merged(cfg: &Config) -> Result<Vec<MergedRecord>> {
    let path = cfg.paths.merged_csv();
    let rows = read_merged_csv(&path)?;
    info!(rows = rows.len(), path = %path.display(), "loaded merged table");
    Ok(rows)
}

fn save<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    write_csv(&dir.join(name), rows)?;
    info!(file = name, rows = rows.len(), "saved");
    Ok(())
}

pub fn coverage_stage(cfg: &Config, merged: &[MergedRecord]) -> Result<CoverageAnalysis> {
    let out = analyze_coverage(merged, &cfg.coverage);
    let dir = cfg.paths.tables_dir.as_path();
    fs::create_dir_all(dir)?;
    save(dir, "dim1_district_coverage.csv", &out.districts)?;
    save(dir, "dim1_state_coverage.csv", &out.states)?;
    save(dir, "dim1_coverage_gap_districts.csv", &out.coverage_gap)?;
    save(dir, "dim1_low_child_enrollment_districts.csv", &out.low_child)?;
    save(dir, "dim1_crisis_zone_districts.csv", &out.crisis_zone)?;
    save(
        dir,
        &format!("dim1_top{}_crisis_zone_districts.csv", cfg.coverage.top_n),
        &out.top_crisis,
    )?;
    save(dir, "dim1_summary_statistics.csv", &[out.summary.clone()])?;
    Ok(out)
}

pub fn readiness_stage(cfg: &Config, merged: &[MergedRecord]) -> Result<ReadinessAnalysis> {
    let out = analyze_readiness(merged, &cfg.readiness);
    let dir = cfg.paths.tables_dir.as_path();
    fs::create_dir_all(dir)?;
    save(dir, "dim2_district_readiness.csv", &out.districts)?;
    save(dir, "dim2_critical_readiness_districts.csv", &out.critical)?;
    save(
        dir,
        &format!(
            "dim2_{}_readiness_districts.csv",
            out.second_tier_category.label().to_lowercase()
        ),
        &out.second_tier,
    )?;
    save(dir, "dim2_high_risk_districts.csv", &out.high_risk)?;
    save(dir, "dim2_state_readiness_ranking.csv", &out.states)?;
    save(dir, "dim2_all_at_risk_districts.csv", &out.at_risk)?;
    save(
        dir,
        &format!("dim2_top{}_at_risk_districts.csv", cfg.readiness.top_n),
        &out.top_at_risk,
    )?;
    save(dir, "dim2_summary_statistics.csv", &[out.summary.clone()])?;
    Ok(out)
}

pub fn integrity_stage(cfg: &Config, merged: &[MergedRecord]) -> Result<IntegrityAnalysis> {
    let out = analyze_integrity(merged, &cfg.integrity);
    let dir = cfg.paths.tables_dir.as_path();
    fs::create_dir_all(dir)?;
    save(dir, "dim3_pincode_profiles.csv", &out.pincodes)?;
    save(dir, "dim3_all_anomalous_pincodes.csv", &out.anomalies)?;
    save(dir, "dim3_all_critical_risk_pincodes.csv", &out.critical)?;
    save(
        dir,
        &format!("dim3_top{}_critical_risk_pincodes.csv", cfg.integrity.top_n),
        &out.top_critical,
    )?;
    save(dir, "dim3_high_risk_pincodes.csv", &out.high)?;
    save(dir, "dim3_district_anomaly_counts.csv", &out.districts)?;
    let clustered: Vec<_> = out.districts.iter().filter(|d| d.clustered).cloned().collect();
    save(dir, "dim3_clustered_districts.csv", &clustered)?;
    save(dir, "dim3_summary_statistics.csv", &[out.summary.clone()])?;
    Ok(out)
}

/// Every stage in order, then `run_summary.json`.
pub fn run_all(cfg: &Config) -> Result<RunSummary> {
    let (merged, mut summary) = prepare(cfg)?;
    summary.coverage = Some(coverage_stage(cfg, &merged)?.summary);
    summary.readiness = Some(readiness_stage(cfg, &merged)?.summary);
    summary.integrity = Some(integrity_stage(cfg, &merged)?.summary);
    summary.write(cfg)?;
    Ok(summary)
}
