//! Three tiny input tables through every stage, checked against hand-computed
//! totals.

use aadhaar_gaps::config::{Config, ReferenceTotals};
use aadhaar_gaps::output::read_merged_csv;
use aadhaar_gaps::pipeline::{load_merged, prepare, run_all};
use aadhaar_gaps::types::MergedRecord;
use aadhaar_gaps::PipelineError;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

const ENROLLMENT: &str = "\
date,state,district,pincode,age_0_5,age_5_17,age_18_greater
01-03-2025,West Bengal,Nadia,741101,2,3,0
01-03-25,WEST BENGAL,NADIA,741101,4,1,0
02-03-2025,West Bengal,Nadia,741102,1,1,1
02-03-2025,100000,Nadia,741102,9,9,9
";

const BIOMETRIC: &str = "\
date,state,district,pincode,bio_age_5_17,bio_age_17_
01-03-2025,West Bengal,Nadia,741101,10,5
02-03-2025,West Bengal,Nadia,741102,0,6
";

const DEMOGRAPHIC: &str = "\
date,state,district,pincode,demo_age_5_17,demo_age_17_
01-03-2025,West Bengal,Nadia,741101,1,4
03-03-2025,West Bengal,Nadia,741103,2,2
";

fn fixture(root: &Path) -> Config {
    let raw = root.join("raw");
    fs::create_dir_all(&raw).expect("raw dir");
    fs::write(raw.join("enr.csv"), ENROLLMENT).expect("write");
    fs::write(raw.join("bio.csv"), BIOMETRIC).expect("write");
    fs::write(raw.join("demo.csv"), DEMOGRAPHIC).expect("write");

    let mut cfg = Config::default();
    cfg.paths.raw_dir = raw;
    cfg.paths.processed_dir = root.join("processed");
    cfg.paths.tables_dir = root.join("tables");
    cfg.files.enrollment = vec!["enr.csv".into()];
    cfg.files.biometric = vec!["bio.csv".into()];
    cfg.files.demographic = vec!["demo.csv".into()];
    cfg
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).expect("date")
}

fn totals(r: &MergedRecord) -> (u64, u64, u64, u64, f64) {
    (
        r.total_enrollment,
        r.total_biometric_updates,
        r.total_demographic_updates,
        r.total_updates,
        r.ue_ratio,
    )
}

#[test]
fn merged_table_matches_hand_computed_rows() {
    let dir = tempfile::tempdir().expect("tmp");
    let cfg = fixture(dir.path());

    let (merged, summary) = prepare(&cfg).expect("prepare");

    assert_eq!(merged.len(), 3);
    assert_eq!((merged[0].date, merged[0].pincode), (day(1), 741101));
    assert_eq!((merged[1].date, merged[1].pincode), (day(2), 741102));
    assert_eq!((merged[2].date, merged[2].pincode), (day(3), 741103));

    // duplicate enrollment key summed once: (2+4, 3+1, 0)
    assert_eq!(
        (merged[0].age_0_5, merged[0].age_5_17, merged[0].age_18_greater),
        (6, 4, 0)
    );
    assert_eq!(totals(&merged[0]), (10, 15, 5, 20, 2.0));
    assert_eq!(totals(&merged[1]), (3, 6, 0, 6, 2.0));
    // demographic-only key
    assert_eq!(totals(&merged[2]), (0, 0, 4, 4, 0.0));
    assert!(merged
        .iter()
        .all(|r| r.state == "West Bengal" && r.district == "Nadia"));

    let m = summary.merge.as_ref().expect("merge report");
    assert_eq!(m.enrollment.duplicate_rows_collapsed, 1);
    assert_eq!(m.national.enrollments, 13);
    assert_eq!(m.national.total_updates, 30);
    assert_eq!(m.national.ue_ratio, 30.0 / 13.0);

    let enr = &summary.tables[0];
    assert_eq!(enr.load.total_rows, 4);
    assert_eq!(enr.clean.invalid_state_rows, 1);
    assert_eq!(enr.clean.null_dates, 0);
    assert!(!summary.is_partial());
    assert!(summary.reference_checks.is_empty());

    assert_eq!(read_merged_csv(&cfg.paths.merged_csv()).expect("csv"), merged);
    assert!(cfg.paths.processed_dir.join("enrollment_clean.csv").exists());
}

#[test]
fn full_run_writes_every_table_and_the_summary() {
    let dir = tempfile::tempdir().expect("tmp");
    let mut cfg = fixture(dir.path());
    cfg.reference.totals = Some(ReferenceTotals {
        enrollments: 13,
        biometric_updates: 21,
        demographic_updates: 9,
        total_updates: 30,
        ue_ratio: 2.31,
    });

    let summary = run_all(&cfg).expect("run");

    assert_eq!(summary.reference_checks.len(), 5);
    assert!(summary.reference_checks.iter().all(|c| c.passed));

    let coverage = summary.coverage.as_ref().expect("coverage");
    assert_eq!(coverage.total_districts, 1);
    let readiness = summary.readiness.as_ref().expect("readiness");
    // 10 youth of 21 biometric updates
    assert!((readiness.median_readiness - 1000.0 / 21.0).abs() < 1e-9);
    let integrity = summary.integrity.as_ref().expect("integrity");
    assert_eq!(integrity.total_pincodes, 3);

    for name in [
        "dim1_district_coverage.csv",
        "dim1_summary_statistics.csv",
        "dim2_district_readiness.csv",
        "dim2_low_readiness_districts.csv",
        "dim2_summary_statistics.csv",
        "dim3_all_anomalous_pincodes.csv",
        "dim3_summary_statistics.csv",
        "run_summary.json",
    ] {
        assert!(cfg.paths.tables_dir.join(name).exists(), "{name} missing");
    }

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(cfg.paths.tables_dir.join("run_summary.json")).expect("read"),
    )
    .expect("json");
    assert_eq!(json["merge"]["national"]["enrollments"], 13);
    assert_eq!(json["tables"][0]["clean"]["invalid_state_rows"], 1);

    let summary_csv =
        fs::read_to_string(cfg.paths.tables_dir.join("dim1_summary_statistics.csv")).expect("read");
    assert!(summary_csv.starts_with("Total Districts Analyzed,"));

    // headers the report layer reads verbatim
    for (name, header) in [
        ("dim1_summary_statistics.csv", "Top 10 Crisis Zone Districts"),
        ("dim2_summary_statistics.csv", "All At-Risk Districts (Low+Critical)"),
        ("dim3_summary_statistics.csv", "Critical Risk (Top 10)"),
    ] {
        let csv = fs::read_to_string(cfg.paths.tables_dir.join(name)).expect("read");
        let first = csv.lines().next().unwrap_or_default();
        assert!(first.split(',').any(|h| h == header), "{name}: {first}");
    }
}

#[test]
fn missing_partition_is_reported_not_fatal() {
    let dir = tempfile::tempdir().expect("tmp");
    let mut cfg = fixture(dir.path());
    cfg.files.biometric.push("bio_part2.csv".into());

    let (merged, summary) = prepare(&cfg).expect("prepare");
    assert_eq!(merged.len(), 3);
    assert!(summary.is_partial());
}

#[test]
fn record_type_with_no_files_is_fatal() {
    let dir = tempfile::tempdir().expect("tmp");
    let mut cfg = fixture(dir.path());
    cfg.files.demographic = vec!["absent.csv".into()];

    let err = prepare(&cfg).expect_err("no demographic input");
    assert!(matches!(err, PipelineError::NoFilesLoaded { .. }));
}

#[test]
fn analyzers_need_a_merged_table_first() {
    let dir = tempfile::tempdir().expect("tmp");
    let cfg = fixture(dir.path());
    let err = load_merged(&cfg).expect_err("nothing merged yet");
    assert!(matches!(err, PipelineError::MissingInput { .. }));
}
