//! Deduplicate each record-type table on the natural key, then outer-join
//! the three tables and derive totals.
//!
//! Deduplication must run before any join. The raw tables contain the same
//! (date, state, district, pincode) on several rows; joining those directly
//! multiplies rows and inflates every total downstream.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::ReferenceConfig;
use crate::types::{
    BiometricCounts, DemographicCounts, EnrollmentCounts, Measures, MergedRecord, NaturalKey,
    Record, RecordKind, ReferenceCheck,
};
use crate::util::{format_int, safe_ratio};

#[derive(Debug, Clone, Serialize)]
pub struct DedupReport {
    pub kind: RecordKind,
    pub rows_in: usize,
    /// Rows without a parsed date; they cannot take part in a date-keyed join.
    pub null_date_rows_excluded: usize,
    pub keys_out: usize,
    pub duplicate_rows_collapsed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NationalTotals {
    pub enrollments: u64,
    pub biometric_updates: u64,
    pub demographic_updates: u64,
    pub total_updates: u64,
    pub ue_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub enrollment: DedupReport,
    pub biometric: DedupReport,
    pub demographic: DedupReport,
    pub rows_after_first_join: usize,
    pub rows_out: usize,
    pub national: NationalTotals,
}

impl MergeReport {
    pub fn null_date_rows_excluded(&self) -> usize {
        self.enrollment.null_date_rows_excluded
            + self.biometric.null_date_rows_excluded
            + self.demographic.null_date_rows_excluded
    }
}

/// Collapse rows sharing a natural key by summing their counts.
///
/// Rows with an unparsed date are excluded and counted.
pub fn dedup<M: Measures>(records: &[Record<M>]) -> (BTreeMap<NaturalKey, M>, DedupReport) {
    let mut by_key: BTreeMap<NaturalKey, M> = BTreeMap::new();
    let mut null_dates = 0usize;
    for r in records {
        let Some(date) = r.date else {
            null_dates += 1;
            continue;
        };
        let key = NaturalKey {
            date,
            state: r.state.clone(),
            district: r.district.clone(),
            pincode: r.pincode,
        };
        by_key.entry(key).or_default().accumulate(&r.counts);
    }
    let keyed_rows = records.len() - null_dates;
    let report = DedupReport {
        kind: M::KIND,
        rows_in: records.len(),
        null_date_rows_excluded: null_dates,
        keys_out: by_key.len(),
        duplicate_rows_collapsed: keyed_rows - by_key.len(),
    };
    info!(
        kind = %report.kind,
        before = %format_int(keyed_rows),
        after = %format_int(report.keys_out),
        duplicates = report.duplicate_rows_collapsed,
        "aggregated duplicate keys"
    );
    if null_dates > 0 {
        warn!(kind = %report.kind, rows = null_dates, "rows without a date excluded from merge");
    }
    (by_key, report)
}

/// Full outer join of two tables that are already unique on their key.
fn outer_join<A, B>(
    left: BTreeMap<NaturalKey, A>,
    mut right: BTreeMap<NaturalKey, B>,
) -> BTreeMap<NaturalKey, (Option<A>, Option<B>)> {
    let mut joined = BTreeMap::new();
    for (key, a) in left {
        let b = right.remove(&key);
        joined.insert(key, (Some(a), b));
    }
    for (key, b) in right {
        joined.insert(key, (None, Some(b)));
    }
    joined
}

/// Deduplicate, join enrollment with biometric, join the result with
/// demographic, then fill absent sides with zero and derive totals.
pub fn merge(
    enrollment: &[Record<EnrollmentCounts>],
    biometric: &[Record<BiometricCounts>],
    demographic: &[Record<DemographicCounts>],
) -> (Vec<MergedRecord>, MergeReport) {
    let (enr, enr_report) = dedup(enrollment);
    let (bio, bio_report) = dedup(biometric);
    let (demo, demo_report) = dedup(demographic);

    let first = outer_join(enr, bio);
    let rows_after_first_join = first.len();
    info!(rows = %format_int(rows_after_first_join), "joined enrollment + biometric");

    let merged: Vec<MergedRecord> = outer_join(first, demo)
        .into_iter()
        .map(|(key, (eb, d))| {
            let (e, b) = eb.unwrap_or((None, None));
            MergedRecord::derive(key, e, b, d)
        })
        .collect();
    info!(rows = %format_int(merged.len()), "joined demographic");

    let national = national_totals(&merged);
    info!(
        enrollments = %format_int(national.enrollments),
        updates = %format_int(national.total_updates),
        ue_ratio = %format!("{:.2}", national.ue_ratio),
        "merged totals"
    );
    let report = MergeReport {
        enrollment: enr_report,
        biometric: bio_report,
        demographic: demo_report,
        rows_after_first_join,
        rows_out: merged.len(),
        national,
    };
    (merged, report)
}

pub fn national_totals(merged: &[MergedRecord]) -> NationalTotals {
    let enrollments: u64 = merged.iter().map(|r| r.total_enrollment).sum();
    let biometric_updates: u64 = merged.iter().map(|r| r.total_biometric_updates).sum();
    let demographic_updates: u64 = merged.iter().map(|r| r.total_demographic_updates).sum();
    let total_updates = biometric_updates + demographic_updates;
    NationalTotals {
        enrollments,
        biometric_updates,
        demographic_updates,
        total_updates,
        ue_ratio: safe_ratio(total_updates as f64, enrollments as f64),
    }
}

/// Compare national totals with externally verified figures.
///
/// Empty when no reference totals are configured.
pub fn cross_check(national: &NationalTotals, reference: &ReferenceConfig) -> Vec<ReferenceCheck> {
    let Some(truth) = &reference.totals else {
        return Vec::new();
    };
    let count = |metric: &str, actual: u64, expected: u64| {
        check(metric, actual as f64, expected as f64, reference.count_tolerance)
    };
    let checks = vec![
        count("Total Enrollments", national.enrollments, truth.enrollments),
        count("Total Bio Updates", national.biometric_updates, truth.biometric_updates),
        count("Total Demo Updates", national.demographic_updates, truth.demographic_updates),
        count("Total Updates", national.total_updates, truth.total_updates),
        check("UE Ratio", national.ue_ratio, truth.ue_ratio, reference.ratio_tolerance),
    ];
    for c in checks.iter().filter(|c| !c.passed) {
        warn!(metric = %c.metric, actual = c.actual, expected = c.expected, "total does not match reference");
    }
    checks
}

fn check(metric: &str, actual: f64, expected: f64, tolerance: f64) -> ReferenceCheck {
    let difference = (actual - expected).abs();
    ReferenceCheck {
        metric: metric.to_string(),
        actual,
        expected,
        difference,
        passed: difference <= tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceTotals;
    use chrono::NaiveDate;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 3, d)
    }

    fn rec<M>(d: u32, pincode: u32, counts: M) -> Record<M> {
        Record {
            raw_date: String::new(),
            date: day(d),
            state: "Kerala".into(),
            district: "Kollam".into(),
            pincode,
            counts,
        }
    }

    fn enr(a: u64, b: u64, c: u64) -> EnrollmentCounts {
        EnrollmentCounts {
            age_0_5: a,
            age_5_17: b,
            age_18_greater: c,
        }
    }

    fn bio(a: u64, b: u64) -> BiometricCounts {
        BiometricCounts {
            bio_age_5_17: a,
            bio_age_17_plus: b,
        }
    }

    fn demo(a: u64, b: u64) -> DemographicCounts {
        DemographicCounts {
            demo_age_5_17: a,
            demo_age_17_plus: b,
        }
    }

    #[test]
    fn duplicate_enrollment_key_is_summed_exactly_once() {
        let (merged, report) = merge(
            &[rec(1, 691001, enr(2, 3, 0)), rec(1, 691001, enr(4, 1, 0))],
            &[rec(1, 691001, bio(10, 0))],
            &[rec(1, 691001, demo(0, 5))],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total_enrollment, 10);
        assert_eq!(merged[0].total_updates, 15);
        assert_eq!(merged[0].ue_ratio, 1.5);
        assert_eq!(report.enrollment.duplicate_rows_collapsed, 1);
        assert_eq!(report.biometric.duplicate_rows_collapsed, 0);
    }

    #[test]
    fn duplicates_in_two_tables_do_not_multiply() {
        let (merged, report) = merge(
            &[rec(1, 691001, enr(5, 0, 0)), rec(1, 691001, enr(7, 0, 0))],
            &[rec(1, 691001, bio(1, 2)), rec(1, 691001, bio(3, 4))],
            &[rec(1, 691001, demo(1, 1))],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total_enrollment, 12);
        assert_eq!(merged[0].total_biometric_updates, 10);
        assert_eq!(merged[0].total_demographic_updates, 2);
        assert_eq!(report.national.total_updates, 12);
    }

    #[test]
    fn duplicates_in_all_three_tables_do_not_multiply() {
        let (merged, report) = merge(
            &[
                rec(1, 691001, enr(1, 1, 1)),
                rec(1, 691001, enr(1, 1, 1)),
                rec(1, 691001, enr(1, 1, 1)),
            ],
            &[rec(1, 691001, bio(2, 0)), rec(1, 691001, bio(0, 2))],
            &[rec(1, 691001, demo(5, 0)), rec(1, 691001, demo(0, 5))],
        );
        assert_eq!(merged.len(), 1);
        let row = &merged[0];
        assert_eq!((row.age_0_5, row.age_5_17, row.age_18_greater), (3, 3, 3));
        assert_eq!(row.total_enrollment, 9);
        assert_eq!(row.total_biometric_updates, 4);
        assert_eq!(row.total_demographic_updates, 10);
        assert_eq!(report.enrollment.duplicate_rows_collapsed, 2);
        assert_eq!(report.national.enrollments, 9);
    }

    #[test]
    fn biometric_only_key_survives_with_zero_enrollment() {
        let (merged, _) = merge(
            &[rec(1, 691001, enr(1, 0, 0))],
            &[rec(2, 691002, bio(4, 6))],
            &[],
        );
        assert_eq!(merged.len(), 2);
        let only_bio: Vec<_> = merged.iter().filter(|r| r.pincode == 691002).collect();
        assert_eq!(only_bio.len(), 1);
        assert_eq!(only_bio[0].total_enrollment, 0);
        assert_eq!(only_bio[0].age_0_5, 0);
        assert_eq!(only_bio[0].total_updates, 10);
        assert_eq!(only_bio[0].ue_ratio, 0.0);
    }

    #[test]
    fn same_pincode_on_different_dates_stays_separate() {
        let (merged, report) = merge(
            &[rec(1, 691001, enr(1, 0, 0)), rec(2, 691001, enr(1, 0, 0))],
            &[],
            &[rec(2, 691001, demo(3, 0))],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(report.rows_after_first_join, 2);
        assert_eq!(report.enrollment.duplicate_rows_collapsed, 0);
    }

    #[test]
    fn undated_rows_are_excluded_and_counted() {
        let mut undated = rec(1, 691001, enr(9, 9, 9));
        undated.date = None;
        let (merged, report) = merge(&[rec(1, 691001, enr(1, 0, 0)), undated], &[], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total_enrollment, 1);
        assert_eq!(report.null_date_rows_excluded(), 1);
    }

    #[test]
    fn reference_cross_check_flags_each_metric() {
        let national = NationalTotals {
            enrollments: 5_435_484,
            biometric_updates: 69_763_095,
            demographic_updates: 49_295_285,
            total_updates: 119_058_380,
            ue_ratio: 21.9041,
        };
        let reference = ReferenceConfig {
            totals: Some(ReferenceTotals::release_2025()),
            ..ReferenceConfig::default()
        };
        let checks = cross_check(&national, &reference);
        let passed: Vec<bool> = checks.iter().map(|c| c.passed).collect();
        assert_eq!(passed, vec![true, true, true, true, true]);

        let inflated = NationalTotals {
            enrollments: 5_435_484 * 2,
            ..national
        };
        let checks = cross_check(&inflated, &reference);
        assert!(!checks[0].passed);
        assert!(checks[1].passed);
    }

    #[test]
    fn no_reference_means_no_checks() {
        let (merged, report) = merge(&[rec(1, 691001, enr(1, 0, 0))], &[], &[]);
        assert_eq!(merged.len(), 1);
        assert!(cross_check(&report.national, &ReferenceConfig::default()).is_empty());
    }
}
