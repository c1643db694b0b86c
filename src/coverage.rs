//! Dimension 1: district coverage, the enrollment/update quadrant and child
//! enrollment shares.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::CoverageConfig;
use crate::types::{
    CoverageSummary, DistrictCoverage, MergedRecord, Quadrant, StateCoverage, UeCategory,
};
use crate::util::{average, median, pct, safe_ratio};

#[derive(Debug, Clone, Serialize)]
pub struct CoverageAnalysis {
    /// One row per (state, district), in key order.
    pub districts: Vec<DistrictCoverage>,
    /// States by UE ratio, highest first.
    pub states: Vec<StateCoverage>,
    pub coverage_gap: Vec<DistrictCoverage>,
    pub low_child: Vec<DistrictCoverage>,
    pub crisis_zone: Vec<DistrictCoverage>,
    pub top_crisis: Vec<DistrictCoverage>,
    pub median_enrollment: f64,
    pub median_updates: f64,
    pub summary: CoverageSummary,
}

#[derive(Default)]
struct Acc {
    age_0_5: u64,
    age_5_17: u64,
    age_18_greater: u64,
    bio_age_5_17: u64,
    bio_age_17_plus: u64,
    total_enrollment: u64,
    total_updates: u64,
}

impl Acc {
    fn add(&mut self, r: &MergedRecord) {
        self.age_0_5 += r.age_0_5;
        self.age_5_17 += r.age_5_17;
        self.age_18_greater += r.age_18_greater;
        self.bio_age_5_17 += r.bio_age_5_17;
        self.bio_age_17_plus += r.bio_age_17_plus;
        self.total_enrollment += r.total_enrollment;
        self.total_updates += r.total_updates;
    }
}

/// Place a district relative to the enrollment and update medians.
///
/// Values equal to a median count as high.
pub fn classify_quadrant(
    enrollment: u64,
    updates: u64,
    median_enrollment: f64,
    median_updates: f64,
) -> Quadrant {
    let high_enroll = enrollment as f64 >= median_enrollment;
    let high_update = updates as f64 >= median_updates;
    match (high_enroll, high_update) {
        (true, true) => Quadrant::HealthyGrowing,
        (false, true) => Quadrant::CoverageGap,
        (true, false) => Quadrant::NeedsEngagement,
        (false, false) => Quadrant::CrisisZone,
    }
}

/// Right-closed UE bins `(0, low] (low, national] (national, high] (high, inf)`.
pub fn ue_category(ratio: f64, cfg: &CoverageConfig) -> UeCategory {
    if ratio <= 0.0 {
        UeCategory::NoEnrollment
    } else if ratio <= cfg.low_ue_ratio {
        UeCategory::Low
    } else if ratio <= cfg.national_ue_ratio {
        UeCategory::Normal
    } else if ratio <= cfg.high_ue_ratio {
        UeCategory::High
    } else {
        UeCategory::VeryHigh
    }
}

pub fn analyze_coverage(merged: &[MergedRecord], cfg: &CoverageConfig) -> CoverageAnalysis {
    let mut by_district: BTreeMap<(&str, &str), Acc> = BTreeMap::new();
    for r in merged {
        by_district
            .entry((r.state.as_str(), r.district.as_str()))
            .or_default()
            .add(r);
    }

    let median_enrollment = median(
        by_district
            .values()
            .map(|a| a.total_enrollment as f64)
            .collect(),
    );
    let median_updates = median(by_district.values().map(|a| a.total_updates as f64).collect());
    let months = f64::from(cfg.analysis_months.max(1));

    let districts: Vec<DistrictCoverage> = by_district
        .iter()
        .map(|(&(state, district), a)| {
            let ue_ratio = safe_ratio(a.total_updates as f64, a.total_enrollment as f64);
            let child_total_pct = pct(a.age_0_5 + a.age_5_17, a.total_enrollment);
            DistrictCoverage {
                state: state.to_string(),
                district: district.to_string(),
                age_0_5: a.age_0_5,
                age_5_17: a.age_5_17,
                age_18_greater: a.age_18_greater,
                bio_age_5_17: a.bio_age_5_17,
                bio_age_17_plus: a.bio_age_17_plus,
                total_enrollment: a.total_enrollment,
                total_updates: a.total_updates,
                ue_ratio,
                enrollment_velocity: a.total_enrollment as f64 / months,
                update_velocity: a.total_updates as f64 / months,
                child_0_5_pct: pct(a.age_0_5, a.total_enrollment),
                child_5_17_pct: pct(a.age_5_17, a.total_enrollment),
                child_total_pct,
                low_child_enrollment: child_total_pct < cfg.low_child_pct,
                very_high_child_enrollment: child_total_pct > cfg.high_child_pct,
                ue_category: ue_category(ue_ratio, cfg),
                quadrant: classify_quadrant(
                    a.total_enrollment,
                    a.total_updates,
                    median_enrollment,
                    median_updates,
                ),
            }
        })
        .collect();

    let states = state_rollup(&districts);

    let mut coverage_gap = in_quadrant(&districts, Quadrant::CoverageGap);
    coverage_gap.sort_by(|a, b| b.ue_ratio.partial_cmp(&a.ue_ratio).unwrap_or(Ordering::Equal));

    let mut low_child: Vec<DistrictCoverage> = districts
        .iter()
        .filter(|d| d.low_child_enrollment)
        .cloned()
        .collect();
    low_child.sort_by(|a, b| {
        a.child_total_pct
            .partial_cmp(&b.child_total_pct)
            .unwrap_or(Ordering::Equal)
    });

    let mut crisis_zone = in_quadrant(&districts, Quadrant::CrisisZone);
    crisis_zone.sort_by_key(|d| d.total_enrollment);
    let top_crisis: Vec<DistrictCoverage> = crisis_zone.iter().take(cfg.top_n).cloned().collect();

    let national_enrollment: u64 = districts.iter().map(|d| d.total_enrollment).sum();
    let national_child: u64 = districts.iter().map(|d| d.age_0_5 + d.age_5_17).sum();
    let ratios: Vec<f64> = districts.iter().map(|d| d.ue_ratio).collect();
    let summary = CoverageSummary {
        total_districts: districts.len(),
        coverage_gap_districts: coverage_gap.len(),
        low_child_districts: low_child.len(),
        very_high_child_districts: districts
            .iter()
            .filter(|d| d.very_high_child_enrollment)
            .count(),
        crisis_zone_districts: crisis_zone.len(),
        top_crisis_districts: top_crisis.len(),
        median_enrollment,
        median_updates,
        national_child_pct: pct(national_child, national_enrollment),
        average_ue_ratio: average(&ratios),
        median_ue_ratio: median(ratios),
    };

    for q in Quadrant::ALL {
        let n = districts.iter().filter(|d| d.quadrant == q).count();
        info!(quadrant = %q, districts = n, "quadrant");
    }
    info!(
        districts = summary.total_districts,
        coverage_gap = summary.coverage_gap_districts,
        low_child = summary.low_child_districts,
        crisis_zone = summary.crisis_zone_districts,
        national_child_pct = %format!("{:.1}", summary.national_child_pct),
        "coverage analysis"
    );

    CoverageAnalysis {
        districts,
        states,
        coverage_gap,
        low_child,
        crisis_zone,
        top_crisis,
        median_enrollment,
        median_updates,
        summary,
    }
}

fn in_quadrant(districts: &[DistrictCoverage], q: Quadrant) -> Vec<DistrictCoverage> {
    districts.iter().filter(|d| d.quadrant == q).cloned().collect()
}

/// Ratios are recomputed from state sums, never averaged over districts.
fn state_rollup(districts: &[DistrictCoverage]) -> Vec<StateCoverage> {
    #[derive(Default)]
    struct StateAcc {
        districts: usize,
        children: u64,
        total_enrollment: u64,
        total_updates: u64,
    }
    let mut by_state: BTreeMap<&str, StateAcc> = BTreeMap::new();
    for d in districts {
        let e = by_state.entry(d.state.as_str()).or_default();
        e.districts += 1;
        e.children += d.age_0_5 + d.age_5_17;
        e.total_enrollment += d.total_enrollment;
        e.total_updates += d.total_updates;
    }
    let mut states: Vec<StateCoverage> = by_state
        .into_iter()
        .map(|(state, a)| StateCoverage {
            state: state.to_string(),
            districts: a.districts,
            total_enrollment: a.total_enrollment,
            total_updates: a.total_updates,
            ue_ratio: safe_ratio(a.total_updates as f64, a.total_enrollment as f64),
            child_total_pct: pct(a.children, a.total_enrollment),
        })
        .collect();
    states.sort_by(|a, b| b.ue_ratio.partial_cmp(&a.ue_ratio).unwrap_or(Ordering::Equal));
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BiometricCounts, DemographicCounts, EnrollmentCounts, NaturalKey};
    use chrono::NaiveDate;

    fn row(district: &str, pincode: u32, enr: [u64; 3], bio: [u64; 2]) -> MergedRecord {
        MergedRecord::derive(
            NaturalKey {
                date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"),
                state: "Bihar".into(),
                district: district.into(),
                pincode,
            },
            Some(EnrollmentCounts {
                age_0_5: enr[0],
                age_5_17: enr[1],
                age_18_greater: enr[2],
            }),
            Some(BiometricCounts {
                bio_age_5_17: bio[0],
                bio_age_17_plus: bio[1],
            }),
            Some(DemographicCounts::default()),
        )
    }

    #[test]
    fn child_share_comes_from_summed_totals() {
        let merged = vec![
            row("Gaya", 823001, [10, 0, 90], [0, 0]),
            row("Gaya", 823002, [0, 0, 5], [0, 0]),
        ];
        let out = analyze_coverage(&merged, &CoverageConfig::default());
        let gaya = &out.districts[0];
        assert_eq!(gaya.total_enrollment, 105);
        assert!((gaya.child_total_pct - 1000.0 / 105.0).abs() < 1e-9);
        assert!((gaya.child_total_pct - 5.0).abs() > 1.0);
        assert!(gaya.low_child_enrollment);
    }

    #[test]
    fn quadrants_follow_both_medians() {
        // enrollment median 25, update median 20
        let merged = vec![
            row("A", 1, [10, 0, 0], [10, 0]),
            row("B", 2, [20, 0, 0], [40, 0]),
            row("C", 3, [30, 0, 0], [5, 0]),
            row("D", 4, [40, 0, 0], [30, 0]),
        ];
        let out = analyze_coverage(&merged, &CoverageConfig::default());
        let got: Vec<Quadrant> = out.districts.iter().map(|d| d.quadrant).collect();
        assert_eq!(
            got,
            vec![
                Quadrant::CrisisZone,
                Quadrant::CoverageGap,
                Quadrant::NeedsEngagement,
                Quadrant::HealthyGrowing,
            ]
        );
        assert_eq!(out.median_enrollment, 25.0);
        assert_eq!(out.median_updates, 20.0);
        assert_eq!(out.summary.crisis_zone_districts, 1);
        assert_eq!(out.top_crisis[0].district, "A");
    }

    #[test]
    fn ties_at_the_median_fall_on_the_high_side() {
        assert_eq!(classify_quadrant(25, 20, 25.0, 20.0), Quadrant::HealthyGrowing);
        assert_eq!(classify_quadrant(24, 20, 25.0, 20.0), Quadrant::CoverageGap);
        assert_eq!(classify_quadrant(25, 19, 25.0, 20.0), Quadrant::NeedsEngagement);
        assert_eq!(classify_quadrant(0, 0, 0.0, 0.0), Quadrant::HealthyGrowing);
    }

    #[test]
    fn every_pair_gets_exactly_one_quadrant() {
        for e in 0..6u64 {
            for u in 0..6u64 {
                let q = classify_quadrant(e, u, 2.5, 3.0);
                let hits = Quadrant::ALL.iter().filter(|x| **x == q).count();
                assert_eq!(hits, 1);
                assert_eq!(q == Quadrant::HealthyGrowing, e >= 3 && u >= 3);
                assert_eq!(q == Quadrant::CrisisZone, e < 3 && u < 3);
            }
        }
    }

    #[test]
    fn ue_bins_are_right_closed() {
        let cfg = CoverageConfig::default();
        assert_eq!(ue_category(0.0, &cfg), UeCategory::NoEnrollment);
        assert_eq!(ue_category(10.0, &cfg), UeCategory::Low);
        assert_eq!(ue_category(10.01, &cfg), UeCategory::Normal);
        assert_eq!(ue_category(21.90, &cfg), UeCategory::Normal);
        assert_eq!(ue_category(30.0, &cfg), UeCategory::High);
        assert_eq!(ue_category(30.5, &cfg), UeCategory::VeryHigh);
    }

    #[test]
    fn zero_enrollment_district_has_zero_ratio_not_nan() {
        let merged = vec![row("Nalanda", 803101, [0, 0, 0], [7, 3])];
        let out = analyze_coverage(&merged, &CoverageConfig::default());
        let d = &out.districts[0];
        assert_eq!(d.ue_ratio, 0.0);
        assert_eq!(d.child_total_pct, 0.0);
        assert_eq!(d.ue_category, UeCategory::NoEnrollment);
        assert_eq!(out.states[0].ue_ratio, 0.0);
    }

    #[test]
    fn state_ratio_uses_state_sums() {
        let merged = vec![
            row("Gaya", 823001, [1, 0, 0], [10, 0]),
            row("Patna", 800001, [99, 0, 1], [100, 0]),
        ];
        let out = analyze_coverage(&merged, &CoverageConfig::default());
        assert_eq!(out.states.len(), 1);
        assert_eq!(out.states[0].districts, 2);
        assert!((out.states[0].ue_ratio - 110.0 / 101.0).abs() < 1e-12);
        // district mean would be (10 + 1) / 2
        assert!((out.summary.average_ue_ratio - 5.5).abs() < 1e-12);
    }
}
