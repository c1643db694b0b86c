//! Dimension 2: youth biometric-update readiness per district.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::ReadinessConfig;
use crate::types::{
    DistrictReadiness, MergedRecord, ReadinessCategory, ReadinessSummary, StateReadiness,
};
use crate::util::{average, median, pct};

/// Left-closed readiness bins built from the configured thresholds.
///
/// Thresholds are clamped to be non-decreasing, and a bin whose lower and
/// upper edges coincide is dropped, so misconfigured thresholds yield fewer
/// categories instead of an empty or inverted one.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessBands {
    /// (exclusive upper edge, category) for every bin below `Good`.
    upper: Vec<(f64, ReadinessCategory)>,
}

impl ReadinessBands {
    pub fn new(cfg: &ReadinessConfig) -> Self {
        let critical = cfg.critical;
        let moderate = cfg.moderate.max(critical);
        let good = cfg.good.max(moderate);
        let edges = [
            (f64::NEG_INFINITY, critical, ReadinessCategory::Critical),
            (critical, moderate, ReadinessCategory::Low),
            (moderate, good, ReadinessCategory::Moderate),
        ];
        let upper = edges
            .into_iter()
            .filter(|(lo, hi, _)| hi > lo)
            .map(|(_, hi, cat)| (hi, cat))
            .collect();
        ReadinessBands { upper }
    }

    pub fn classify(&self, score: f64) -> ReadinessCategory {
        self.upper
            .iter()
            .find(|(hi, _)| score < *hi)
            .map(|(_, cat)| *cat)
            .unwrap_or(ReadinessCategory::Good)
    }

    /// Categories that can actually be produced, worst first.
    pub fn categories(&self) -> Vec<ReadinessCategory> {
        let mut cats: Vec<ReadinessCategory> = self.upper.iter().map(|(_, c)| *c).collect();
        cats.push(ReadinessCategory::Good);
        cats
    }

    pub fn has(&self, cat: ReadinessCategory) -> bool {
        self.categories().contains(&cat)
    }

    /// The tier just above Critical: Low, or Moderate when Low has collapsed.
    pub fn second_tier(&self) -> ReadinessCategory {
        if self.has(ReadinessCategory::Low) {
            ReadinessCategory::Low
        } else {
            ReadinessCategory::Moderate
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessAnalysis {
    pub districts: Vec<DistrictReadiness>,
    /// States by readiness, best first.
    pub states: Vec<StateReadiness>,
    pub high_risk: Vec<DistrictReadiness>,
    pub critical: Vec<DistrictReadiness>,
    pub second_tier_category: ReadinessCategory,
    /// Districts in [`ReadinessAnalysis::second_tier_category`].
    pub second_tier: Vec<DistrictReadiness>,
    pub at_risk: Vec<DistrictReadiness>,
    pub top_at_risk: Vec<DistrictReadiness>,
    pub summary: ReadinessSummary,
}

#[derive(Default)]
struct Acc {
    bio_age_5_17: u64,
    bio_age_17_plus: u64,
    age_0_5: u64,
    age_5_17: u64,
    age_18_greater: u64,
}

/// Share of biometric updates made by 5-17 year olds, in percent.
pub fn readiness_score(bio_age_5_17: u64, bio_age_17_plus: u64) -> f64 {
    pct(bio_age_5_17, bio_age_5_17 + bio_age_17_plus)
}

pub fn analyze_readiness(merged: &[MergedRecord], cfg: &ReadinessConfig) -> ReadinessAnalysis {
    let bands = ReadinessBands::new(cfg);
    if bands.categories().len() < 4 {
        warn!(categories = ?bands.categories(), "readiness thresholds overlap, bins collapsed");
    }

    let mut by_district: BTreeMap<(&str, &str), Acc> = BTreeMap::new();
    for r in merged {
        let e = by_district
            .entry((r.state.as_str(), r.district.as_str()))
            .or_default();
        e.bio_age_5_17 += r.bio_age_5_17;
        e.bio_age_17_plus += r.bio_age_17_plus;
        e.age_0_5 += r.age_0_5;
        e.age_5_17 += r.age_5_17;
        e.age_18_greater += r.age_18_greater;
    }

    let scores: Vec<f64> = by_district
        .values()
        .map(|a| readiness_score(a.bio_age_5_17, a.bio_age_17_plus))
        .collect();
    let national_median = median(scores.clone());

    let districts: Vec<DistrictReadiness> = by_district
        .iter()
        .zip(&scores)
        .map(|(((state, district), a), &score)| {
            let gap = (national_median - score).max(0.0);
            DistrictReadiness {
                state: state.to_string(),
                district: district.to_string(),
                bio_age_5_17: a.bio_age_5_17,
                bio_age_17_plus: a.bio_age_17_plus,
                total_bio_updates: a.bio_age_5_17 + a.bio_age_17_plus,
                age_0_5: a.age_0_5,
                age_5_17: a.age_5_17,
                age_18_greater: a.age_18_greater,
                total_enrollment: a.age_0_5 + a.age_5_17 + a.age_18_greater,
                readiness_score: score,
                readiness_category: bands.classify(score),
                readiness_gap: gap,
                estimated_at_risk_youth: (a.age_5_17 as f64 * gap / 100.0).round_ties_even()
                    as u64,
                high_risk: score < cfg.critical,
            }
        })
        .collect();

    let second_tier_category = bands.second_tier();
    let high_risk = by_at_risk(&districts, |d| d.high_risk);
    let critical = by_at_risk(&districts, |d| {
        d.readiness_category == ReadinessCategory::Critical
    });
    let second_tier = by_at_risk(&districts, |d| d.readiness_category == second_tier_category);
    let at_risk = by_at_risk(&districts, |d| {
        d.readiness_category == ReadinessCategory::Critical
            || d.readiness_category == second_tier_category
    });
    let top_at_risk: Vec<DistrictReadiness> = at_risk.iter().take(cfg.top_n).cloned().collect();

    let youth_bio: u64 = districts.iter().map(|d| d.bio_age_5_17).sum();
    let adult_bio: u64 = districts.iter().map(|d| d.bio_age_17_plus).sum();
    let summary = ReadinessSummary {
        total_districts: districts.len(),
        critical_districts: critical.len(),
        low_districts: second_tier.len(),
        at_risk_districts: at_risk.len(),
        high_risk_districts: high_risk.len(),
        average_readiness: average(&scores),
        median_readiness: national_median,
        national_youth_bio_pct: readiness_score(youth_bio, adult_bio),
        total_at_risk_youth: districts.iter().map(|d| d.estimated_at_risk_youth).sum(),
    };

    for cat in bands.categories() {
        let n = districts
            .iter()
            .filter(|d| d.readiness_category == cat)
            .count();
        info!(category = %cat, districts = n, "readiness");
    }
    info!(
        districts = summary.total_districts,
        high_risk = summary.high_risk_districts,
        median = %format!("{:.2}", summary.median_readiness),
        at_risk_youth = summary.total_at_risk_youth,
        "readiness analysis"
    );

    ReadinessAnalysis {
        states: state_ranking(&districts),
        districts,
        high_risk,
        critical,
        second_tier_category,
        second_tier,
        at_risk,
        top_at_risk,
        summary,
    }
}

/// Matching districts, most estimated at-risk youth first.
fn by_at_risk(
    districts: &[DistrictReadiness],
    pred: impl Fn(&DistrictReadiness) -> bool,
) -> Vec<DistrictReadiness> {
    let mut v: Vec<DistrictReadiness> = districts.iter().filter(|d| pred(d)).cloned().collect();
    v.sort_by(|a, b| b.estimated_at_risk_youth.cmp(&a.estimated_at_risk_youth));
    v
}

fn state_ranking(districts: &[DistrictReadiness]) -> Vec<StateReadiness> {
    let mut by_state: BTreeMap<&str, (u64, u64, u64)> = BTreeMap::new();
    for d in districts {
        let e = by_state.entry(d.state.as_str()).or_default();
        e.0 += d.bio_age_5_17;
        e.1 += d.bio_age_17_plus;
        e.2 += d.age_5_17;
    }
    let mut states: Vec<StateReadiness> = by_state
        .into_iter()
        .map(|(state, (youth, adult, age_5_17))| StateReadiness {
            state: state.to_string(),
            bio_age_5_17: youth,
            bio_age_17_plus: adult,
            total_bio_updates: youth + adult,
            age_5_17,
            readiness_score: readiness_score(youth, adult),
        })
        .collect();
    states.sort_by(|a, b| {
        b.readiness_score
            .partial_cmp(&a.readiness_score)
            .unwrap_or(Ordering::Equal)
    });
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BiometricCounts, EnrollmentCounts, NaturalKey};
    use chrono::NaiveDate;

    fn row(state: &str, district: &str, youth_enr: u64, bio: [u64; 2]) -> MergedRecord {
        MergedRecord::derive(
            NaturalKey {
                date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"),
                state: state.into(),
                district: district.into(),
                pincode: 500001,
            },
            Some(EnrollmentCounts {
                age_0_5: 0,
                age_5_17: youth_enr,
                age_18_greater: 0,
            }),
            Some(BiometricCounts {
                bio_age_5_17: bio[0],
                bio_age_17_plus: bio[1],
            }),
            None,
        )
    }

    #[test]
    fn default_bands_are_left_closed() {
        let bands = ReadinessBands::new(&ReadinessConfig::default());
        assert_eq!(bands.categories().len(), 4);
        assert_eq!(bands.classify(0.0), ReadinessCategory::Critical);
        assert_eq!(bands.classify(9.99), ReadinessCategory::Critical);
        assert_eq!(bands.classify(10.0), ReadinessCategory::Low);
        assert_eq!(bands.classify(15.0), ReadinessCategory::Moderate);
        assert_eq!(bands.classify(30.0), ReadinessCategory::Good);
        assert_eq!(bands.classify(100.0), ReadinessCategory::Good);
    }

    #[test]
    fn equal_thresholds_collapse_to_three_categories() {
        let cfg = ReadinessConfig {
            critical: 10.0,
            moderate: 10.0,
            ..ReadinessConfig::default()
        };
        let bands = ReadinessBands::new(&cfg);
        assert_eq!(
            bands.categories(),
            vec![
                ReadinessCategory::Critical,
                ReadinessCategory::Moderate,
                ReadinessCategory::Good
            ]
        );
        for score in [0.0, 5.0, 10.0, 12.0, 29.9, 30.0, 100.0] {
            assert_ne!(bands.classify(score), ReadinessCategory::Low);
        }
        assert_eq!(bands.classify(10.0), ReadinessCategory::Moderate);
        assert_eq!(bands.second_tier(), ReadinessCategory::Moderate);
    }

    #[test]
    fn inverted_thresholds_do_not_panic_or_invert_bins() {
        let cfg = ReadinessConfig {
            critical: 20.0,
            moderate: 5.0,
            good: 1.0,
            top_n: 3,
        };
        let bands = ReadinessBands::new(&cfg);
        assert_eq!(
            bands.categories(),
            vec![ReadinessCategory::Critical, ReadinessCategory::Good]
        );
        assert_eq!(bands.classify(19.0), ReadinessCategory::Critical);
        assert_eq!(bands.classify(20.0), ReadinessCategory::Good);
    }

    #[test]
    fn gap_and_at_risk_youth_follow_the_median() {
        // scores: 5, 20, 40 -> median 20
        let merged = vec![
            row("Telangana", "Adilabad", 1000, [5, 95]),
            row("Telangana", "Karimnagar", 300, [20, 80]),
            row("Telangana", "Warangal", 50, [40, 60]),
        ];
        let out = analyze_readiness(&merged, &ReadinessConfig::default());
        assert_eq!(out.summary.median_readiness, 20.0);
        let adilabad = &out.districts[0];
        assert_eq!(adilabad.readiness_score, 5.0);
        assert_eq!(adilabad.readiness_gap, 15.0);
        assert_eq!(adilabad.estimated_at_risk_youth, 150);
        assert!(adilabad.high_risk);
        assert_eq!(out.districts[2].readiness_gap, 0.0);
        assert_eq!(out.districts[2].estimated_at_risk_youth, 0);
        assert_eq!(out.high_risk.len(), 1);
        assert_eq!(out.summary.total_at_risk_youth, 150);
        assert_eq!(out.summary.national_youth_bio_pct, 65.0 / 300.0 * 100.0);
    }

    #[test]
    fn district_without_bio_updates_scores_zero_and_is_critical() {
        let merged = vec![row("Goa", "North Goa", 10, [0, 0])];
        let out = analyze_readiness(&merged, &ReadinessConfig::default());
        assert_eq!(out.districts[0].readiness_score, 0.0);
        assert_eq!(
            out.districts[0].readiness_category,
            ReadinessCategory::Critical
        );
    }

    #[test]
    fn at_risk_list_is_sorted_by_estimated_youth() {
        // scores 5 and 8 are critical, 50 and 60 are good; median 29
        let merged = vec![
            row("Assam", "Barpeta", 100, [5, 95]),
            row("Assam", "Cachar", 1000, [8, 92]),
            row("Assam", "Dhubri", 10, [50, 50]),
            row("Assam", "Goalpara", 10, [60, 40]),
        ];
        let out = analyze_readiness(&merged, &ReadinessConfig::default());
        let order: Vec<&str> = out.at_risk.iter().map(|d| d.district.as_str()).collect();
        assert_eq!(order, vec!["Cachar", "Barpeta"]);
        assert_eq!(out.second_tier_category, ReadinessCategory::Low);
        assert!(out.second_tier.is_empty());
        assert_eq!(out.states[0].state, "Assam");
    }
}
