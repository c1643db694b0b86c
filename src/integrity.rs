//! Dimension 3: pincode-level integrity flags and composite risk scoring.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::config::{IntegrityConfig, RiskTiers};
use crate::types::{
    AgeBand, AnomalousPincode, DistrictAnomalies, IntegritySummary, MergedRecord,
    PincodeProfile, RiskLevel,
};
use crate::util::{median, safe_ratio, z_scores};

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityAnalysis {
    /// Every pincode with its flags, in pincode order.
    pub pincodes: Vec<PincodeProfile>,
    /// Pincodes with a non-zero score, highest first.
    pub anomalies: Vec<AnomalousPincode>,
    pub critical: Vec<AnomalousPincode>,
    pub top_critical: Vec<AnomalousPincode>,
    pub high: Vec<AnomalousPincode>,
    /// Anomalous-pincode counts per district, largest first.
    pub districts: Vec<DistrictAnomalies>,
    pub summary: IntegritySummary,
}

#[derive(Default)]
struct Acc<'a> {
    state: &'a str,
    district: &'a str,
    age_0_5: u64,
    age_5_17: u64,
    age_18_greater: u64,
    bio: u64,
    demo: u64,
    /// Per-date (enrollment, biometric updates).
    by_date: BTreeMap<NaiveDate, (u64, u64)>,
}

/// Map a composite score to its tier. Zero scores have no tier.
///
/// Upper bounds are inclusive and clamped to be non-decreasing.
pub fn risk_level(score: u32, tiers: &RiskTiers) -> Option<RiskLevel> {
    let low = tiers.low_max;
    let medium = tiers.medium_max.max(low);
    let high = tiers.high_max.max(medium);
    match score {
        0 => None,
        s if s <= low => Some(RiskLevel::Low),
        s if s <= medium => Some(RiskLevel::Medium),
        s if s <= high => Some(RiskLevel::High),
        _ => Some(RiskLevel::Critical),
    }
}

/// Band holding more than `share` of `total`, if `total` clears `min_total`.
fn concentrated_band(
    bands: [(AgeBand, u64); 3],
    min_total: u64,
    share: f64,
) -> Option<(AgeBand, f64)> {
    let total: u64 = bands.iter().map(|(_, n)| n).sum();
    if total <= min_total {
        return None;
    }
    bands
        .into_iter()
        .map(|(band, n)| (band, safe_ratio(n as f64, total as f64)))
        .find(|(_, s)| *s > share)
        .map(|(band, s)| (band, s * 100.0))
}

/// Distinct dates on which enrollment or biometric updates spiked above the
/// pincode's own median.
fn spike_dates(by_date: &BTreeMap<NaiveDate, (u64, u64)>, cfg: &IntegrityConfig) -> usize {
    let base_enr = median(by_date.values().map(|(e, _)| *e as f64).collect());
    let base_bio = median(by_date.values().map(|(_, b)| *b as f64).collect());
    by_date
        .values()
        .filter(|(e, b)| {
            let enr_spike = *e as f64 > base_enr * cfg.spike_multiplier
                && *e > cfg.spike_min_enrollment;
            let bio_spike =
                *b as f64 > base_bio * cfg.spike_multiplier && *b > cfg.spike_min_updates;
            enr_spike || bio_spike
        })
        .count()
}

pub fn analyze_integrity(merged: &[MergedRecord], cfg: &IntegrityConfig) -> IntegrityAnalysis {
    let mut by_pincode: BTreeMap<u32, Acc> = BTreeMap::new();
    for r in merged {
        let e = by_pincode.entry(r.pincode).or_insert_with(|| Acc {
            state: &r.state,
            district: &r.district,
            ..Acc::default()
        });
        e.age_0_5 += r.age_0_5;
        e.age_5_17 += r.age_5_17;
        e.age_18_greater += r.age_18_greater;
        e.bio += r.total_biometric_updates;
        e.demo += r.total_demographic_updates;
        let day = e.by_date.entry(r.date).or_default();
        day.0 += r.total_enrollment;
        day.1 += r.total_biometric_updates;
    }

    let ratios: Vec<f64> = by_pincode
        .values()
        .map(|a| {
            let enrollment = a.age_0_5 + a.age_5_17 + a.age_18_greater;
            safe_ratio((a.bio + a.demo) as f64, enrollment as f64)
        })
        .collect();
    let zs = z_scores(&ratios);
    let w = &cfg.weights;

    let pincodes: Vec<PincodeProfile> = by_pincode
        .iter()
        .zip(ratios.iter().zip(&zs))
        .map(|((&pincode, a), (&ue_ratio, &ue_zscore))| {
            let total_enrollment = a.age_0_5 + a.age_5_17 + a.age_18_greater;
            let extreme_ratio = ue_ratio > cfg.extreme_ue_ratio;
            let high_ratio = ue_ratio > cfg.anomaly_ue_ratio
                && total_enrollment > cfg.high_ratio_min_enrollment;
            let statistical_outlier = ue_zscore.abs() > cfg.z_score_threshold;
            let concentration = concentrated_band(
                [
                    (AgeBand::Age0To5, a.age_0_5),
                    (AgeBand::Age5To17, a.age_5_17),
                    (AgeBand::Age18Plus, a.age_18_greater),
                ],
                cfg.age_concentration_min_total,
                cfg.age_concentration_share,
            );
            let spikes = spike_dates(&a.by_date, cfg);
            let frequent_spike = spikes > cfg.frequent_spike_min_dates;

            let mut risk_score = 0;
            if extreme_ratio {
                risk_score += w.extreme_ratio;
            }
            if high_ratio {
                risk_score += w.high_ratio;
            }
            if statistical_outlier {
                risk_score += w.statistical_outlier;
            }
            if concentration.is_some() {
                risk_score += w.age_concentration;
            }
            if frequent_spike {
                risk_score += w.frequent_spike;
            }

            PincodeProfile {
                pincode,
                state: a.state.to_string(),
                district: a.district.to_string(),
                age_0_5: a.age_0_5,
                age_5_17: a.age_5_17,
                age_18_greater: a.age_18_greater,
                total_enrollment,
                total_biometric_updates: a.bio,
                total_demographic_updates: a.demo,
                total_updates: a.bio + a.demo,
                ue_ratio,
                ue_zscore,
                extreme_ratio,
                high_ratio,
                statistical_outlier,
                concentrated_band: concentration.map(|(b, _)| b),
                concentration_pct: concentration.map(|(_, p)| p).unwrap_or(0.0),
                spike_dates: spikes,
                frequent_spike,
                risk_score,
            }
        })
        .collect();

    let mut anomalies: Vec<AnomalousPincode> = pincodes
        .iter()
        .filter_map(|p| {
            risk_level(p.risk_score, &cfg.tiers).map(|lvl| AnomalousPincode::from_profile(p, lvl))
        })
        .collect();
    anomalies.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

    let tier = |lvl: RiskLevel| -> Vec<AnomalousPincode> {
        anomalies
            .iter()
            .filter(|a| a.risk_level == lvl)
            .cloned()
            .collect()
    };
    let critical = tier(RiskLevel::Critical);
    let high = tier(RiskLevel::High);
    let top_critical: Vec<AnomalousPincode> = critical.iter().take(cfg.top_n).cloned().collect();
    let districts = district_counts(&anomalies, cfg.cluster_min_anomalies);

    let count = |f: fn(&PincodeProfile) -> bool| pincodes.iter().filter(|p| f(p)).count();
    let summary = IntegritySummary {
        total_pincodes: pincodes.len(),
        anomalous_pincodes: anomalies.len(),
        extreme_ratio: count(|p| p.extreme_ratio),
        high_ratio: count(|p| p.high_ratio),
        statistical_outliers: count(|p| p.statistical_outlier),
        age_concentration: count(|p| p.age_concentration()),
        frequent_spikes: count(|p| p.frequent_spike),
        critical: critical.len(),
        top_critical: top_critical.len(),
        high: high.len(),
        medium: tier(RiskLevel::Medium).len(),
        low: tier(RiskLevel::Low).len(),
        clustered_districts: districts.iter().filter(|d| d.clustered).count(),
    };

    debug!(
        extreme = summary.extreme_ratio,
        high = summary.high_ratio,
        zscore = summary.statistical_outliers,
        age = summary.age_concentration,
        spikes = summary.frequent_spikes,
        "integrity flags"
    );
    info!(
        pincodes = summary.total_pincodes,
        anomalous = summary.anomalous_pincodes,
        critical = summary.critical,
        high = summary.high,
        clustered_districts = summary.clustered_districts,
        "integrity analysis"
    );

    IntegrityAnalysis {
        pincodes,
        anomalies,
        critical,
        top_critical,
        high,
        districts,
        summary,
    }
}

fn district_counts(anomalies: &[AnomalousPincode], cluster_min: usize) -> Vec<DistrictAnomalies> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for a in anomalies {
        *counts
            .entry((a.state.as_str(), a.district.as_str()))
            .or_default() += 1;
    }
    let mut out: Vec<DistrictAnomalies> = counts
        .into_iter()
        .map(|((state, district), n)| DistrictAnomalies {
            state: state.to_string(),
            district: district.to_string(),
            anomaly_count: n,
            clustered: n >= cluster_min,
        })
        .collect();
    out.sort_by(|a, b| {
        b.anomaly_count
            .cmp(&a.anomaly_count)
            .then_with(|| a.state.cmp(&b.state))
            .then_with(|| a.district.cmp(&b.district))
    });
    out
}
