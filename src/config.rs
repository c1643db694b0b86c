//! Run configuration.
//!
//! Every analyzer threshold is a named field with a documented default. The
//! struct is built once (defaults, optionally overlaid by a TOML file) and
//! passed by reference into each stage; nothing reads global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::RecordKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub files: FilesConfig,
    pub coverage: CoverageConfig,
    pub readiness: ReadinessConfig,
    pub integrity: IntegrityConfig,
    pub reference: ReferenceConfig,
}

impl Config {
    pub fn load_from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the partitioned raw CSV files.
    pub raw_dir: PathBuf,
    /// Cleaned per-type CSVs and the merged CSV.
    pub processed_dir: PathBuf,
    /// Analyzer tables and summary-statistics CSVs.
    pub tables_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            tables_dir: PathBuf::from("outputs/tables"),
        }
    }
}

impl PathsConfig {
    pub fn merged_csv(&self) -> PathBuf {
        self.processed_dir.join("merged_data.csv")
    }

    pub fn cleaned_csv(&self, kind: RecordKind) -> PathBuf {
        self.processed_dir.join(format!("{}_clean.csv", kind.label()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub enrollment: Vec<String>,
    pub biometric: Vec<String>,
    pub demographic: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        let names = |stem: &str, bounds: &[u32]| -> Vec<String> {
            bounds
                .windows(2)
                .map(|w| format!("api_data_aadhar_{stem}_{}_{}.csv", w[0], w[1]))
                .collect()
        };
        Self {
            enrollment: names("enrolment", &[0, 500_000, 1_000_000, 1_006_029]),
            biometric: names("biometric", &[0, 500_000, 1_000_000, 1_500_000, 1_861_108]),
            demographic: names(
                "demographic",
                &[0, 500_000, 1_000_000, 1_500_000, 2_000_000, 2_071_700],
            ),
        }
    }
}

impl FilesConfig {
    pub fn for_kind(&self, kind: RecordKind) -> &[String] {
        match kind {
            RecordKind::Enrollment => &self.enrollment,
            RecordKind::Biometric => &self.biometric,
            RecordKind::Demographic => &self.demographic,
        }
    }
}

/// Dimension 1 thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Districts whose child (0-17) share of enrollments is below this
    /// percentage are flagged `low_child_enrollment`.
    pub low_child_pct: f64,
    /// Districts above this percentage are flagged `very_high_child_enrollment`.
    pub high_child_pct: f64,
    /// Divisor for the per-month velocity columns.
    pub analysis_months: u32,
    /// Upper edge of the `Low` UE category.
    pub low_ue_ratio: f64,
    /// Upper edge of the `Normal` UE category.
    pub national_ue_ratio: f64,
    /// Upper edge of the `High` UE category; above it is `Very High`.
    pub high_ue_ratio: f64,
    /// Length of the top-N crisis-zone list.
    pub top_n: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            low_child_pct: 80.0,
            high_child_pct: 98.0,
            analysis_months: 12,
            low_ue_ratio: 10.0,
            national_ue_ratio: 21.90,
            high_ue_ratio: 30.0,
            top_n: 10,
        }
    }
}

/// Dimension 2 thresholds, in readiness-score percent.
///
/// Scores below `critical` are Critical (and high-risk), below `moderate`
/// Low, below `good` Moderate, otherwise Good. Every bin is closed on the
/// left, so a score of exactly `critical` is Low and exactly `good` is Good.
/// Equal thresholds remove the bin between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub critical: f64,
    pub moderate: f64,
    pub good: f64,
    pub top_n: usize,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            critical: 10.0,
            moderate: 15.0,
            good: 30.0,
            top_n: 10,
        }
    }
}

/// Dimension 3 thresholds and risk weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// UE ratio strictly above this sets the extreme-ratio flag.
    pub extreme_ue_ratio: f64,
    /// UE ratio strictly above this (with enough volume) sets the high-ratio flag.
    pub anomaly_ue_ratio: f64,
    /// Minimum total enrollment (exclusive) for the high-ratio flag.
    pub high_ratio_min_enrollment: u64,
    /// |z| strictly above this sets the statistical-outlier flag.
    pub z_score_threshold: f64,
    /// Share (0..1) of enrollments in one age band that sets the
    /// age-concentration flag.
    pub age_concentration_share: f64,
    /// Minimum total enrollment (exclusive) before age shares are evaluated.
    pub age_concentration_min_total: u64,
    /// A date spikes when its total exceeds this multiple of the pincode median.
    pub spike_multiplier: f64,
    /// Minimum per-date enrollment (exclusive) for an enrollment spike.
    pub spike_min_enrollment: u64,
    /// Minimum per-date biometric updates (exclusive) for an update spike.
    pub spike_min_updates: u64,
    /// A pincode spiking on more than this many distinct dates is frequent-spike.
    pub frequent_spike_min_dates: usize,
    pub weights: RiskWeights,
    pub tiers: RiskTiers,
    /// Districts with at least this many anomalous pincodes are clustering candidates.
    pub cluster_min_anomalies: usize,
    pub top_n: usize,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            extreme_ue_ratio: 100.0,
            anomaly_ue_ratio: 40.0,
            high_ratio_min_enrollment: 100,
            z_score_threshold: 3.0,
            age_concentration_share: 0.80,
            age_concentration_min_total: 100,
            spike_multiplier: 3.0,
            spike_min_enrollment: 50,
            spike_min_updates: 100,
            frequent_spike_min_dates: 3,
            weights: RiskWeights::default(),
            tiers: RiskTiers::default(),
            cluster_min_anomalies: 3,
            top_n: 10,
        }
    }
}

/// Points each flag adds to the composite risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub extreme_ratio: u32,
    pub high_ratio: u32,
    /// Z-score outliers are reported but do not score by default.
    pub statistical_outlier: u32,
    pub age_concentration: u32,
    pub frequent_spike: u32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            extreme_ratio: 5,
            high_ratio: 3,
            statistical_outlier: 0,
            age_concentration: 2,
            frequent_spike: 2,
        }
    }
}

/// Inclusive upper score bounds of the Low, Medium and High tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTiers {
    pub low_max: u32,
    pub medium_max: u32,
    pub high_max: u32,
}

impl Default for RiskTiers {
    fn default() -> Self {
        Self {
            low_max: 2,
            medium_max: 5,
            high_max: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Externally verified national totals; no cross-check when absent.
    pub totals: Option<ReferenceTotals>,
    pub count_tolerance: f64,
    pub ratio_tolerance: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            totals: None,
            count_tolerance: 100.0,
            ratio_tolerance: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTotals {
    pub enrollments: u64,
    pub biometric_updates: u64,
    pub demographic_updates: u64,
    pub total_updates: u64,
    pub ue_ratio: f64,
}

impl ReferenceTotals {
    /// Ground truth for the 2025 calendar-year release.
    pub fn release_2025() -> Self {
        Self {
            enrollments: 5_435_484,
            biometric_updates: 69_763_095,
            demographic_updates: 49_295_185,
            total_updates: 119_058_280,
            ue_ratio: 21.90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_lists_match_the_partitioned_release() {
        let files = FilesConfig::default();
        assert_eq!(files.enrollment.len(), 3);
        assert_eq!(files.biometric.len(), 4);
        assert_eq!(files.demographic.len(), 5);
        assert_eq!(files.enrollment[2], "api_data_aadhar_enrolment_1000000_1006029.csv");
        assert_eq!(files.demographic[0], "api_data_aadhar_demographic_0_500000.csv");
    }

    #[test]
    fn partial_toml_overlays_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [readiness]
            moderate = 10.0

            [integrity.weights]
            statistical_outlier = 1
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.readiness.moderate, 10.0);
        assert_eq!(cfg.readiness.good, 30.0);
        assert_eq!(cfg.integrity.weights.statistical_outlier, 1);
        assert_eq!(cfg.integrity.weights.extreme_ratio, 5);
        assert_eq!(cfg.coverage, CoverageConfig::default());
    }

    #[test]
    fn config_survives_a_save_and_load() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.reference.totals = Some(ReferenceTotals::release_2025());
        cfg.save_to_file(&path).expect("save");
        assert_eq!(Config::load_from_file(&path).expect("load"), cfg);
    }
}
