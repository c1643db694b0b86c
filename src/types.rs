use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::{display_2dp, parse_count_field, parse_pincode_safe};

/// The three transaction streams published by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Enrollment,
    Biometric,
    Demographic,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Enrollment => "enrollment",
            RecordKind::Biometric => "biometric",
            RecordKind::Demographic => "demographic",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-age-band counts carried by one record type.
///
/// Implementors are plain non-negative counters; `accumulate` is the only
/// way two observations of the same key are combined.
pub trait Measures: Copy + Default + PartialEq + fmt::Debug {
    const KIND: RecordKind;
    /// Column names as they appear in the raw and cleaned CSV files.
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<u64>;
    fn accumulate(&mut self, other: &Self);

    fn total(&self) -> u64 {
        self.values().iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentCounts {
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
}

impl Measures for EnrollmentCounts {
    const KIND: RecordKind = RecordKind::Enrollment;
    const COLUMNS: &'static [&'static str] = &["age_0_5", "age_5_17", "age_18_greater"];

    fn values(&self) -> Vec<u64> {
        vec![self.age_0_5, self.age_5_17, self.age_18_greater]
    }

    fn accumulate(&mut self, other: &Self) {
        self.age_0_5 += other.age_0_5;
        self.age_5_17 += other.age_5_17;
        self.age_18_greater += other.age_18_greater;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BiometricCounts {
    pub bio_age_5_17: u64,
    pub bio_age_17_plus: u64,
}

impl Measures for BiometricCounts {
    const KIND: RecordKind = RecordKind::Biometric;
    const COLUMNS: &'static [&'static str] = &["bio_age_5_17", "bio_age_17_"];

    fn values(&self) -> Vec<u64> {
        vec![self.bio_age_5_17, self.bio_age_17_plus]
    }

    fn accumulate(&mut self, other: &Self) {
        self.bio_age_5_17 += other.bio_age_5_17;
        self.bio_age_17_plus += other.bio_age_17_plus;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemographicCounts {
    pub demo_age_5_17: u64,
    pub demo_age_17_plus: u64,
}

impl Measures for DemographicCounts {
    const KIND: RecordKind = RecordKind::Demographic;
    const COLUMNS: &'static [&'static str] = &["demo_age_5_17", "demo_age_17_"];

    fn values(&self) -> Vec<u64> {
        vec![self.demo_age_5_17, self.demo_age_17_plus]
    }

    fn accumulate(&mut self, other: &Self) {
        self.demo_age_5_17 += other.demo_age_5_17;
        self.demo_age_17_plus += other.demo_age_17_plus;
    }
}

/// One row of a single record-type table.
///
/// `raw_date` is kept verbatim from the source file; `date` stays `None`
/// until the cleaner parses it, and stays `None` afterwards if parsing fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<M> {
    pub raw_date: String,
    pub date: Option<NaiveDate>,
    pub state: String,
    pub district: String,
    pub pincode: u32,
    pub counts: M,
}

pub type EnrollmentRecord = Record<EnrollmentCounts>;
pub type BiometricRecord = Record<BiometricCounts>;
pub type DemographicRecord = Record<DemographicCounts>;

/// (date, state, district, pincode): identifies one intended observation
/// across all three record types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NaturalKey {
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    pub pincode: u32,
}

/// A deserializable raw CSV row that converts into a typed record.
pub trait RawRow: DeserializeOwned {
    type Counts: Measures;

    /// `None` when the pincode or a count is present but not numeric.
    fn into_record(self) -> Option<Record<Self::Counts>>;
}

fn text(v: Option<String>) -> String {
    v.unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct RawEnrollmentRow {
    pub date: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub age_0_5: Option<String>,
    pub age_5_17: Option<String>,
    pub age_18_greater: Option<String>,
}

impl RawRow for RawEnrollmentRow {
    type Counts = EnrollmentCounts;

    fn into_record(self) -> Option<EnrollmentRecord> {
        Some(Record {
            raw_date: text(self.date),
            date: None,
            state: text(self.state),
            district: text(self.district),
            pincode: parse_pincode_safe(self.pincode.as_deref())?,
            counts: EnrollmentCounts {
                age_0_5: parse_count_field(self.age_0_5.as_deref())?,
                age_5_17: parse_count_field(self.age_5_17.as_deref())?,
                age_18_greater: parse_count_field(self.age_18_greater.as_deref())?,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawBiometricRow {
    pub date: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub bio_age_5_17: Option<String>,
    #[serde(rename = "bio_age_17_", alias = "bio_age_17_plus")]
    pub bio_age_17_plus: Option<String>,
}

impl RawRow for RawBiometricRow {
    type Counts = BiometricCounts;

    fn into_record(self) -> Option<BiometricRecord> {
        Some(Record {
            raw_date: text(self.date),
            date: None,
            state: text(self.state),
            district: text(self.district),
            pincode: parse_pincode_safe(self.pincode.as_deref())?,
            counts: BiometricCounts {
                bio_age_5_17: parse_count_field(self.bio_age_5_17.as_deref())?,
                bio_age_17_plus: parse_count_field(self.bio_age_17_plus.as_deref())?,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawDemographicRow {
    pub date: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub pincode: Option<String>,
    pub demo_age_5_17: Option<String>,
    #[serde(rename = "demo_age_17_", alias = "demo_age_17_plus")]
    pub demo_age_17_plus: Option<String>,
}

impl RawRow for RawDemographicRow {
    type Counts = DemographicCounts;

    fn into_record(self) -> Option<DemographicRecord> {
        Some(Record {
            raw_date: text(self.date),
            date: None,
            state: text(self.state),
            district: text(self.district),
            pincode: parse_pincode_safe(self.pincode.as_deref())?,
            counts: DemographicCounts {
                demo_age_5_17: parse_count_field(self.demo_age_5_17.as_deref())?,
                demo_age_17_plus: parse_count_field(self.demo_age_17_plus.as_deref())?,
            },
        })
    }
}

/// One row of the unified dataset. Every `total_*` column and `ue_ratio` is
/// derived from the seven raw count columns by [`MergedRecord::derive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    pub pincode: u32,
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
    pub bio_age_5_17: u64,
    #[serde(rename = "bio_age_17_")]
    pub bio_age_17_plus: u64,
    pub demo_age_5_17: u64,
    #[serde(rename = "demo_age_17_")]
    pub demo_age_17_plus: u64,
    pub total_enrollment: u64,
    pub total_biometric_updates: u64,
    pub total_demographic_updates: u64,
    pub total_updates: u64,
    pub ue_ratio: f64,
}

impl MergedRecord {
    /// Fill-and-derive: absent sides count as zero, totals come only from
    /// the per-age-band columns.
    pub fn derive(
        key: NaturalKey,
        enrollment: Option<EnrollmentCounts>,
        biometric: Option<BiometricCounts>,
        demographic: Option<DemographicCounts>,
    ) -> Self {
        let e = enrollment.unwrap_or_default();
        let b = biometric.unwrap_or_default();
        let d = demographic.unwrap_or_default();
        let total_enrollment = e.total();
        let total_biometric_updates = b.total();
        let total_demographic_updates = d.total();
        let total_updates = total_biometric_updates + total_demographic_updates;
        MergedRecord {
            date: key.date,
            state: key.state,
            district: key.district,
            pincode: key.pincode,
            age_0_5: e.age_0_5,
            age_5_17: e.age_5_17,
            age_18_greater: e.age_18_greater,
            bio_age_5_17: b.bio_age_5_17,
            bio_age_17_plus: b.bio_age_17_plus,
            demo_age_5_17: d.demo_age_5_17,
            demo_age_17_plus: d.demo_age_17_plus,
            total_enrollment,
            total_biometric_updates,
            total_demographic_updates,
            total_updates,
            ue_ratio: crate::util::safe_ratio(total_updates as f64, total_enrollment as f64),
        }
    }
}

/// Enrollment-versus-update quadrant relative to the district medians.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "Healthy & Growing")]
    HealthyGrowing,
    #[serde(rename = "Saturation/Coverage Gap")]
    CoverageGap,
    #[serde(rename = "New Users Need Engagement")]
    NeedsEngagement,
    #[serde(rename = "Crisis Zone")]
    CrisisZone,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::HealthyGrowing,
        Quadrant::CoverageGap,
        Quadrant::NeedsEngagement,
        Quadrant::CrisisZone,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::HealthyGrowing => "Healthy & Growing",
            Quadrant::CoverageGap => "Saturation/Coverage Gap",
            Quadrant::NeedsEngagement => "New Users Need Engagement",
            Quadrant::CrisisZone => "Crisis Zone",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UeCategory {
    #[serde(rename = "No Enrollment")]
    NoEnrollment,
    Low,
    Normal,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl UeCategory {
    pub fn label(self) -> &'static str {
        match self {
            UeCategory::NoEnrollment => "No Enrollment",
            UeCategory::Low => "Low",
            UeCategory::Normal => "Normal",
            UeCategory::High => "High",
            UeCategory::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for UeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered readiness bins, worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReadinessCategory {
    Critical,
    Low,
    Moderate,
    Good,
}

impl ReadinessCategory {
    pub fn label(self) -> &'static str {
        match self {
            ReadinessCategory::Critical => "Critical",
            ReadinessCategory::Low => "Low",
            ReadinessCategory::Moderate => "Moderate",
            ReadinessCategory::Good => "Good",
        }
    }
}

impl fmt::Display for ReadinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered risk tiers for pincodes with a non-zero composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "0-5")]
    Age0To5,
    #[serde(rename = "5-17")]
    Age5To17,
    #[serde(rename = "18+")]
    Age18Plus,
}

impl AgeBand {
    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Age0To5 => "0-5",
            AgeBand::Age5To17 => "5-17",
            AgeBand::Age18Plus => "18+",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn display_band(band: &Option<AgeBand>) -> String {
    band.map(|b| b.label().to_string()).unwrap_or_default()
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DistrictCoverage {
    pub state: String,
    pub district: String,
    #[tabled(skip)]
    pub age_0_5: u64,
    #[tabled(skip)]
    pub age_5_17: u64,
    #[tabled(skip)]
    pub age_18_greater: u64,
    #[tabled(skip)]
    pub bio_age_5_17: u64,
    #[tabled(skip)]
    #[serde(rename = "bio_age_17_")]
    pub bio_age_17_plus: u64,
    pub total_enrollment: u64,
    pub total_updates: u64,
    #[tabled(display_with = "display_2dp")]
    pub ue_ratio: f64,
    #[tabled(skip)]
    pub enrollment_velocity: f64,
    #[tabled(skip)]
    pub update_velocity: f64,
    #[tabled(skip)]
    pub child_0_5_pct: f64,
    #[tabled(skip)]
    pub child_5_17_pct: f64,
    #[tabled(display_with = "display_2dp")]
    pub child_total_pct: f64,
    #[tabled(skip)]
    pub low_child_enrollment: bool,
    #[tabled(skip)]
    pub very_high_child_enrollment: bool,
    #[tabled(skip)]
    pub ue_category: UeCategory,
    pub quadrant: Quadrant,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct StateCoverage {
    pub state: String,
    pub districts: usize,
    pub total_enrollment: u64,
    pub total_updates: u64,
    #[tabled(display_with = "display_2dp")]
    pub ue_ratio: f64,
    #[tabled(display_with = "display_2dp")]
    pub child_total_pct: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CoverageSummary {
    #[serde(rename = "Total Districts Analyzed")]
    pub total_districts: usize,
    #[serde(rename = "Coverage Gap Districts")]
    pub coverage_gap_districts: usize,
    #[serde(rename = "Low Child Enrollment Districts")]
    pub low_child_districts: usize,
    #[serde(rename = "Very High Child Enrollment Districts")]
    pub very_high_child_districts: usize,
    #[serde(rename = "Crisis Zone Districts")]
    pub crisis_zone_districts: usize,
    #[serde(rename = "Top 10 Crisis Zone Districts")]
    pub top_crisis_districts: usize,
    #[serde(rename = "Median Enrollment")]
    pub median_enrollment: f64,
    #[serde(rename = "Median Updates")]
    pub median_updates: f64,
    #[serde(rename = "National Child Enrollment Pct")]
    pub national_child_pct: f64,
    #[serde(rename = "Average UE Ratio")]
    pub average_ue_ratio: f64,
    #[serde(rename = "Median UE Ratio")]
    pub median_ue_ratio: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DistrictReadiness {
    pub state: String,
    pub district: String,
    pub bio_age_5_17: u64,
    #[serde(rename = "bio_age_17_")]
    pub bio_age_17_plus: u64,
    #[tabled(skip)]
    pub total_bio_updates: u64,
    #[tabled(skip)]
    pub age_0_5: u64,
    #[tabled(skip)]
    pub age_5_17: u64,
    #[tabled(skip)]
    pub age_18_greater: u64,
    #[tabled(skip)]
    pub total_enrollment: u64,
    #[tabled(display_with = "display_2dp")]
    pub readiness_score: f64,
    pub readiness_category: ReadinessCategory,
    #[tabled(skip)]
    pub readiness_gap: f64,
    pub estimated_at_risk_youth: u64,
    #[tabled(skip)]
    pub high_risk: bool,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct StateReadiness {
    pub state: String,
    pub bio_age_5_17: u64,
    #[serde(rename = "bio_age_17_")]
    pub bio_age_17_plus: u64,
    pub total_bio_updates: u64,
    pub age_5_17: u64,
    #[tabled(display_with = "display_2dp")]
    pub readiness_score: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ReadinessSummary {
    #[serde(rename = "Total Districts Analyzed")]
    pub total_districts: usize,
    #[serde(rename = "Critical Readiness Districts")]
    pub critical_districts: usize,
    #[serde(rename = "Low Readiness Districts")]
    pub low_districts: usize,
    #[serde(rename = "All At-Risk Districts (Low+Critical)")]
    pub at_risk_districts: usize,
    #[serde(rename = "High Risk Districts")]
    pub high_risk_districts: usize,
    #[serde(rename = "Average Readiness Score")]
    pub average_readiness: f64,
    #[serde(rename = "Median Readiness Score")]
    pub median_readiness: f64,
    #[serde(rename = "National Youth Bio Update Pct")]
    pub national_youth_bio_pct: f64,
    #[serde(rename = "Total Estimated At-Risk Youth")]
    pub total_at_risk_youth: u64,
}

/// Pincode rollup with every integrity flag evaluated.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PincodeProfile {
    pub pincode: u32,
    pub state: String,
    pub district: String,
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
    pub total_enrollment: u64,
    pub total_biometric_updates: u64,
    pub total_demographic_updates: u64,
    pub total_updates: u64,
    pub ue_ratio: f64,
    pub ue_zscore: f64,
    pub extreme_ratio: bool,
    pub high_ratio: bool,
    pub statistical_outlier: bool,
    pub concentrated_band: Option<AgeBand>,
    pub concentration_pct: f64,
    pub spike_dates: usize,
    pub frequent_spike: bool,
    pub risk_score: u32,
}

impl PincodeProfile {
    pub fn age_concentration(&self) -> bool {
        self.concentrated_band.is_some()
    }
}

/// A pincode with a non-zero composite score and its tier.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct AnomalousPincode {
    pub pincode: u32,
    pub state: String,
    pub district: String,
    pub total_enrollment: u64,
    pub total_updates: u64,
    #[tabled(display_with = "display_2dp")]
    pub ue_ratio: f64,
    #[tabled(skip)]
    pub ue_zscore: f64,
    #[tabled(skip)]
    pub has_extreme_ue: bool,
    #[tabled(skip)]
    pub has_high_ue: bool,
    #[tabled(skip)]
    pub has_zscore_outlier: bool,
    #[tabled(skip)]
    pub has_age_anomaly: bool,
    #[tabled(display_with = "display_band")]
    pub concentrated_band: Option<AgeBand>,
    #[tabled(skip)]
    pub concentration_pct: f64,
    #[tabled(skip)]
    pub spike_dates: usize,
    #[tabled(skip)]
    pub has_temporal_spike: bool,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
}

impl AnomalousPincode {
    pub fn from_profile(p: &PincodeProfile, risk_level: RiskLevel) -> Self {
        AnomalousPincode {
            pincode: p.pincode,
            state: p.state.clone(),
            district: p.district.clone(),
            total_enrollment: p.total_enrollment,
            total_updates: p.total_updates,
            ue_ratio: p.ue_ratio,
            ue_zscore: p.ue_zscore,
            has_extreme_ue: p.extreme_ratio,
            has_high_ue: p.high_ratio,
            has_zscore_outlier: p.statistical_outlier,
            has_age_anomaly: p.age_concentration(),
            concentrated_band: p.concentrated_band,
            concentration_pct: p.concentration_pct,
            spike_dates: p.spike_dates,
            has_temporal_spike: p.frequent_spike,
            risk_score: p.risk_score,
            risk_level,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DistrictAnomalies {
    pub state: String,
    pub district: String,
    pub anomaly_count: usize,
    pub clustered: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IntegritySummary {
    #[serde(rename = "Total Pincodes Analyzed")]
    pub total_pincodes: usize,
    #[serde(rename = "Anomalous Pincodes")]
    pub anomalous_pincodes: usize,
    #[serde(rename = "Extreme UE Pincodes")]
    pub extreme_ratio: usize,
    #[serde(rename = "High UE Pincodes")]
    pub high_ratio: usize,
    #[serde(rename = "Z-Score Outliers")]
    pub statistical_outliers: usize,
    #[serde(rename = "Age Concentration Pincodes")]
    pub age_concentration: usize,
    #[serde(rename = "Frequent Spike Pincodes")]
    pub frequent_spikes: usize,
    #[serde(rename = "Critical Risk (All)")]
    pub critical: usize,
    #[serde(rename = "Critical Risk (Top 10)")]
    pub top_critical: usize,
    #[serde(rename = "High Risk")]
    pub high: usize,
    #[serde(rename = "Medium Risk")]
    pub medium: usize,
    #[serde(rename = "Low Risk")]
    pub low: usize,
    #[serde(rename = "Districts with Clustering")]
    pub clustered_districts: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ReferenceCheck {
    pub metric: String,
    #[tabled(display_with = "display_2dp")]
    pub actual: f64,
    #[tabled(display_with = "display_2dp")]
    pub expected: f64,
    #[tabled(display_with = "display_2dp")]
    pub difference: f64,
    pub passed: bool,
}
