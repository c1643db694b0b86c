//! Date parsing and geography canonicalization for one record-type table.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::canonical::{canonicalize, is_canonical_state, NameKind};
use crate::types::{Measures, Record, RecordKind};
use crate::util::{format_int, parse_date_safe, pct};

const NULL_DATE_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
}

/// How densely the parsed dates cover their own calendar span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCoverage {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub unique_dates: usize,
    pub expected_days: i64,
    pub coverage_pct: f64,
    pub cadence: Cadence,
}

impl DateCoverage {
    fn from_dates<'a>(dates: impl Iterator<Item = &'a NaiveDate>) -> Option<Self> {
        let unique: BTreeSet<&NaiveDate> = dates.collect();
        let first = **unique.first()?;
        let last = **unique.last()?;
        let expected_days = (last - first).num_days() + 1;
        let coverage_pct = pct(unique.len() as u64, expected_days as u64);
        let cadence = if coverage_pct < 20.0 {
            Cadence::Monthly
        } else if coverage_pct < 50.0 {
            Cadence::Weekly
        } else {
            Cadence::Daily
        };
        Some(DateCoverage {
            first,
            last,
            unique_dates: unique.len(),
            expected_days,
            coverage_pct,
            cadence,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub kind: RecordKind,
    pub rows_in: usize,
    pub rows_out: usize,
    pub null_dates: usize,
    pub null_date_samples: Vec<String>,
    pub invalid_state_rows: usize,
    pub renamed_state_rows: usize,
    pub renamed_district_rows: usize,
    pub states_before: usize,
    pub states_after: usize,
    pub districts_before: usize,
    pub districts_after: usize,
    /// Distinct (state, district) pairs after cleaning.
    pub geographies_after: usize,
    /// Canonical state names outside the 36-value reference set.
    pub unrecognised_states: Vec<String>,
    pub pincodes_multi_district: usize,
    pub pincodes_multi_state: usize,
    pub date_coverage: Option<DateCoverage>,
}

/// Parse dates, canonicalize state then district, drop invalid-state rows.
///
/// No other row is filtered: unparsable dates stay as `None`.
pub fn clean<M: Measures>(records: Vec<Record<M>>) -> (Vec<Record<M>>, CleanReport) {
    let kind = M::KIND;
    let rows_in = records.len();
    let states_before = distinct(records.iter().map(|r| r.state.as_str()));
    let districts_before = distinct(records.iter().map(|r| r.district.as_str()));

    let mut state_cache: HashMap<String, Option<String>> = HashMap::new();
    let mut district_cache: HashMap<(String, String), String> = HashMap::new();
    let mut out = Vec::with_capacity(rows_in);
    let mut null_dates = 0usize;
    let mut null_date_samples = Vec::new();
    let mut invalid_state_rows = 0usize;
    let mut renamed_state_rows = 0usize;
    let mut renamed_district_rows = 0usize;

    for mut rec in records {
        rec.date = parse_date_safe(&rec.raw_date);
        if rec.date.is_none() {
            null_dates += 1;
            if null_date_samples.len() < NULL_DATE_SAMPLES {
                null_date_samples.push(rec.raw_date.clone());
            }
        }

        let state = state_cache
            .entry(rec.state.clone())
            .or_insert_with_key(|raw| canonicalize(raw, NameKind::State))
            .clone();
        let Some(state) = state else {
            invalid_state_rows += 1;
            continue;
        };
        if state != rec.state {
            renamed_state_rows += 1;
        }

        let district = district_cache
            .entry((state.clone(), rec.district.clone()))
            .or_insert_with_key(|(st, raw)| {
                canonicalize(raw, NameKind::District { state: st }).unwrap_or_else(|| raw.clone())
            })
            .clone();
        if district != rec.district {
            renamed_district_rows += 1;
        }

        rec.state = state;
        rec.district = district;
        out.push(rec);
    }

    let unrecognised_states: Vec<String> = out
        .iter()
        .map(|r| r.state.as_str())
        .filter(|s| !is_canonical_state(s))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let (pincodes_multi_district, pincodes_multi_state) = inconsistent_pincodes(&out);

    let report = CleanReport {
        kind,
        rows_in,
        rows_out: out.len(),
        null_dates,
        null_date_samples,
        invalid_state_rows,
        renamed_state_rows,
        renamed_district_rows,
        states_before,
        states_after: distinct(out.iter().map(|r| r.state.as_str())),
        districts_before,
        districts_after: distinct(out.iter().map(|r| r.district.as_str())),
        geographies_after: distinct(out.iter().map(|r| (r.state.as_str(), r.district.as_str()))),
        unrecognised_states,
        pincodes_multi_district,
        pincodes_multi_state,
        date_coverage: DateCoverage::from_dates(out.iter().filter_map(|r| r.date.as_ref())),
    };
    log_report(&report);
    (out, report)
}

fn distinct<T: std::hash::Hash + Eq>(items: impl Iterator<Item = T>) -> usize {
    items.collect::<HashSet<T>>().len()
}

/// Pincodes seen with more than one district, and with more than one state.
fn inconsistent_pincodes<M>(records: &[Record<M>]) -> (usize, usize) {
    let mut geo: HashMap<u32, (HashSet<&str>, HashSet<&str>)> = HashMap::new();
    for r in records {
        let e = geo.entry(r.pincode).or_default();
        e.0.insert(r.district.as_str());
        e.1.insert(r.state.as_str());
    }
    let multi_district = geo.values().filter(|(d, _)| d.len() > 1).count();
    let multi_state = geo.values().filter(|(_, s)| s.len() > 1).count();
    (multi_district, multi_state)
}

fn log_report(r: &CleanReport) {
    let kind = r.kind;
    if r.null_dates > 0 {
        warn!(
            %kind,
            null_dates = r.null_dates,
            samples = ?r.null_date_samples,
            "dates could not be parsed"
        );
    }
    if r.invalid_state_rows > 0 {
        info!(%kind, removed = r.invalid_state_rows, "removed rows with invalid state entries");
    }
    if !r.unrecognised_states.is_empty() {
        warn!(%kind, states = ?r.unrecognised_states, "states outside the reference set");
    }
    if r.pincodes_multi_state > 0 {
        warn!(%kind, pincodes = r.pincodes_multi_state, "pincodes mapping to multiple states");
    }
    debug!(%kind, pincodes = r.pincodes_multi_district, "pincodes mapping to multiple districts");
    info!(
        %kind,
        rows = %format_int(r.rows_out),
        states = %format!("{} -> {}", r.states_before, r.states_after),
        districts = %format!("{} -> {}", r.districts_before, r.districts_after),
        "cleaned"
    );
}
