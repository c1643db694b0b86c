// Utility helpers for parsing and basic statistics.
//
// All the forgiving CSV handling (counts, pincodes, mixed-format dates) lives
// here so the stages can assume typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a non-negative integer count.
///
/// - Trims whitespace and strips thousands separators.
/// - Accepts integral floats such as `"12.0"` (spreadsheet exports).
/// - Returns `None` for blanks, negatives, fractions and text.
pub fn parse_count_safe(s: Option<&str>) -> Option<u64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
        Some(f as u64)
    } else {
        None
    }
}

/// Count column of a raw row: a blank cell is zero, anything non-numeric is
/// rejected.
pub fn parse_count_field(s: Option<&str>) -> Option<u64> {
    match s.map(str::trim) {
        None | Some("") => Some(0),
        Some(v) => parse_count_safe(Some(v)),
    }
}

pub fn parse_pincode_safe(s: Option<&str>) -> Option<u32> {
    let v = parse_count_safe(s)?;
    u32::try_from(v).ok().filter(|p| *p > 0)
}

/// Parse a date written as `DD-MM-YY`, `DD-MM-YYYY` or ISO `YYYY-MM-DD`.
///
/// `/` is accepted as a separator and a trailing time component is ignored.
/// The year width decides the format, so `01-03-25` is 2025 and never year 25.
pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let s = s.split([' ', 'T']).next()?;
    if s.is_empty() {
        return None;
    }
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let normalized = parts.join("-");
    match (parts[0].len(), parts[2].len()) {
        (4, 1..=2) => NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok(),
        (1..=2, 4) => NaiveDate::parse_from_str(&normalized, "%d-%m-%Y").ok(),
        (1..=2, 2) => NaiveDate::parse_from_str(&normalized, "%d-%m-%y").ok(),
        _ => None,
    }
}

/// `num / den`, or 0 when the denominator is zero.
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    let r = num / den;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Percentage share, guarded like [`safe_ratio`].
pub fn pct(part: u64, whole: u64) -> f64 {
    safe_ratio(part as f64, whole as f64) * 100.0
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(mut v: Vec<f64>) -> f64 {
    // Takes the vector by value so it can sort in place.
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        (v[mid - 1] + v[mid]) / 2.0
    }
}

/// Population standard deviation (ddof = 0).
pub fn population_std(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean = average(v);
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64;
    var.sqrt()
}

/// Population z-scores. A constant series scores 0 everywhere.
pub fn z_scores(v: &[f64]) -> Vec<f64> {
    let mean = average(v);
    let std = population_std(v);
    v.iter()
        .map(|x| if std > 0.0 { (x - mean) / std } else { 0.0 })
        .collect()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `en` thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Two-decimal rendering for console tables.
pub fn display_2dp(v: &f64) -> String {
    format_number(*v, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_in_all_accepted_formats_parse_to_the_same_day() {
        let want = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(parse_date_safe("01-03-25"), want);
        assert_eq!(parse_date_safe("01-03-2025"), want);
        assert_eq!(parse_date_safe("2025-03-01"), want);
        assert_eq!(parse_date_safe("1/3/2025"), want);
        assert_eq!(parse_date_safe("2025-03-01 00:00:00"), want);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        for raw in ["", "  ", "31-02-2025", "not a date", "2025-13-01", "01-03", "001-03-2025"] {
            assert_eq!(parse_date_safe(raw), None, "{raw:?} should not parse");
        }
    }

    #[test]
    fn counts_accept_separators_and_integral_floats() {
        assert_eq!(parse_count_safe(Some(" 1,204 ")), Some(1204));
        assert_eq!(parse_count_safe(Some("12.0")), Some(12));
        assert_eq!(parse_count_safe(Some("12.5")), None);
        assert_eq!(parse_count_safe(Some("-3")), None);
        assert_eq!(parse_count_safe(Some("abc")), None);
        assert_eq!(parse_count_field(Some("")), Some(0));
        assert_eq!(parse_count_field(None), Some(0));
        assert_eq!(parse_count_field(Some("x")), None);
    }

    #[test]
    fn pincodes_must_be_positive_integers() {
        assert_eq!(parse_pincode_safe(Some("110001")), Some(110001));
        assert_eq!(parse_pincode_safe(Some("110001.0")), Some(110001));
        assert_eq!(parse_pincode_safe(Some("0")), None);
        assert_eq!(parse_pincode_safe(None), None);
    }

    #[test]
    fn ratios_never_produce_nan_or_infinity() {
        assert_eq!(safe_ratio(5.0, 0.0), 0.0);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
        assert_eq!(pct(3, 0), 0.0);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(vec![]), 0.0);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn z_scores_use_population_deviation() {
        let z = z_scores(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        // mean 5, population std 2
        assert!((z[0] + 1.5).abs() < 1e-12);
        assert!((z[7] - 2.0).abs() < 1e-12);
        assert!(z_scores(&[3.0, 3.0]).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn numbers_get_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_int(5_435_484u64), "5,435,484");
    }
}
