use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::{PipelineError, Result};
use crate::types::{Measures, MergedRecord, Record};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write one cleaned record-type table. Dates are ISO, unparsed dates blank.
pub fn write_records<M: Measures>(path: &Path, records: &[Record<M>]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["date", "state", "district", "pincode"];
    header.extend_from_slice(M::COLUMNS);
    wtr.write_record(&header)?;
    for r in records {
        let mut row = vec![
            r.date.map(|d| d.to_string()).unwrap_or_default(),
            r.state.clone(),
            r.district.clone(),
            r.pincode.to_string(),
        ];
        row.extend(r.counts.values().iter().map(u64::to_string));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_merged_csv(path: &Path) -> Result<Vec<MergedRecord>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for r in rdr.deserialize() {
        rows.push(r?);
    }
    Ok(rows)
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BiometricCounts, NaturalKey};
    use chrono::NaiveDate;

    #[test]
    fn merged_csv_roundtrips_the_published_column_names() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("merged_data.csv");
        let row = MergedRecord::derive(
            NaturalKey {
                date: NaiveDate::from_ymd_opt(2025, 9, 1).expect("date"),
                state: "Punjab".into(),
                district: "Ludhiana".into(),
                pincode: 141001,
            },
            None,
            Some(BiometricCounts {
                bio_age_5_17: 4,
                bio_age_17_plus: 6,
            }),
            None,
        );
        write_csv(&path, &[row.clone()]).expect("write");

        let text = std::fs::read_to_string(&path).expect("read");
        let header = text.lines().next().expect("header");
        assert!(header.starts_with("date,state,district,pincode,age_0_5"));
        assert!(header.contains(",bio_age_17_,"));
        assert!(header.ends_with("total_updates,ue_ratio"));

        assert_eq!(read_merged_csv(&path).expect("read back"), vec![row]);
    }

    #[test]
    fn cleaned_records_keep_blank_dates() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("biometric_clean.csv");
        let rec = Record {
            raw_date: "garbage".into(),
            date: None,
            state: "Punjab".into(),
            district: "Ludhiana".into(),
            pincode: 141001,
            counts: BiometricCounts {
                bio_age_5_17: 1,
                bio_age_17_plus: 2,
            },
        };
        write_records(&path, &[rec]).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert_eq!(
            text,
            "date,state,district,pincode,bio_age_5_17,bio_age_17_\n,Punjab,Ludhiana,141001,1,2\n"
        );
    }

    #[test]
    fn missing_merged_csv_is_a_typed_error() {
        let dir = tempfile::tempdir().expect("tmp");
        let err = read_merged_csv(&dir.path().join("nope.csv")).expect_err("missing");
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }
}
