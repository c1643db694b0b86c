use crate::error::{PipelineError, Result};
use crate::types::{Measures, RawRow, Record, RecordKind};
use csv::ReaderBuilder;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Loaded,
    Missing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileLoad {
    pub file: String,
    pub status: FileStatus,
    pub rows: usize,
    pub columns: usize,
    pub skipped_rows: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub kind: RecordKind,
    pub files: Vec<FileLoad>,
    pub total_rows: usize,
    pub skipped_rows: usize,
}

impl LoadReport {
    pub fn files_loaded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Loaded)
            .count()
    }

    /// True when at least one listed file was missing or unreadable.
    pub fn is_partial(&self) -> bool {
        self.files_loaded() < self.files.len()
    }
}

/// Read every listed file from `dir` and concatenate the rows in file order.
///
/// Missing or unreadable files are logged and skipped; rows that do not
/// deserialize or carry non-numeric counts are skipped and counted. Fails
/// only when no file could be loaded.
pub fn load<R: RawRow>(
    files: &[String],
    dir: &Path,
) -> Result<(Vec<Record<R::Counts>>, LoadReport)> {
    let kind = <R::Counts as Measures>::KIND;
    info!(%kind, files = files.len(), dir = %dir.display(), "loading");

    let mut records = Vec::new();
    let mut report = LoadReport {
        kind,
        files: Vec::with_capacity(files.len()),
        total_rows: 0,
        skipped_rows: 0,
    };

    for (idx, name) in files.iter().enumerate() {
        let path = dir.join(name);
        if !path.exists() {
            warn!(%kind, file = %name, "file not found, skipping");
            report.files.push(FileLoad {
                file: name.clone(),
                status: FileStatus::Missing,
                rows: 0,
                columns: 0,
                skipped_rows: 0,
                error: None,
            });
            continue;
        }
        match read_file::<R>(&path) {
            Ok((mut rows, columns, skipped)) => {
                info!(
                    %kind,
                    file = %name,
                    part = idx + 1,
                    of = files.len(),
                    rows = rows.len(),
                    columns,
                    skipped,
                    "loaded file"
                );
                if skipped > 0 {
                    warn!(%kind, file = %name, skipped, "rows skipped due to parse errors");
                }
                report.total_rows += rows.len();
                report.skipped_rows += skipped;
                report.files.push(FileLoad {
                    file: name.clone(),
                    status: FileStatus::Loaded,
                    rows: rows.len(),
                    columns,
                    skipped_rows: skipped,
                    error: None,
                });
                records.append(&mut rows);
            }
            Err(e) => {
                warn!(%kind, file = %name, error = %e, "could not read file, skipping");
                report.files.push(FileLoad {
                    file: name.clone(),
                    status: FileStatus::Failed,
                    rows: 0,
                    columns: 0,
                    skipped_rows: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if report.files_loaded() == 0 {
        return Err(PipelineError::NoFilesLoaded { kind });
    }
    info!(
        %kind,
        files_loaded = report.files_loaded(),
        total_rows = report.total_rows,
        "combined files"
    );
    Ok((records, report))
}

fn read_file<R: RawRow>(path: &Path) -> Result<(Vec<Record<R::Counts>>, usize, usize)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = rdr.headers()?.len();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<R>() {
        match result.ok().and_then(R::into_record) {
            Some(r) => rows.push(r),
            None => skipped += 1,
        }
    }
    Ok((rows, columns, skipped))
}
