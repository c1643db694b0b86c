//! Error taxonomy for the pipeline.
//!
//! Only conditions that stop a stage are errors. Missing files, unparsable
//! dates, invalid states and duplicate keys are counted in the per-stage
//! reports instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::RecordKind;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no {kind} files could be loaded")]
    NoFilesLoaded { kind: RecordKind },

    #[error("required input not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("could not serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
