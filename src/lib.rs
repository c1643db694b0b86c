//! Aadhaar transaction-log gap analysis.
//!
//! Raw enrollment, biometric-update and demographic-update CSV extracts are
//! cleaned against canonical geography tables, deduplicated on their natural
//! key, outer-joined into one table, and analyzed along three dimensions:
//! district coverage, youth biometric readiness and pincode integrity.

pub mod canonical;
pub mod cleaner;
pub mod config;
pub mod coverage;
pub mod error;
pub mod integrity;
pub mod loader;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod readiness;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::{PipelineError, Result};
