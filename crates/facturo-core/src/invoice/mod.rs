//! Invoice field extraction module.

mod assembler;
pub mod rules;

pub use assembler::{ExtractionReport, MetadataAssembler};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
