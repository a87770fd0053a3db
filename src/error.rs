//! Error types for the cytometry-statistics crate.
//!
//! Public functions return `anyhow::Result`; the variants below are the typed failures raised
//! through it and can be recovered with `anyhow::Error::downcast_ref::<AnalysisError>()`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Significance threshold must lie in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("Duplicate sample id '{0}'")]
    DuplicateSample(String),

    #[error("Population '{population}' appears more than once for sample '{sample_id}'")]
    DuplicatePopulation {
        sample_id: String,
        population: String,
    },

    #[error("Cell count references unknown sample '{0}'")]
    UnknownSample(String),

    #[error("Unrecognised response value '{value}' for sample '{sample_id}'")]
    InvalidResponse { sample_id: String, value: String },

    #[error("Baseline summary requires at least one sample")]
    EmptyCohort,

    #[error("Page size must be greater than zero")]
    InvalidPageSize,
}
