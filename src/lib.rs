//! # cytometry-statistics
//!
//! Statistical analysis of flow-cytometry cell-population counts.
//!
//! The crate turns raw per-sample population counts into relative frequencies, compares
//! treatment responders with non-responders population by population using the Mann-Whitney U
//! test, and summarises baseline cohorts by project, response and sex.
//!
//! ## Core Features
//!
//! - **Relative frequencies**: percentage of each population within its sample
//! - **Cohort selection**: exact-match filters over condition, treatment, sample type and time point
//! - **Responder comparison**: two-sided Mann-Whitney U per population with optional
//!   multiple testing correction
//! - **Baseline summary**: samples per project, subjects per response and per sex
//!
//! ## Quick Start
//!
//! ```rust
//! use cytometry_statistics::prelude::*;
//!
//! let csv = "\
//! project,subject,condition,age,sex,treatment,response,sample,sample_type,time_from_treatment_start,b_cell,cd8_t_cell,cd4_t_cell,nk_cell,monocyte
//! prj1,sbj1,melanoma,57,M,miraclib,yes,s1,PBMC,0,100,50,50,50,50
//! ";
//! let store = MemoryStore::from_csv_reader(csv.as_bytes()).unwrap();
//! let params = AnalysisParams::default();
//!
//! let frequencies = relative_frequencies(&store).unwrap();
//! assert_eq!(frequencies.len(), 5);
//!
//! let report = baseline_summary(&store, &params).unwrap();
//! assert_eq!(report.summary().unwrap().num_samples(), 1);
//! ```
//!
//! ## Module Organization
//!
//! - **[`data`]**: Sample and count types, the [`data::DataStore`] read interface, an in-memory store
//! - **[`frequency`]**: Relative frequency computation
//! - **[`cohort`]**: Responder and baseline cohort filters
//! - **[`testing`]**: Mann-Whitney U, multiple testing correction, per-population significance
//! - **[`baseline`]**: Baseline cohort tabulations
//! - **[`analysis`]**: Query functions with default parameters

pub mod analysis;
pub mod baseline;
pub mod cohort;
pub mod data;
pub mod error;
pub mod frequency;
pub mod testing;

pub use error::AnalysisError;

pub mod prelude {
    pub use crate::analysis::{
        AnalysisParams, BaselineReport, baseline_summary, relative_frequencies,
        responder_frequencies, significant_populations,
    };
    pub use crate::baseline::{BaselineSummary, GroupCount};
    pub use crate::cohort::{BaselineCohort, CohortSpec, ResponderTable};
    pub use crate::data::{CellCount, DataStore, MemoryStore, Sample, SampleFilter};
    pub use crate::error::AnalysisError;
    pub use crate::frequency::{FrequencyRecord, FrequencyTable};
    pub use crate::testing::correction::Correction;
    pub use crate::testing::significance::{
        PopulationTest, SignificanceConfig, SignificanceRecord,
    };
    pub use crate::testing::{Alternative, MannWhitneyMethod};
}
