//! Sample metadata, raw cell counts and the read interface to the store that owns them.
//!
//! The analysis code never talks to a database directly. It receives a [`DataStore`] handle and
//! asks it for three tables: all cell counts, the samples matching a [`SampleFilter`], and the
//! response flag of every sample. [`MemoryStore`] is an in-memory implementation that can be
//! loaded from the wide cell-count CSV layout.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod memory;

pub use memory::MemoryStore;

/// Population labels recorded per sample by the cytometry panel.
pub const POPULATIONS: [&str; 5] = ["b_cell", "cd8_t_cell", "cd4_t_cell", "nk_cell", "monocyte"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub sample_id: String,
    pub project: String,
    pub subject: String,
    pub condition: String,
    pub age: u32,
    pub sex: String,
    pub treatment: String,
    /// Treatment response, canonicalised to a boolean when the store is loaded
    pub response: bool,
    pub sample_type: String,
    /// Days since treatment start, 0 is the baseline visit
    pub time_from_treatment_start: i64,
}

/// One population count of one sample. A missing population label is allowed by the store
/// and is carried through the frequency table, but never reaches the responder comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCount {
    pub sample_id: String,
    pub population: Option<String>,
    pub count: u64,
}

impl CellCount {
    pub fn new(sample_id: impl Into<String>, population: impl Into<String>, count: u64) -> Self {
        CellCount {
            sample_id: sample_id.into(),
            population: Some(population.into()),
            count,
        }
    }

    pub fn unlabelled(sample_id: impl Into<String>, count: u64) -> Self {
        CellCount {
            sample_id: sample_id.into(),
            population: None,
            count,
        }
    }
}

/// Equality filter over sample metadata. `None` fields match everything; string comparison is
/// exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleFilter {
    pub condition: Option<String>,
    pub treatment: Option<String>,
    pub sample_type: Option<String>,
    pub time_point: Option<i64>,
}

impl SampleFilter {
    /// A filter that matches every sample
    pub fn all() -> Self {
        SampleFilter::default()
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_treatment(mut self, treatment: impl Into<String>) -> Self {
        self.treatment = Some(treatment.into());
        self
    }

    pub fn with_sample_type(mut self, sample_type: impl Into<String>) -> Self {
        self.sample_type = Some(sample_type.into());
        self
    }

    pub fn with_time_point(mut self, time_point: i64) -> Self {
        self.time_point = Some(time_point);
        self
    }

    pub fn matches(&self, sample: &Sample) -> bool {
        self.condition.as_deref().is_none_or(|c| c == sample.condition)
            && self.treatment.as_deref().is_none_or(|t| t == sample.treatment)
            && self
                .sample_type
                .as_deref()
                .is_none_or(|s| s == sample.sample_type)
            && self
                .time_point
                .is_none_or(|t| t == sample.time_from_treatment_start)
    }
}

/// Read interface the analysis functions require from the persistence layer.
///
/// Implementations must return a consistent snapshot: a loader is expected to have finished
/// writing before any of these methods are called.
pub trait DataStore: Send + Sync {
    /// Every cell count row whose sample exists in the store
    fn fetch_counts(&self) -> anyhow::Result<Vec<CellCount>>;

    /// Samples matching all supplied filter fields, in sample id order
    fn fetch_samples(&self, filter: &SampleFilter) -> anyhow::Result<Vec<Sample>>;

    /// Response flag keyed by sample id
    fn fetch_sample_responses(&self) -> anyhow::Result<HashMap<String, bool>>;
}

impl<S: DataStore + ?Sized> DataStore for &S {
    fn fetch_counts(&self) -> anyhow::Result<Vec<CellCount>> {
        (**self).fetch_counts()
    }

    fn fetch_samples(&self, filter: &SampleFilter) -> anyhow::Result<Vec<Sample>> {
        (**self).fetch_samples(filter)
    }

    fn fetch_sample_responses(&self) -> anyhow::Result<HashMap<String, bool>> {
        (**self).fetch_sample_responses()
    }
}
