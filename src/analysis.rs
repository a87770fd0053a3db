//! Query functions for presentation layers.
//!
//! Each function takes the store handle explicitly, reads what it needs, and returns freshly
//! computed tables. Nothing is cached between calls and the store is never written.

use crate::baseline::{BaselineSummary, summarize_baseline};
use crate::cohort::{BaselineCohort, CohortSpec, ResponderTable, baseline_cohort, responder_cohort};
use crate::data::{DataStore, Sample};
use crate::frequency::{FrequencyTable, compute_relative_frequencies};
use crate::testing::MannWhitneyMethod;
use crate::testing::correction::Correction;
use crate::testing::significance::{
    SignificanceConfig, SignificanceRecord, test_significant_populations,
};
use serde::Serialize;

pub const DEFAULT_CONDITION: &str = "melanoma";
pub const DEFAULT_TREATMENT: &str = "miraclib";
pub const DEFAULT_SAMPLE_TYPE: &str = "PBMC";
pub const DEFAULT_TIME_POINT: i64 = 0;

/// Query parameters shared by the analysis functions.
///
/// `sample_type` and `time_point` only apply to the baseline query; the responder comparison
/// always uses PBMC samples from every time point.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    pub condition: String,
    pub treatment: String,
    pub sample_type: String,
    pub time_point: i64,
    pub significance: SignificanceConfig,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            condition: DEFAULT_CONDITION.to_string(),
            treatment: DEFAULT_TREATMENT.to_string(),
            sample_type: DEFAULT_SAMPLE_TYPE.to_string(),
            time_point: DEFAULT_TIME_POINT,
            significance: SignificanceConfig::default(),
        }
    }
}

impl AnalysisParams {
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn with_treatment(mut self, treatment: impl Into<String>) -> Self {
        self.treatment = treatment.into();
        self
    }

    pub fn with_sample_type(mut self, sample_type: impl Into<String>) -> Self {
        self.sample_type = sample_type.into();
        self
    }

    pub fn with_time_point(mut self, time_point: i64) -> Self {
        self.time_point = time_point;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.significance.alpha = alpha;
        self
    }

    pub fn with_method(mut self, method: MannWhitneyMethod) -> Self {
        self.significance.method = method;
        self
    }

    pub fn with_correction(mut self, correction: Option<Correction>) -> Self {
        self.significance.correction = correction;
        self
    }

    pub fn baseline_spec(&self) -> CohortSpec {
        CohortSpec::new(&self.condition, &self.treatment, &self.sample_type)
            .at_time_point(self.time_point)
    }
}

/// Baseline query result. `NoData` is returned instead of summarising an empty cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BaselineReport {
    NoData,
    Summary {
        samples: Vec<Sample>,
        summary: BaselineSummary,
    },
}

impl BaselineReport {
    pub fn is_empty(&self) -> bool {
        matches!(self, BaselineReport::NoData)
    }

    pub fn summary(&self) -> Option<&BaselineSummary> {
        match self {
            BaselineReport::NoData => None,
            BaselineReport::Summary { summary, .. } => Some(summary),
        }
    }
}

/// Relative frequency of every population in every sample.
pub fn relative_frequencies<S: DataStore>(store: &S) -> anyhow::Result<FrequencyTable> {
    let counts = store.fetch_counts()?;
    Ok(compute_relative_frequencies(&counts))
}

/// PBMC frequencies of the requested condition and treatment, joined to response flags.
pub fn responder_frequencies<S: DataStore>(
    store: &S,
    params: &AnalysisParams,
) -> anyhow::Result<ResponderTable> {
    let frequencies = relative_frequencies(store)?;
    responder_cohort(store, &frequencies, &params.condition, &params.treatment)
}

/// Per-population Mann-Whitney comparison of responders and non-responders.
pub fn significant_populations<S: DataStore>(
    store: &S,
    params: &AnalysisParams,
) -> anyhow::Result<Vec<SignificanceRecord>> {
    params.significance.validate()?;
    let table = responder_frequencies(store, params)?;
    test_significant_populations(&table, &params.significance)
}

/// Project, response and sex tabulations of the baseline cohort.
pub fn baseline_summary<S: DataStore>(
    store: &S,
    params: &AnalysisParams,
) -> anyhow::Result<BaselineReport> {
    match baseline_cohort(store, &params.baseline_spec())? {
        BaselineCohort::Empty => {
            tracing::info!(
                condition = %params.condition,
                treatment = %params.treatment,
                sample_type = %params.sample_type,
                time_point = params.time_point,
                "no baseline samples match the selected filters"
            );
            Ok(BaselineReport::NoData)
        }
        BaselineCohort::Samples(samples) => {
            let summary = summarize_baseline(&samples);
            Ok(BaselineReport::Summary { samples, summary })
        }
    }
}
