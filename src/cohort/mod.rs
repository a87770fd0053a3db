//! Cohort selection over sample metadata.
//!
//! Two cohorts are used downstream: the responder cohort, which feeds the per-population
//! significance tests with PBMC frequencies joined to response flags, and the baseline cohort,
//! which feeds the baseline summary. A filter that matches nothing is a normal outcome and
//! yields an empty cohort.

use crate::data::{DataStore, Sample, SampleFilter};
use crate::frequency::FrequencyTable;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Sample type the responder comparison is restricted to
pub const RESPONDER_SAMPLE_TYPE: &str = "PBMC";

/// Exact-match cohort definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortSpec {
    pub condition: String,
    pub treatment: String,
    pub sample_type: String,
    pub time_point: Option<i64>,
}

impl CohortSpec {
    pub fn new(
        condition: impl Into<String>,
        treatment: impl Into<String>,
        sample_type: impl Into<String>,
    ) -> Self {
        CohortSpec {
            condition: condition.into(),
            treatment: treatment.into(),
            sample_type: sample_type.into(),
            time_point: None,
        }
    }

    /// PBMC samples of a condition and treatment, any time point
    pub fn responder(condition: impl Into<String>, treatment: impl Into<String>) -> Self {
        CohortSpec::new(condition, treatment, RESPONDER_SAMPLE_TYPE)
    }

    pub fn at_time_point(mut self, time_point: i64) -> Self {
        self.time_point = Some(time_point);
        self
    }

    pub fn to_filter(&self) -> SampleFilter {
        let filter = SampleFilter::all()
            .with_condition(self.condition.clone())
            .with_treatment(self.treatment.clone())
            .with_sample_type(self.sample_type.clone());
        match self.time_point {
            Some(t) => filter.with_time_point(t),
            None => filter,
        }
    }
}

/// Frequency row of a responder-cohort sample, joined to its response flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponderRecord {
    pub sample: String,
    pub total_count: u64,
    pub population: String,
    pub count: u64,
    pub percentage: f64,
    pub response: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponderTable {
    pub records: Vec<ResponderRecord>,
}

impl ResponderTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct populations in lexicographic order
    pub fn populations(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.population.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Percentages of one population split into (responders, non-responders)
    pub fn partition(&self, population: &str) -> (Vec<f64>, Vec<f64>) {
        let (responders, non_responders): (Vec<&ResponderRecord>, Vec<&ResponderRecord>) = self
            .records
            .iter()
            .filter(|r| r.population == population)
            .partition(|r| r.response);

        (
            responders.iter().map(|r| r.percentage).collect(),
            non_responders.iter().map(|r| r.percentage).collect(),
        )
    }
}

/// Outcome of the baseline filter. `Empty` is the explicit "no data" marker; `Samples` is
/// never constructed with an empty vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BaselineCohort {
    Empty,
    Samples(Vec<Sample>),
}

impl BaselineCohort {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        if samples.is_empty() {
            BaselineCohort::Empty
        } else {
            BaselineCohort::Samples(samples)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BaselineCohort::Empty)
    }

    pub fn samples(&self) -> &[Sample] {
        match self {
            BaselineCohort::Empty => &[],
            BaselineCohort::Samples(samples) => samples,
        }
    }
}

/// Distinct metadata values available for building a cohort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub conditions: Vec<String>,
    pub treatments: Vec<String>,
    pub sample_types: Vec<String>,
    pub time_points: Vec<i64>,
}

/// Sample ids matching `spec`, in sample id order.
pub fn cohort_sample_ids<S: DataStore>(store: &S, spec: &CohortSpec) -> anyhow::Result<Vec<String>> {
    let samples = store.fetch_samples(&spec.to_filter())?;
    Ok(samples.into_iter().map(|s| s.sample_id).collect())
}

/// Restrict `frequencies` to PBMC samples of `condition` / `treatment` with a population label
/// and attach each sample's response flag.
pub fn responder_cohort<S: DataStore>(
    store: &S,
    frequencies: &FrequencyTable,
    condition: &str,
    treatment: &str,
) -> anyhow::Result<ResponderTable> {
    let spec = CohortSpec::responder(condition, treatment);
    let cohort: HashSet<String> = cohort_sample_ids(store, &spec)?.into_iter().collect();
    let responses = store.fetch_sample_responses()?;

    let mut unmatched = 0usize;
    let records: Vec<ResponderRecord> = frequencies
        .records
        .iter()
        .filter(|r| cohort.contains(&r.sample))
        .filter_map(|r| {
            let population = r.population.clone()?;
            let Some(&response) = responses.get(&r.sample) else {
                unmatched += 1;
                return None;
            };
            Some(ResponderRecord {
                sample: r.sample.clone(),
                total_count: r.total_count,
                population,
                count: r.count,
                percentage: r.percentage,
                response,
            })
        })
        .collect();

    if unmatched > 0 {
        tracing::debug!(unmatched, "dropped frequency rows without a response flag");
    }
    tracing::debug!(
        condition,
        treatment,
        samples = cohort.len(),
        rows = records.len(),
        "built responder cohort"
    );

    Ok(ResponderTable { records })
}

/// Samples matching all four fields of `spec`. A spec without a time point is treated as the
/// baseline visit (time point 0).
pub fn baseline_cohort<S: DataStore>(store: &S, spec: &CohortSpec) -> anyhow::Result<BaselineCohort> {
    let spec = CohortSpec {
        time_point: Some(spec.time_point.unwrap_or(0)),
        ..spec.clone()
    };
    let samples = store.fetch_samples(&spec.to_filter())?;

    tracing::debug!(
        condition = %spec.condition,
        treatment = %spec.treatment,
        sample_type = %spec.sample_type,
        time_point = ?spec.time_point,
        samples = samples.len(),
        "built baseline cohort"
    );

    Ok(BaselineCohort::from_samples(samples))
}

/// Sorted distinct conditions, treatments, sample types and time points in the store.
pub fn filter_options<S: DataStore>(store: &S) -> anyhow::Result<FilterOptions> {
    let samples = store.fetch_samples(&SampleFilter::all())?;

    let mut conditions = BTreeSet::new();
    let mut treatments = BTreeSet::new();
    let mut sample_types = BTreeSet::new();
    let mut time_points = BTreeSet::new();
    for sample in samples {
        conditions.insert(sample.condition);
        treatments.insert(sample.treatment);
        sample_types.insert(sample.sample_type);
        time_points.insert(sample.time_from_treatment_start);
    }

    Ok(FilterOptions {
        conditions: conditions.into_iter().collect(),
        treatments: treatments.into_iter().collect(),
        sample_types: sample_types.into_iter().collect(),
        time_points: time_points.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sample: &str, population: &str, percentage: f64, response: bool) -> ResponderRecord {
        ResponderRecord {
            sample: sample.to_string(),
            total_count: 100,
            population: population.to_string(),
            count: percentage as u64,
            percentage,
            response,
        }
    }

    #[test]
    fn populations_are_sorted_and_distinct() {
        let table = ResponderTable {
            records: vec![
                record("s1", "nk_cell", 10.0, true),
                record("s1", "b_cell", 20.0, true),
                record("s2", "nk_cell", 30.0, false),
            ],
        };
        assert_eq!(table.populations(), vec!["b_cell", "nk_cell"]);
    }

    #[test]
    fn partition_splits_by_response() {
        let table = ResponderTable {
            records: vec![
                record("s1", "nk_cell", 10.0, true),
                record("s2", "nk_cell", 40.0, false),
                record("s3", "nk_cell", 12.0, true),
                record("s3", "b_cell", 50.0, true),
            ],
        };
        let (responders, non_responders) = table.partition("nk_cell");
        assert_eq!(responders, vec![10.0, 12.0]);
        assert_eq!(non_responders, vec![40.0]);

        let (responders, non_responders) = table.partition("monocyte");
        assert!(responders.is_empty() && non_responders.is_empty());
    }

    #[test]
    fn spec_without_time_point_ignores_time() {
        let filter = CohortSpec::responder("melanoma", "miraclib").to_filter();
        assert_eq!(filter.sample_type.as_deref(), Some(RESPONDER_SAMPLE_TYPE));
        assert_eq!(filter.time_point, None);

        let filter = CohortSpec::new("melanoma", "miraclib", "WB")
            .at_time_point(7)
            .to_filter();
        assert_eq!(filter.time_point, Some(7));
    }

    #[test]
    fn empty_sample_list_is_the_no_data_marker() {
        assert_eq!(BaselineCohort::from_samples(vec![]), BaselineCohort::Empty);
        assert!(BaselineCohort::Empty.samples().is_empty());
    }
}
