//! Tabulations of a baseline cohort by project, response and sex.

use crate::data::Sample;
use crate::error::AnalysisError;
use serde::Serialize;
use std::collections::HashMap;

pub const RESPONDER_LABEL: &str = "responder";
pub const NON_RESPONDER_LABEL: &str = "non-responder";

/// One group of a tabulation and its number of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineSummary {
    /// Samples per project
    pub projects: Vec<GroupCount>,
    /// Subjects per response label
    pub responses: Vec<GroupCount>,
    /// Subjects per sex
    pub sexes: Vec<GroupCount>,
}

impl BaselineSummary {
    pub fn num_samples(&self) -> usize {
        self.projects.iter().map(|g| g.count).sum()
    }
}

pub fn response_label(response: bool) -> &'static str {
    if response {
        RESPONDER_LABEL
    } else {
        NON_RESPONDER_LABEL
    }
}

/// Count rows per key, most frequent first, ties broken by key
fn value_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<GroupCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(group, count)| GroupCount {
            group: group.to_string(),
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.group.cmp(&b.group)));
    groups
}

/// Summarise a baseline cohort. The caller is expected to have short-circuited an empty
/// cohort; see [`try_summarize_baseline`] for a checked variant.
pub fn summarize_baseline(samples: &[Sample]) -> BaselineSummary {
    BaselineSummary {
        projects: value_counts(samples.iter().map(|s| s.project.as_str())),
        responses: value_counts(samples.iter().map(|s| response_label(s.response))),
        sexes: value_counts(samples.iter().map(|s| s.sex.as_str())),
    }
}

pub fn try_summarize_baseline(samples: &[Sample]) -> anyhow::Result<BaselineSummary> {
    if samples.is_empty() {
        return Err(AnalysisError::EmptyCohort.into());
    }
    Ok(summarize_baseline(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, project: &str, sex: &str, response: bool) -> Sample {
        Sample {
            sample_id: id.to_string(),
            project: project.to_string(),
            subject: format!("sbj-{id}"),
            condition: "melanoma".to_string(),
            age: 60,
            sex: sex.to_string(),
            treatment: "miraclib".to_string(),
            response,
            sample_type: "PBMC".to_string(),
            time_from_treatment_start: 0,
        }
    }

    #[test]
    fn tabulations_sum_to_input_size() {
        let samples = vec![
            sample("a", "prj1", "M", true),
            sample("b", "prj1", "F", false),
            sample("c", "prj2", "F", true),
            sample("d", "prj3", "F", true),
        ];
        let summary = summarize_baseline(&samples);

        for table in [&summary.projects, &summary.responses, &summary.sexes] {
            assert_eq!(table.iter().map(|g| g.count).sum::<usize>(), samples.len());
        }
        assert_eq!(summary.num_samples(), 4);

        assert_eq!(
            summary.projects,
            vec![
                GroupCount { group: "prj1".to_string(), count: 2 },
                GroupCount { group: "prj2".to_string(), count: 1 },
                GroupCount { group: "prj3".to_string(), count: 1 },
            ]
        );
        assert_eq!(
            summary.responses,
            vec![
                GroupCount { group: RESPONDER_LABEL.to_string(), count: 3 },
                GroupCount { group: NON_RESPONDER_LABEL.to_string(), count: 1 },
            ]
        );
        assert_eq!(summary.sexes[0], GroupCount { group: "F".to_string(), count: 3 });
    }

    #[test]
    fn single_response_category_has_one_row() {
        let summary = summarize_baseline(&[sample("a", "prj1", "M", false)]);
        assert_eq!(summary.responses.len(), 1);
        assert_eq!(summary.responses[0].group, NON_RESPONDER_LABEL);
    }

    #[test]
    fn empty_cohort_is_rejected_by_checked_variant() {
        let err = try_summarize_baseline(&[]).unwrap_err();
        assert_eq!(err.downcast_ref::<AnalysisError>(), Some(&AnalysisError::EmptyCohort));
    }
}
