//! Relative frequency of every cell population within its sample.
//!
//! Totals are computed in an explicit group-by pass (`sample_id -> sum of counts`) and joined
//! back onto each count row, so a sample's total always covers exactly the rows it owns.
//! Samples whose counts sum to zero have no defined frequency; they are left out of the table
//! and reported in [`FrequencyTable::zero_total_samples`]. Samples whose total does not fit in a
//! `u64` are likewise left out and reported in [`FrequencyTable::overflowed_samples`].

use crate::data::CellCount;
use crate::error::AnalysisError;
use ndarray::Array2;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRecord {
    pub sample: String,
    /// Sum of every count recorded for `sample`
    pub total_count: u64,
    pub population: Option<String>,
    pub count: u64,
    /// `count / total_count * 100`
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    /// Records ordered by (sample, population)
    pub records: Vec<FrequencyRecord>,
    /// Samples left out because their total count is zero
    pub zero_total_samples: Vec<String>,
    /// Samples left out because their total count overflows `u64`
    pub overflowed_samples: Vec<String>,
}

/// A window of the frequency table for paginated display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyPage<'a> {
    pub records: &'a [FrequencyRecord],
    pub total_rows: usize,
    pub page_index: usize,
    pub num_pages: usize,
}

/// Percentages pivoted to a samples x populations matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyMatrix {
    pub samples: Vec<String>,
    pub populations: Vec<String>,
    pub percentages: Array2<f64>,
}

/// Compute one [`FrequencyRecord`] per count row.
pub fn compute_relative_frequencies(counts: &[CellCount]) -> FrequencyTable {
    // None once a sample's total has overflowed
    let mut totals: HashMap<&str, Option<u64>> = HashMap::new();
    for count in counts {
        let total = totals.entry(count.sample_id.as_str()).or_insert(Some(0));
        *total = total.and_then(|t| t.checked_add(count.count));
    }

    let mut zero_total_samples = Vec::new();
    let mut overflowed_samples = Vec::new();
    for (&sample, &total) in &totals {
        match total {
            Some(0) => zero_total_samples.push(sample.to_string()),
            None => overflowed_samples.push(sample.to_string()),
            Some(_) => {}
        }
    }
    zero_total_samples.sort();
    overflowed_samples.sort();

    if !zero_total_samples.is_empty() {
        tracing::warn!(
            samples = ?zero_total_samples,
            "excluding samples with a zero total count from relative frequencies"
        );
    }
    if !overflowed_samples.is_empty() {
        tracing::warn!(
            samples = ?overflowed_samples,
            "excluding samples whose total count overflows from relative frequencies"
        );
    }

    let mut records: Vec<FrequencyRecord> = counts
        .iter()
        .filter_map(|count| {
            let total_count = match totals[count.sample_id.as_str()] {
                Some(total) if total > 0 => total,
                _ => return None,
            };
            Some(FrequencyRecord {
                sample: count.sample_id.clone(),
                total_count,
                population: count.population.clone(),
                count: count.count,
                percentage: count.count as f64 / total_count as f64 * 100.0,
            })
        })
        .collect();

    records.sort_by(|a, b| {
        a.sample
            .cmp(&b.sample)
            .then_with(|| a.population.cmp(&b.population))
    });

    tracing::debug!(
        rows = records.len(),
        samples = totals.len() - zero_total_samples.len() - overflowed_samples.len(),
        "computed relative frequencies"
    );

    FrequencyTable {
        records,
        zero_total_samples,
        overflowed_samples,
    }
}

impl FrequencyTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows `offset..offset + limit` in (sample, population) order.
    pub fn page(&self, limit: usize, offset: usize) -> anyhow::Result<FrequencyPage<'_>> {
        if limit == 0 {
            return Err(AnalysisError::InvalidPageSize.into());
        }

        let total_rows = self.records.len();
        let start = offset.min(total_rows);
        let end = offset.saturating_add(limit).min(total_rows);

        Ok(FrequencyPage {
            records: &self.records[start..end],
            total_rows,
            page_index: offset / limit,
            num_pages: total_rows.div_ceil(limit),
        })
    }

    /// Index of the page holding the first row of `sample_id`, if the sample is present.
    pub fn page_of_sample(&self, sample_id: &str, page_size: usize) -> anyhow::Result<Option<usize>> {
        if page_size == 0 {
            return Err(AnalysisError::InvalidPageSize.into());
        }
        Ok(self
            .records
            .iter()
            .position(|r| r.sample == sample_id)
            .map(|row| row / page_size))
    }

    /// All rows of one sample, i.e. its population composition.
    pub fn sample_composition(&self, sample_id: &str) -> Vec<&FrequencyRecord> {
        self.records
            .iter()
            .filter(|r| r.sample == sample_id)
            .collect()
    }

    /// Sum of percentages per sample. Every value is 100 up to rounding.
    pub fn percentage_sums(&self) -> BTreeMap<&str, f64> {
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for record in &self.records {
            *sums.entry(record.sample.as_str()).or_default() += record.percentage;
        }
        sums
    }

    /// Pivot labelled rows into a dense samples x populations matrix. Missing pairs are 0 and
    /// rows without a population label are skipped.
    pub fn to_matrix(&self) -> FrequencyMatrix {
        let samples: Vec<String> = self
            .records
            .iter()
            .map(|r| r.sample.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let populations: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| r.population.as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let sample_index: HashMap<&str, usize> = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let population_index: HashMap<&str, usize> = populations
            .iter()
            .enumerate()
            .map(|(j, p)| (p.as_str(), j))
            .collect();

        let mut percentages = Array2::zeros((samples.len(), populations.len()));
        for record in &self.records {
            if let Some(population) = record.population.as_deref() {
                let i = sample_index[record.sample.as_str()];
                let j = population_index[population];
                percentages[[i, j]] = record.percentage;
            }
        }

        FrequencyMatrix {
            samples,
            populations,
            percentages,
        }
    }
}
