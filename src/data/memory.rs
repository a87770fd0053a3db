use crate::data::{CellCount, DataStore, POPULATIONS, Sample, SampleFilter};
use crate::error::AnalysisError;
use anyhow::Context;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

/// Immutable in-memory store. Samples are kept in sample id order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    samples: BTreeMap<String, Sample>,
    counts: Vec<CellCount>,
}

/// One row of the wide cell-count CSV: sample metadata followed by one column per population
#[derive(Debug, Deserialize)]
struct WideRow {
    project: String,
    subject: String,
    condition: String,
    age: u32,
    sex: String,
    treatment: String,
    response: String,
    sample: String,
    sample_type: String,
    time_from_treatment_start: i64,
    b_cell: u64,
    cd8_t_cell: u64,
    cd4_t_cell: u64,
    nk_cell: u64,
    monocyte: u64,
}

impl WideRow {
    fn population_counts(&self) -> [u64; 5] {
        [
            self.b_cell,
            self.cd8_t_cell,
            self.cd4_t_cell,
            self.nk_cell,
            self.monocyte,
        ]
    }
}

/// Canonicalise the response encodings seen in exported trial sheets
pub(crate) fn parse_response(sample_id: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(AnalysisError::InvalidResponse {
            sample_id: sample_id.to_string(),
            value: value.to_string(),
        }
        .into()),
    }
}

impl MemoryStore {
    /// Build a store, rejecting duplicate sample ids, counts for unknown samples and repeated
    /// (sample, population) pairs.
    pub fn new(samples: Vec<Sample>, counts: Vec<CellCount>) -> anyhow::Result<Self> {
        let mut by_id = BTreeMap::new();
        for sample in samples {
            let id = sample.sample_id.clone();
            if by_id.insert(id.clone(), sample).is_some() {
                return Err(AnalysisError::DuplicateSample(id).into());
            }
        }

        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        for count in &counts {
            if !by_id.contains_key(&count.sample_id) {
                return Err(AnalysisError::UnknownSample(count.sample_id.clone()).into());
            }
            if let Some(population) = count.population.as_deref() {
                if !seen.insert((count.sample_id.as_str(), population)) {
                    return Err(AnalysisError::DuplicatePopulation {
                        sample_id: count.sample_id.clone(),
                        population: population.to_string(),
                    }
                    .into());
                }
            }
        }

        tracing::debug!(
            samples = by_id.len(),
            counts = counts.len(),
            "memory store loaded"
        );

        Ok(MemoryStore {
            samples: by_id,
            counts,
        })
    }

    /// Load the wide CSV layout (one row per sample, one column per population).
    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut samples = Vec::new();
        let mut counts = Vec::new();
        for (line, row) in csv_reader.deserialize::<WideRow>().enumerate() {
            let row = row.with_context(|| format!("Failed to parse cell-count row {}", line + 1))?;
            let response = parse_response(&row.sample, &row.response)?;

            for (population, count) in POPULATIONS.iter().zip(row.population_counts()) {
                counts.push(CellCount::new(row.sample.clone(), *population, count));
            }

            samples.push(Sample {
                sample_id: row.sample,
                project: row.project,
                subject: row.subject,
                condition: row.condition,
                age: row.age,
                sex: row.sex,
                treatment: row.treatment,
                response,
                sample_type: row.sample_type,
                time_from_treatment_start: row.time_from_treatment_start,
            });
        }

        MemoryStore::new(samples, counts)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        MemoryStore::from_csv_reader(file)
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sample(&self, sample_id: &str) -> Option<&Sample> {
        self.samples.get(sample_id)
    }
}

impl DataStore for MemoryStore {
    fn fetch_counts(&self) -> anyhow::Result<Vec<CellCount>> {
        Ok(self.counts.clone())
    }

    fn fetch_samples(&self, filter: &SampleFilter) -> anyhow::Result<Vec<Sample>> {
        Ok(self
            .samples
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn fetch_sample_responses(&self) -> anyhow::Result<HashMap<String, bool>> {
        Ok(self
            .samples
            .values()
            .map(|s| (s.sample_id.clone(), s.response))
            .collect())
    }
}
