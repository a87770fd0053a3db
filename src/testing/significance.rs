//! Responder versus non-responder comparison, one Mann-Whitney U test per population.

use crate::cohort::ResponderTable;
use crate::error::AnalysisError;
use crate::testing::correction::Correction;
use crate::testing::inference::mann_whitney;
use crate::testing::{Alternative, MannWhitneyMethod, TestResult};
use rayon::prelude::*;
use serde::Serialize;

pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignificanceConfig {
    /// A population is significant when its raw p-value is strictly below `alpha`
    pub alpha: f64,
    pub method: MannWhitneyMethod,
    /// Adjustment reported alongside the raw p-values, if any
    pub correction: Option<Correction>,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        SignificanceConfig {
            alpha: DEFAULT_ALPHA,
            method: MannWhitneyMethod::default(),
            correction: Some(Correction::BenjaminiHochberg),
        }
    }
}

impl SignificanceConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_method(mut self, method: MannWhitneyMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_correction(mut self, correction: Option<Correction>) -> Self {
        self.correction = correction;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AnalysisError::InvalidAlpha(self.alpha).into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PopulationTest {
    Tested(TestResult<f64>),
    /// One of the two response groups has no samples for this population
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificanceRecord {
    pub population: String,
    pub responders: usize,
    pub non_responders: usize,
    pub test: PopulationTest,
    pub adjusted_p_value: Option<f64>,
    pub significant: bool,
}

impl SignificanceRecord {
    /// U statistic of the responder group
    pub fn statistic(&self) -> Option<f64> {
        match &self.test {
            PopulationTest::Tested(result) => Some(result.statistic),
            PopulationTest::InsufficientData => None,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match &self.test {
            PopulationTest::Tested(result) => Some(result.p_value),
            PopulationTest::InsufficientData => None,
        }
    }

    pub fn is_tested(&self) -> bool {
        matches!(self.test, PopulationTest::Tested(_))
    }
}

/// Run a two-sided Mann-Whitney U test of responders against non-responders for each
/// population of `table`, in lexicographic population order.
///
/// Populations missing either group are reported as [`PopulationTest::InsufficientData`]
/// and never flagged significant; the remaining populations are still tested.
pub fn test_significant_populations(
    table: &ResponderTable,
    config: &SignificanceConfig,
) -> anyhow::Result<Vec<SignificanceRecord>> {
    config.validate()?;

    let populations = table.populations();
    let mut records: Vec<SignificanceRecord> = populations
        .par_iter()
        .map(|&population| -> anyhow::Result<SignificanceRecord> {
            let (responders, non_responders) = table.partition(population);

            let test = if responders.is_empty() || non_responders.is_empty() {
                tracing::warn!(
                    population,
                    responders = responders.len(),
                    non_responders = non_responders.len(),
                    "skipping population without both response groups"
                );
                PopulationTest::InsufficientData
            } else {
                PopulationTest::Tested(mann_whitney(
                    &responders,
                    &non_responders,
                    Alternative::TwoSided,
                    config.method,
                )?)
            };

            let significant = match &test {
                PopulationTest::Tested(result) => result.is_significant(config.alpha),
                PopulationTest::InsufficientData => false,
            };

            Ok(SignificanceRecord {
                population: population.to_string(),
                responders: responders.len(),
                non_responders: non_responders.len(),
                test,
                adjusted_p_value: None,
                significant,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if let Some(correction) = config.correction {
        let tested: Vec<usize> = (0..records.len())
            .filter(|&i| records[i].is_tested())
            .collect();
        let p_values: Vec<f64> = tested.iter().filter_map(|&i| records[i].p_value()).collect();

        if !p_values.is_empty() {
            let adjusted = correction.apply(&p_values)?;
            for (&i, p) in tested.iter().zip(adjusted) {
                records[i].adjusted_p_value = Some(p);
            }
        }
    }

    tracing::debug!(
        populations = records.len(),
        significant = records.iter().filter(|r| r.significant).count(),
        alpha = config.alpha,
        "tested responder populations"
    );

    Ok(records)
}
