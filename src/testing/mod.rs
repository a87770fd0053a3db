use num_traits::Float;
use serde::Serialize;
use std::collections::BTreeMap;

pub mod correction;
pub mod inference;
pub mod significance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alternative {
    TwoSided,
    Less,
    Greater,
}

/// How the Mann-Whitney p-value is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MannWhitneyMethod {
    /// Normal approximation with tie-corrected variance
    Asymptotic { continuity_correction: bool },
    /// Exact null distribution of U. Only valid without ties; tied data falls back to the
    /// normal approximation.
    Exact,
    /// Exact when both groups have fewer than 8 values and there are no ties
    Auto,
}

impl Default for MannWhitneyMethod {
    fn default() -> Self {
        MannWhitneyMethod::Asymptotic {
            continuity_correction: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult<T> {
    /// The test statistic value (U of the first group for Mann-Whitney)
    pub statistic: T,
    /// The p-value of the test
    pub p_value: T,
    /// Effect size measurement
    pub effect_size: Option<T>,
    /// Standard error of the test statistic
    pub standard_error: Option<T>,
    /// Additional test-specific information
    pub metadata: BTreeMap<String, T>,
}

impl<T> TestResult<T>
where
    T: Float,
{
    /// Create a new test result with minimal information
    pub fn new(statistic: T, p_value: T) -> Self {
        TestResult {
            statistic,
            p_value,
            effect_size: None,
            standard_error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a new test result with effect size
    pub fn with_effect_size(statistic: T, p_value: T, effect_size: T) -> Self {
        TestResult {
            effect_size: Some(effect_size),
            ..TestResult::new(statistic, p_value)
        }
    }

    /// Add standard error to the result
    pub fn with_standard_error(mut self, se: T) -> Self {
        self.standard_error = Some(se);
        self
    }

    /// Add additional metadata
    pub fn with_metadata(mut self, key: &str, value: T) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Check if the result is statistically significant at the given threshold
    pub fn is_significant(&self, alpha: T) -> bool {
        self.p_value < alpha
    }
}
