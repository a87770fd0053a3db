use anyhow::{Result, anyhow};
use serde::Serialize;
use std::cmp::Ordering;

/// Multiple testing correction applied across the populations of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Correction {
    Bonferroni,
    Holm,
    BenjaminiHochberg,
}

impl Correction {
    pub fn apply(self, p_values: &[f64]) -> Result<Vec<f64>> {
        match self {
            Correction::Bonferroni => bonferroni_correction(p_values),
            Correction::Holm => holm_bonferroni_correction(p_values),
            Correction::BenjaminiHochberg => benjamini_hochberg_correction(p_values),
        }
    }
}

fn validate(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(anyhow!("Empty p-value array"));
    }
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(anyhow!("Invalid p-value at index {}: {}", i, p));
        }
    }
    Ok(())
}

/// Indices of `p_values` in ascending p-value order
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Apply Bonferroni correction to p-values
///
/// Bonferroni correction is a simple but conservative method that multiplies
/// each p-value by the number of tests.
///
/// # Example
/// ```
/// use cytometry_statistics::testing::correction::bonferroni_correction;
///
/// let adjusted = bonferroni_correction(&[0.01, 0.03, 0.05]).unwrap();
/// assert_eq!(adjusted[2], 0.15000000000000002);
/// ```
pub fn bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate(p_values)?;
    let n = p_values.len() as f64;

    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Apply Holm-Bonferroni (step-down) method for controlling family-wise error rate
///
/// The i-th smallest p-value is multiplied by `n - i` and the adjusted values are made
/// monotone non-decreasing in p-value order.
pub fn holm_bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate(p_values)?;
    let n = p_values.len();

    let mut adjusted_p_values = vec![0.0; n];
    let mut running_max: f64 = 0.0;
    for (i, idx) in ascending_order(p_values).into_iter().enumerate() {
        let adjusted = (p_values[idx] * (n - i) as f64).min(1.0);
        running_max = running_max.max(adjusted);
        adjusted_p_values[idx] = running_max;
    }

    Ok(adjusted_p_values)
}

/// Apply Benjamini-Hochberg (BH) procedure for controlling false discovery rate
///
/// The BH procedure controls the false discovery rate (FDR), which is the expected
/// proportion of false positives among all rejected null hypotheses.
///
/// # Example
/// ```
/// use cytometry_statistics::testing::correction::benjamini_hochberg_correction;
///
/// let adjusted = benjamini_hochberg_correction(&[0.01, 0.04, 0.03]).unwrap();
/// assert!((adjusted[0] - 0.03).abs() < 1e-12);
/// assert!((adjusted[1] - 0.04).abs() < 1e-12);
/// ```
pub fn benjamini_hochberg_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate(p_values)?;
    let n = p_values.len();
    let order = ascending_order(p_values);

    let mut adjusted_p_values = vec![0.0; n];
    let mut current_min: f64 = 1.0;

    // Process from largest to smallest p-value
    for (i, &idx) in order.iter().enumerate().rev() {
        let rank = i + 1;
        let adjustment = (p_values[idx] * n as f64 / rank as f64).min(1.0);
        current_min = adjustment.min(current_min);
        adjusted_p_values[idx] = current_min;
    }

    Ok(adjusted_p_values)
}
