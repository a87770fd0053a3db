use crate::testing::{Alternative, MannWhitneyMethod, TestResult};
use statrs::distribution::{ContinuousCDF, Normal};

/// Largest combined sample size for which the exact U distribution is enumerated.
/// The counts are binomial coefficients and must stay inside `i128`.
const MAX_EXACT_SIZE: usize = 120;

/// Below this group size `MannWhitneyMethod::Auto` uses the exact distribution
const AUTO_EXACT_LIMIT: usize = 8;

/// Mann-Whitney U test (Wilcoxon rank-sum) of `x` against `y`.
///
/// The reported statistic is U of `x`, i.e. the number of (x, y) pairs with x > y, ties
/// counting one half. Tied values receive their average rank and the variance of the normal
/// approximation is corrected for ties.
///
/// # Errors
/// Fails when either group is empty or contains a NaN.
pub fn mann_whitney(
    x: &[f64],
    y: &[f64],
    alternative: Alternative,
    method: MannWhitneyMethod,
) -> anyhow::Result<TestResult<f64>> {
    let nx = x.len();
    let ny = y.len();

    if nx == 0 || ny == 0 {
        return Err(anyhow::anyhow!(
            "Mann-Whitney U requires two non-empty groups (got {} and {})",
            nx,
            ny
        ));
    }
    if x.iter().chain(y).any(|v| v.is_nan()) {
        return Err(anyhow::anyhow!("Mann-Whitney U input contains NaN"));
    }

    // Combine samples and assign group labels (0 for x, 1 for y)
    let mut combined: Vec<(f64, usize)> = Vec::with_capacity(nx + ny);
    combined.extend(x.iter().map(|&v| (v, 0)));
    combined.extend(y.iter().map(|&v| (v, 1)));
    combined.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Average ranks over ties and accumulate sum(t^3 - t) over tie groups
    let mut rank_sum_x = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < combined.len() {
        let mut j = i + 1;
        while j < combined.len() && combined[j].0 == combined[i].0 {
            j += 1;
        }

        let rank = (i + j - 1) as f64 / 2.0 + 1.0;
        rank_sum_x += combined[i..j].iter().filter(|(_, g)| *g == 0).count() as f64 * rank;

        let t = (j - i) as f64;
        tie_term += t * t * t - t;
        i = j;
    }
    let has_ties = tie_term > 0.0;

    let n = (nx + ny) as f64;
    let nx_f = nx as f64;
    let ny_f = ny as f64;

    let u_x = rank_sum_x - nx_f * (nx_f + 1.0) / 2.0;
    let u_y = nx_f * ny_f - u_x;

    let mean_u = nx_f * ny_f / 2.0;
    let var_u = if n > 1.0 {
        nx_f * ny_f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))
    } else {
        0.0
    };
    let sd_u = var_u.max(0.0).sqrt();

    let exact = match method {
        MannWhitneyMethod::Asymptotic { .. } => false,
        MannWhitneyMethod::Exact => {
            if has_ties {
                tracing::warn!("exact Mann-Whitney requested on tied data; using normal approximation");
                false
            } else if nx + ny > MAX_EXACT_SIZE {
                tracing::warn!(
                    nx,
                    ny,
                    max = MAX_EXACT_SIZE,
                    "exact Mann-Whitney requested on groups too large to enumerate; using normal approximation"
                );
                false
            } else {
                true
            }
        }
        MannWhitneyMethod::Auto => !has_ties && nx < AUTO_EXACT_LIMIT && ny < AUTO_EXACT_LIMIT,
    };
    let continuity = match method {
        MannWhitneyMethod::Asymptotic {
            continuity_correction,
        } => continuity_correction,
        _ => false,
    };

    // Uncorrected z, also the basis of the effect size
    let z = if sd_u > 0.0 { (u_x - mean_u) / sd_u } else { 0.0 };

    let p_value = if exact {
        exact_p_value(nx, ny, u_x, u_y, alternative)
    } else if sd_u == 0.0 {
        // Every value tied: no evidence of a shift in either direction
        1.0
    } else {
        let normal = Normal::new(0.0, 1.0)?;
        let cc = if continuity { 0.5 } else { 0.0 };
        let d = u_x - mean_u;
        match alternative {
            Alternative::TwoSided => {
                let z_abs = ((d.abs() - cc).max(0.0)) / sd_u;
                2.0 * normal.sf(z_abs)
            }
            Alternative::Less => normal.cdf((d + cc) / sd_u),
            Alternative::Greater => normal.sf((d - cc) / sd_u),
        }
    };
    let p_value = p_value.clamp(0.0, 1.0);

    let effect_size = z / n.sqrt();

    Ok(TestResult::with_effect_size(u_x, p_value, effect_size)
        .with_standard_error(sd_u)
        .with_metadata("z_score", z)
        .with_metadata("mean_u", mean_u)
        .with_metadata("var_u", var_u)
        .with_metadata("nx", nx_f)
        .with_metadata("ny", ny_f)
        .with_metadata("exact", if exact { 1.0 } else { 0.0 }))
}

fn exact_p_value(nx: usize, ny: usize, u_x: f64, u_y: f64, alternative: Alternative) -> f64 {
    let counts = u_distribution(nx, ny);
    let total: i128 = counts.iter().sum();

    // Without ties U is integral
    let cdf = |u: f64| -> f64 {
        let upto = (u.round() as usize).min(counts.len() - 1);
        let below: i128 = counts[..=upto].iter().sum();
        below as f64 / total as f64
    };

    let p = match alternative {
        Alternative::TwoSided => 2.0 * cdf(u_x.min(u_y)),
        Alternative::Less => cdf(u_x),
        Alternative::Greater => cdf(u_y),
    };
    p.min(1.0)
}

/// Number of arrangements of `m` and `n` observations giving each U in `0..=m*n`.
///
/// These are the coefficients of the Gaussian binomial `[m + n choose m]_q`, built as
/// `prod_{i=1..m} (1 - q^(n+i)) / (1 - q^i)` truncated at degree `m * n`.
fn u_distribution(m: usize, n: usize) -> Vec<i128> {
    let max_u = m * n;
    let mut coeffs = vec![0i128; max_u + 1];
    coeffs[0] = 1;

    for i in 1..=m {
        let shift = n + i;
        for k in (shift..=max_u).rev() {
            coeffs[k] -= coeffs[k - shift];
        }
        for k in i..=max_u {
            coeffs[k] += coeffs[k - i];
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ASYMPTOTIC: MannWhitneyMethod = MannWhitneyMethod::Asymptotic {
        continuity_correction: false,
    };

    #[test]
    fn u_distribution_counts_arrangements() {
        // C(6, 3) = 20 arrangements, symmetric around 4.5
        let counts = u_distribution(3, 3);
        assert_eq!(counts, vec![1, 1, 2, 3, 3, 3, 3, 2, 1, 1]);
        assert_eq!(counts.iter().sum::<i128>(), 20);

        let counts = u_distribution(2, 4);
        assert_eq!(counts.iter().sum::<i128>(), 15);
        assert_eq!(counts, vec![1, 1, 2, 2, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn separated_groups_normal_approximation() {
        let result = mann_whitney(
            &[10.0, 12.0, 11.0],
            &[40.0, 42.0, 41.0],
            Alternative::TwoSided,
            ASYMPTOTIC,
        )
        .unwrap();

        assert_abs_diff_eq!(result.statistic, 0.0);
        // z = -4.5 / sqrt(5.25)
        assert_abs_diff_eq!(result.metadata["z_score"], -1.963961, epsilon = 1e-5);
        assert_abs_diff_eq!(result.p_value, 0.049535, epsilon = 1e-4);
        assert!(result.is_significant(0.05));
    }

    #[test]
    fn separated_groups_exact() {
        let result = mann_whitney(
            &[10.0, 12.0, 11.0],
            &[40.0, 42.0, 41.0],
            Alternative::TwoSided,
            MannWhitneyMethod::Exact,
        )
        .unwrap();
        assert_abs_diff_eq!(result.p_value, 0.1, epsilon = 1e-12);

        let less = mann_whitney(
            &[10.0, 12.0, 11.0],
            &[40.0, 42.0, 41.0],
            Alternative::Less,
            MannWhitneyMethod::Exact,
        )
        .unwrap();
        assert_abs_diff_eq!(less.p_value, 0.05, epsilon = 1e-12);

        let greater = mann_whitney(
            &[10.0, 12.0, 11.0],
            &[40.0, 42.0, 41.0],
            Alternative::Greater,
            MannWhitneyMethod::Exact,
        )
        .unwrap();
        assert_abs_diff_eq!(greater.p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn continuity_correction_is_more_conservative() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.5, 5.0, 6.0, 7.0];
        let plain = mann_whitney(&x, &y, Alternative::TwoSided, ASYMPTOTIC).unwrap();
        let corrected = mann_whitney(
            &x,
            &y,
            Alternative::TwoSided,
            MannWhitneyMethod::Asymptotic {
                continuity_correction: true,
            },
        )
        .unwrap();
        assert!(corrected.p_value > plain.p_value);
    }

    #[test]
    fn ties_get_average_ranks() {
        // x ranks: 1, 2.5 ; y ranks: 2.5, 4  -> R_x = 3.5, U_x = 0.5
        let result = mann_whitney(&[1.0, 2.0], &[2.0, 3.0], Alternative::TwoSided, ASYMPTOTIC).unwrap();
        assert_abs_diff_eq!(result.statistic, 0.5);

        // var = 4/12 * (5 - 6/12)
        assert_abs_diff_eq!(result.metadata["var_u"], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn auto_falls_back_on_ties() {
        let result = mann_whitney(
            &[1.0, 2.0, 2.0],
            &[2.0, 3.0, 4.0],
            Alternative::TwoSided,
            MannWhitneyMethod::Auto,
        )
        .unwrap();
        assert_abs_diff_eq!(result.metadata["exact"], 0.0);

        let result = mann_whitney(
            &[1.0, 2.0, 5.0],
            &[2.5, 3.0, 4.0],
            Alternative::TwoSided,
            MannWhitneyMethod::Auto,
        )
        .unwrap();
        assert_abs_diff_eq!(result.metadata["exact"], 1.0);
    }

    #[test]
    fn exact_falls_back_beyond_enumeration_limit() {
        let x: Vec<f64> = (0..61).map(|i| (2 * i) as f64).collect();
        let y: Vec<f64> = (0..61).map(|i| (2 * i + 1) as f64).collect();

        let exact = mann_whitney(&x, &y, Alternative::TwoSided, MannWhitneyMethod::Exact).unwrap();
        let approx = mann_whitney(&x, &y, Alternative::TwoSided, ASYMPTOTIC).unwrap();
        assert_abs_diff_eq!(exact.metadata["exact"], 0.0);
        assert_abs_diff_eq!(exact.p_value, approx.p_value, epsilon = 1e-12);

        let result = mann_whitney(&x[..60], &y[..60], Alternative::TwoSided, MannWhitneyMethod::Exact)
            .unwrap();
        assert_abs_diff_eq!(result.metadata["exact"], 1.0);
    }

    #[test]
    fn all_values_tied() {
        let result = mann_whitney(&[5.0, 5.0], &[5.0, 5.0, 5.0], Alternative::TwoSided, ASYMPTOTIC).unwrap();
        assert_abs_diff_eq!(result.p_value, 1.0);
        assert_abs_diff_eq!(result.statistic, 3.0);
    }

    #[test]
    fn identical_distributions_are_not_significant() {
        let x = [1.0, 3.0, 5.0, 7.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let result = mann_whitney(&x, &y, Alternative::TwoSided, ASYMPTOTIC).unwrap();
        assert!(result.p_value > 0.5);
        assert!(result.p_value <= 1.0);
    }

    #[test]
    fn statistic_is_swapped_when_groups_are() {
        let x = [1.0, 4.0, 6.0];
        let y = [2.0, 3.0, 8.0, 9.0];
        let xy = mann_whitney(&x, &y, Alternative::TwoSided, ASYMPTOTIC).unwrap();
        let yx = mann_whitney(&y, &x, Alternative::TwoSided, ASYMPTOTIC).unwrap();

        assert_abs_diff_eq!(xy.statistic + yx.statistic, 12.0);
        assert_abs_diff_eq!(xy.p_value, yx.p_value, epsilon = 1e-12);
    }

    #[test]
    fn empty_or_nan_input_is_rejected() {
        assert!(mann_whitney(&[], &[1.0], Alternative::TwoSided, ASYMPTOTIC).is_err());
        assert!(mann_whitney(&[1.0], &[], Alternative::TwoSided, ASYMPTOTIC).is_err());
        assert!(mann_whitney(&[f64::NAN], &[1.0], Alternative::TwoSided, ASYMPTOTIC).is_err());
    }
}
