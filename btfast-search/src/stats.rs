//! Small statistical helpers the validation pipeline needs beyond what
//! `btfast_core::performance` already computes: the Mann-Whitney U test
//! (OOS consistency, spec §4.10 step 3) and a normal-CDF helper it's built
//! from, in the same "pin the formula, test against a worked example"
//! style as the core performance metrics.

/// Abramowitz & Stegun 7.1.26 error-function approximation (max error
/// ~1.5e-7), sufficient for a p-value used as a pass/fail threshold rather
/// than a published statistic.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal CDF, `Phi(z)`.
fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Result of a two-sided Mann-Whitney U test between two independent
/// samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitneyResult {
    pub u_statistic: f64,
    pub p_value: f64,
}

/// Two-sided Mann-Whitney U test via the normal approximation (with a tie
/// correction), used to compare per-trade tick distributions between IS and
/// OOS partitions (spec §4.10 step 3: "p-value ... >= 0.05" passes).
///
/// Returns `None` when either sample is empty — the caller treats that as
/// "cannot evaluate", not as a pass.
pub fn mann_whitney_u(sample_a: &[f64], sample_b: &[f64]) -> Option<MannWhitneyResult> {
    let n1 = sample_a.len();
    let n2 = sample_b.len();
    if n1 == 0 || n2 == 0 {
        return None;
    }

    let mut combined: Vec<(f64, u8)> = sample_a
        .iter()
        .map(|&v| (v, 0u8))
        .chain(sample_b.iter().map(|&v| (v, 1u8)))
        .collect();
    combined.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    // Assign midranks: ties share the average rank of their block.
    let mut ranks = vec![0.0; combined.len()];
    let mut i = 0;
    let mut tie_correction = 0.0;
    while i < combined.len() {
        let mut j = i;
        while j + 1 < combined.len() && combined[j + 1].0 == combined[i].0 {
            j += 1;
        }
        let tie_len = (j - i + 1) as f64;
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for r in ranks.iter_mut().take(j + 1).skip(i) {
            *r = avg_rank;
        }
        if tie_len > 1.0 {
            tie_correction += tie_len.powi(3) - tie_len;
        }
        i = j + 1;
    }

    let rank_sum_a: f64 = combined
        .iter()
        .zip(ranks.iter())
        .filter(|((_, g), _)| *g == 0)
        .map(|(_, r)| r)
        .sum();

    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let u1 = rank_sum_a - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;
    let u = u1.min(u2);

    let mean_u = n1f * n2f / 2.0;
    let total = n1f + n2f;
    let var_u = if total > 1.0 {
        let tie_term = tie_correction / (total * (total - 1.0));
        n1f * n2f / 12.0 * ((total + 1.0) - tie_term)
    } else {
        0.0
    };

    if var_u <= 0.0 {
        return Some(MannWhitneyResult { u_statistic: u, p_value: 1.0 });
    }

    let z = (u - mean_u) / var_u.sqrt();
    let p_value = 2.0 * (1.0 - normal_cdf(z.abs()));

    Some(MannWhitneyResult { u_statistic: u, p_value: p_value.min(1.0) })
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

pub fn stdev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let sum_sq: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (sum_sq / (xs.len() as f64 - 1.0)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_distributions_yield_high_p_value() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let r = mann_whitney_u(&a, &b).unwrap();
        assert!(r.p_value > 0.9);
    }

    #[test]
    fn clearly_separated_distributions_yield_low_p_value() {
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..20).map(|i| i as f64 + 100.0).collect();
        let r = mann_whitney_u(&a, &b).unwrap();
        assert!(r.p_value < 0.01);
    }

    #[test]
    fn empty_sample_returns_none() {
        assert!(mann_whitney_u(&[], &[1.0]).is_none());
    }

    #[test]
    fn mean_and_stdev_basic() {
        let xs = vec![1.0, 2.0, 3.0];
        assert_eq!(mean(&xs), 2.0);
        assert!((stdev(&xs) - 1.0).abs() < 1e-9);
    }
}
