//! Inequality measures over selection rates.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Coefficient of variation `σ / μ`; 0 when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    variance(values).sqrt() / m
}

/// Gini coefficient `Σᵢ Σⱼ |rᵢ − rⱼ| / (2 n² μ)` in `[0, 1]`.
///
/// Computed via the equivalent sorted form
/// `(2 Σ i·x₍ᵢ₎) / (n Σ x) − (n+1)/n` to avoid the O(n²) double sum.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| (i as f64 + 1.0) * x)
        .sum();
    let n = n as f64;
    ((2.0 * weighted) / (n * sum) - (n + 1.0) / n).clamp(0.0, 1.0)
}

/// Theil index `(1/n) Σ (rᵢ/μ)·ln(rᵢ/μ)` over positive rates.
///
/// 0 means perfect equality; the upper bound is `ln n`.
pub fn theil(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    let sum: f64 = values
        .iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| (v / m) * (v / m).ln())
        .sum();
    (sum / n as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_have_zero_inequality() {
        let equal = [2.0, 2.0, 2.0, 2.0];
        assert_eq!(variance(&equal), 0.0);
        assert_eq!(coefficient_of_variation(&equal), 0.0);
        assert!(gini(&equal).abs() < 1e-12);
        assert!(theil(&equal).abs() < 1e-12);
    }

    #[test]
    fn total_concentration_approaches_bounds() {
        // One member takes everything.
        let concentrated = [0.0, 0.0, 0.0, 4.0];
        let g = gini(&concentrated);
        assert!((g - 0.75).abs() < 1e-12); // (n-1)/n for a point mass
        let t = theil(&concentrated);
        assert!(t > 0.0 && t <= 4.0_f64.ln() + 1e-12);
    }

    #[test]
    fn gini_matches_pairwise_definition() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let n = values.len() as f64;
        let m = mean(&values);
        let mut pairwise = 0.0;
        for a in &values {
            for b in &values {
                pairwise += (a - b).abs();
            }
        }
        let expected = pairwise / (2.0 * n * n * m);
        assert!((gini(&values) - expected).abs() < 1e-12);
    }

    #[test]
    fn measures_are_scale_invariant() {
        let base = [1.0, 2.0, 3.0];
        let scaled: Vec<f64> = base.iter().map(|v| v * 10.0).collect();
        assert!((gini(&base) - gini(&scaled)).abs() < 1e-12);
        assert!((theil(&base) - theil(&scaled)).abs() < 1e-12);
        assert!(
            (coefficient_of_variation(&base) - coefficient_of_variation(&scaled)).abs() < 1e-12
        );
    }

    #[test]
    fn empty_and_zero_inputs_are_quiet() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(theil(&[0.0, 0.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }
}
