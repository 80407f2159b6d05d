//! Small descriptive statistics over `f64` slices.
//!
//! `NaN` marks a missing value; every function here skips it. Functions
//! return `None` when no finite inputs remain (or too few for the
//! statistic), so callers decide their own fallback.

/// Present (non-NaN) values of `values`.
pub fn present(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.iter().filter(|v| !v.is_nan()) {
        sum += v;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom
/// (0 = population, 1 = sample).
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    let vals = present(values);
    if vals.len() <= ddof {
        return None;
    }
    let m = vals.iter().sum::<f64>() / vals.len() as f64;
    let ss: f64 = vals.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (vals.len() - ddof) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile `q` in `[0, 1]` with linear interpolation between order
/// statistics.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut vals = present(values);
    if vals.is_empty() {
        return None;
    }
    vals.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (vals.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(vals[lo] + (vals[hi] - vals[lo]) * frac)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .max_by(f64::total_cmp)
}

pub fn min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .min_by(f64::total_cmp)
}
