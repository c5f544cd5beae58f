//! Order statistics over the present (non-NaN) values of a column.

fn sorted_present(values: &[f64]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(f64::total_cmp);
    present
}

/// Quantile with linear interpolation between closest ranks, `q` in `[0, 1]`.
/// `None` when no value is present.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let sorted = sorted_present(values);
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Replace NaN entries with the median, or with `fallback` when nothing is present.
pub fn fill_with_median(values: &mut [f64], fallback: f64) -> f64 {
    let fill = median(values).unwrap_or(fallback);
    for v in values.iter_mut().filter(|v| v.is_nan()) {
        *v = fill;
    }
    fill
}
