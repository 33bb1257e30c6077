//! Derived scalar statistics over accumulated sequences
//!
//! Every function returns `None` when the value is undefined (empty input,
//! zero denominator) so callers can tell "no data" apart from zero.

pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Upper median: element at index `len / 2` of the sorted values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

pub fn average_count(values: &[usize]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<usize>() as f64 / values.len() as f64)
}

pub fn median_count(values: &[usize]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    Some(sorted[sorted.len() / 2])
}

/// `numerator / denominator`, undefined for a zero denominator
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// Render an optional statistic; undefined values print as `NaN`
pub fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "NaN".to_string(),
    }
}
