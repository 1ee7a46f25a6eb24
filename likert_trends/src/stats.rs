// Descriptive statistics over the scores of one slice.

use crate::config::Summary;

/// z value of the two-sided 95% interval.
const Z_95: f64 = 1.96;

fn sorted_values(scores: &[u8]) -> Vec<f64> {
    let mut values: Vec<f64> = scores.iter().map(|s| *s as f64).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values
}

/// Quantile with the (n+1)p rank definition, clamped to the extreme observations.
pub(crate) fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = (n as f64 + 1.0) * p;
    if h <= 1.0 {
        return sorted.first().cloned();
    }
    if h >= n as f64 {
        return sorted.last().cloned();
    }
    let lower = h.floor();
    let idx = lower as usize - 1;
    let frac = h - lower;
    Some(sorted[idx] + frac * (sorted[idx + 1] - sorted[idx]))
}

pub(crate) fn mean(scores: &[u8]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: f64 = scores.iter().map(|s| *s as f64).sum();
    Some(sum / scores.len() as f64)
}

/// Sample standard deviation (n - 1 in the denominator).
pub(crate) fn sample_std(scores: &[u8]) -> Option<f64> {
    if scores.len() < 2 {
        return None;
    }
    let m = mean(scores)?;
    let ss: f64 = scores.iter().map(|s| (*s as f64 - m).powi(2)).sum();
    Some((ss / (scores.len() - 1) as f64).sqrt())
}

pub(crate) fn median(scores: &[u8]) -> Option<f64> {
    quantile(&sorted_values(scores), 0.5)
}

pub(crate) fn quartiles(scores: &[u8]) -> Option<Summary> {
    let sorted = sorted_values(scores);
    Some(Summary::Quartiles {
        median: quantile(&sorted, 0.5)?,
        q1: quantile(&sorted, 0.25)?,
        q3: quantile(&sorted, 0.75)?,
    })
}

pub(crate) fn mean_interval(scores: &[u8]) -> Option<Summary> {
    let mean = mean(scores)?;
    let std = sample_std(scores);
    let half_width = std.map(|s| Z_95 * s / (scores.len() as f64).sqrt());
    Some(Summary::MeanInterval {
        mean,
        std,
        half_width,
    })
}
