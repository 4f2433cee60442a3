//! Median-deviation outlier filter
//!
//! Drops quotes whose implied price is more than `threshold` (relative)
//! away from the median, and repeats until nothing more is dropped. When a
//! pass against the true median would drop every quote (two far-apart
//! paths), that pass measures against the lower middle element instead,
//! which is itself a quote, so a non-empty set never empties. Running to a
//! fixed point makes the filter idempotent.

use super::paths::PathQuote;

/// Lower median of `values` (element at index `(n - 1) / 2` once sorted)
pub fn lower_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[(sorted.len() - 1) / 2])
}

/// Median of `values`; the mean of the two middle elements for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn deviates(price: f64, median: f64, threshold: f64) -> bool {
    ((price - median) / median).abs() > threshold
}

/// Filter to a fixed point; returns survivors and the number removed
pub fn remove_outliers(mut quotes: Vec<PathQuote>, threshold: f64) -> (Vec<PathQuote>, usize) {
    let initial = quotes.len();

    loop {
        let prices: Vec<f64> = quotes.iter().map(|q| q.implied_price).collect();
        let (Some(center), Some(lower)) = (median(&prices), lower_median(&prices)) else {
            break;
        };
        let center = if prices.iter().all(|p| deviates(*p, center, threshold)) {
            lower
        } else {
            center
        };
        if center <= 0.0 {
            break;
        }

        let before = quotes.len();
        quotes.retain(|q| !deviates(q.implied_price, center, threshold));
        if quotes.len() == before {
            break;
        }
    }

    let removed = initial - quotes.len();
    (quotes, removed)
}
