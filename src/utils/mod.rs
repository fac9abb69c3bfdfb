//! Small helpers shared across modules.

use std::cmp::Ordering;

/// Arithmetic mean of `ratings` rounded half-up to one decimal place.
///
/// Works in integer tenths so `4.25` style midpoints never fall the wrong way
/// through float representation. An empty slice averages to `0.0`.
pub fn average_rating(ratings: &[u8]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u64 = ratings.iter().map(|&r| u64::from(r)).sum();
    let count = ratings.len() as u64;
    // round(sum * 10 / count) with halves going up
    let tenths = (sum * 20 + count) / (count * 2);
    tenths as f64 / 10.0
}

/// Title ordering that ignores case first and falls back to byte order, so
/// the result is total and stable.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
