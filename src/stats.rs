//! Small deterministic statistics over ordered record slices.
//!
//! All functions take a field accessor so they can run over any record type
//! returned by the query service. Sorting always happens on a copy; the
//! caller's slice is never reordered.

/// Arithmetic mean of `key` over `records`.
///
/// Returns `NaN` on empty input; callers must guard before rendering.
pub fn mean<T>(records: &[T], key: impl Fn(&T) -> f64) -> f64 {
    let sum: f64 = records.iter().map(&key).sum();
    sum / records.len() as f64
}

/// Linear-interpolation quantile (the R-7 method) of `key` at `q` in [0, 1].
///
/// Sorts a copy ascending by key (stable on ties), then interpolates between
/// the two records surrounding position `(n - 1) * q`.
///
/// Panics on empty input.
pub fn quantile<T: Clone>(records: &[T], key: impl Fn(&T) -> f64, q: f64) -> f64 {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| key(a).total_cmp(&key(b)));

    let pos = (sorted.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;

    match sorted.get(base + 1) {
        Some(next) => key(&sorted[base]) + rest * (key(next) - key(&sorted[base])),
        None => key(&sorted[base]),
    }
}

/// Records at or above the `q` quantile position, ascending by `key`.
///
/// Membership is by index in the sorted copy (suffix starting at
/// `round((n - 1) * q)`), so ties at the boundary are included by position
/// rather than by value.
pub fn outlier<T: Clone>(records: &[T], key: impl Fn(&T) -> f64, q: f64) -> Vec<T> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| key(a).total_cmp(&key(b)));

    if sorted.is_empty() {
        return sorted;
    }
    let pos = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted.split_off(pos)
}

/// Partition a copy of `records` (original order preserved) into `n`
/// contiguous groups with float boundaries `i * len / n`.
///
/// Group sizes differ by at most one; groups may be empty when `n > len`.
pub fn chunks<T: Clone>(records: &[T], n: usize) -> Vec<Vec<T>> {
    let len = records.len();
    (0..n)
        .map(|i| {
            let start = i * len / n;
            let end = (i + 1) * len / n;
            records[start..end].to_vec()
        })
        .collect()
}

/// Pick a bin count for a sparse result set.
///
/// Reduces `max_bins` until every bin can hold at least `min_entries`
/// records. If even `min_entries` records do not exist, falls back to one
/// record per bin. The loop only ever decreases the bin count, so it
/// terminates for any input, including `min_entries == 0`.
pub fn bin_count(len: usize, max_bins: usize, min_entries: usize) -> usize {
    if len < min_entries {
        return len.max(1);
    }

    let mut bins = max_bins.max(1);
    while bins > 1 && len < bins * min_entries {
        bins -= 1;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Rec {
        v: f64,
    }

    fn recs(values: &[f64]) -> Vec<Rec> {
        values.iter().map(|&v| Rec { v }).collect()
    }

    #[test]
    fn mean_of_simple_values() {
        let data = recs(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(mean(&data, |r| r.v), 2.5);
    }

    #[test]
    fn mean_of_empty_is_nan() {
        let data: Vec<Rec> = Vec::new();
        assert!(mean(&data, |r| r.v).is_nan());
    }

    #[test]
    fn quantile_interpolates_between_positions() {
        // pos = 1.5 between sorted indices 1 and 2
        let data = recs(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(quantile(&data, |r| r.v, 0.5), 2.5);
    }

    #[test]
    fn quantile_endpoints_are_min_and_max() {
        let data = recs(&[7.0, 1.0, 5.0, 3.0]);
        assert_eq!(quantile(&data, |r| r.v, 0.0), 1.0);
        assert_eq!(quantile(&data, |r| r.v, 1.0), 7.0);
    }

    #[test]
    fn quantile_is_monotone_in_q() {
        let data = recs(&[4.0, 9.0, 1.0, 6.0, 2.0]);
        let mut prev = f64::NEG_INFINITY;
        for i in 0..=10 {
            let q = i as f64 / 10.0;
            let value = quantile(&data, |r| r.v, q);
            assert!(value >= prev, "quantile decreased at q={q}");
            prev = value;
        }
    }

    #[test]
    fn outlier_is_sorted_suffix() {
        let data = recs(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let tail = outlier(&data, |r| r.v, 0.5);
        let values: Vec<f64> = tail.iter().map(|r| r.v).collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn outlier_q0_returns_everything() {
        let data = recs(&[3.0, 1.0, 2.0]);
        assert_eq!(outlier(&data, |r| r.v, 0.0).len(), 3);
    }

    #[test]
    fn outlier_q1_returns_at_most_one() {
        let data = recs(&[3.0, 1.0, 2.0]);
        let tail = outlier(&data, |r| r.v, 1.0);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].v, 3.0);

        let empty: Vec<Rec> = Vec::new();
        assert!(outlier(&empty, |r| r.v, 1.0).is_empty());
    }

    #[test]
    fn chunks_partition_preserves_order_and_balance() {
        let data = recs(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        for n in 1..=7 {
            let parts = chunks(&data, n);
            assert_eq!(parts.len(), n);

            let total: usize = parts.iter().map(|c| c.len()).sum();
            assert_eq!(total, data.len());

            let flat: Vec<f64> = parts.iter().flatten().map(|r| r.v).collect();
            let original: Vec<f64> = data.iter().map(|r| r.v).collect();
            assert_eq!(flat, original);

            let min = parts.iter().map(|c| c.len()).min().unwrap();
            let max = parts.iter().map(|c| c.len()).max().unwrap();
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn chunks_with_more_bins_than_records_has_empty_groups() {
        let data = recs(&[1.0, 2.0]);
        let parts = chunks(&data, 5);
        assert_eq!(parts.len(), 5);
        assert_eq!(parts.iter().map(|c| c.len()).sum::<usize>(), 2);
    }

    #[test]
    fn bin_count_reduces_for_sparse_data() {
        // 30 records, want 10 bins of at least 5 each: only 6 fit
        assert_eq!(bin_count(30, 10, 5), 6);
        // plenty of data keeps the requested bin count
        assert_eq!(bin_count(1000, 10, 5), 10);
    }

    #[test]
    fn bin_count_falls_back_to_one_record_per_bin() {
        assert_eq!(bin_count(3, 10, 5), 3);
        assert_eq!(bin_count(0, 10, 5), 1);
    }

    #[test]
    fn bin_count_terminates_with_zero_min_entries() {
        assert_eq!(bin_count(100, 20, 0), 20);
    }
}
