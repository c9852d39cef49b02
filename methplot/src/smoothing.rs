use crate::common::*;
use crate::record::FreqRow;

///
/// Centered moving average. Each output is the mean of `window` values
/// with `window / 2` on the left; positions without a full window, or
/// whose window holds a NaN, become NaN.
///
pub fn rolling_center_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window <= 1 {
        return values.to_vec();
    }
    let left = window / 2;
    let right = window - 1 - left;

    (0..n)
        .map(|i| {
            if i < left || i + right >= n {
                return f64::NAN;
            }
            let slice = &values[(i - left)..=(i + right)];
            slice.iter().sum::<f64>() / window as f64
        })
        .collect()
}

///
/// Average values sharing the same `chr` and `[start, stop)`, sorted by
/// chromosome then position
///
pub fn mean_by_position(rows: Vec<FreqRow>) -> Vec<FreqRow> {
    let mut sums: BTreeMap<(Box<str>, i64, i64), (f64, usize)> = BTreeMap::new();
    for r in rows {
        let acc = sums.entry((r.chr, r.start, r.stop)).or_insert((0.0, 0));
        acc.0 += r.value;
        acc.1 += 1;
    }
    sums.into_iter()
        .map(|((chr, start, stop), (sum, n))| FreqRow {
            chr,
            start,
            stop,
            value: sum / n as f64,
        })
        .collect()
}

/// Group by position, then smooth each chromosome in position order
pub fn aggregate_and_smooth(rows: Vec<FreqRow>, window: usize) -> Vec<FreqRow> {
    let mut rows = mean_by_position(rows);
    for chunk in rows.chunk_by_mut(|a, b| a.chr == b.chr) {
        let values: Vec<f64> = chunk.iter().map(|r| r.value).collect();
        for (r, v) in chunk.iter_mut().zip(rolling_center_mean(&values, window)) {
            r.value = v;
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_spike() {
        let values = [0.0, 0.0, 1.0, 0.0, 0.0];
        let smooth = rolling_center_mean(&values, 3);
        assert!(smooth[0].is_nan());
        assert!(smooth[4].is_nan());
        for v in &smooth[1..4] {
            assert!((v - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nan_in_window() {
        let values = [1.0, f64::NAN, 1.0, 1.0, 1.0];
        let smooth = rolling_center_mean(&values, 3);
        assert!(smooth[1].is_nan());
        assert!(smooth[2].is_nan());
        assert!((smooth[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_even_window_and_identity() {
        // window 4: two to the left, one to the right
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let smooth = rolling_center_mean(&values, 4);
        assert!(smooth[0].is_nan());
        assert!(smooth[1].is_nan());
        assert!((smooth[2] - 2.5).abs() < 1e-12);
        assert!((smooth[3] - 3.5).abs() < 1e-12);
        assert!(smooth[4].is_nan());
        assert_eq!(rolling_center_mean(&values, 1), values.to_vec());
    }

    fn row(chr: &str, start: i64, value: f64) -> FreqRow {
        FreqRow {
            chr: chr.into(),
            start,
            stop: start + 1,
            value,
        }
    }

    #[test]
    fn test_mean_by_position() {
        let rows = vec![row("chr1", 20, 1.0), row("chr1", 10, 0.5), row("chr1", 20, 0.0)];
        let agg = mean_by_position(rows);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].start, 10);
        assert!((agg[1].value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_chromosomes_kept_apart() {
        let rows = vec![row("chr2", 100, 0.0), row("chr1", 100, 1.0)];
        let agg = mean_by_position(rows);
        assert_eq!(agg.len(), 2);
        assert_eq!((agg[0].chr.as_ref(), agg[0].value), ("chr1", 1.0));
        assert_eq!((agg[1].chr.as_ref(), agg[1].value), ("chr2", 0.0));

        // the window never spans two chromosomes
        let rows = vec![
            row("chr1", 1, 1.0),
            row("chr1", 2, 1.0),
            row("chr1", 3, 1.0),
            row("chr2", 1, 0.0),
            row("chr2", 2, 0.0),
            row("chr2", 3, 0.0),
        ];
        let smooth = aggregate_and_smooth(rows, 3);
        assert!(smooth[0].value.is_nan());
        assert!((smooth[1].value - 1.0).abs() < 1e-12);
        assert!(smooth[2].value.is_nan());
        assert!(smooth[3].value.is_nan());
        assert!(smooth[4].value.abs() < 1e-12);
    }
}
