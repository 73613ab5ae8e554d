//! Largest-Triangle-Three-Buckets downsampling
//!
//! Reduces a dense series to `threshold` points while keeping its visual
//! shape. The first and last samples are always kept; the interior is split
//! into `threshold - 2` equal-width buckets and from each bucket the point
//! forming the largest triangle with the previously selected point and the
//! next bucket's centroid is chosen.

/// Indices of the samples to keep, in ascending order.
///
/// When `threshold >= n` or `threshold <= 2` every index is returned.
/// Slices of different length are treated as having the shorter length.
pub fn downsample(xs: &[f64], ys: &[f64], threshold: usize) -> Vec<usize> {
    let n = xs.len().min(ys.len());
    if threshold >= n || threshold <= 2 {
        return (0..n).collect();
    }

    let mut selected = Vec::with_capacity(threshold);
    selected.push(0);

    let bucket_size = (n - 2) as f64 / (threshold - 2) as f64;
    let mut a = 0usize;

    for i in 0..threshold - 2 {
        // Centroid of the next bucket (the last point for the final bucket)
        let avg_start = ((i + 1) as f64 * bucket_size).floor() as usize + 1;
        let avg_end = (((i + 2) as f64 * bucket_size).floor() as usize + 1).min(n);
        let (avg_x, avg_y) = if avg_start < avg_end {
            let len = (avg_end - avg_start) as f64;
            let sum_x: f64 = xs[avg_start..avg_end].iter().sum();
            let sum_y: f64 = ys[avg_start..avg_end].iter().sum();
            (sum_x / len, sum_y / len)
        } else {
            (xs[n - 1], ys[n - 1])
        };

        let range_start = (i as f64 * bucket_size).floor() as usize + 1;
        let range_end = (((i + 1) as f64 * bucket_size).floor() as usize + 1).min(n - 1);

        let (ax, ay) = (xs[a], ys[a]);
        let mut max_area = -1.0;
        let mut max_index = range_start;

        for j in range_start..range_end {
            let area = ((ax - avg_x) * (ys[j] - ay) - (ax - xs[j]) * (avg_y - ay)).abs();
            if area > max_area {
                max_area = area;
                max_index = j;
            }
        }

        selected.push(max_index);
        a = max_index;
    }

    selected.push(n - 1);
    selected
}

/// Downsampled copies of `xs` and `ys`
pub fn downsample_points(xs: &[f64], ys: &[f64], threshold: usize) -> (Vec<f64>, Vec<f64>) {
    downsample(xs, ys, threshold)
        .into_iter()
        .map(|i| (xs[i], ys[i]))
        .unzip()
}
