use realfft::RealFftPlanner;

use crate::error::{Error, Result};

/// Work size (`n * m`) above which dot products go through the FFT.
const FFT_THRESHOLD: usize = 256 * 1024;

/// Dot product of `query` with every window of `series` of the same length.
///
/// Element `j` of the result is `dot(query, series[j..j + m])`. Large inputs
/// are computed as an FFT cross-correlation, small ones directly.
pub fn sliding_dot_product(query: &[f64], series: &[f64]) -> Result<Vec<f64>> {
    let m = query.len();
    let n = series.len();
    if m == 0 || n < m {
        return Err(Error::subsequence(0, m, n));
    }
    if n * m > FFT_THRESHOLD {
        if let Some(dots) = sliding_dot_product_fft(query, series) {
            return Ok(dots);
        }
    }
    Ok(sliding_dot_product_naive(query, series))
}

/// Direct O(n * m) sliding dot product. Callers check the lengths.
pub fn sliding_dot_product_naive(query: &[f64], series: &[f64]) -> Vec<f64> {
    series
        .windows(query.len())
        .map(|w| query.iter().zip(w).map(|(a, b)| a * b).sum())
        .collect()
}

/// O(n log n) sliding dot product: the reversed query is convolved with the
/// series in the frequency domain. `None` if a transform fails.
pub fn sliding_dot_product_fft(query: &[f64], series: &[f64]) -> Option<Vec<f64>> {
    let m = query.len();
    let n = series.len();
    let n_subs = n - m + 1;
    let fft_len = (n + m - 1).next_power_of_two();

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut query_buf = vec![0.0; fft_len];
    for (dst, src) in query_buf.iter_mut().zip(query.iter().rev()) {
        *dst = *src;
    }
    let mut series_buf = vec![0.0; fft_len];
    series_buf[..n].copy_from_slice(series);

    let mut query_spec = forward.make_output_vec();
    let mut series_spec = forward.make_output_vec();
    forward.process(&mut query_buf, &mut query_spec).ok()?;
    forward.process(&mut series_buf, &mut series_spec).ok()?;
    for (q, s) in query_spec.iter_mut().zip(&series_spec) {
        *q *= s;
    }

    let mut out = vec![0.0; fft_len];
    inverse.process(&mut query_spec, &mut out).ok()?;

    // realfft leaves the inverse unnormalized
    let norm = 1.0 / fft_len as f64;
    Some(out[m - 1..m - 1 + n_subs].iter().map(|x| x * norm).collect())
}

/// Split diagonals `first..n_subs` into at most `n_chunks` contiguous ranges
/// of roughly equal cell count. Diagonal `k` holds `n_subs - k` cells.
#[cfg(feature = "parallel")]
pub fn diagonal_ranges(first: usize, n_subs: usize, n_chunks: usize) -> Vec<(usize, usize)> {
    let n_diags = n_subs.saturating_sub(first);
    if n_diags == 0 || n_chunks == 0 {
        return Vec::new();
    }
    let n_chunks = n_chunks.min(n_diags);

    // Cells in the first `i` diagonals of the range.
    let cells = |i: usize| i * n_diags - i * i.saturating_sub(1) / 2;
    let total = cells(n_diags) as f64;

    let mut ranges = Vec::with_capacity(n_chunks);
    let mut prev = 0;
    for c in 1..=n_chunks {
        let end = if c == n_chunks {
            n_diags
        } else {
            let target = (c as f64 * total / n_chunks as f64).round() as usize;
            let (mut lo, mut hi) = (prev, n_diags);
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if cells(mid) >= target {
                    hi = mid;
                } else {
                    lo = mid + 1;
                }
            }
            lo
        };
        if end > prev {
            ranges.push((first + prev, first + end));
        }
        prev = end;
    }
    ranges
}
