use serde::{Deserialize, Serialize};

use crate::algorithms::common::sliding_dot_product;
use crate::core::running_stats::RunningStats;
use crate::error::{Error, Result};
use crate::metrics::euclidean::similarity;

/// Minimum number of windows before the scan is split across threads.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_SUBS: usize = 256;

/// The closest pair of windows starting at least one window apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopPair {
    pub a: usize,
    pub b: usize,
    pub distance: f64,
}

/// Per-window terms of the squared-distance identity.
///
/// With `v` the population variance and `s` the floored sigma of a window,
/// `dist² = W·vA/sA² + W·vB/sB² - 2·(dot - W·muA·muB) / (sA·sB)`, which
/// reduces to `2W(1 - r)` when neither window is floored.
struct PairTerms {
    mean: Vec<f64>,
    inv_sigma: Vec<f64>,
    self_term: Vec<f64>,
}

impl PairTerms {
    fn new(stats: &RunningStats) -> Self {
        let w = stats.window() as f64;
        let n = stats.len();
        let mut terms = Self {
            mean: Vec::with_capacity(n),
            inv_sigma: Vec::with_capacity(n),
            self_term: Vec::with_capacity(n),
        };
        for i in 0..n {
            let sigma = stats.sigma(i);
            terms.mean.push(stats.mean(i));
            terms.inv_sigma.push(1.0 / sigma);
            terms.self_term.push(w * stats.variance(i) / (sigma * sigma));
        }
        terms
    }

    #[inline]
    fn dist_sq(&self, dot: f64, i: usize, j: usize, w: f64) -> f64 {
        let cross = (dot - w * self.mean[i] * self.mean[j]) * self.inv_sigma[i] * self.inv_sigma[j];
        (self.self_term[i] + self.self_term[j] - 2.0 * cross).max(0.0)
    }
}

/// Best cell seen so far: squared distance and its `(i, j)`.
#[derive(Debug, Clone, Copy)]
struct Best {
    dist_sq: f64,
    i: usize,
    j: usize,
}

impl Best {
    const NONE: Best = Best {
        dist_sq: f64::INFINITY,
        i: usize::MAX,
        j: usize::MAX,
    };

    /// Smaller distance wins; equal distances go to the smaller `(i, j)`.
    #[inline]
    fn offer(&mut self, dist_sq: f64, i: usize, j: usize) {
        if dist_sq < self.dist_sq || (dist_sq == self.dist_sq && (i, j) < (self.i, self.j)) {
            *self = Best { dist_sq, i, j };
        }
    }

    #[cfg(feature = "parallel")]
    fn merge(mut self, other: Best) -> Best {
        self.offer(other.dist_sq, other.i, other.j);
        self
    }
}

/// Find the globally closest pair of windows whose starts differ by at least
/// `window`.
///
/// The distance matrix is scanned diagonal by diagonal: diagonal `k` pairs
/// `i` with `i + k`, and its dot products follow
/// `QT[i] = QT[i-1] - T[i-1]·T[i+k-1] + T[i+W-1]·T[i+k+W-1]`, seeded from a
/// single sliding dot product of the first window. The reported distance is
/// recomputed exactly for the winning pair.
///
/// Returns `Ok(None)` when the series is too short to hold a non-trivial pair.
pub fn tpm(series: &[f64], stats: &RunningStats) -> Result<Option<TopPair>> {
    let w = stats.window();
    let n_subs = stats.len();
    if series.len() != n_subs + w - 1 {
        return Err(Error::subsequence(0, w, series.len()));
    }
    if n_subs <= w {
        return Ok(None);
    }

    let terms = PairTerms::new(stats);
    let qt_first = sliding_dot_product(&series[..w], series)?;

    #[cfg(feature = "parallel")]
    let best = if n_subs >= MIN_PARALLEL_SUBS {
        scan_parallel(series, w, n_subs, &qt_first, &terms)
    } else {
        scan_diagonals(series, w, n_subs, w..n_subs, &qt_first, &terms)
    };
    #[cfg(not(feature = "parallel"))]
    let best = scan_diagonals(series, w, n_subs, w..n_subs, &qt_first, &terms);

    if best.i == usize::MAX {
        return Ok(None);
    }
    let distance = similarity(series, stats, best.i, best.j, f64::INFINITY)?.value();
    Ok(Some(TopPair {
        a: best.i,
        b: best.j,
        distance,
    }))
}

fn scan_diagonals(
    series: &[f64],
    w: usize,
    n_subs: usize,
    diagonals: std::ops::Range<usize>,
    qt_first: &[f64],
    terms: &PairTerms,
) -> Best {
    let wf = w as f64;
    let mut best = Best::NONE;
    for k in diagonals {
        let mut qt = qt_first[k];
        best.offer(terms.dist_sq(qt, 0, k, wf), 0, k);
        for i in 1..(n_subs - k) {
            let j = i + k;
            qt = qt - series[i - 1] * series[j - 1] + series[i + w - 1] * series[j + w - 1];
            best.offer(terms.dist_sq(qt, i, j, wf), i, j);
        }
    }
    best
}

/// Diagonals are independent, so each load-balanced range is scanned on its
/// own thread and the per-range winners are merged with the same ordering
/// as the serial scan.
#[cfg(feature = "parallel")]
fn scan_parallel(
    series: &[f64],
    w: usize,
    n_subs: usize,
    qt_first: &[f64],
    terms: &PairTerms,
) -> Best {
    use crate::algorithms::common::diagonal_ranges;
    use rayon::prelude::*;

    let ranges = diagonal_ranges(w, n_subs, rayon::current_num_threads());
    ranges
        .into_par_iter()
        .map(|(start, end)| scan_diagonals(series, w, n_subs, start..end, qt_first, terms))
        .reduce(|| Best::NONE, Best::merge)
}

/// Brute-force reference: exact distance for every admissible pair.
#[cfg(test)]
pub(crate) fn tpm_brute_force(series: &[f64], stats: &RunningStats) -> Option<TopPair> {
    let w = stats.window();
    let mut best: Option<TopPair> = None;
    for a in 0..stats.len() {
        for b in (a + w)..stats.len() {
            let d = similarity(series, stats, a, b, f64::INFINITY).ok()?.value();
            if best.map_or(true, |p| d < p.distance) {
                best = Some(TopPair { a, b, distance: d });
            }
        }
    }
    best
}
