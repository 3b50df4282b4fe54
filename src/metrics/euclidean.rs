use crate::core::motif::{mean_sigma, Motif};
use crate::core::running_stats::RunningStats;
use crate::error::{Error, Result};

/// Z-normalized Euclidean distance, possibly cut short by a best-so-far bound.
///
/// Accumulation stops as soon as the running sum of squared differences
/// reaches `best_so_far²`. A `Pruned` value is therefore only a lower bound on
/// the true distance and is always `>= best_so_far`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// All `window` terms were accumulated.
    Exact(f64),
    /// The bound was reached before the last term.
    Pruned(f64),
}

impl Distance {
    /// The returned distance, exact or lower bound.
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            Distance::Exact(d) | Distance::Pruned(d) => d,
        }
    }

    #[inline]
    pub fn is_exact(self) -> bool {
        matches!(self, Distance::Exact(_))
    }
}

/// Distance between the windows at `a` and `b` of the same series.
///
/// Means and floored standard deviations come from `stats`, which must
/// describe `series`. Pass `f64::INFINITY` as `best_so_far` for an exact
/// result.
pub fn similarity(
    series: &[f64],
    stats: &RunningStats,
    a: usize,
    b: usize,
    best_so_far: f64,
) -> Result<Distance> {
    check_window(series, stats, a)?;
    check_window(series, stats, b)?;
    let w = stats.window();
    let (mean_a, sigma_a) = (stats.mean(a), stats.sigma(a));
    let (mean_b, sigma_b) = (stats.mean(b), stats.sigma(b));
    Ok(accumulate(
        series[a..a + w]
            .iter()
            .zip(&series[b..b + w])
            .map(|(x, y)| (x - mean_a) / sigma_a - (y - mean_b) / sigma_b),
        w,
        best_so_far,
    ))
}

/// Distance between a free-standing reference and the window at `pos`.
pub fn similarity_to_reference(
    reference: &Motif,
    series: &[f64],
    stats: &RunningStats,
    pos: usize,
    best_so_far: f64,
) -> Result<Distance> {
    check_window(series, stats, pos)?;
    let w = stats.window();
    if reference.len() != w {
        return Err(Error::subsequence(pos, reference.len(), series.len()));
    }
    let (mean, sigma) = (stats.mean(pos), stats.sigma(pos));
    Ok(accumulate(
        reference
            .znorm()
            .iter()
            .zip(&series[pos..pos + w])
            .map(|(z, y)| z - (y - mean) / sigma),
        w,
        best_so_far,
    ))
}

/// Distance between two free-standing sequences of equal length.
pub fn sequence_distance(a: &[f64], b: &[f64], best_so_far: f64) -> Result<Distance> {
    if a.is_empty() || a.len() != b.len() {
        return Err(Error::subsequence(0, a.len(), b.len()));
    }
    let (mean_a, sigma_a) = mean_sigma(a);
    let (mean_b, sigma_b) = mean_sigma(b);
    Ok(accumulate(
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - mean_a) / sigma_a - (y - mean_b) / sigma_b),
        a.len(),
        best_so_far,
    ))
}

/// Whether the windows at `a` and `b` are within `radius` (inclusive).
///
/// Uses `radius` as the pruning bound and falls back to an exact pass when a
/// pruned value lands exactly on the radius.
pub fn within_radius(
    series: &[f64],
    stats: &RunningStats,
    a: usize,
    b: usize,
    radius: f64,
) -> Result<bool> {
    match similarity(series, stats, a, b, radius)? {
        Distance::Exact(d) => Ok(d <= radius),
        Distance::Pruned(d) if d > radius => Ok(false),
        Distance::Pruned(_) => {
            Ok(similarity(series, stats, a, b, f64::INFINITY)?.value() <= radius)
        }
    }
}

/// Z-normalize `values` with the unit-variance floor.
pub fn z_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let (mean, sigma) = mean_sigma(values);
    values.iter().map(|x| (x - mean) / sigma).collect()
}

#[inline]
fn check_window(series: &[f64], stats: &RunningStats, pos: usize) -> Result<()> {
    let w = stats.window();
    if series.is_empty() || pos >= stats.len() || series.len() != stats.len() + w - 1 {
        return Err(Error::subsequence(pos, w, series.len()));
    }
    Ok(())
}

#[inline]
fn accumulate(diffs: impl Iterator<Item = f64>, window: usize, best_so_far: f64) -> Distance {
    let bound = best_so_far * best_so_far;
    let mut sum = 0.0;
    let mut terms = 0;
    for diff in diffs {
        if sum >= bound {
            break;
        }
        sum += diff * diff;
        terms += 1;
    }
    if terms < window {
        Distance::Pruned(sum.sqrt())
    } else {
        Distance::Exact(sum.sqrt())
    }
}
