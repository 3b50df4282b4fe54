//! Exclusivity checks run after every candidate placement.
//!
//! Both checks re-scan the whole series, so they dominate the cost of a
//! generation run; they rely on [`within_radius`] pruning to stay cheap for
//! far-apart windows.

use std::collections::BTreeSet;

use tracing::trace;

use crate::core::running_stats::RunningStats;
use crate::error::{Error, Result};
use crate::metrics::euclidean::within_radius;

/// Offsets whose window overlaps the window at `pos`, clamped to the series.
fn neighbourhood(pos: usize, window: usize, n_subs: usize) -> std::ops::RangeInclusive<usize> {
    pos.saturating_sub(window - 1)..=(pos + window - 1).min(n_subs - 1)
}

/// Size of the largest group of mutually non-overlapping windows within
/// `radius` of one anchor, where anchors are the windows overlapping `pos`
/// and every window matching one of them.
///
/// Anchors overlapping `pos` are scanned first, starting with `pos` itself.
/// For each anchor the series is walked left to right and a matching window
/// is counted and then skipped past, so counted windows never overlap each
/// other or the anchor. The anchor counts as one member.
///
/// Returns early with the first count above `target`, since callers only
/// compare the result against `target`.
pub fn larger_motif_set(
    series: &[f64],
    stats: &RunningStats,
    pos: usize,
    target: usize,
    radius: f64,
) -> Result<usize> {
    let w = stats.window();
    let n_subs = stats.len();
    if pos >= n_subs {
        return Err(Error::subsequence(pos, w, series.len()));
    }

    let near = neighbourhood(pos, w, n_subs);
    let mut others = BTreeSet::new();
    for i in near.clone() {
        for j in 0..n_subs {
            if !near.contains(&j) && within_radius(series, stats, i, j, radius)? {
                others.insert(j);
            }
        }
    }

    let anchors = std::iter::once(pos)
        .chain(near.filter(|&i| i != pos))
        .chain(others);

    let mut largest = 1;
    for anchor in anchors {
        let size = greedy_count(series, stats, anchor, target, radius)?;
        if size > target {
            trace!(anchor, size, target, "larger motif set found");
            return Ok(size);
        }
        largest = largest.max(size);
    }
    Ok(largest)
}

/// Count the anchor plus a left-to-right greedy selection of non-overlapping
/// matches, stopping once the count exceeds `target`.
fn greedy_count(
    series: &[f64],
    stats: &RunningStats,
    anchor: usize,
    target: usize,
    radius: f64,
) -> Result<usize> {
    let w = stats.window();
    let mut size = 1;
    let mut j = 0;
    while j < stats.len() {
        if j.abs_diff(anchor) >= w && within_radius(series, stats, anchor, j, radius)? {
            size += 1;
            if size > target {
                break;
            }
            j += w;
        } else {
            j += 1;
        }
    }
    Ok(size)
}

/// Whether any non-trivial pair involving a window that overlaps `pos1` is
/// at least as close as `distance`, other than the pair `(pos0, pos1)`.
///
/// Pairs not touching the neighbourhood of `pos1` are unchanged by the last
/// edit and are not rescanned.
pub fn smaller_distance(
    series: &[f64],
    stats: &RunningStats,
    pos0: usize,
    pos1: usize,
    distance: f64,
) -> Result<bool> {
    let w = stats.window();
    let n_subs = stats.len();
    if pos0 >= n_subs || pos1 >= n_subs {
        return Err(Error::subsequence(pos0.max(pos1), w, series.len()));
    }
    for i in neighbourhood(pos1, w, n_subs) {
        for j in 0..n_subs {
            if (i == pos1 && j == pos0) || i.abs_diff(j) < w {
                continue;
            }
            if within_radius(series, stats, i, j, distance)? {
                trace!(i, j, distance, "closer pair found");
                return Ok(true);
            }
        }
    }
    Ok(false)
}
