//! Decoy groups injected after the primary motif.
//!
//! Each group copies a random window of the series to `size - 1` offsets, so
//! a discovery algorithm sees a repeated pattern that is one occurrence short
//! of the ground truth.

use rand::Rng;
use tracing::{debug, instrument, warn};

use super::{Anchor, Canvas};
use crate::algorithms::motif_set::larger_motif_set;
use crate::core::config::GeneratorConfig;
use crate::error::{Error, Phase, Result};

/// Tries per decoy, per primary occurrence.
const RETRIES_PER_OCCURRENCE: usize = 5;

/// Inject up to `config.smaller` decoy groups checked at `radius`.
///
/// Running out of free offsets ends hardening early; a group cut short is
/// kept if it has at least two members.
#[instrument(skip_all, fields(groups = config.smaller, radius = radius))]
pub(super) fn harden<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    canvas: &mut Canvas,
    radius: f64,
    rng: &mut R,
) -> Result<Vec<Vec<usize>>> {
    let target = config.size - 1;
    let budget = config.size * RETRIES_PER_OCCURRENCE;
    let mut groups = Vec::with_capacity(config.smaller);

    for group in 0..config.smaller {
        let mut members = Vec::with_capacity(target);
        match decoy_group(canvas, &mut members, target, budget, radius, rng) {
            Ok(true) => groups.push(members),
            Ok(false) => debug!(group, source = members[0], "decoy source already repeats"),
            Err(Error::NoFreePositions) => {
                warn!(group, placed = members.len(), "no free positions left for decoys");
                if members.len() >= 2 {
                    groups.push(members);
                }
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(groups)
}

/// Fill `members` with copies of a random window. Returns `false` when the
/// window already belongs to a group of `target` or more.
fn decoy_group<R: Rng + ?Sized>(
    canvas: &mut Canvas,
    members: &mut Vec<usize>,
    target: usize,
    budget: usize,
    radius: f64,
    rng: &mut R,
) -> Result<bool> {
    let w = canvas.window();
    let first = canvas.free.sample(rng)?;
    let origin = canvas.series[first];
    let source: Vec<f64> = canvas.series[first..first + w]
        .iter()
        .map(|v| v - origin)
        .collect();
    canvas.free.remove(first)?;
    members.push(first);

    if larger_motif_set(&canvas.series, &canvas.stats, first, target, radius)? >= target {
        return Ok(false);
    }

    while members.len() < target {
        let pos = canvas.place(
            rng,
            Phase::Hardening,
            budget,
            Anchor::Midpoint,
            |_| Ok(source.clone()),
            |canvas, pos| {
                Ok(larger_motif_set(&canvas.series, &canvas.stats, pos, target, radius)? <= target)
            },
        )?;
        members.push(pos);
    }
    Ok(true)
}
