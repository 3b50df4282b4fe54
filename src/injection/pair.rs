//! Pair strategy: two occurrences that form the closest pair of the series.

use rand::Rng;
use tracing::{debug, instrument};

use super::{checked_radius, stretch, with_noise, Anchor, Canvas, Placement};
use crate::algorithms::match_gen::generate_match;
use crate::algorithms::motif_set::smaller_distance;
use crate::base::Noise;
use crate::core::config::GeneratorConfig;
use crate::core::motif::Motif;
use crate::error::{Phase, Result};
use crate::metrics::euclidean::similarity;

/// Tries for the second occurrence on top of the series length.
const EXTRA_RETRIES: usize = 100;

/// Inject the noisy, stretched shape, then a match of it closer than the
/// top pair of the series, at an offset where no other pair touching it is
/// as close.
#[instrument(skip_all, fields(window = config.window))]
pub(super) fn inject_pair<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    canvas: &mut Canvas,
    rng: &mut R,
) -> Result<Placement> {
    let shape = config.shape.render(config.window, config.height)?;
    let noise = Noise::new(config.noise)?;
    let first = stretch(with_noise(&shape, &noise, rng), rng);

    let pos0 = canvas.free.sample(rng)?;
    canvas.write(pos0, &first, Anchor::Start)?;
    canvas.free.remove(pos0)?;

    let limit = checked_radius(canvas.top_pair()?.distance, Phase::Pair)?;
    debug!(pos0, limit, "pair distance limit");

    let reference = Motif::from_series(&canvas.series, pos0, config.window)?;
    let mut second = Vec::new();
    let pos1 = canvas.place(
        rng,
        Phase::Pair,
        config.length + EXTRA_RETRIES,
        Anchor::Start,
        |rng| {
            second = stretch(generate_match(&reference, limit, rng)?, rng);
            Ok(second.clone())
        },
        |canvas, pos| is_closest_pair(canvas, pos0, pos, limit),
    )?;

    let distance = similarity(&canvas.series, &canvas.stats, pos0, pos1, f64::INFINITY)?.value();
    debug!(pos1, distance, "pair placed");

    Ok(Placement {
        motif: vec![first, second],
        positions: vec![pos0, pos1],
        radius: distance,
        check_radius: distance,
    })
}

/// `(pos0, pos1)` is closer than `limit` and no other pair touching the
/// neighbourhood of `pos1` is as close.
fn is_closest_pair(canvas: &Canvas, pos0: usize, pos1: usize, limit: f64) -> Result<bool> {
    let (series, stats) = (&canvas.series, &canvas.stats);
    let d = similarity(series, stats, pos0, pos1, f64::INFINITY)?.value();
    Ok(d < limit && !smaller_distance(series, stats, pos0, pos1, d)?)
}
