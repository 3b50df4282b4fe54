//! Set and latent strategies.
//!
//! Both place `size` occurrences that are pairwise within the check radius
//! and accept a new occurrence only if it does not complete a group larger
//! than the members placed so far. They differ in where the radius and the
//! reference come from.

use rand::Rng;
use tracing::{debug, instrument};

use super::{checked_radius, stretch, with_noise, Anchor, Canvas, Placement};
use crate::algorithms::match_gen::generate_match;
use crate::algorithms::motif_set::larger_motif_set;
use crate::base::Noise;
use crate::core::config::GeneratorConfig;
use crate::core::motif::Motif;
use crate::error::{Phase, Result};
use crate::metrics::euclidean::within_radius;

/// Tries per occurrence.
const RETRIES: usize = 20;
const SET_RADIUS_FACTOR: f64 = 0.9999999;
const LATENT_RADIUS_FACTOR: f64 = 0.49999999;

/// Set motif: the first occurrence is the noisy, stretched shape; its radius
/// is just below the top-pair distance of the series that contains it.
///
/// Later occurrences are matches within half the radius of the first one,
/// so every pair of occurrences is within the radius.
#[instrument(skip_all, fields(size = config.size, window = config.window))]
pub(super) fn inject_set<R: Rng + ?Sized>(
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

    let radius = checked_radius(
        SET_RADIUS_FACTOR * canvas.top_pair()?.distance,
        Phase::Primary,
    )?;
    debug!(pos0, radius, "set radius");

    let reference = Motif::from_series(&canvas.series, pos0, config.window)?;
    let mut positions = vec![pos0];
    while positions.len() < config.size {
        let pos = canvas.place(
            rng,
            Phase::Primary,
            RETRIES,
            Anchor::Start,
            |rng| Ok(stretch(generate_match(&reference, radius / 2.0, rng)?, rng)),
            |canvas, pos| joins_group(canvas, &positions, pos, radius),
        )?;
        positions.push(pos);
    }

    Ok(Placement {
        motif: vec![shape],
        positions,
        radius,
        check_radius: radius,
    })
}

/// Latent motif: occurrences are matches of a hidden center, the noisy shape,
/// within half the top-pair distance of the untouched base series.
///
/// No occurrence is the center itself, so the group is checked at twice the
/// reported radius.
#[instrument(skip_all, fields(size = config.size, window = config.window))]
pub(super) fn inject_latent<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    canvas: &mut Canvas,
    rng: &mut R,
) -> Result<Placement> {
    let radius = checked_radius(
        LATENT_RADIUS_FACTOR * canvas.top_pair()?.distance,
        Phase::Primary,
    )?;
    let check_radius = 2.0 * radius;
    debug!(radius, check_radius, "latent radius");

    let shape = config.shape.render(config.window, config.height)?;
    let noise = Noise::new(config.noise)?;
    let center_values = with_noise(&shape, &noise, rng);
    let center = Motif::new(center_values.clone())?;

    let mut positions = Vec::with_capacity(config.size);
    while positions.len() < config.size {
        let pos = canvas.place(
            rng,
            Phase::Primary,
            RETRIES,
            Anchor::Start,
            |rng| Ok(stretch(generate_match(&center, radius, rng)?, rng)),
            |canvas, pos| joins_group(canvas, &positions, pos, check_radius),
        )?;
        positions.push(pos);
    }

    Ok(Placement {
        motif: vec![center_values],
        positions,
        radius,
        check_radius,
    })
}

/// The window at `pos` is within `radius` of every member and is not part
/// of a group larger than the members plus itself.
fn joins_group(canvas: &Canvas, members: &[usize], pos: usize, radius: f64) -> Result<bool> {
    let (series, stats) = (&canvas.series, &canvas.stats);
    for &m in members {
        if !within_radius(series, stats, m, pos, radius)? {
            return Ok(false);
        }
    }
    let count = members.len() + 1;
    Ok(larger_motif_set(series, stats, pos, count, radius)? <= count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{BaseMethod, BaseSeries, RandomBase};
    use crate::core::config::Strategy;
    use crate::core::motif::MotifShape;
    use crate::metrics::euclidean::{similarity, similarity_to_reference};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn canvas_for(config: &GeneratorConfig, rng: &mut ChaCha8Rng) -> Canvas {
        let series = config.base().generate(config.length, rng).unwrap();
        Canvas::new(series, config.window, None).unwrap()
    }

    fn assert_group(canvas: &Canvas, placement: &Placement, size: usize) {
        let p = &placement.positions;
        assert_eq!(p.len(), size);
        for (k, &a) in p.iter().enumerate() {
            for &b in &p[k + 1..] {
                assert!(a.abs_diff(b) >= 2 * canvas.window());
                let d = similarity(&canvas.series, &canvas.stats, a, b, f64::INFINITY)
                    .unwrap()
                    .value();
                assert!(d <= placement.check_radius, "pair ({a}, {b}) at {d}");
            }
        }
    }

    #[test]
    fn test_set_places_group() {
        let config = GeneratorConfig::new(600, 20)
            .with_strategy(Strategy::Set)
            .with_method(BaseMethod::NormalRandomWalk)
            .with_height(40.0);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut canvas = canvas_for(&config, &mut rng);
            match inject_set(&config, &mut canvas, &mut rng) {
                Ok(placement) => {
                    assert_eq!(placement.radius, placement.check_radius);
                    let shape = MotifShape::Box.render(20, 40.0).unwrap();
                    assert_eq!(placement.motif, vec![shape]);
                    assert_group(&canvas, &placement, 3);
                    return;
                }
                Err(e) => assert!(e.is_retryable(), "{e}"),
            }
        }
        panic!("no seed placed a set motif");
    }

    #[test]
    fn test_latent_checks_twice_the_radius() {
        let config = GeneratorConfig::new(600, 20)
            .with_method(BaseMethod::NormalRandomWalk)
            .with_height(40.0);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut canvas = canvas_for(&config, &mut rng);
            let base_top = canvas.top_pair().unwrap().distance;
            let placement = match inject_latent(&config, &mut canvas, &mut rng) {
                Ok(placement) => placement,
                Err(e) => {
                    assert!(e.is_retryable(), "{e}");
                    continue;
                }
            };
            assert!((placement.radius - LATENT_RADIUS_FACTOR * base_top).abs() < 1e-12);
            assert_eq!(placement.check_radius, 2.0 * placement.radius);
            assert_group(&canvas, &placement, 3);

            // Every occurrence is a match of the hidden center
            let center = Motif::new(placement.motif[0].clone()).unwrap();
            for &p in &placement.positions {
                let d = similarity_to_reference(
                    &center,
                    &canvas.series,
                    &canvas.stats,
                    p,
                    f64::INFINITY,
                )
                .unwrap()
                .value();
                assert!(d < placement.radius + 1e-9, "occurrence {p} at {d}");
            }
            return;
        }
        panic!("no seed placed a latent motif");
    }

    #[test]
    fn test_joins_group_rejects_distant_window() {
        let base = RandomBase::new(BaseMethod::NormalRandomWalk);
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let series = base.generate(300, &mut rng).unwrap();
        let mut canvas = Canvas::new(series, 10, None).unwrap();
        let shape = MotifShape::Sine.render(10, 30.0).unwrap();
        canvas.write(20, &shape, Anchor::Start).unwrap();
        canvas.write(150, &shape, Anchor::Start).unwrap();

        assert!(joins_group(&canvas, &[20], 150, 1e-6).unwrap());
        assert!(!joins_group(&canvas, &[20], 80, 1e-6).unwrap());
    }
}
