//! Validated injection of motif occurrences into a base series.
//!
//! Every strategy works on a [`Canvas`]: the series, its running statistics
//! and the free-position registry of one generation attempt. Occurrences are
//! written with [`Canvas::place`], which samples a free offset, writes a
//! candidate, validates it and either keeps it or restores the previous
//! values and resamples, within a fixed budget.

mod hardening;
mod pair;
mod set;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::algorithms::motif_set::{larger_motif_set, smaller_distance};
use crate::algorithms::tpm::{tpm, TopPair};
use crate::base::{BaseSeries, Noise};
use crate::core::config::{GeneratorConfig, Strategy};
use crate::core::free_positions::FreePositions;
use crate::core::motif::mean_sigma;
use crate::core::running_stats::{RunningStats, VARIANCE_FLOOR};
use crate::error::{Error, Phase, Result};
use crate::metrics::euclidean::{similarity, within_radius};

/// Range the stretch factor of an occurrence is drawn from.
const STRETCH_RANGE: std::ops::Range<f64> = 0.6..1.4;

/// Output of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionResult {
    pub series: Vec<f64>,
    /// Motif sequences: the rendered shape for the set strategy, the hidden
    /// center for the latent strategy, both pair sequences for the pair
    /// strategy.
    pub motif: Vec<Vec<f64>>,
    /// Radius of each group in `positions`.
    pub radii: Vec<f64>,
    /// Start offsets, primary occurrences first, then one group per decoy set.
    pub positions: Vec<Vec<usize>>,
    /// Closest non-trivial pair of the final series.
    pub top_pair: Option<TopPair>,
}

impl InjectionResult {
    /// Offsets of the ground-truth motif.
    pub fn primary(&self) -> &[usize] {
        self.positions.first().map_or(&[], Vec::as_slice)
    }

    /// Radius reported for the ground-truth motif.
    pub fn radius(&self) -> Option<f64> {
        self.radii.first().copied()
    }

    /// Offsets of the decoy groups.
    pub fn decoys(&self) -> &[Vec<usize>] {
        self.positions.get(1..).unwrap_or(&[])
    }
}

/// Primary occurrences placed by a strategy.
#[derive(Debug)]
pub(crate) struct Placement {
    pub motif: Vec<Vec<f64>>,
    pub positions: Vec<usize>,
    /// Radius reported to the caller.
    pub radius: f64,
    /// Radius the group was validated against.
    pub check_radius: f64,
}

/// How the offset of a written occurrence is derived from the values it
/// replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    /// First replaced value.
    Start,
    /// Midpoint between the first and last replaced values.
    Midpoint,
}

impl Anchor {
    fn offset(self, current: &[f64]) -> f64 {
        match self {
            Anchor::Start => current[0],
            Anchor::Midpoint => {
                let first = current[0];
                let last = current[current.len() - 1];
                first + (last - first) / 2.0
            }
        }
    }
}

/// Mutable state of one generation attempt.
#[derive(Debug)]
pub(crate) struct Canvas {
    pub series: Vec<f64>,
    pub stats: RunningStats,
    pub free: FreePositions,
    window: usize,
    bound: Option<f64>,
}

impl Canvas {
    /// `bound` keeps written occurrences inside `[-bound, bound]`.
    pub fn new(series: Vec<f64>, window: usize, bound: Option<f64>) -> Result<Self> {
        let stats = RunningStats::calc(&series, window)?;
        let free = FreePositions::new(series.len(), window);
        Ok(Self {
            series,
            stats,
            free,
            window,
            bound,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Recompute the statistics from scratch.
    pub fn recalc(&mut self) -> Result<()> {
        self.stats = RunningStats::calc(&self.series, self.window)?;
        Ok(())
    }

    /// Closest non-trivial pair of the current series.
    pub fn top_pair(&self) -> Result<TopPair> {
        tpm(&self.series, &self.stats)?
            .ok_or_else(|| Error::subsequence(0, self.window, self.series.len()))
    }

    /// Write `values` shifted by the anchor offset at `pos` and refresh the
    /// statistics. Returns the replaced values.
    pub fn write(&mut self, pos: usize, values: &[f64], anchor: Anchor) -> Result<Vec<f64>> {
        let w = self.window;
        if values.len() != w || pos + w > self.series.len() {
            return Err(Error::subsequence(pos, values.len(), self.series.len()));
        }
        let backup = self.series[pos..pos + w].to_vec();
        let offset = clamp_offset(anchor.offset(&backup), values, self.bound);
        for (dst, v) in self.series[pos..pos + w].iter_mut().zip(values) {
            *dst = offset + v;
        }
        self.stats.update(&self.series, pos)?;
        Ok(backup)
    }

    /// Put back the values returned by [`Canvas::write`].
    pub fn restore(&mut self, pos: usize, backup: &[f64]) -> Result<()> {
        if pos + backup.len() > self.series.len() {
            return Err(Error::subsequence(pos, backup.len(), self.series.len()));
        }
        self.series[pos..pos + backup.len()].copy_from_slice(backup);
        self.stats.update(&self.series, pos)
    }

    /// Place one occurrence at a free offset.
    ///
    /// Each try draws a candidate, writes it and asks `accept`; a rejected
    /// candidate is rolled back and a new offset is sampled. The accepted
    /// offset is removed from the free registry.
    pub fn place<R, G, A>(
        &mut self,
        rng: &mut R,
        phase: Phase,
        budget: usize,
        anchor: Anchor,
        mut candidate: G,
        mut accept: A,
    ) -> Result<usize>
    where
        R: Rng + ?Sized,
        G: FnMut(&mut R) -> Result<Vec<f64>>,
        A: FnMut(&Canvas, usize) -> Result<bool>,
    {
        let mut pos = self.free.sample(rng)?;
        for retry in 0..budget {
            let values = candidate(rng)?;
            let backup = self.write(pos, &values, anchor)?;
            if accept(&*self, pos)? {
                debug!(%phase, pos, retry, "occurrence accepted");
                self.free.remove(pos)?;
                return Ok(pos);
            }
            trace!(%phase, pos, retry, "occurrence rejected");
            self.restore(pos, &backup)?;
            pos = self.free.sample(rng)?;
        }
        Err(Error::InjectionExhausted {
            phase,
            retries: budget,
        })
    }
}

/// Offset that keeps `offset + values` inside `[-bound, bound]`.
fn clamp_offset(offset: f64, values: &[f64], bound: Option<f64>) -> f64 {
    let Some(bound) = bound else {
        return offset;
    };
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let mut offset = offset;
    if offset + max > bound {
        offset = bound - max;
    }
    if offset + min < -bound {
        offset = -bound - min;
    }
    offset
}

/// Scale `values` by a factor from `U(0.6, 1.4)`.
///
/// The factor is only applied when the spread is above the variance floor
/// both before and after scaling, so the z-normalized shape is unchanged.
pub(crate) fn stretch<R: Rng + ?Sized>(mut values: Vec<f64>, rng: &mut R) -> Vec<f64> {
    let factor = rng.gen_range(STRETCH_RANGE);
    let (_, sigma) = mean_sigma(&values);
    let var = sigma * sigma;
    if var > VARIANCE_FLOOR && var * factor * factor > VARIANCE_FLOOR {
        values.iter_mut().for_each(|v| *v *= factor);
    }
    values
}

/// Copy of `values` with per-sample noise added.
pub(crate) fn with_noise<R: Rng + ?Sized>(values: &[f64], noise: &Noise, rng: &mut R) -> Vec<f64> {
    values.iter().map(|v| v + noise.sample(rng)).collect()
}

/// A radius derived from a top-pair distance, rejected when it cannot host a
/// match.
pub(crate) fn checked_radius(radius: f64, phase: Phase) -> Result<f64> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        warn!(%phase, radius, "degenerate radius");
        Err(Error::InjectionExhausted { phase, retries: 0 })
    }
}

/// Reflection bound applied to written occurrences, if the base is bounded
/// and wide enough for the motif.
fn occurrence_bound<B: BaseSeries>(config: &GeneratorConfig, base: &B) -> Option<f64> {
    base.bound()
        .filter(|&maxi| config.height.abs() <= 2.0 * maxi)
}

/// One complete generation attempt: base series, primary motif, decoys and a
/// final check of the primary group on freshly computed statistics.
pub(crate) fn inject<B, R>(config: &GeneratorConfig, base: &B, rng: &mut R) -> Result<InjectionResult>
where
    B: BaseSeries,
    R: Rng + ?Sized,
{
    let series = base.generate(config.length, rng)?;
    if series.len() != config.length {
        return Err(Error::config(format!(
            "base series has length {}, expected {}",
            series.len(),
            config.length
        )));
    }
    let mut canvas = Canvas::new(series, config.window, occurrence_bound(config, base))?;

    let placement = match config.strategy {
        Strategy::Pair => pair::inject_pair(config, &mut canvas, rng)?,
        Strategy::Set => set::inject_set(config, &mut canvas, rng)?,
        Strategy::Latent => set::inject_latent(config, &mut canvas, rng)?,
    };

    let mut positions = vec![placement.positions.clone()];
    let mut radii = vec![placement.radius];
    if config.strategy != Strategy::Pair {
        for group in hardening::harden(config, &mut canvas, placement.check_radius, rng)? {
            positions.push(group);
            radii.push(placement.check_radius);
        }
    }

    canvas.recalc()?;
    verify(config, &canvas, &placement)?;
    let top_pair = canvas.top_pair()?;

    Ok(InjectionResult {
        series: canvas.series,
        motif: placement.motif,
        radii,
        positions,
        top_pair: Some(top_pair),
    })
}

/// Re-check the primary group against statistics computed from scratch.
fn verify(config: &GeneratorConfig, canvas: &Canvas, placement: &Placement) -> Result<()> {
    let (series, stats) = (&canvas.series, &canvas.stats);
    let members = &placement.positions;
    let radius = placement.check_radius;

    let holds = match config.strategy {
        Strategy::Pair => {
            let (p0, p1) = (members[0], members[1]);
            let d = similarity(series, stats, p0, p1, f64::INFINITY)?.value();
            !smaller_distance(series, stats, p0, p1, d)?
        }
        Strategy::Set | Strategy::Latent => {
            let mut holds = true;
            'outer: for (k, &a) in members.iter().enumerate() {
                for &b in &members[k + 1..] {
                    if !within_radius(series, stats, a, b, radius)? {
                        holds = false;
                        break 'outer;
                    }
                }
                if larger_motif_set(series, stats, a, members.len(), radius)? > members.len() {
                    holds = false;
                    break;
                }
            }
            holds
        }
    };

    if holds {
        Ok(())
    } else {
        debug!(?members, radius, "primary group failed final check");
        let phase = match config.strategy {
            Strategy::Pair => Phase::Pair,
            _ => Phase::Primary,
        };
        Err(Error::InjectionExhausted { phase, retries: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motif::MotifShape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.5).collect()
    }

    #[test]
    fn test_write_and_restore() {
        let mut canvas = Canvas::new(ramp(60), 5, None).unwrap();
        let before = canvas.series.clone();
        let values = [0.0, 3.0, -1.0, 4.0, 0.0];
        let backup = canvas.write(10, &values, Anchor::Start).unwrap();
        assert_eq!(backup, before[10..15]);
        for (k, v) in values.iter().enumerate() {
            assert_eq!(canvas.series[10 + k], 5.0 + v);
        }
        let fresh = RunningStats::calc(&canvas.series, 5).unwrap();
        for i in 0..fresh.len() {
            assert!((fresh.sums[i] - canvas.stats.sums[i]).abs() < 1e-9);
        }

        canvas.restore(10, &backup).unwrap();
        assert_eq!(canvas.series, before);
    }

    #[test]
    fn test_midpoint_anchor() {
        let mut canvas = Canvas::new(ramp(40), 5, None).unwrap();
        // Replaced values are 5.0 ..= 7.0
        canvas.write(10, &[0.0; 5], Anchor::Midpoint).unwrap();
        assert!(canvas.series[10..15].iter().all(|&v| v == 6.0));
    }

    #[test]
    fn test_write_rejects_bad_range() {
        let mut canvas = Canvas::new(ramp(20), 5, None).unwrap();
        assert!(canvas.write(16, &[0.0; 5], Anchor::Start).is_err());
        assert!(canvas.write(0, &[0.0; 4], Anchor::Start).is_err());
    }

    #[test]
    fn test_clamp_offset() {
        let values = [0.0, 10.0, -4.0];
        assert_eq!(clamp_offset(3.0, &values, None), 3.0);
        assert_eq!(clamp_offset(3.0, &values, Some(20.0)), 3.0);
        // Would peak at 25
        assert_eq!(clamp_offset(15.0, &values, Some(20.0)), 10.0);
        // Would dip to -22
        assert_eq!(clamp_offset(-18.0, &values, Some(20.0)), -16.0);
    }

    #[test]
    fn test_bounded_write_stays_in_bound() {
        let series = vec![19.0; 50];
        let mut canvas = Canvas::new(series, 10, Some(20.0)).unwrap();
        let shape = MotifShape::Box.render(10, 10.0).unwrap();
        canvas.write(5, &shape, Anchor::Start).unwrap();
        assert!(canvas.series.iter().all(|v| v.abs() <= 20.0 + 1e-12));
    }

    #[test]
    fn test_stretch_respects_floor() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let flat = vec![0.0, 0.5, 0.0, 0.5];
        assert_eq!(stretch(flat.clone(), &mut rng), flat);

        let wide = MotifShape::Sine.render(20, 10.0).unwrap();
        let scaled = stretch(wide.clone(), &mut rng);
        let ratio = scaled[5] / wide[5];
        assert!((0.6..1.4).contains(&ratio));
        for (s, w) in scaled.iter().zip(&wide) {
            assert!((s - w * ratio).abs() < 1e-9);
        }
    }

    #[test]
    fn test_place_exhausts_budget() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut canvas = Canvas::new(ramp(100), 5, None).unwrap();
        let before = canvas.series.clone();
        let err = canvas
            .place(
                &mut rng,
                Phase::Primary,
                4,
                Anchor::Start,
                |_| Ok(vec![1.0; 5]),
                |_, _| Ok(false),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::InjectionExhausted {
                phase: Phase::Primary,
                retries: 4
            }
        );
        assert_eq!(canvas.series, before);
    }

    #[test]
    fn test_place_consumes_position() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut canvas = Canvas::new(ramp(100), 5, None).unwrap();
        let free_before = canvas.free.free_count();
        let pos = canvas
            .place(
                &mut rng,
                Phase::Hardening,
                1,
                Anchor::Start,
                |_| Ok(vec![0.0, 1.0, 2.0, 1.0, 0.0]),
                |_, _| Ok(true),
            )
            .unwrap();
        assert!(!canvas.free.is_free(pos));
        assert!(canvas.free.free_count() < free_before);
    }

    #[test]
    fn test_result_accessors() {
        let result = InjectionResult {
            series: vec![0.0; 10],
            motif: vec![],
            radii: vec![1.5, 3.0],
            positions: vec![vec![1, 5], vec![3, 7]],
            top_pair: None,
        };
        assert_eq!(result.primary(), &[1, 5]);
        assert_eq!(result.radius(), Some(1.5));
        assert_eq!(result.decoys(), &[vec![3, 7]]);
    }
}
