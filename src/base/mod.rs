//! Background series generators.
//!
//! The injection engine only relies on the [`BaseSeries`] trait; [`RandomBase`]
//! is the default collaborator and covers the random-walk and noise families.

pub mod spline;

use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson, Triangular};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use spline::CubicSpline;

/// Generator of the background series a run injects into.
pub trait BaseSeries {
    /// Produce a fresh series of `length` values.
    fn generate<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Vec<f64>>;

    /// Absolute bound the walk is reflected at, if it is bounded.
    ///
    /// Injected occurrences are shifted to stay inside it.
    fn bound(&self) -> Option<f64> {
        None
    }
}

/// Method used to generate the background series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseMethod {
    SimpleRandomWalk,
    RealRandomWalk,
    NormalRandomWalk,
    LinearRandomWalk,
    BoundedSimpleRandomWalk,
    BoundedRealRandomWalk,
    BoundedNormalRandomWalk,
    BoundedLinearRandomWalk,
    UniformRandom,
    NormalRandom,
    PiecewiseLinearRandom,
    SplineRepeated,
}

impl BaseMethod {
    pub const ALL: [BaseMethod; 12] = [
        BaseMethod::SimpleRandomWalk,
        BaseMethod::RealRandomWalk,
        BaseMethod::NormalRandomWalk,
        BaseMethod::LinearRandomWalk,
        BaseMethod::BoundedSimpleRandomWalk,
        BaseMethod::BoundedRealRandomWalk,
        BaseMethod::BoundedNormalRandomWalk,
        BaseMethod::BoundedLinearRandomWalk,
        BaseMethod::UniformRandom,
        BaseMethod::NormalRandom,
        BaseMethod::PiecewiseLinearRandom,
        BaseMethod::SplineRepeated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseMethod::SimpleRandomWalk => "simpleRandomWalk",
            BaseMethod::RealRandomWalk => "realRandomWalk",
            BaseMethod::NormalRandomWalk => "normalRandomWalk",
            BaseMethod::LinearRandomWalk => "linearRandomWalk",
            BaseMethod::BoundedSimpleRandomWalk => "boundedSimpleRandomWalk",
            BaseMethod::BoundedRealRandomWalk => "boundedRealRandomWalk",
            BaseMethod::BoundedNormalRandomWalk => "boundedNormalRandomWalk",
            BaseMethod::BoundedLinearRandomWalk => "boundedLinearRandomWalk",
            BaseMethod::UniformRandom => "uniformRandom",
            BaseMethod::NormalRandom => "normalRandom",
            BaseMethod::PiecewiseLinearRandom => "piecewiseLinearRandom",
            BaseMethod::SplineRepeated => "splineRepeated",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| Error::config(format!("unknown base method: {name}")))
    }

    /// Whether the walk is reflected at `±maxi`.
    pub fn is_bounded(self) -> bool {
        matches!(
            self,
            BaseMethod::BoundedSimpleRandomWalk
                | BaseMethod::BoundedRealRandomWalk
                | BaseMethod::BoundedNormalRandomWalk
                | BaseMethod::BoundedLinearRandomWalk
        )
    }
}

/// Default background generator.
///
/// `delta` is the step or amplitude scale, `noise` adds `N(0, noise / 2)` to
/// every sample, `step` is the mean knot spacing of the linear walks and the
/// largest knot spacing of the spline, `times` is the number of spline knots
/// per period and `maxi` the reflection bound of the bounded walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomBase {
    pub method: BaseMethod,
    pub delta: f64,
    pub noise: f64,
    pub step: f64,
    pub times: usize,
    pub maxi: f64,
}

impl RandomBase {
    pub fn new(method: BaseMethod) -> Self {
        Self {
            method,
            delta: 1.0,
            noise: 2.0,
            step: 1.0,
            times: 3,
            maxi: 20.0,
        }
    }
}

impl BaseSeries for RandomBase {
    fn generate<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Vec<f64>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        if self.method.is_bounded() && self.maxi < self.delta {
            return Err(Error::config(format!(
                "bound {} is too tight for delta {}",
                self.maxi, self.delta
            )));
        }
        let noise = Noise::new(self.noise)?;
        let bound = self.bound();
        let delta = self.delta;

        let mut series = match self.method {
            BaseMethod::SimpleRandomWalk | BaseMethod::BoundedSimpleRandomWalk => {
                walk(length, bound, rng, |rng| {
                    if rng.gen_bool(0.5) {
                        delta
                    } else {
                        -delta
                    }
                })
            }
            BaseMethod::RealRandomWalk | BaseMethod::BoundedRealRandomWalk => {
                walk(length, bound, rng, |rng| symmetric_uniform(rng, delta))
            }
            BaseMethod::NormalRandomWalk | BaseMethod::BoundedNormalRandomWalk => {
                let step = Gaussian::new(delta)?;
                walk(length, bound, rng, |rng| step.sample(rng))
            }
            BaseMethod::LinearRandomWalk | BaseMethod::BoundedLinearRandomWalk => {
                linear_walk(length, delta, self.step, bound, rng)?
            }
            BaseMethod::UniformRandom => (0..length)
                .map(|_| symmetric_uniform(rng, delta / 2.0))
                .collect(),
            BaseMethod::NormalRandom => {
                let dist = Gaussian::new(delta / 2.0)?;
                (0..length).map(|_| dist.sample(rng)).collect()
            }
            BaseMethod::PiecewiseLinearRandom => piecewise_linear(length, delta, rng)?,
            BaseMethod::SplineRepeated => spline_repeated(length, delta, self.step, self.times, rng)?,
        };

        for v in series.iter_mut().skip(1) {
            *v += noise.sample(rng);
        }
        Ok(series)
    }

    fn bound(&self) -> Option<f64> {
        self.method.is_bounded().then_some(self.maxi)
    }
}

/// `N(0, std)`, or constant zero when `std` is not positive.
struct Gaussian(Option<Normal<f64>>);

impl Gaussian {
    fn new(std: f64) -> Result<Self> {
        if std > 0.0 {
            Normal::new(0.0, std)
                .map(|n| Self(Some(n)))
                .map_err(|e| Error::config(format!("invalid normal distribution: {e}")))
        } else {
            Ok(Self(None))
        }
    }

    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.0.as_ref().map_or(0.0, |n| n.sample(rng))
    }
}

/// Additive sample noise with standard deviation `noise / 2`.
pub(crate) struct Noise(Gaussian);

impl Noise {
    pub(crate) fn new(noise: f64) -> Result<Self> {
        Gaussian::new(noise / 2.0).map(Self)
    }

    #[inline]
    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.0.sample(rng)
    }
}

#[inline]
fn symmetric_uniform<R: Rng + ?Sized>(rng: &mut R, half_width: f64) -> f64 {
    if half_width > 0.0 {
        rng.gen_range(-half_width..half_width)
    } else {
        0.0
    }
}

/// Reflect `step` so that `prev + step` stays within `±bound`.
#[inline]
fn reflect(prev: f64, step: f64, bound: Option<f64>) -> f64 {
    match bound {
        Some(b) if prev + step < -b => step.abs(),
        Some(b) if prev + step > b => -step.abs(),
        _ => step,
    }
}

fn walk<R, F>(length: usize, bound: Option<f64>, rng: &mut R, mut step: F) -> Vec<f64>
where
    R: Rng + ?Sized,
    F: FnMut(&mut R) -> f64,
{
    let mut series = Vec::with_capacity(length);
    let mut value = 0.0;
    series.push(value);
    for _ in 1..length {
        value += reflect(value, step(rng), bound);
        series.push(value);
    }
    series
}

/// Random walk over knots spaced `Poisson(step)` samples apart, linearly
/// interpolated in between.
fn linear_walk<R: Rng + ?Sized>(
    length: usize,
    delta: f64,
    step: f64,
    bound: Option<f64>,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let increment = Gaussian::new(delta)?;
    let spacing = if step.abs() > 0.0 {
        Some(
            Poisson::new(step.abs())
                .map_err(|e| Error::config(format!("invalid poisson distribution: {e}")))?,
        )
    } else {
        None
    };
    let draw_span = |rng: &mut R| spacing.as_ref().map_or(0.0, |p| p.sample(rng));

    let mut series = Vec::with_capacity(length);
    series.push(0.0);
    let mut last = 0.0;
    let mut next = last + reflect(last, increment.sample(rng), bound);
    let mut span = draw_span(rng);
    let mut k = 1.0;
    for _ in 1..length {
        let value = if k < span {
            let v = last + (next - last) * k / span;
            k += 1.0;
            v
        } else {
            last = next;
            next += reflect(next, increment.sample(rng), bound);
            span = draw_span(rng);
            k = 1.0;
            last
        };
        series.push(value);
    }
    Ok(series)
}

/// Values drawn from two triangles peaking at `±delta / 4`.
fn piecewise_linear<R: Rng + ?Sized>(length: usize, delta: f64, rng: &mut R) -> Result<Vec<f64>> {
    if delta <= 0.0 {
        return Ok(vec![0.0; length]);
    }
    let half = Triangular::new(0.0, delta / 2.0, delta / 4.0)
        .map_err(|e| Error::config(format!("invalid triangular distribution: {e}")))?;
    Ok((0..length)
        .map(|_| {
            let v = half.sample(rng);
            if rng.gen_bool(0.5) {
                v
            } else {
                -v
            }
        })
        .collect())
}

/// A random periodic spline repeated until the series is full.
///
/// One period has `times` knots with random spacing in `1..=step` and
/// values in `±delta / 2`; the knots are laid out twice so the repeated
/// segments, taken from the middle, join smoothly.
fn spline_repeated<R: Rng + ?Sized>(
    length: usize,
    delta: f64,
    step: f64,
    times: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let max_step = (step.abs() as usize).max(1);
    let times = times.max(1);
    let mut x = Vec::with_capacity(2 * times);
    let mut y = Vec::with_capacity(2 * times);

    x.push(0.0);
    y.push(symmetric_uniform(rng, delta / 2.0));
    for i in 1..times {
        x.push(x[i - 1] + rng.gen_range(1..=max_step) as f64);
        y.push(symmetric_uniform(rng, delta / 2.0));
    }
    x.push(x[times - 1] + rng.gen_range(1..=max_step) as f64);
    y.push(y[0]);
    for i in 1..times {
        x.push(x[times] + x[i]);
        y.push(y[i]);
    }

    let spline = CubicSpline::natural(&x, &y)?;
    let start = times / 2;
    let mut series = Vec::with_capacity(length);
    while series.len() < length {
        for seg in start..start + times {
            let (from, to) = (spline.knot(seg) as usize, spline.knot(seg + 1) as usize);
            for j in from..to {
                if series.len() == length {
                    break;
                }
                series.push(spline.eval_segment(seg, (j - from) as f64));
            }
        }
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn base(method: BaseMethod) -> RandomBase {
        RandomBase::new(method)
    }

    #[test]
    fn test_names_round_trip() {
        for method in BaseMethod::ALL {
            assert_eq!(BaseMethod::from_name(method.name()).unwrap(), method);
        }
        assert!(BaseMethod::from_name("brownianBridge").is_err());
    }

    #[test]
    fn test_every_method_fills_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for method in BaseMethod::ALL {
            for length in [1, 2, 17, 500] {
                let ts = base(method).generate(length, &mut rng).unwrap();
                assert_eq!(ts.len(), length, "{}", method.name());
                assert!(ts.iter().all(|v| v.is_finite()), "{}", method.name());
            }
        }
    }

    #[test]
    fn test_walks_start_at_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for method in [
            BaseMethod::SimpleRandomWalk,
            BaseMethod::NormalRandomWalk,
            BaseMethod::BoundedLinearRandomWalk,
        ] {
            let ts = base(method).generate(50, &mut rng).unwrap();
            assert_eq!(ts[0], 0.0);
        }
    }

    #[test]
    fn test_simple_walk_steps_without_noise() {
        let mut gen = base(BaseMethod::SimpleRandomWalk);
        gen.noise = 0.0;
        gen.delta = 2.5;
        let ts = gen.generate(200, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        for w in ts.windows(2) {
            assert!(((w[1] - w[0]).abs() - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bounded_walk_stays_within_bound() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for method in [
            BaseMethod::BoundedSimpleRandomWalk,
            BaseMethod::BoundedRealRandomWalk,
            BaseMethod::BoundedNormalRandomWalk,
            BaseMethod::BoundedLinearRandomWalk,
        ] {
            let mut gen = base(method);
            gen.noise = 0.0;
            gen.maxi = 3.0;
            gen.delta = 1.0;
            let ts = gen.generate(5000, &mut rng).unwrap();
            // A reflected Gaussian step can overshoot by at most its own size
            let limit = if method == BaseMethod::BoundedSimpleRandomWalk { 3.0 } else { 12.0 };
            assert!(
                ts.iter().all(|v| v.abs() <= limit),
                "{} left its bound",
                method.name()
            );
            assert_eq!(gen.bound(), Some(3.0));
        }
        assert_eq!(base(BaseMethod::UniformRandom).bound(), None);
    }

    #[test]
    fn test_bound_tighter_than_delta_rejected() {
        let mut gen = base(BaseMethod::BoundedRealRandomWalk);
        gen.maxi = 0.5;
        gen.delta = 1.0;
        let err = gen.generate(10, &mut ChaCha8Rng::seed_from_u64(5)).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn test_uniform_range() {
        let mut gen = base(BaseMethod::UniformRandom);
        gen.noise = 0.0;
        gen.delta = 4.0;
        let ts = gen.generate(1000, &mut ChaCha8Rng::seed_from_u64(6)).unwrap();
        assert!(ts.iter().all(|v| v.abs() <= 2.0));
    }

    #[test]
    fn test_piecewise_linear_range() {
        let mut gen = base(BaseMethod::PiecewiseLinearRandom);
        gen.noise = 0.0;
        gen.delta = 8.0;
        let ts = gen.generate(1000, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert!(ts.iter().all(|v| v.abs() <= 4.0));
        assert!(ts.iter().any(|v| *v > 0.0) && ts.iter().any(|v| *v < 0.0));
    }

    #[test]
    fn test_spline_repeats_periodically() {
        let mut gen = base(BaseMethod::SplineRepeated);
        gen.noise = 0.0;
        gen.delta = 10.0;
        gen.step = 5.0;
        gen.times = 4;
        let ts = gen.generate(400, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        // The period is the distance between repeated values of the first sample
        let period = (1..ts.len())
            .find(|&p| (0..ts.len() - p).all(|i| (ts[i] - ts[i + p]).abs() < 1e-9))
            .unwrap();
        assert!(period >= 4 && period <= 20, "period {period}");
    }

    #[test]
    fn test_reproducible() {
        for method in BaseMethod::ALL {
            let a = base(method).generate(300, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
            let b = base(method).generate(300, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
            assert_eq!(a, b, "{}", method.name());
        }
    }
}
