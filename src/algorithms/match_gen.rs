use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::motif::Motif;
use crate::core::running_stats::floored_sigma;
use crate::error::{Error, Result};
use crate::metrics::euclidean::sequence_distance;

/// Generate a sequence whose z-normalized distance to `reference` is strictly
/// below `radius`.
///
/// Starts from the mean-centered reference and visits its samples in a random
/// order, adding a uniform perturbation of at most
/// `radius / sqrt(W) * sigma` to each. The distance is tracked in O(1) per
/// step from running sums; the first perturbation that would bring it to
/// `radius` or beyond is undone and generation stops.
///
/// The result is mean-centered only up to the perturbations applied; callers
/// add their own offset when writing it into a series.
pub fn generate_match<R: Rng + ?Sized>(
    reference: &Motif,
    radius: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::config(format!(
            "match radius must be positive and finite, got {radius}"
        )));
    }
    let w = reference.len();
    let z = reference.znorm();
    let mut tracker = DistanceTracker::new(reference.centered(), z);
    let scale = radius / (w as f64).sqrt() * reference.sigma();

    let mut order: Vec<usize> = (0..w).collect();
    order.shuffle(rng);

    let mut applied = Vec::with_capacity(w);
    for &i in &order {
        let delta = rng.gen_range(-scale..=scale);
        tracker.perturb(i, delta, z[i]);
        if tracker.dist_sq() >= radius * radius {
            tracker.perturb(i, -delta, z[i]);
            break;
        }
        applied.push((i, delta));
    }

    let mut values = tracker.values;
    // The running sums drift; confirm against a direct pass and back off.
    while sequence_distance(reference.raw(), &values, f64::INFINITY)?.value() >= radius {
        match applied.pop() {
            Some((i, delta)) => values[i] -= delta,
            None => break,
        }
    }
    Ok(values)
}

/// Running sums for the distance between a changing sequence `x` and a fixed
/// z-normalized reference `z`.
struct DistanceTracker {
    values: Vec<f64>,
    sum: f64,
    sum_sq: f64,
    sum_xz: f64,
    sum_z: f64,
    sum_zz: f64,
}

impl DistanceTracker {
    fn new(start: &[f64], z: &[f64]) -> Self {
        Self {
            values: start.to_vec(),
            sum: start.iter().sum(),
            sum_sq: start.iter().map(|x| x * x).sum(),
            sum_xz: start.iter().zip(z).map(|(x, z)| x * z).sum(),
            sum_z: z.iter().sum(),
            sum_zz: z.iter().map(|z| z * z).sum(),
        }
    }

    #[inline]
    fn perturb(&mut self, i: usize, delta: f64, z_i: f64) {
        let old = self.values[i];
        let new = old + delta;
        self.values[i] = new;
        self.sum += delta;
        self.sum_sq += new * new - old * old;
        self.sum_xz += delta * z_i;
    }

    /// `sum((x_i - mu) / s - z_i)²` expanded over the running sums.
    fn dist_sq(&self) -> f64 {
        let n = self.values.len() as f64;
        let mean = self.sum / n;
        let var = (self.sum_sq / n - mean * mean).max(0.0);
        let sigma = floored_sigma(var);
        let self_term = n * var / (sigma * sigma);
        let cross = (self.sum_xz - mean * self.sum_z) / sigma;
        (self_term - 2.0 * cross + self.sum_zz).max(0.0)
    }
}
