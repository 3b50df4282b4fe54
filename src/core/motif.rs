use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::core::running_stats::floored_sigma;
use crate::error::{Error, Result};

/// Shape of the motif injected into the base series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotifShape {
    Box,
    Triangle,
    Semicircle,
    Trapezoid,
    PositiveFlank,
    NegativeFlank,
    Sine,
    Cosine,
    /// User-supplied raw shape; must hold exactly `window` values.
    Custom(Vec<f64>),
}

impl MotifShape {
    /// Names of the built-in shapes, in catalogue order.
    pub const NAMES: [&'static str; 8] = [
        "box",
        "triangle",
        "semicircle",
        "trapezoid",
        "positiveflank",
        "negativeflank",
        "sine",
        "cosine",
    ];

    /// Look up a built-in shape by name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "box" => Ok(Self::Box),
            "triangle" => Ok(Self::Triangle),
            "semicircle" => Ok(Self::Semicircle),
            "trapezoid" => Ok(Self::Trapezoid),
            "positiveflank" => Ok(Self::PositiveFlank),
            "negativeflank" => Ok(Self::NegativeFlank),
            "sine" => Ok(Self::Sine),
            "cosine" => Ok(Self::Cosine),
            other => Err(Error::config(format!("unknown motif shape: {other}"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Triangle => "triangle",
            Self::Semicircle => "semicircle",
            Self::Trapezoid => "trapezoid",
            Self::PositiveFlank => "positiveflank",
            Self::NegativeFlank => "negativeflank",
            Self::Sine => "sine",
            Self::Cosine => "cosine",
            Self::Custom(_) => "custom",
        }
    }

    /// Render the shape as `window` values with amplitude `height`.
    ///
    /// Windows of two or fewer values render as zeros for the built-in
    /// shapes.
    pub fn render(&self, window: usize, height: f64) -> Result<Vec<f64>> {
        if let Self::Custom(values) = self {
            if values.len() != window {
                return Err(Error::config(format!(
                    "custom shape has {} values, window is {window}",
                    values.len()
                )));
            }
            return Ok(values.clone());
        }
        if window <= 2 {
            return Ok(vec![0.0; window]);
        }
        let n = window;
        let inner = n - 2;
        let mut out = Vec::with_capacity(n);
        match self {
            Self::Box => {
                out.push(0.0);
                out.extend(std::iter::repeat(height).take(inner));
                out.push(0.0);
            }
            Self::Triangle => {
                let increase = height / ((n as f64 - 1.0) / 2.0);
                out.push(0.0);
                out.extend((2..n - 1).step_by(2).map(|k| increase * (k as f64 / 2.0)));
                let top = if n % 2 == 0 { n - 2 } else { n - 1 };
                out.extend(
                    (2..=top)
                        .rev()
                        .step_by(2)
                        .map(|k| increase * (k as f64 / 2.0)),
                );
                out.push(0.0);
            }
            Self::Semicircle => {
                let (height, sign) = if height < 0.0 { (-height, -1.0) } else { (height, 1.0) };
                let diameter = inner as f64;
                let scale = 2.0 * sign * height / diameter;
                let r2 = (diameter / 2.0) * (diameter / 2.0);
                let arc = |k: usize| scale * (r2 - (k as f64 / 2.0) * (k as f64 / 2.0)).max(0.0).sqrt();
                out.push(0.0);
                // Odd ticks walk down to the center, then back up from the
                // tick parity of the opposite side.
                let mut k = inner as isize - 1;
                while k > 0 {
                    out.push(arc(k as usize));
                    k -= 2;
                }
                if k < 0 {
                    k += 2;
                }
                while k <= inner as isize {
                    out.push(arc(k as usize));
                    k += 2;
                }
                out.push(0.0);
            }
            Self::Trapezoid => {
                let quarter = inner / 4;
                let increase = height / (quarter as f64 + 1.0);
                out.push(0.0);
                out.extend((1..=quarter).map(|k| increase * k as f64));
                out.extend(std::iter::repeat(height).take(inner - 2 * quarter));
                out.extend((1..=quarter).rev().map(|k| increase * k as f64));
                out.push(0.0);
            }
            Self::PositiveFlank => {
                let increase = height / inner as f64;
                out.push(0.0);
                out.extend((1..=inner).map(|k| increase * k as f64));
                out.push(0.0);
            }
            Self::NegativeFlank => {
                let increase = height / inner as f64;
                out.push(0.0);
                out.extend((1..=inner).rev().map(|k| increase * k as f64));
                out.push(0.0);
            }
            Self::Sine => {
                let amp = height / 2.0;
                let middle = (n - 1) / 2;
                out.extend((0..n - 1).map(|k| {
                    if n % 2 == 1 && k == middle {
                        0.0
                    } else {
                        amp * (2.0 * PI / (n as f64 - 1.0) * k as f64).sin()
                    }
                }));
                out.push(0.0);
            }
            Self::Cosine => {
                let amp = height / 2.0;
                out.extend(
                    (0..n).map(|k| amp * (PI / 2.0 + 2.0 * PI / (n as f64 - 1.0) * k as f64).sin() - amp),
                );
            }
            Self::Custom(_) => unreachable!("custom shapes return early"),
        }
        debug_assert_eq!(out.len(), window);
        Ok(out)
    }
}

/// Reference subsequence kept in mean-centered and z-normalized form.
///
/// Both forms are derived from `raw` on construction; a new reference is
/// built rather than mutating an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    raw: Vec<f64>,
    centered: Vec<f64>,
    znorm: Vec<f64>,
    mean: f64,
    sigma: f64,
}

impl Motif {
    pub fn new(raw: Vec<f64>) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::subsequence(0, 0, 0));
        }
        let (mean, sigma) = mean_sigma(&raw);
        let centered: Vec<f64> = raw.iter().map(|x| x - mean).collect();
        let znorm = centered.iter().map(|x| x / sigma).collect();
        Ok(Self {
            raw,
            centered,
            znorm,
            mean,
            sigma,
        })
    }

    /// Copy the reference out of a series window.
    pub fn from_series(series: &[f64], pos: usize, window: usize) -> Result<Self> {
        if window == 0 || pos + window > series.len() {
            return Err(Error::subsequence(pos, window, series.len()));
        }
        Self::new(series[pos..pos + window].to_vec())
    }

    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    /// Values with the mean subtracted.
    pub fn centered(&self) -> &[f64] {
        &self.centered
    }

    /// Values with the mean subtracted, divided by the floored sigma.
    pub fn znorm(&self) -> &[f64] {
        &self.znorm
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Floored standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Mean and floored standard deviation of a free-standing sequence.
pub fn mean_sigma(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|x| x * x).sum();
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, floored_sigma(var))
}
