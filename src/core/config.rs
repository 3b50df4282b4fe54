use serde::{Deserialize, Serialize};

use crate::base::{BaseMethod, RandomBase};
use crate::core::motif::MotifShape;
use crate::error::{Error, Result};

/// How the ground-truth motif is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Two occurrences that must remain the closest pair in the series.
    Pair,
    /// `size` occurrences within the series' own top-pair distance.
    Set,
    /// `size` occurrences around a hidden center, calibrated to half the
    /// base series' top-pair distance.
    Latent,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Pair => "pair",
            Strategy::Set => "set",
            Strategy::Latent => "latent",
        }
    }

    /// Accepts the short names and the `"<name> motif"` forms.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.strip_suffix(" motif").unwrap_or(name) {
            "pair" => Ok(Strategy::Pair),
            "set" => Ok(Strategy::Set),
            "latent" => Ok(Strategy::Latent),
            _ => Err(Error::config(format!("unknown strategy: {name}"))),
        }
    }
}

/// Parameters of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Series length.
    pub length: usize,
    /// Subsequence length shared by every occurrence.
    pub window: usize,
    /// Number of primary occurrences (set and latent strategies).
    pub size: usize,
    pub shape: MotifShape,
    /// Motif amplitude.
    pub height: f64,
    pub strategy: Strategy,
    pub method: BaseMethod,
    /// Step or amplitude scale of the base series.
    pub delta: f64,
    /// Noise level; samples get `N(0, noise / 2)`.
    pub noise: f64,
    pub step: f64,
    pub times: usize,
    /// Reflection bound of the bounded walks.
    pub maxi: f64,
    /// Number of decoy groups injected after the primary motif (set and
    /// latent strategies).
    pub smaller: usize,
    /// Whole-run attempts before a retryable failure is returned.
    pub attempts: usize,
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            length: 4000,
            window: 30,
            size: 3,
            shape: MotifShape::Box,
            height: 10.0,
            strategy: Strategy::Latent,
            method: BaseMethod::BoundedNormalRandomWalk,
            delta: 1.0,
            noise: 2.0,
            step: 1.0,
            times: 3,
            maxi: 20.0,
            smaller: 1,
            attempts: 10,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new(length: usize, window: usize) -> Self {
        Self {
            length,
            window,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_shape(mut self, shape: MotifShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_method(mut self, method: BaseMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_times(mut self, times: usize) -> Self {
        self.times = times;
        self
    }

    pub fn with_maxi(mut self, maxi: f64) -> Self {
        self.maxi = maxi;
        self
    }

    pub fn with_smaller(mut self, smaller: usize) -> Self {
        self.smaller = smaller;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every parameter, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.length < 1 {
            return Err(Error::config("length must be at least 1"));
        }
        if self.window < 1 {
            return Err(Error::config("window must be at least 1"));
        }
        if self.size < 3 {
            return Err(Error::config(format!(
                "size must be at least 3, got {}",
                self.size
            )));
        }
        let needed = self
            .size
            .checked_mul(2)
            .and_then(|s| s.checked_sub(1))
            .and_then(|s| s.checked_mul(self.window));
        match needed {
            Some(needed) if self.length >= needed => {}
            Some(needed) => {
                return Err(Error::config(format!(
                    "length {} cannot hold {} occurrences of window {} (needs {needed})",
                    self.length, self.size, self.window
                )));
            }
            None => {
                return Err(Error::config(format!(
                    "length {} cannot hold {} occurrences of window {} (overflows usize)",
                    self.length, self.size, self.window
                )));
            }
        }
        if self.attempts < 1 {
            return Err(Error::config("attempts must be at least 1"));
        }
        for (name, value) in [
            ("delta", self.delta),
            ("noise", self.noise),
            ("height", self.height),
            ("step", self.step),
            ("maxi", self.maxi),
        ] {
            if !value.is_finite() {
                return Err(Error::config(format!("{name} must be finite, got {value}")));
            }
        }
        if self.method.is_bounded() && self.maxi < self.delta {
            return Err(Error::config(format!(
                "maxi {} must be at least delta {} for {}",
                self.maxi,
                self.delta,
                self.method.name()
            )));
        }
        if self.method == BaseMethod::SplineRepeated && self.times < 1 {
            return Err(Error::config("times must be at least 1 for splineRepeated"));
        }
        if let MotifShape::Custom(values) = &self.shape {
            if values.len() != self.window {
                return Err(Error::config(format!(
                    "custom shape has {} values, window is {}",
                    values.len(),
                    self.window
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(Error::config("custom shape values must be finite"));
            }
        }
        Ok(())
    }

    /// Background generator described by this configuration.
    pub fn base(&self) -> RandomBase {
        RandomBase {
            method: self.method,
            delta: self.delta,
            noise: self.noise,
            step: self.step,
            times: self.times,
            maxi: self.maxi,
        }
    }
}
