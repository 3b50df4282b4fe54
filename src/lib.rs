//! Synthetic time series with injected, validated ground-truth motifs.
//!
//! A [`Generator`] draws a background series, injects a motif with one of
//! the [`Strategy`] variants and checks that no other group of windows in
//! the series is as large or as tight as the injected one.

pub mod algorithms;
pub mod base;
pub mod core;
pub mod error;
pub mod injection;
pub mod metrics;

pub use crate::algorithms::match_gen::generate_match;
pub use crate::algorithms::motif_set::{larger_motif_set, smaller_distance};
pub use crate::algorithms::tpm::{tpm, TopPair};
pub use crate::base::{BaseMethod, BaseSeries, RandomBase};
pub use crate::core::config::{GeneratorConfig, Strategy};
pub use crate::core::free_positions::{FreePositions, Interval};
pub use crate::core::motif::{Motif, MotifShape};
pub use crate::core::running_stats::RunningStats;
pub use crate::error::{Error, Phase, Result};
pub use crate::injection::InjectionResult;
pub use crate::metrics::euclidean::{similarity, Distance};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument, warn};

/// Motif injection engine owning the random source of its runs.
///
/// # Examples
///
/// ```
/// use motif_inject::{Generator, GeneratorConfig, MotifShape, Strategy};
///
/// let config = GeneratorConfig::new(300, 20)
///     .with_shape(MotifShape::Box)
///     .with_height(50.0)
///     .with_strategy(Strategy::Set)
///     .with_seed(7);
/// let mut generator = Generator::new(config).unwrap();
/// let result = generator.run().unwrap();
/// assert_eq!(result.series.len(), 300);
/// assert_eq!(result.primary().len(), 3);
/// ```
pub struct Generator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
}

impl Generator {
    /// Validate `config` and seed the random source from `config.seed`, or
    /// from entropy when it is `None`.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a series with the base method of the configuration.
    pub fn run(&mut self) -> Result<InjectionResult> {
        let base = self.config.base();
        self.run_with_base(&base)
    }

    /// Generate a series on top of backgrounds drawn from `base`.
    ///
    /// An attempt that runs out of free offsets or retries is abandoned and
    /// a new background is drawn, up to `config.attempts` attempts in total.
    /// Other errors are returned immediately.
    #[instrument(
        name = "run",
        skip(self, base),
        fields(
            strategy = self.config.strategy.name(),
            length = self.config.length,
            window = self.config.window,
        )
    )]
    pub fn run_with_base<B: BaseSeries>(&mut self, base: &B) -> Result<InjectionResult> {
        let mut attempt = 1;
        loop {
            match injection::inject(&self.config, base, &mut self.rng) {
                Ok(result) => {
                    info!(
                        attempt,
                        positions = ?result.primary(),
                        radius = ?result.radius(),
                        "generation complete"
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.config.attempts => {
                    warn!(attempt, error = %e, "attempt abandoned, drawing a new base series");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
