//! Error types for motif injection.
//!
//! Configuration problems are rejected up front, subsequence range errors
//! indicate a bug in the caller, and the two search failures are the only
//! ones worth retrying with a fresh base series.

use thiserror::Error;

/// Phase of a generation run that owns a retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Second occurrence of a pair motif.
    Pair,
    /// Primary occurrences of a set or latent motif.
    Primary,
    /// Decoy occurrences injected after the primary motif.
    Hardening,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Pair => "pair",
            Phase::Primary => "primary",
            Phase::Hardening => "hardening",
        };
        f.write_str(name)
    }
}

/// Error type for generation runs and their building blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid configuration, rejected before any generation work.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A subsequence request that does not fit the series.
    #[error("Invalid subsequence at {position}: window {window} does not fit a series of length {length}")]
    InvalidSubsequence {
        position: usize,
        window: usize,
        length: usize,
    },

    /// No offset is left to host another occurrence.
    #[error("No free positions left in the series")]
    NoFreePositions,

    /// The randomized search did not satisfy its constraints within budget.
    #[error("Injection exhausted after {retries} retries in {phase} phase")]
    InjectionExhausted { phase: Phase, retries: usize },
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether regenerating the whole run from a new base series may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NoFreePositions | Error::InjectionExhausted { .. })
    }

    /// Create an error for a window that does not fit at `position`.
    pub fn subsequence(position: usize, window: usize, length: usize) -> Self {
        Self::InvalidSubsequence {
            position,
            window,
            length,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }
}
