use crate::error::{Error, Result};

/// Variance below which a window is treated as flat and given unit spread.
pub const VARIANCE_FLOOR: f64 = 1.0;

/// Standard deviation used for z-normalization: `sqrt(var)`, or 1 for
/// windows whose variance falls below [`VARIANCE_FLOOR`].
#[inline]
pub fn floored_sigma(var: f64) -> f64 {
    if var < VARIANCE_FLOOR {
        1.0
    } else {
        var.sqrt()
    }
}

/// Sliding sums and sums of squares for every window of length `window`.
///
/// `sums[i]` and `sum_squares[i]` describe `series[i..i + window]`. The
/// buffers are filled once per base series by [`RunningStats::calc`] and kept
/// current after each localized edit with [`RunningStats::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStats {
    window: usize,
    pub sums: Vec<f64>,
    pub sum_squares: Vec<f64>,
}

impl RunningStats {
    /// Compute the statistics of every window in one O(n) pass.
    pub fn calc(series: &[f64], window: usize) -> Result<Self> {
        if series.is_empty() || window == 0 || series.len() < window {
            return Err(Error::subsequence(0, window, series.len()));
        }
        let n_subs = series.len() - window + 1;
        let mut stats = Self {
            window,
            sums: vec![0.0; n_subs],
            sum_squares: vec![0.0; n_subs],
        };
        stats.seed_first(series);
        stats.slide(series, 0, n_subs - 1);
        Ok(stats)
    }

    /// Refresh the entries whose window overlaps a length-`window` edit
    /// starting at `edited`, i.e. `[edited - window + 1, edited + window - 1]`.
    ///
    /// Each entry is rebuilt from the first unaffected entry on its left with
    /// the same recurrence `calc` uses.
    pub fn update(&mut self, series: &[f64], edited: usize) -> Result<()> {
        let n_subs = self.len();
        if series.len() != n_subs + self.window - 1 || edited >= n_subs {
            return Err(Error::subsequence(edited, self.window, series.len()));
        }
        let mut start = edited.saturating_sub(self.window - 1);
        let end = (edited + self.window - 1).min(n_subs - 1);
        if start == 0 {
            self.seed_first(series);
            start = 1;
        }
        if start <= end {
            self.slide(series, start - 1, end);
        }
        Ok(())
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn mean(&self, i: usize) -> f64 {
        self.sums[i] / self.window as f64
    }

    /// Population variance of window `i`, clamped at 0.
    #[inline]
    pub fn variance(&self, i: usize) -> f64 {
        let mu = self.mean(i);
        (self.sum_squares[i] / self.window as f64 - mu * mu).max(0.0)
    }

    /// Floored standard deviation of window `i`.
    #[inline]
    pub fn sigma(&self, i: usize) -> f64 {
        floored_sigma(self.variance(i))
    }

    fn seed_first(&mut self, series: &[f64]) {
        let head = &series[..self.window];
        self.sums[0] = head.iter().sum();
        self.sum_squares[0] = head.iter().map(|x| x * x).sum();
    }

    /// Fill entries `from + 1..=to` from entry `from`.
    fn slide(&mut self, series: &[f64], from: usize, to: usize) {
        let w = self.window;
        for i in from..to {
            let out = series[i];
            let inc = series[i + w];
            self.sums[i + 1] = self.sums[i] - out + inc;
            self.sum_squares[i + 1] = self.sum_squares[i] - out * out + inc * inc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_running_stats_simple() {
        // Windows [1,2,3], [2,3,4], [3,4,5]
        let ts = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = RunningStats::calc(&ts, 3).unwrap();

        assert_eq!(stats.len(), 3);
        assert_relative_eq!(stats.sums[0], 6.0);
        assert_relative_eq!(stats.sums[2], 12.0);
        assert_relative_eq!(stats.sum_squares[1], 29.0);
        assert_relative_eq!(stats.mean(1), 3.0);
        assert_relative_eq!(stats.variance(0), 2.0 / 3.0, epsilon = 1e-12);
        // Variance 2/3 is below the floor
        assert_relative_eq!(stats.sigma(0), 1.0);
    }

    #[test]
    fn test_sigma_above_floor() {
        let ts = vec![0.0, 10.0, 0.0, 10.0];
        let stats = RunningStats::calc(&ts, 2).unwrap();
        assert_relative_eq!(stats.variance(0), 25.0, epsilon = 1e-12);
        assert_relative_eq!(stats.sigma(0), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_series() {
        let ts = vec![5.0; 10];
        let stats = RunningStats::calc(&ts, 4).unwrap();
        for i in 0..stats.len() {
            assert_relative_eq!(stats.mean(i), 5.0, epsilon = 1e-12);
            assert!(stats.variance(i) < 1e-10);
            assert_relative_eq!(stats.sigma(i), 1.0);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(RunningStats::calc(&[], 3).is_err());
        assert!(RunningStats::calc(&[1.0, 2.0], 3).is_err());
        assert!(RunningStats::calc(&[1.0, 2.0], 0).is_err());

        let ts = vec![1.0; 10];
        let mut stats = RunningStats::calc(&ts, 3).unwrap();
        assert!(stats.update(&ts, 8).is_err());
        assert!(stats.update(&ts[..9], 0).is_err());
    }

    #[test]
    fn test_update_at_edges() {
        let mut ts: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin() * 4.0).collect();
        let w = 6;
        let mut stats = RunningStats::calc(&ts, w).unwrap();

        for (edited, value) in [(0, 9.0), (24, -3.0), (12, 2.5)] {
            for v in &mut ts[edited..edited + w] {
                *v += value;
            }
            stats.update(&ts, edited).unwrap();
            let full = RunningStats::calc(&ts, w).unwrap();
            for i in 0..full.len() {
                assert_relative_eq!(stats.sums[i], full.sums[i], epsilon = 1e-9);
                assert_relative_eq!(stats.sum_squares[i], full.sum_squares[i], epsilon = 1e-9);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_update_matches_calc(
            mut ts in prop::collection::vec(-50.0f64..50.0, 40..120),
            window in 2usize..12,
            edit_seed in any::<usize>(),
            patch in prop::collection::vec(-50.0f64..50.0, 12),
        ) {
            let mut stats = RunningStats::calc(&ts, window).unwrap();
            let edited = edit_seed % (ts.len() - window + 1);
            ts[edited..edited + window].copy_from_slice(&patch[..window]);
            stats.update(&ts, edited).unwrap();
            let full = RunningStats::calc(&ts, window).unwrap();
            for i in 0..full.len() {
                let tol = 1e-9 * full.sum_squares[i].abs().max(1.0);
                prop_assert!((stats.sums[i] - full.sums[i]).abs() <= tol);
                prop_assert!((stats.sum_squares[i] - full.sum_squares[i]).abs() <= tol);
            }
        }
    }
}
