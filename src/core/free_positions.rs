use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inclusive block `[start, end]` of offsets that may still host an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    /// Number of offsets in the interval.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Registry of start offsets still eligible for an injected subsequence.
///
/// Offsets are kept as sorted, disjoint, non-touching intervals together with
/// a cached count, so a uniform draw never has to reject. Removing an offset
/// eagerly consumes an exclusion zone of `2 * window` on both sides, which
/// keeps every later draw at least `2 * window` away from it.
#[derive(Debug, Clone)]
pub struct FreePositions {
    window: usize,
    length: usize,
    intervals: Vec<Interval>,
    free_count: usize,
}

impl FreePositions {
    /// All offsets `0..=length - window` start out free.
    pub fn new(length: usize, window: usize) -> Self {
        let intervals = if window > 0 && length >= window {
            vec![Interval {
                start: 0,
                end: length - window,
            }]
        } else {
            Vec::new()
        };
        let free_count = intervals.iter().map(Interval::len).sum();
        Self {
            window,
            length,
            intervals,
            free_count,
        }
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Whether `offset` may still be drawn.
    pub fn is_free(&self, offset: usize) -> bool {
        self.locate(offset).is_some()
    }

    /// Draw a free offset uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        if self.free_count < 1 {
            return Err(Error::NoFreePositions);
        }
        let mut rank = rng.gen_range(0..self.free_count);
        for interval in &self.intervals {
            let len = interval.len();
            if rank < len {
                return Ok(interval.start + rank);
            }
            rank -= len;
        }
        unreachable!("free count {} exceeds interval total", self.free_count)
    }

    /// Consume `offset` and its exclusion zone, returning how many offsets
    /// were removed.
    ///
    /// The containing interval `[s, e]` is split into `[s, offset - 2w]` and
    /// `[offset + 2w, e]`; empty remainders are dropped.
    pub fn remove(&mut self, offset: usize) -> Result<usize> {
        let idx = self
            .locate(offset)
            .ok_or_else(|| Error::subsequence(offset, self.window, self.length))?;
        let interval = self.intervals.remove(idx);
        let zone = 2 * self.window;

        let left = (offset >= interval.start + zone).then(|| Interval {
            start: interval.start,
            end: offset - zone,
        });
        let right = (offset + zone <= interval.end).then(|| Interval {
            start: offset + zone,
            end: interval.end,
        });

        let kept = left.map_or(0, |iv| iv.len()) + right.map_or(0, |iv| iv.len());
        let removed = interval.len() - kept;

        if let Some(iv) = right {
            self.intervals.insert(idx, iv);
        }
        if let Some(iv) = left {
            self.intervals.insert(idx, iv);
        }
        self.free_count -= removed;
        self.check_invariants();
        Ok(removed)
    }

    /// Index of the interval holding `offset`, by binary search.
    fn locate(&self, offset: usize) -> Option<usize> {
        let idx = self.intervals.partition_point(|iv| iv.end < offset);
        self.intervals
            .get(idx)
            .filter(|iv| iv.contains(offset))
            .map(|_| idx)
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.free_count,
            self.intervals.iter().map(Interval::len).sum::<usize>(),
            "free count out of sync with intervals"
        );
        debug_assert!(
            self.intervals.windows(2).all(|w| w[0].end + 1 < w[1].start),
            "intervals must be sorted, disjoint and non-adjacent"
        );
    }
}
