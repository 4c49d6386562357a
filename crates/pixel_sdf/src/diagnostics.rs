//! Timing state for generations.
//!
//! Timings are owned by the generator that produced them; nothing here is
//! global. A [`Stopwatch`] is an explicit start handle that yields a
//! [`Duration`] when stopped.

use std::collections::VecDeque;
use std::time::Duration;

// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

/// Number of generations kept in a generator's timing history.
pub const HISTORY_CAPACITY: usize = 300;

/// Explicit start/end timing handle.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
  started: Instant,
}

impl Stopwatch {
  pub fn start() -> Self {
    Self {
      started: Instant::now(),
    }
  }

  /// Time since `start`, leaving the handle usable.
  pub fn elapsed(&self) -> Duration {
    self.started.elapsed()
  }

  /// Consumes the handle and returns the measured time.
  pub fn stop(self) -> Duration {
    self.started.elapsed()
  }
}

/// Wall-clock time spent in each stage of one job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTimings {
  pub parallel: Duration,
  pub gap_fill: Duration,
}

/// Wall-clock breakdown of one generation.
///
/// Stage times are the longer of the two jobs, since they run side by side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationTimings {
  pub parallel: Duration,
  pub gap_fill: Duration,
  pub merge: Duration,
  /// From `generate` to the poll that produced the field.
  pub total: Duration,
}

impl GenerationTimings {
  pub(crate) fn from_jobs(inside: StageTimings, outside: StageTimings) -> Self {
    Self {
      parallel: inside.parallel.max(outside.parallel),
      gap_fill: inside.gap_fill.max(outside.gap_fill),
      ..Default::default()
    }
  }
}

/// Timings of the most recent generations, oldest first.
///
/// Holds at most `capacity` entries; pushing beyond that drops the oldest.
#[derive(Clone, Debug)]
pub struct TimingHistory {
  entries: VecDeque<GenerationTimings>,
  capacity: usize,
}

impl TimingHistory {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      entries: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  pub(crate) fn push(&mut self, timings: GenerationTimings) {
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
    }
    self.entries.push_back(timings);
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Timings of the newest generation.
  pub fn latest(&self) -> Option<GenerationTimings> {
    self.entries.back().copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = &GenerationTimings> {
    self.entries.iter()
  }

  /// Mean wall-clock time from `generate` to field.
  pub fn mean_total(&self) -> Option<Duration> {
    let count = u32::try_from(self.entries.len()).ok().filter(|&n| n > 0)?;
    Some(self.entries.iter().map(|t| t.total).sum::<Duration>() / count)
  }

  /// The generation with the longest total time.
  pub fn slowest(&self) -> Option<GenerationTimings> {
    self.entries.iter().copied().max_by_key(|t| t.total)
  }
}

impl Default for TimingHistory {
  fn default() -> Self {
    Self::new(HISTORY_CAPACITY)
  }
}
