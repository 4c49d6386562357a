//! Distance transform job for one mask polarity.
//!
//! A [`DistanceJob`] runs in two stages on a background coordinator thread:
//!
//! 1. **Parallel**: the grid is split into row bands ([`BandPlan`]) and every
//!    band is scanned independently on the job's thread pool.
//! 2. **Gap-fill**: a window of rows around every internal band boundary is
//!    rescanned to propagate distances across the seams.
//!
//! Each stage is a batch of rayon tasks over disjoint `&mut` row slices. The
//! batch returns only when every band has finished, which is the barrier that
//! makes stage-1 writes visible to stage-2 reads. The foreground never blocks:
//! it reads progress from a shared counter and picks up the finished grid
//! from a channel with [`DistanceJob::poll`].

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender, TryRecvError};
use log::{debug, warn};
use rayon::prelude::*;

use crate::config::PartitionConfig;
use crate::diagnostics::{StageTimings, Stopwatch};
use crate::error::{SdfError, StateError};
use crate::grid::Grid;
use crate::kernel::{self, BandKernel};
use crate::partition::BandPlan;

/// Which mask pixels act as seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
  /// Seeds on `true` pixels. Distances measure how far a pixel is from the
  /// region.
  Inside,
  /// Seeds on `false` pixels. Distances measure how deep a pixel is inside
  /// the region.
  Outside,
}

impl Polarity {
  /// Mask value that marks a seed for this polarity.
  #[inline]
  pub fn target(self) -> bool {
    matches!(self, Self::Inside)
  }
}

impl fmt::Display for Polarity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Inside => write!(f, "inside"),
      Self::Outside => write!(f, "outside"),
    }
  }
}

/// Externally visible stage of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStage {
  NotStarted,
  Parallel,
  GapFill,
  Done,
  Failed,
}

/// Completion counter for the current stage, shared by all bands of a job.
#[derive(Clone, Copy, Debug)]
struct StageProgress {
  stage: JobStage,
  dispatched: usize,
  completed: usize,
}

impl StageProgress {
  const IDLE: Self = Self {
    stage: JobStage::NotStarted,
    dispatched: 0,
    completed: 0,
  };

  fn fraction(&self) -> f32 {
    if self.dispatched == 0 {
      0.0
    } else {
      (self.completed as f32 / self.dispatched as f32).min(1.0)
    }
  }
}

/// Message from the coordinator thread.
enum JobEvent {
  Done { grid: Grid, timings: StageTimings },
  Failed { message: String },
}

enum JobState {
  Idle,
  Running {
    events: Receiver<JobEvent>,
    _worker: JoinHandle<()>,
  },
  Done {
    grid: Grid,
    timings: StageTimings,
  },
  Failed {
    message: String,
  },
}

/// Everything the coordinator thread needs for one run.
struct JobRun {
  polarity: Polarity,
  mask: Arc<[bool]>,
  width: usize,
  plan: BandPlan,
  kernel: BandKernel,
  progress: Arc<Mutex<StageProgress>>,
}

/// Computes nearest-seed vectors for one polarity of a mask.
pub struct DistanceJob {
  polarity: Polarity,
  width: usize,
  height: usize,
  partition: PartitionConfig,
  kernel: BandKernel,
  progress: Arc<Mutex<StageProgress>>,
  state: JobState,
  max_bands_ever_used: usize,
}

impl DistanceJob {
  /// Creates an idle job for a `width` x `height` grid.
  pub fn new(polarity: Polarity, width: usize, height: usize, partition: PartitionConfig) -> Self {
    Self {
      polarity,
      width,
      height,
      partition,
      kernel: kernel::scan_band,
      progress: Arc::new(Mutex::new(StageProgress::IDLE)),
      state: JobState::Idle,
      max_bands_ever_used: 0,
    }
  }

  /// Replaces the band kernel.
  #[cfg(test)]
  pub(crate) fn with_kernel(mut self, kernel: BandKernel) -> Self {
    self.kernel = kernel;
    self
  }

  #[inline]
  pub fn polarity(&self) -> Polarity {
    self.polarity
  }

  /// Starts both stages in the background and returns immediately.
  ///
  /// `mask` must hold `width * height` pixels. Fails with
  /// [`StateError::AlreadyGenerating`] while a previous run is in flight.
  pub fn start(&mut self, mask: Arc<[bool]>, min_block_size: usize) -> Result<(), SdfError> {
    if matches!(self.state, JobState::Running { .. }) {
      return Err(StateError::AlreadyGenerating.into());
    }
    debug_assert_eq!(mask.len(), self.width * self.height);

    let plan = BandPlan::new(self.height, min_block_size, &self.partition);
    self.max_bands_ever_used = self.max_bands_ever_used.max(plan.len());
    debug!(
      "{} job: {} bands of {} rows (min block {})",
      self.polarity,
      plan.len(),
      plan.block_size,
      min_block_size
    );

    self.set_progress(StageProgress {
      stage: JobStage::Parallel,
      dispatched: plan.len(),
      completed: 0,
    });

    let (event_tx, event_rx) = async_channel::bounded::<JobEvent>(1);
    let run = JobRun {
      polarity: self.polarity,
      mask,
      width: self.width,
      plan,
      kernel: self.kernel,
      progress: Arc::clone(&self.progress),
    };

    let spawned = thread::Builder::new()
      .name(format!("sdf-{}", self.polarity))
      .spawn(move || coordinator_loop(run, event_tx));

    match spawned {
      Ok(worker) => {
        self.state = JobState::Running {
          events: event_rx,
          _worker: worker,
        };
        Ok(())
      }
      Err(e) => {
        let message = format!("failed to spawn coordinator: {}", e);
        self.fail(message.clone());
        Err(SdfError::Worker {
          polarity: self.polarity,
          message,
        })
      }
    }
  }

  /// Checks for completion without blocking.
  ///
  /// Returns `Ok(true)` once the job is done (and on every later call),
  /// `Ok(false)` while it is idle or running, and an error if a band failed.
  pub fn poll(&mut self) -> Result<bool, SdfError> {
    let event = match &self.state {
      JobState::Idle => return Ok(false),
      JobState::Done { .. } => return Ok(true),
      JobState::Failed { message } => {
        return Err(SdfError::Worker {
          polarity: self.polarity,
          message: message.clone(),
        });
      }
      JobState::Running { events, .. } => events.try_recv(),
    };

    match event {
      Ok(JobEvent::Done { grid, timings }) => {
        debug!(
          "{} job done (parallel {:?}, gap-fill {:?})",
          self.polarity, timings.parallel, timings.gap_fill
        );
        self.state = JobState::Done { grid, timings };
        Ok(true)
      }
      Ok(JobEvent::Failed { message }) => {
        self.fail(message.clone());
        Err(SdfError::Worker {
          polarity: self.polarity,
          message,
        })
      }
      Err(TryRecvError::Empty) => Ok(false),
      Err(TryRecvError::Closed) => {
        let message = "coordinator exited without a result".to_string();
        self.fail(message.clone());
        Err(SdfError::Worker {
          polarity: self.polarity,
          message,
        })
      }
    }
  }

  /// Whether a run is still in flight, after picking up any finished result.
  ///
  /// Failures reported here belong to a generation the caller already
  /// abandoned, so they only update the job state.
  pub fn is_busy(&mut self) -> bool {
    if let Err(e) = self.poll() {
      debug!("{} job: stale failure: {}", self.polarity, e);
    }
    matches!(self.state, JobState::Running { .. })
  }

  /// Whether the last run finished successfully. Sticky until restarted.
  #[inline]
  pub fn is_done(&self) -> bool {
    matches!(self.state, JobState::Done { .. })
  }

  pub fn stage(&self) -> JobStage {
    match self.state {
      JobState::Idle => JobStage::NotStarted,
      JobState::Done { .. } => JobStage::Done,
      JobState::Failed { .. } => JobStage::Failed,
      JobState::Running { .. } => self.read_progress().stage,
    }
  }

  /// Fraction of the current stage's bands that have finished.
  ///
  /// Non-decreasing within a stage, drops back when the gap-fill stage
  /// starts, and is `1.0` once the job is done.
  pub fn progress(&self) -> f32 {
    match self.state {
      JobState::Done { .. } => 1.0,
      _ => self.read_progress().fraction(),
    }
  }

  /// Stage and progress read together, so a stage transition between two
  /// separate reads cannot pair a new stage with an old fraction.
  pub fn snapshot(&self) -> (JobStage, f32) {
    match self.state {
      JobState::Idle => (JobStage::NotStarted, 0.0),
      JobState::Done { .. } => (JobStage::Done, 1.0),
      JobState::Failed { .. } => (JobStage::Failed, self.read_progress().fraction()),
      JobState::Running { .. } => {
        let progress = self.read_progress();
        (progress.stage, progress.fraction())
      }
    }
  }

  /// Most bands this job has dispatched in a single stage, over all runs.
  #[inline]
  pub fn max_bands_ever_used(&self) -> usize {
    self.max_bands_ever_used
  }

  /// The finished grid, once done.
  pub fn grid(&self) -> Option<&Grid> {
    match &self.state {
      JobState::Done { grid, .. } => Some(grid),
      _ => None,
    }
  }

  /// Per-pixel distance to the nearest seed, once done.
  pub fn distances(&self) -> Option<Vec<f32>> {
    self.grid().map(Grid::distances)
  }

  /// Stage timings of the last successful run.
  pub fn timings(&self) -> Option<StageTimings> {
    match &self.state {
      JobState::Done { timings, .. } => Some(*timings),
      _ => None,
    }
  }

  fn fail(&mut self, message: String) {
    warn!("{} job failed: {}", self.polarity, message);
    self.state = JobState::Failed { message };
  }

  fn set_progress(&self, value: StageProgress) {
    if let Ok(mut progress) = self.progress.lock() {
      *progress = value;
    }
  }

  fn read_progress(&self) -> StageProgress {
    self
      .progress
      .lock()
      .map(|progress| *progress)
      .unwrap_or(StageProgress::IDLE)
  }
}

/// Runs both stages and reports the outcome. Panics inside bands are caught
/// here and reported as failures.
fn coordinator_loop(run: JobRun, events: Sender<JobEvent>) {
  let polarity = run.polarity;
  let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_stages(run)));

  let event = match outcome {
    Ok(Ok((grid, timings))) => JobEvent::Done { grid, timings },
    Ok(Err(message)) => JobEvent::Failed { message },
    Err(payload) => JobEvent::Failed {
      message: panic_message(payload.as_ref()),
    },
  };

  if events.send_blocking(event).is_err() {
    debug!("{} job result dropped, job was discarded", polarity);
  }
}

fn run_stages(run: JobRun) -> Result<(Grid, StageTimings), String> {
  #[cfg(feature = "tracy")]
  let _span = tracing::info_span!("distance_job", polarity = %run.polarity).entered();

  let pool = rayon::ThreadPoolBuilder::new()
    .num_threads(run.plan.len().max(1))
    .thread_name({
      let polarity = run.polarity;
      move |i| format!("sdf-{}-band-{}", polarity, i)
    })
    .build()
    .map_err(|e| format!("failed to build band pool: {}", e))?;

  let mut grid = Grid::from_mask(&run.mask, run.width, run.polarity.target());
  let mut timings = StageTimings::default();

  let watch = Stopwatch::start();
  run_stage(&pool, &mut grid, &run.plan.bands, run.kernel, &run.progress);
  timings.parallel = watch.stop();

  let windows = run.plan.gap_windows(grid.height());
  debug!(
    "{} job: parallel stage done, gap-filling {} seams (half-width {})",
    run.polarity,
    windows.len(),
    run.plan.gap_half_width()
  );
  if let Ok(mut progress) = run.progress.lock() {
    *progress = StageProgress {
      stage: JobStage::GapFill,
      dispatched: windows.len(),
      completed: 0,
    };
  }

  let watch = Stopwatch::start();
  run_stage(&pool, &mut grid, &windows, run.kernel, &run.progress);
  timings.gap_fill = watch.stop();

  Ok((grid, timings))
}

/// Scans every row range on the pool and returns when all are finished.
fn run_stage(
  pool: &rayon::ThreadPool,
  grid: &mut Grid,
  ranges: &[Range<usize>],
  kernel: BandKernel,
  progress: &Mutex<StageProgress>,
) {
  #[cfg(feature = "tracy")]
  let _span = tracing::info_span!("stage", bands = ranges.len()).entered();

  let width = grid.width();
  let bands = grid.split_rows_mut(ranges);
  pool.install(|| {
    bands.into_par_iter().for_each(|band| {
      kernel(band, width);
      if let Ok(mut progress) = progress.lock() {
        progress.completed += 1;
      }
    });
  });
  // Implicit barrier: install returns once every band has finished
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "band worker panicked".to_string()
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::vector::DisplacementVector;

  fn wait(job: &mut DistanceJob) -> Result<(), SdfError> {
    for _ in 0..10_000 {
      if job.poll()? {
        return Ok(());
      }
      thread::sleep(Duration::from_millis(1));
    }
    panic!("job did not finish");
  }

  fn stripes(width: usize, height: usize) -> Arc<[bool]> {
    (0..width * height).map(|i| (i % width) % 8 < 4).collect()
  }

  #[test]
  fn idle_job_reports_not_started() {
    let mut job = DistanceJob::new(Polarity::Inside, 8, 8, PartitionConfig::default());
    assert_eq!(job.stage(), JobStage::NotStarted);
    assert_eq!(job.progress(), 0.0);
    assert!(!job.poll().unwrap());
    assert!(job.grid().is_none());
  }

  #[test]
  fn job_runs_to_done() {
    let mut job = DistanceJob::new(Polarity::Inside, 32, 300, PartitionConfig::default());
    job.start(stripes(32, 300), 3).unwrap();
    wait(&mut job).unwrap();

    assert_eq!(job.stage(), JobStage::Done);
    assert_eq!(job.progress(), 1.0);
    // extent 299 / 64 = 4 bands
    assert_eq!(job.max_bands_ever_used(), 4);

    let grid = job.grid().unwrap();
    assert_eq!(grid[(0, 0)], DisplacementVector::SEED);
    assert_eq!(grid[(5, 150)].fast_distance(), 4);
    assert!(job.timings().is_some());

    // Done is sticky
    assert!(job.poll().unwrap());
    assert!(job.is_done());
  }

  #[test]
  fn max_bands_is_monotonic_across_runs() {
    let mut job = DistanceJob::new(Polarity::Outside, 16, 300, PartitionConfig::default());
    job.start(stripes(16, 300), 3).unwrap();
    wait(&mut job).unwrap();
    assert_eq!(job.max_bands_ever_used(), 4);

    // A huge minimum block forces a single band
    job.start(stripes(16, 300), 1000).unwrap();
    wait(&mut job).unwrap();
    assert_eq!(job.max_bands_ever_used(), 4);
  }

  fn slow_kernel(cells: &mut [DisplacementVector], width: usize) {
    thread::sleep(Duration::from_millis(200));
    kernel::scan_band(cells, width);
  }

  #[test]
  fn restart_while_running_is_rejected() {
    let mut job =
      DistanceJob::new(Polarity::Inside, 8, 8, PartitionConfig::default()).with_kernel(slow_kernel);
    job.start(stripes(8, 8), 1).unwrap();
    let err = job.start(stripes(8, 8), 1).unwrap_err();
    assert!(matches!(err, SdfError::State(StateError::AlreadyGenerating)));
    wait(&mut job).unwrap();
  }

  fn panicking_kernel(_: &mut [DisplacementVector], _: usize) {
    panic!("band exploded");
  }

  #[test]
  fn band_panic_fails_the_job() {
    let mut job = DistanceJob::new(Polarity::Inside, 16, 200, PartitionConfig::default())
      .with_kernel(panicking_kernel);
    job.start(stripes(16, 200), 1).unwrap();

    let err = wait(&mut job).unwrap_err();
    match err {
      SdfError::Worker { polarity, message } => {
        assert_eq!(polarity, Polarity::Inside);
        assert!(message.contains("band exploded"));
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(job.stage(), JobStage::Failed);
    assert!(job.grid().is_none());
    // Failure is sticky as well
    assert!(job.poll().is_err());
  }
}
