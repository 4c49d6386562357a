//! Signed distance field generation from a binary mask.
//!
//! The generator owns one [`DistanceJob`] per polarity. `generate` starts both
//! in the background and returns at once; the caller then polls
//! [`SdfGenerator::try_advance`] (typically once per frame) until it yields
//! the merged field.
//!
//! ```no_run
//! use pixel_sdf::SdfGenerator;
//!
//! # fn main() -> Result<(), pixel_sdf::SdfError> {
//! let mask = vec![false; 64 * 64];
//! let mut generator = SdfGenerator::new(&mask, 64)?;
//! generator.generate(8, 1.0)?;
//! loop {
//!   if let Some(field) = generator.try_advance()? {
//!     println!("{} values", field.len());
//!     break;
//!   }
//!   // do other work, then poll again next tick
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::config::SdfConfig;
use crate::diagnostics::{GenerationTimings, Stopwatch, TimingHistory};
use crate::error::{ConfigurationError, MAX_DIMENSION, MIN_DIMENSION, SdfError, StateError};
use crate::field::SignedField;
use crate::job::{DistanceJob, Polarity};
use crate::vector::DisplacementVector;

/// Largest radius `generate` accepts; bigger values are clamped.
///
/// Keeps `max_distance` far below the length of
/// [`DisplacementVector::INFINITE`], so unreached pixels still saturate.
pub const MAX_RADIUS: u32 = 1 << 24;

/// Lifecycle of a generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorState {
  /// `generate` has never been called.
  Idle,
  Generating,
  /// The field of the last generation is available.
  Complete,
  /// The last generation was abandoned after a worker failure.
  Failed,
}

/// Parameters of the generation in flight.
#[derive(Clone, Copy, Debug)]
struct Request {
  radius: u32,
  skew: f32,
  max_distance: f32,
  watch: Stopwatch,
}

/// Produces a normalized signed distance field from a boolean mask.
pub struct SdfGenerator {
  mask: Arc<[bool]>,
  width: usize,
  height: usize,
  config: SdfConfig,
  inside: DistanceJob,
  outside: DistanceJob,
  state: GeneratorState,
  request: Option<Request>,
  field: Option<SignedField>,
  history: TimingHistory,
}

impl SdfGenerator {
  /// Creates a generator with the default configuration.
  ///
  /// Fails if the mask is not a whole number of rows or is smaller than 8x8.
  pub fn new(mask: &[bool], width: usize) -> Result<Self, SdfError> {
    Self::with_config(mask, width, SdfConfig::default())
  }

  pub fn with_config(mask: &[bool], width: usize, config: SdfConfig) -> Result<Self, SdfError> {
    if width == 0 || mask.len() % width != 0 {
      return Err(
        ConfigurationError::MaskLength {
          len: mask.len(),
          width,
        }
        .into(),
      );
    }
    let height = mask.len() / width;
    check_dimensions(width, height)?;

    Ok(Self {
      mask: Arc::from(mask),
      width,
      height,
      inside: DistanceJob::new(Polarity::Inside, width, height, config.partition),
      outside: DistanceJob::new(Polarity::Outside, width, height, config.partition),
      config,
      state: GeneratorState::Idle,
      request: None,
      field: None,
      history: TimingHistory::default(),
    })
  }

  /// Starts a generation and returns immediately.
  ///
  /// `radius` sets the distance mapped to the `[0, 1]` range: values saturate
  /// at `distance(radius, radius) / 2` from the boundary. `skew` weights the
  /// two sides; 1.0 is symmetric, 2.0 favors the inside, 0.0 the outside.
  ///
  /// Fails with [`StateError::AlreadyGenerating`] while a generation is in
  /// flight.
  pub fn generate(&mut self, radius: u32, skew: f32) -> Result<(), SdfError> {
    // Jobs of an abandoned generation may still be running their bands
    if self.state == GeneratorState::Generating || self.inside.is_busy() || self.outside.is_busy()
    {
      return Err(StateError::AlreadyGenerating.into());
    }

    if radius > MAX_RADIUS {
      warn!("SDF radius {} clamped to {}", radius, MAX_RADIUS);
    }
    let radius = radius.min(MAX_RADIUS);
    let extent = radius as i32;
    let max_distance = DisplacementVector::new(extent, extent).distance();
    let min_block_size = max_distance.ceil() as usize;

    self.field = None;
    self.request = Some(Request {
      radius,
      skew,
      max_distance,
      watch: Stopwatch::start(),
    });

    let started = self
      .inside
      .start(Arc::clone(&self.mask), min_block_size)
      .and_then(|()| self.outside.start(Arc::clone(&self.mask), min_block_size));

    match started {
      Ok(()) => {
        self.state = GeneratorState::Generating;
        Ok(())
      }
      Err(e) => {
        self.state = GeneratorState::Failed;
        Err(e)
      }
    }
  }

  /// Starts a generation with the configured radius and skew.
  pub fn generate_default(&mut self) -> Result<(), SdfError> {
    self.generate(self.config.radius, self.config.skew)
  }

  /// Polls the running generation without blocking.
  ///
  /// Returns `Ok(None)` while either job is still running. On the poll where
  /// both jobs are first done the field is merged and returned; later polls
  /// return the same field. A worker failure is returned once as
  /// [`SdfError::Worker`]; after that the generator stays
  /// [`GeneratorState::Failed`] until the next `generate`.
  pub fn try_advance(&mut self) -> Result<Option<&SignedField>, SdfError> {
    match self.state {
      GeneratorState::Idle => return Err(StateError::NotGenerated.into()),
      GeneratorState::Failed => return Err(StateError::Failed.into()),
      GeneratorState::Complete => return Ok(self.field.as_ref()),
      GeneratorState::Generating => {}
    }

    // Poll both so a failure in either is picked up on the same tick
    let inside = self.inside.poll();
    let outside = self.outside.poll();
    let (inside_done, outside_done) = match (inside, outside) {
      (Ok(inside_done), Ok(outside_done)) => (inside_done, outside_done),
      (Err(e), _) | (_, Err(e)) => {
        warn!("Abandoning SDF generation: {e}");
        self.state = GeneratorState::Failed;
        return Err(e);
      }
    };
    if !(inside_done && outside_done) {
      return Ok(None);
    }

    self.merge()?;
    Ok(self.field.as_ref())
  }

  /// The field of the last completed generation.
  pub fn field(&self) -> Result<&SignedField, SdfError> {
    match self.state {
      GeneratorState::Idle => Err(StateError::NotGenerated.into()),
      GeneratorState::Generating => Err(StateError::InProgress.into()),
      GeneratorState::Failed => Err(StateError::Failed.into()),
      GeneratorState::Complete => self
        .field
        .as_ref()
        .ok_or_else(|| StateError::InProgress.into()),
    }
  }

  #[inline]
  pub fn state(&self) -> GeneratorState {
    self.state
  }

  /// Mean progress of both jobs in their current stage.
  pub fn progress(&self) -> f32 {
    (self.inside.progress() + self.outside.progress()) * 0.5
  }

  pub fn inside_progress(&self) -> f32 {
    self.inside.progress()
  }

  pub fn outside_progress(&self) -> f32 {
    self.outside.progress()
  }

  /// Peak number of band workers across both jobs.
  pub fn max_threads_used(&self) -> usize {
    self.inside.max_bands_ever_used() + self.outside.max_bands_ever_used()
  }

  /// Job seeded on `true` pixels.
  pub fn inside_job(&self) -> &DistanceJob {
    &self.inside
  }

  /// Job seeded on `false` pixels.
  pub fn outside_job(&self) -> &DistanceJob {
    &self.outside
  }

  pub fn last_timings(&self) -> Option<GenerationTimings> {
    self.history.latest()
  }

  /// Timings of recent completed generations, oldest first.
  pub fn timing_history(&self) -> &TimingHistory {
    &self.history
  }

  #[inline]
  pub fn width(&self) -> usize {
    self.width
  }

  #[inline]
  pub fn height(&self) -> usize {
    self.height
  }

  pub fn config(&self) -> &SdfConfig {
    &self.config
  }

  #[cfg(test)]
  pub(crate) fn with_kernels(
    mut self,
    inside: crate::kernel::BandKernel,
    outside: crate::kernel::BandKernel,
  ) -> Self {
    self.inside = self.inside.with_kernel(inside);
    self.outside = self.outside.with_kernel(outside);
    self
  }

  fn merge(&mut self) -> Result<(), SdfError> {
    let Some(request) = self.request else {
      return Err(StateError::NotGenerated.into());
    };
    let (Some(inside), Some(outside)) = (self.inside.distances(), self.outside.distances()) else {
      return Err(StateError::InProgress.into());
    };

    #[cfg(feature = "tracy")]
    let _span = tracing::info_span!("merge_sdf").entered();

    let watch = Stopwatch::start();
    let field = SignedField::merge(
      &inside,
      &outside,
      self.width,
      request.max_distance,
      request.skew,
    );

    let mut timings = GenerationTimings::from_jobs(
      self.inside.timings().unwrap_or_default(),
      self.outside.timings().unwrap_or_default(),
    );
    timings.merge = watch.stop();
    timings.total = request.watch.elapsed();

    self.history.push(timings);
    info!(
      "Generated {}x{} SDF (radius {}, skew {}) in {:?}, mean {:?} over {} runs",
      self.width,
      self.height,
      request.radius,
      request.skew,
      timings.total,
      self.history.mean_total().unwrap_or_default(),
      self.history.len()
    );
    self.field = Some(field);
    self.state = GeneratorState::Complete;
    Ok(())
  }
}

fn check_dimensions(width: usize, height: usize) -> Result<(), ConfigurationError> {
  if width < MIN_DIMENSION || height < MIN_DIMENSION {
    return Err(ConfigurationError::TooSmall { width, height });
  }
  if width > MAX_DIMENSION || height > MAX_DIMENSION {
    return Err(ConfigurationError::TooLarge { width, height });
  }
  Ok(())
}
