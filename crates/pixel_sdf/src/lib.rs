//! Pixel SDF - multithreaded signed distance fields from binary masks.
//!
//! A [`SdfGenerator`] takes a row-major `bool` mask and computes, for every
//! pixel, an approximate Euclidean distance to the nearest pixel of the
//! opposite class. Two [`DistanceJob`]s (one per polarity) run a two-pass
//! 8-point raster scan over parallel row bands, repair the band seams in a
//! gap-fill stage, and are merged into a [`SignedField`] normalized to
//! `[0, 1]`.
//!
//! Generation never blocks the caller. Start it with
//! [`SdfGenerator::generate`] and poll [`SdfGenerator::try_advance`] until it
//! returns the field.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod generator;
pub mod grid;
pub mod job;
pub mod kernel;
pub mod partition;
#[cfg(feature = "tracy")]
mod tracy_init;
pub mod vector;

pub use config::{PartitionConfig, SdfConfig};
pub use diagnostics::{GenerationTimings, StageTimings, Stopwatch, TimingHistory};
pub use error::{ConfigurationError, MAX_DIMENSION, MIN_DIMENSION, SdfError, StateError};
pub use field::SignedField;
pub use generator::{GeneratorState, MAX_RADIUS, SdfGenerator};
pub use grid::Grid;
pub use job::{DistanceJob, JobStage, Polarity};
pub use partition::BandPlan;
#[cfg(feature = "tracy")]
pub use tracy_init::init_tracy;
pub use vector::DisplacementVector;
