//! Error types for SDF generation.

use std::fmt;
use std::io;

use crate::job::Polarity;

/// Smallest accepted width and height of a mask.
pub const MIN_DIMENSION: usize = 8;

/// Largest accepted width and height of a mask.
pub const MAX_DIMENSION: usize = 1 << 24;

/// Invalid input dimensions or configuration.
#[derive(Debug)]
pub enum ConfigurationError {
  /// Width or height below [`MIN_DIMENSION`].
  TooSmall { width: usize, height: usize },
  /// Width or height above [`MAX_DIMENSION`].
  TooLarge { width: usize, height: usize },
  /// Mask length is not a multiple of the width.
  MaskLength { len: usize, width: usize },
  Parse(toml::de::Error),
  Io(io::Error),
}

impl From<toml::de::Error> for ConfigurationError {
  fn from(err: toml::de::Error) -> Self {
    Self::Parse(err)
  }
}

impl From<io::Error> for ConfigurationError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl fmt::Display for ConfigurationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TooSmall { width, height } => write!(
        f,
        "mask is {}x{}, minimum is {}x{}",
        width, height, MIN_DIMENSION, MIN_DIMENSION
      ),
      Self::TooLarge { width, height } => write!(
        f,
        "mask is {}x{}, maximum side is {}",
        width, height, MAX_DIMENSION
      ),
      Self::MaskLength { len, width } => {
        write!(f, "mask length {} is not a multiple of width {}", len, width)
      }
      Self::Parse(e) => write!(f, "config parse error: {}", e),
      Self::Io(e) => write!(f, "config I/O error: {}", e),
    }
  }
}

impl std::error::Error for ConfigurationError {}

/// An operation was requested in the wrong generator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateError {
  /// `generate` has never been called.
  NotGenerated,
  /// A generation is running and has not produced a field yet.
  InProgress,
  /// `generate` was called while a generation was still running.
  AlreadyGenerating,
  /// The last generation failed; no field is available.
  Failed,
}

impl fmt::Display for StateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotGenerated => write!(f, "no generation has been started"),
      Self::InProgress => write!(f, "generation is still in progress"),
      Self::AlreadyGenerating => write!(f, "a generation is already running"),
      Self::Failed => write!(f, "the last generation failed"),
    }
  }
}

impl std::error::Error for StateError {}

/// Any error surfaced by the generator.
#[derive(Debug)]
pub enum SdfError {
  Configuration(ConfigurationError),
  State(StateError),
  /// A band worker panicked or its coordinator disappeared. The generation
  /// is abandoned.
  Worker { polarity: Polarity, message: String },
}

impl From<ConfigurationError> for SdfError {
  fn from(err: ConfigurationError) -> Self {
    Self::Configuration(err)
  }
}

impl From<StateError> for SdfError {
  fn from(err: StateError) -> Self {
    Self::State(err)
  }
}

impl fmt::Display for SdfError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Configuration(e) => write!(f, "configuration error: {}", e),
      Self::State(e) => write!(f, "state error: {}", e),
      Self::Worker { polarity, message } => {
        write!(f, "{:?} distance job failed: {}", polarity, message)
      }
    }
  }
}

impl std::error::Error for SdfError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Configuration(e) => Some(e),
      Self::State(e) => Some(e),
      Self::Worker { .. } => None,
    }
  }
}
