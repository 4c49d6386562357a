//! Generator configuration, loadable from TOML.
//!
//! ```toml
//! radius = 8
//! skew = 1.0
//!
//! [partition]
//! target_rows_per_band = 64
//! max_bands = 24
//! ```

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Target number of rows scanned by one band.
pub const DEFAULT_ROWS_PER_BAND: usize = 64;

/// Hard cap on concurrent bands per job.
pub const MAX_BANDS: usize = 24;

/// How rows are split into bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
  target_rows_per_band: usize,
  max_bands: usize,
}

impl PartitionConfig {
  /// Creates a partition config. `max_bands` is clamped to `1..=24` and
  /// `target_rows_per_band` to at least 1.
  pub fn new(target_rows_per_band: usize, max_bands: usize) -> Self {
    Self {
      target_rows_per_band,
      max_bands,
    }
    .sanitized()
  }

  /// Forces a single band, i.e. no parallelism inside a job.
  pub fn single_band() -> Self {
    Self::new(usize::MAX, 1)
  }

  #[inline]
  pub fn target_rows_per_band(&self) -> usize {
    self.target_rows_per_band.max(1)
  }

  #[inline]
  pub fn max_bands(&self) -> usize {
    self.max_bands.clamp(1, MAX_BANDS)
  }

  fn sanitized(self) -> Self {
    Self {
      target_rows_per_band: self.target_rows_per_band(),
      max_bands: self.max_bands(),
    }
  }
}

impl Default for PartitionConfig {
  fn default() -> Self {
    Self {
      target_rows_per_band: DEFAULT_ROWS_PER_BAND,
      max_bands: MAX_BANDS,
    }
  }
}

/// Configuration for [`SdfGenerator`](crate::SdfGenerator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdfConfig {
  /// Default erosion radius for `generate_default`.
  pub radius: u32,
  /// Default skew for `generate_default`. 1.0 is symmetric.
  pub skew: f32,
  pub partition: PartitionConfig,
}

impl Default for SdfConfig {
  fn default() -> Self {
    Self {
      radius: 3,
      skew: 1.0,
      partition: PartitionConfig::default(),
    }
  }
}

impl SdfConfig {
  /// Parses a config from TOML. Missing keys take their defaults.
  pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
    let config: Self = toml::from_str(contents)?;
    Ok(Self {
      partition: config.partition.sanitized(),
      ..config
    })
  }

  /// Reads and parses a TOML config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Self::from_toml_str(&contents)
  }

  /// Reads a config file, falling back to defaults if it is missing or
  /// invalid.
  pub fn load_or_default(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    if !path.exists() {
      return Self::default();
    }
    match Self::load(path) {
      Ok(config) => {
        info!("Loaded SDF config from {}", path.display());
        config
      }
      Err(e) => {
        warn!("Failed to load SDF config {}: {e}, using defaults", path.display());
        Self::default()
      }
    }
  }

  /// Serializes the config as pretty TOML.
  pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(self)
  }
}
