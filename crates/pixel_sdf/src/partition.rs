//! Row partitioning for the parallel and gap-fill stages.
//!
//! The parallel stage splits the grid into horizontal bands that are scanned
//! independently. Bands cannot see each other, so the gap-fill stage rescans a
//! window of rows around every internal band boundary.

use std::ops::Range;

use crate::config::PartitionConfig;

/// Smallest half-height of a gap-fill window.
pub const MIN_GAP_HALF_WIDTH: usize = 3;

/// Row bands for the parallel stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandPlan {
  /// Disjoint row ranges covering `0..height` in order.
  pub bands: Vec<Range<usize>>,
  /// Rows per band. The last band also takes the remainder.
  pub block_size: usize,
}

impl BandPlan {
  /// Plans the parallel stage for a grid of `height` rows.
  ///
  /// With `extent = height - 1` the band count is
  /// `clamp(extent / target_rows_per_band, 1, min(max_bands, extent / min_block_size))`.
  pub fn new(height: usize, min_block_size: usize, config: &PartitionConfig) -> Self {
    let extent = height.saturating_sub(1);
    let target = config.target_rows_per_band().max(1);
    let cap = config.max_bands().min(extent / min_block_size.max(1));
    let count = (extent / target).min(cap).max(1);
    let block_size = (extent / count).max(1);

    let bands = (0..count)
      .map(|i| {
        let start = i * block_size;
        let end = if i + 1 == count {
          height
        } else {
          (i + 1) * block_size
        };
        start..end
      })
      .collect();

    Self { bands, block_size }
  }

  /// Number of bands dispatched in the parallel stage.
  #[inline]
  pub fn len(&self) -> usize {
    self.bands.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.bands.is_empty()
  }

  /// Half-height of the gap-fill windows: `max(3, round(sqrt(block_size)))`,
  /// limited to half a block so neighboring windows never overlap.
  pub fn gap_half_width(&self) -> usize {
    let heuristic = ((self.block_size as f64).sqrt().round() as usize).max(MIN_GAP_HALF_WIDTH);
    heuristic.min((self.block_size / 2).max(1))
  }

  /// Row windows for the gap-fill stage, one per internal band boundary.
  ///
  /// Returns `len() - 1` windows, each clamped to `0..height`.
  pub fn gap_windows(&self, height: usize) -> Vec<Range<usize>> {
    let half = self.gap_half_width();
    self
      .bands
      .iter()
      .skip(1)
      .map(|band| {
        let boundary = band.start;
        boundary.saturating_sub(half)..(boundary + half).min(height)
      })
      .collect()
  }
}
