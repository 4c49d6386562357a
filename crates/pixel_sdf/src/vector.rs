//! Displacement vectors stored per pixel in a distance grid.
//!
//! Each cell holds the offset from the pixel to the nearest seed found so
//! far. Vectors are plain `Copy` values; the raster scan reads a neighbor,
//! offsets it and writes the result back into another cell.

use std::ops::Add;

/// Component magnitude of the [`DisplacementVector::INFINITE`] sentinel.
///
/// The sentinel's squared length still fits in `i64` and exceeds
/// `width² + height²` for any grid up to [`MAX_DIMENSION`], so a real seed
/// always beats it.
///
/// [`MAX_DIMENSION`]: crate::error::MAX_DIMENSION
pub const INFINITE_COMPONENT: i32 = 1 << 30;

/// Offset from a pixel to its nearest known seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DisplacementVector {
  pub dx: i32,
  pub dy: i32,
}

impl DisplacementVector {
  /// The pixel is a seed itself.
  pub const SEED: Self = Self::new(0, 0);

  /// No seed has reached this pixel yet.
  pub const INFINITE: Self = Self::new(INFINITE_COMPONENT, INFINITE_COMPONENT);

  #[inline]
  pub const fn new(dx: i32, dy: i32) -> Self {
    Self { dx, dy }
  }

  /// Squared length, used for all comparisons.
  #[inline]
  pub const fn fast_distance(self) -> i64 {
    let dx = self.dx as i64;
    let dy = self.dy as i64;
    dx * dx + dy * dy
  }

  /// Euclidean length.
  #[inline]
  pub fn distance(self) -> f32 {
    (self.fast_distance() as f64).sqrt() as f32
  }

  #[inline]
  pub fn is_infinite(self) -> bool {
    self == Self::INFINITE
  }
}

impl Add for DisplacementVector {
  type Output = Self;

  #[inline]
  fn add(self, rhs: Self) -> Self::Output {
    Self::new(self.dx + rhs.dx, self.dy + rhs.dy)
  }
}

impl From<(i32, i32)> for DisplacementVector {
  #[inline]
  fn from((dx, dy): (i32, i32)) -> Self {
    Self::new(dx, dy)
  }
}
