//! Normalized signed distance field output.

use std::ops::Index;

/// Per-pixel signed distance, normalized to `[0, 1]`.
///
/// `0.5` lies on the region boundary, values above it are inside the region
/// (`true` pixels) and values below it are outside. Row-major like the mask.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedField {
  values: Box<[f32]>,
  width: usize,
  height: usize,
}

impl SignedField {
  /// Merges the two distance maps of a mask into a normalized field.
  ///
  /// For every pixel: `signed = outside * (2 - skew) - inside * skew`, then
  /// `clamp01(signed / max_distance + 0.5)`.
  pub(crate) fn merge(
    inside: &[f32],
    outside: &[f32],
    width: usize,
    max_distance: f32,
    skew: f32,
  ) -> Self {
    debug_assert_eq!(inside.len(), outside.len());
    let out_factor = 2.0 - skew;
    let scale = if max_distance > 0.0 {
      max_distance
    } else {
      f32::MIN_POSITIVE
    };

    let values = inside
      .iter()
      .zip(outside)
      .map(|(&inside, &outside)| {
        let signed = outside * out_factor - inside * skew;
        let normalized = signed / scale + 0.5;
        // A NaN skew would pass straight through clamp
        if normalized.is_nan() {
          0.5
        } else {
          normalized.clamp(0.0, 1.0)
        }
      })
      .collect();

    Self {
      values,
      width,
      height: inside.len() / width.max(1),
    }
  }

  #[inline]
  pub fn width(&self) -> usize {
    self.width
  }

  #[inline]
  pub fn height(&self) -> usize {
    self.height
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.values.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Value at (x, y), or `None` if out of bounds.
  #[inline]
  pub fn get(&self, x: usize, y: usize) -> Option<f32> {
    (x < self.width && y < self.height).then(|| self.values[y * self.width + x])
  }

  /// All values in row-major order.
  #[inline]
  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn into_values(self) -> Vec<f32> {
    self.values.into_vec()
  }
}

impl Index<usize> for SignedField {
  type Output = f32;

  #[inline]
  fn index(&self, index: usize) -> &Self::Output {
    &self.values[index]
  }
}
