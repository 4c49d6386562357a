//! Flat row-major storage of displacement vectors.
//!
//! A [`Grid`] holds one [`DisplacementVector`] per mask pixel. Workers never
//! share cells: the grid is split into disjoint row slices with
//! [`Grid::split_rows_mut`] and each slice is handed to exactly one band.

use std::ops::{Index, IndexMut, Range};

use crate::vector::DisplacementVector;

/// A 2D buffer of displacement vectors.
///
/// Data is stored in row-major order (y * width + x).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
  cells: Box<[DisplacementVector]>,
  width: usize,
  height: usize,
}

impl Grid {
  /// Creates a grid filled with the given vector.
  pub fn filled(width: usize, height: usize, value: DisplacementVector) -> Self {
    Self {
      cells: vec![value; width * height].into_boxed_slice(),
      width,
      height,
    }
  }

  /// Seeds a grid from a mask: pixels equal to `target` become
  /// [`DisplacementVector::SEED`], everything else
  /// [`DisplacementVector::INFINITE`].
  ///
  /// `mask.len()` must be a multiple of `width`.
  pub fn from_mask(mask: &[bool], width: usize, target: bool) -> Self {
    debug_assert!(width > 0 && mask.len() % width == 0);
    let cells = mask
      .iter()
      .map(|&m| {
        if m == target {
          DisplacementVector::SEED
        } else {
          DisplacementVector::INFINITE
        }
      })
      .collect();
    Self {
      cells,
      width,
      height: mask.len() / width,
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
    self.cells.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Converts (x, y) to a linear index, or `None` if out of bounds.
  #[inline]
  fn index_of(&self, x: usize, y: usize) -> Option<usize> {
    (x < self.width && y < self.height).then(|| y * self.width + x)
  }

  /// Returns the vector at (x, y), or `None` if out of bounds.
  #[inline]
  pub fn get(&self, x: usize, y: usize) -> Option<DisplacementVector> {
    self.index_of(x, y).map(|i| self.cells[i])
  }

  /// Sets the vector at (x, y). Returns `false` if out of bounds.
  #[inline]
  pub fn set(&mut self, x: usize, y: usize, value: DisplacementVector) -> bool {
    match self.index_of(x, y) {
      Some(i) => {
        self.cells[i] = value;
        true
      }
      None => false,
    }
  }

  /// All cells in row-major order.
  #[inline]
  pub fn cells(&self) -> &[DisplacementVector] {
    &self.cells
  }

  /// Euclidean length of every cell, row-major.
  pub fn distances(&self) -> Vec<f32> {
    self.cells.iter().map(|v| v.distance()).collect()
  }

  /// Splits the grid into mutable slices, one per row range.
  ///
  /// Ranges must be sorted, non-overlapping and inside `0..height`. Rows not
  /// covered by any range are left out. Panics if the ranges violate that
  /// contract, since overlapping bands would alias cells.
  pub fn split_rows_mut(&mut self, ranges: &[Range<usize>]) -> Vec<&mut [DisplacementVector]> {
    let width = self.width;
    let mut slices = Vec::with_capacity(ranges.len());
    let mut rest: &mut [DisplacementVector] = &mut self.cells;
    let mut consumed_rows = 0;

    for range in ranges {
      assert!(
        range.start >= consumed_rows && range.start <= range.end && range.end <= self.height,
        "row range {:?} overlaps a previous band or leaves the grid",
        range
      );
      let skip = (range.start - consumed_rows) * width;
      let take = (range.end - range.start) * width;
      let (_, tail) = std::mem::take(&mut rest).split_at_mut(skip);
      let (band, tail) = tail.split_at_mut(take);
      slices.push(band);
      rest = tail;
      consumed_rows = range.end;
    }

    slices
  }
}

impl Index<(usize, usize)> for Grid {
  type Output = DisplacementVector;

  #[inline]
  fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
    &self.cells[y * self.width + x]
  }
}

impl IndexMut<(usize, usize)> for Grid {
  #[inline]
  fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
    &mut self.cells[y * self.width + x]
  }
}
