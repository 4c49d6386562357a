//! Two-pass 8-point raster-scan distance kernel.
//!
//! Operates on a contiguous band of full-width rows. Each pass propagates
//! nearest-seed vectors from already visited neighbors:
//!
//! - Pass A walks rows top to bottom. Each row is swept left to right against
//!   `(-1,0) (0,-1) (-1,-1) (1,-1)`, then right to left against `(1,0)`.
//! - Pass B walks rows bottom to top. Each row is swept right to left against
//!   `(1,0) (0,1) (-1,1) (1,1)`, then left to right against `(-1,0)`.
//!
//! Every sweep covers all columns, so both edge columns see their vertical
//! and diagonal neighbors; offsets past the grid edge are skipped.
//!
//! The result is an approximation of the Euclidean transform. Neighbor rows
//! outside the band are treated as absent, so a band never reads cells owned
//! by another worker.

use crate::vector::DisplacementVector;

/// Band kernel signature, swappable so the job engine can be exercised with
/// other kernels.
pub(crate) type BandKernel = fn(&mut [DisplacementVector], usize);

const PASS_A_FORWARD: [(isize, isize); 4] = [(-1, 0), (0, -1), (-1, -1), (1, -1)];
const PASS_A_BACKWARD: [(isize, isize); 1] = [(1, 0)];
const PASS_B_BACKWARD: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 1), (1, 1)];
const PASS_B_FORWARD: [(isize, isize); 1] = [(-1, 0)];

/// Runs both passes over `cells`, a band of `cells.len() / width` rows.
pub fn scan_band(cells: &mut [DisplacementVector], width: usize) {
  if width == 0 || cells.is_empty() {
    return;
  }
  debug_assert_eq!(cells.len() % width, 0);

  #[cfg(feature = "tracy")]
  let _span = tracing::info_span!("scan_band", rows = cells.len() / width).entered();

  let rows = cells.len() / width;

  // Pass A: top to bottom
  for y in 0..rows {
    for x in 0..width {
      relax(cells, width, rows, x, y, &PASS_A_FORWARD);
    }
    for x in (0..width).rev() {
      relax(cells, width, rows, x, y, &PASS_A_BACKWARD);
    }
  }

  // Pass B: bottom to top
  for y in (0..rows).rev() {
    for x in (0..width).rev() {
      relax(cells, width, rows, x, y, &PASS_B_BACKWARD);
    }
    for x in 0..width {
      relax(cells, width, rows, x, y, &PASS_B_FORWARD);
    }
  }
}

/// Replaces the cell at (x, y) with the shortest `neighbor + offset`.
#[inline]
fn relax(
  cells: &mut [DisplacementVector],
  width: usize,
  rows: usize,
  x: usize,
  y: usize,
  offsets: &[(isize, isize)],
) {
  let index = y * width + x;
  let mut best = cells[index];
  let mut best_distance = best.fast_distance();

  for &(ox, oy) in offsets {
    let (Some(nx), Some(ny)) = (x.checked_add_signed(ox), y.checked_add_signed(oy)) else {
      continue;
    };
    if nx >= width || ny >= rows {
      continue;
    }

    let neighbor = cells[ny * width + nx];
    // Unreached cells stay at the sentinel instead of drifting toward it
    if neighbor.is_infinite() {
      continue;
    }

    let candidate = neighbor + DisplacementVector::new(ox as i32, oy as i32);
    let candidate_distance = candidate.fast_distance();
    if candidate_distance < best_distance {
      best = candidate;
      best_distance = candidate_distance;
    }
  }

  cells[index] = best;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grid::Grid;

  fn scan(grid: &mut Grid) {
    let width = grid.width();
    let height = grid.height();
    for band in grid.split_rows_mut(&[0..height]) {
      scan_band(band, width);
    }
  }

  #[test]
  fn single_seed_reaches_every_cell() {
    let mut mask = vec![false; 64];
    mask[3 * 8 + 3] = true;
    let mut grid = Grid::from_mask(&mask, 8, true);
    scan(&mut grid);

    for y in 0..8 {
      for x in 0..8 {
        assert!(!grid[(x, y)].is_infinite(), "unreached ({x}, {y})");
      }
    }
    assert_eq!(grid[(3, 3)], DisplacementVector::SEED);
    assert_eq!(grid[(4, 3)].fast_distance(), 1);
    assert_eq!(grid[(3, 2)].fast_distance(), 1);
    assert_eq!(grid[(4, 4)].fast_distance(), 2);
    assert_eq!(grid[(6, 3)].fast_distance(), 9);
  }

  #[test]
  fn horizontal_distances_are_exact() {
    // Seeds in column 0 only, every row
    let width = 12;
    let mask: Vec<bool> = (0..width * 8).map(|i| i % width == 0).collect();
    let mut grid = Grid::from_mask(&mask, width, true);
    scan(&mut grid);

    for y in 0..8 {
      for x in 0..width {
        assert_eq!(grid[(x, y)].distance(), x as f32, "at ({x}, {y})");
      }
    }
  }

  #[test]
  fn seedless_grid_stays_infinite() {
    let mask = vec![false; 100];
    let mut grid = Grid::from_mask(&mask, 10, true);
    scan(&mut grid);
    assert!(grid.cells().iter().all(|v| v.is_infinite()));
  }

  #[test]
  fn band_does_not_read_outside_its_rows() {
    // Seed in row 0, scan only rows 4..8
    let mut mask = vec![false; 64];
    mask[2] = true;
    let mut grid = Grid::from_mask(&mask, 8, true);
    for band in grid.split_rows_mut(&[4..8]) {
      scan_band(band, 8);
    }
    for y in 4..8 {
      for x in 0..8 {
        assert!(grid[(x, y)].is_infinite());
      }
    }
  }

  #[test]
  fn side_columns_fill_in_one_scan() {
    let mut mask = vec![false; 64];
    mask[3 * 8 + 3] = true;
    let mut grid = Grid::from_mask(&mask, 8, true);
    scan(&mut grid);

    // Rows above the seed included, on both edges
    for y in 0..8 {
      let dy = y as i64 - 3;
      assert_eq!(grid[(0, y)].fast_distance(), 9 + dy * dy, "at (0, {y})");
      assert_eq!(grid[(7, y)].fast_distance(), 16 + dy * dy, "at (7, {y})");
    }
  }

  #[test]
  fn right_column_seeds_reach_across() {
    let width = 12;
    let mask: Vec<bool> = (0..width * 8).map(|i| i % width == width - 1).collect();
    let mut grid = Grid::from_mask(&mask, width, true);
    scan(&mut grid);

    for y in 0..8 {
      for x in 0..width {
        assert_eq!(grid[(x, y)].distance(), (width - 1 - x) as f32, "at ({x}, {y})");
      }
    }
  }

  #[test]
  fn rescanning_never_increases_distances() {
    let mut mask = vec![false; 16 * 16];
    for &(x, y) in &[(2usize, 3usize), (12, 5), (7, 14)] {
      mask[y * 16 + x] = true;
    }
    let mut once = Grid::from_mask(&mask, 16, true);
    scan(&mut once);
    let mut twice = once.clone();
    scan(&mut twice);
    for (a, b) in once.cells().iter().zip(twice.cells()) {
      assert!(b.fast_distance() <= a.fast_distance());
    }
  }
}
