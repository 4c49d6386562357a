//! Band partitioning must not change the output.
//!
//! The same mask is generated with forced band counts, from a single band up
//! to the 24-band cap, and compared with the single-band reference bit for
//! bit. That holds while `max_distance / 2` stays within the gap-fill
//! half-width; the last test pins down what happens beyond it.

mod common;

use common::{mask_from_fn, random_mask, run_to_completion};
use pixel_sdf::{
  BandPlan, DisplacementVector, PartitionConfig, SdfConfig, SdfGenerator, SignedField,
};

struct Run {
  field: SignedField,
  bands: usize,
  inside: Vec<f32>,
  outside: Vec<f32>,
}

fn generate_with(mask: &[bool], width: usize, radius: u32, partition: PartitionConfig) -> Run {
  let config = SdfConfig {
    partition,
    ..Default::default()
  };
  let mut generator = SdfGenerator::with_config(mask, width, config).unwrap();
  generator.generate(radius, 1.0).unwrap();
  let field = run_to_completion(&mut generator).unwrap();
  Run {
    field,
    bands: generator.inside_job().max_bands_ever_used(),
    inside: generator.inside_job().distances().unwrap(),
    outside: generator.outside_job().distances().unwrap(),
  }
}

fn first_mismatch(a: &SignedField, b: &SignedField) -> Option<usize> {
  a.values().iter().zip(b.values()).position(|(a, b)| a != b)
}

fn assert_partition_invariant(
  mask: &[bool],
  width: usize,
  radius: u32,
  partitions: &[(PartitionConfig, usize)],
) {
  let reference = generate_with(mask, width, radius, PartitionConfig::single_band());
  assert_eq!(reference.bands, 1);

  for &(partition, expected_bands) in partitions {
    let run = generate_with(mask, width, radius, partition);
    assert_eq!(run.bands, expected_bands, "{partition:?}");
    if let Some(index) = first_mismatch(&reference.field, &run.field) {
      panic!(
        "{} bands differ from one band at ({}, {}): {} vs {}",
        run.bands,
        index % width,
        index / width,
        reference.field[index],
        run.field[index]
      );
    }
  }
}

#[test]
fn random_masks_ignore_band_count() {
  let (width, height) = (96, 256);
  // Radius 4: max_distance / 2 is 2.83, within the smallest half-width of 3
  for seed in 0..8 {
    let mask = random_mask(width, height, seed);
    assert!((0..height).any(|y| mask[y * width]));
    assert!((0..height).any(|y| mask[y * width + width - 1]));
    assert_partition_invariant(
      &mask,
      width,
      4,
      &[
        (PartitionConfig::default(), 3),
        (PartitionConfig::new(8, 24), 24),
      ],
    );
  }
}

#[test]
fn rectangles_and_stripes_ignore_band_count() {
  let (width, height) = (96, 256);
  // Shapes cross several band seams, two of them sit on the side columns
  let mask = mask_from_fn(width, height, |x, y| {
    if x < 10 && (30..200).contains(&y) {
      return true;
    }
    if x >= 90 && (80..170).contains(&y) {
      return true;
    }
    if (12..40).contains(&x) && (20..70).contains(&y) {
      return true;
    }
    if (50..80).contains(&x) && (60..130).contains(&y) {
      return true;
    }
    if (16..30).contains(&x) && (100..230).contains(&y) {
      return true;
    }
    (60..84).contains(&x) && (150..=250).contains(&y) && (x / 3) % 2 == 0
  });

  // Radius 4 gives a minimum block of 6 rows
  assert_partition_invariant(
    &mask,
    width,
    4,
    &[
      (PartitionConfig::default(), 3),
      (PartitionConfig::new(32, 24), 7),
      (PartitionConfig::new(16, 24), 15),
      (PartitionConfig::new(8, 24), 24),
    ],
  );
}

#[test]
fn horizontal_stripes_ignore_band_count() {
  let (width, height) = (48, 300);
  // Full-width runs of 7 inside rows every 21 rows, so seams fall at every phase
  let mask = mask_from_fn(width, height, |_, y| (y / 7) % 3 == 0);

  assert_partition_invariant(
    &mask,
    width,
    5,
    &[
      (PartitionConfig::default(), 4),
      (PartitionConfig::new(32, 24), 9),
      (PartitionConfig::new(16, 24), 18),
      (PartitionConfig::new(8, 24), 24),
    ],
  );
}

#[test]
fn seams_are_exact_up_to_the_gap_half_width() {
  let (width, height) = (96, 512);
  // Disc of radius 20 whose bottom edge touches the first seam at row 73
  let mask = mask_from_fn(width, height, |x, y| {
    let (dx, dy) = (x as i64 - 48, y as i64 - 53);
    dx * dx + dy * dy <= 400
  });

  let radius = 20;
  let min_block = DisplacementVector::new(radius, radius).distance().ceil() as usize;
  let plan = BandPlan::new(height, min_block, &PartitionConfig::default());
  assert_eq!(plan.len(), 7);
  assert_eq!(plan.bands[1].start, 73);
  let half_width = plan.gap_half_width();
  assert_eq!(half_width, 9);

  // max_distance / 2 = 8.49 fits in the window: identical output
  assert_partition_invariant(&mask, width, 12, &[(PartitionConfig::default(), 7)]);

  // max_distance / 2 = 14.1 does not: pixels farther than the half-width
  // from the region boundary may keep a longer seam-blocked distance
  let single = generate_with(&mask, width, radius as u32, PartitionConfig::single_band());
  let banded = generate_with(&mask, width, radius as u32, PartitionConfig::default());
  assert!(first_mismatch(&single.field, &banded.field).is_some());

  for i in 0..mask.len() {
    assert!(banded.inside[i] >= single.inside[i]);
    assert!(banded.outside[i] >= single.outside[i]);
    let nearest = single.inside[i].max(single.outside[i]);
    if nearest <= half_width as f32 {
      assert_eq!(
        banded.field[i],
        single.field[i],
        "({}, {}) is within the half-width",
        i % width,
        i / width
      );
    }
  }
}
