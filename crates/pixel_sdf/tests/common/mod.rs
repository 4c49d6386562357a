//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use pixel_sdf::{SdfError, SdfGenerator, SignedField};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Polls until the generation finishes, sleeping between ticks.
pub fn run_to_completion(generator: &mut SdfGenerator) -> Result<SignedField, SdfError> {
  for _ in 0..20_000 {
    if let Some(field) = generator.try_advance()? {
      return Ok(field.clone());
    }
    thread::sleep(Duration::from_millis(1));
  }
  panic!("generation did not finish within 20s");
}

/// Builds a generator and runs one generation to completion.
pub fn generate_field(mask: &[bool], width: usize, radius: u32, skew: f32) -> SignedField {
  let mut generator = SdfGenerator::new(mask, width).expect("valid mask");
  generator.generate(radius, skew).expect("generation starts");
  run_to_completion(&mut generator).expect("generation succeeds")
}

pub fn random_mask(width: usize, height: usize, seed: u64) -> Vec<bool> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..width * height).map(|_| rng.gen_bool(0.5)).collect()
}

pub fn mask_from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Vec<bool> {
  (0..height)
    .flat_map(|y| (0..width).map(move |x| (x, y)))
    .map(|(x, y)| f(x, y))
    .collect()
}
