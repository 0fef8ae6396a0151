//! Seeded sampling and permutation utilities shared by the schedulers.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Draw a random chain over `0..n_labels`.
///
/// Starts from the identity order, then walks every position and swaps it
/// with a uniformly chosen one.
pub fn random_chain<R: Rng>(n_labels: usize, rng: &mut R) -> Vec<usize> {
    let mut chain: Vec<usize> = (0..n_labels).collect();
    for j in 0..n_labels {
        let other = rng.gen_range(0..n_labels);
        chain.swap(j, other);
    }
    chain
}

/// Derive an independently seeded generator for one ensemble member.
///
/// Each member owns its generator, so the sequence of bags and chains is a
/// pure function of `(seed, member)` and never depends on how member tasks
/// interleave on the worker pool.
pub fn member_rng(seed: u64, member: usize) -> StdRng {
    let derived = seed.wrapping_add((member as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    StdRng::seed_from_u64(derived)
}

/// Bootstrap-with-replacement row indices, sized to a percentage of the
/// training set (at least one row).
pub fn bootstrap_indices<R: Rng>(n_rows: usize, bag_size_percent: u32, rng: &mut R) -> Vec<usize> {
    let bag_size = (n_rows * bag_size_percent as usize / 100).max(1);
    (0..bag_size).map(|_| rng.gen_range(0..n_rows)).collect()
}

/// Percentage subsample without replacement (at least one row).
///
/// The kept rows are a uniform subset but are returned in ascending order,
/// so the sampled view preserves the training set's row order and a 100%
/// subsample is the identity view.
pub fn subsample_indices<R: Rng>(n_rows: usize, percentage: f64, rng: &mut R) -> Vec<usize> {
    let keep = ((n_rows as f64 * percentage / 100.0).round() as usize).clamp(1, n_rows);
    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(rng);
    indices.truncate(keep);
    indices.sort_unstable();
    indices
}
