pub mod analyzer;
pub mod automaton;
pub mod cli;
pub mod config;
pub mod envelope;
pub mod frequency;
pub mod mapper;
pub mod mixer;
pub mod oscillatorbank;
pub mod output;
pub mod scale;
pub mod simulation;
pub mod voice;

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded generator when `seed` is given, entropy-seeded otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
