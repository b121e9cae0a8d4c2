// Anything pseudo-random in Smoke goes through here: pointer colours and
// random splats.
//
// We want to have the option of seeding our RNGs to generate deterministic
// output for testing.

use rand::distr::Alphanumeric;
use rand::prelude::*;
use rand_pcg::Pcg32;
use rand_seeder::Seeder;

pub type SmokeRng = Pcg32;

pub fn from_seed(optional_seed: &Option<String>) -> SmokeRng {
    let seed = optional_seed.as_ref().cloned().unwrap_or_else(|| {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    });

    Seeder::from(seed).into_rng()
}

/// A bright-ish colour. Each channel lies in `[0.2, 1.2)`.
pub fn random_color(rng: &mut SmokeRng) -> [f32; 3] {
    [
        rng.random::<f32>() + 0.2,
        rng.random::<f32>() + 0.2,
        rng.random::<f32>() + 0.2,
    ]
}
