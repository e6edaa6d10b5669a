use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::model::WorldDate;

/// Named offsets into an entity's random stream.
///
/// Each purpose owns a block of 1000 slots so that per-entry sub-offsets
/// (a culture entry's `rng_offset`, a route step index, a polity id) can be
/// added to the base without spilling into another purpose's block.
pub mod offsets {
    pub const MIGRATION_PERCENT: u32 = 0;
    pub const MIGRATION_SCORE: u32 = 1;
    pub const ROUTE_START: u32 = 2;

    pub const CULTURE_PREFERENCE: u32 = 1_000;
    pub const CULTURE_ACTIVITY: u32 = 2_000;
    pub const CULTURE_SKILL: u32 = 3_000;
    pub const CULTURE_KNOWLEDGE: u32 = 4_000;
    pub const CULTURE_POLITY_INFLUENCE: u32 = 5_000;

    pub const ROUTE_CHOOSE_NEXT_COASTAL_CELL: u32 = 10_000;
    pub const ROUTE_CHOOSE_NEXT_COASTAL_CELL_2: u32 = 20_000;
    pub const ROUTE_CHOOSE_NEXT_DEPTH_SEA_CELL: u32 = 30_000;

    pub const DISCOVERY_DATE: u32 = 40_000;
    pub const TRIBE_FORMATION_DATE: u32 = 41_000;
    pub const TRIBE_CORE_INFLUENCE: u32 = 42_000;
    pub const PROMINENCE_EXPANSION: u32 = 43_000;
    pub const GENERATOR_DATE: u32 = 44_000;

    pub const TRIBE_SPLIT_DATE: u32 = 50_000;
    pub const TRIBE_SPLIT_CHANCE: u32 = 51_000;
    pub const TRIBE_SPLIT_CORE: u32 = 52_000;

    pub const LANGUAGE_SEED: u32 = 60_000;
}

/// Salt mixed into polity ids so polity streams never coincide with a
/// cell stream whose packed coordinates happen to equal the polity id.
const POLITY_KEY_SALT: u64 = 0xA076_1D64_78BD_642F;

/// SplitMix64 finalizer.
pub fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Stream key for a terrain cell.
pub fn cell_key(longitude: u32, latitude: u32) -> u64 {
    ((longitude as u64) << 32) | latitude as u64
}

/// Stream key for a polity.
pub fn polity_key(polity_id: u64) -> u64 {
    mix64(polity_id ^ POLITY_KEY_SALT)
}

/// Derive the seed for one draw. Pure in all four inputs.
pub fn stream_seed(world_seed: u64, entity_key: u64, date: WorldDate, offset: u32) -> u64 {
    let mut h = mix64(world_seed);
    h = mix64(h ^ entity_key);
    h = mix64(h ^ date as u64);
    mix64(h ^ offset as u64)
}

/// A float in `[0, 1)` from an entity's stream at `(date, offset)`.
pub fn local_random_float(world_seed: u64, entity_key: u64, date: WorldDate, offset: u32) -> f64 {
    SmallRng::seed_from_u64(stream_seed(world_seed, entity_key, date, offset)).random::<f64>()
}

/// An integer in `[0, max_exclusive)`; always 0 when `max_exclusive` is 0 or 1.
pub fn local_random_int(
    world_seed: u64,
    entity_key: u64,
    date: WorldDate,
    offset: u32,
    max_exclusive: u32,
) -> u32 {
    if max_exclusive <= 1 {
        return 0;
    }
    let f = local_random_float(world_seed, entity_key, date, offset);
    ((f * max_exclusive as f64) as u32).min(max_exclusive - 1)
}

/// Pick an index with probability proportional to its weight.
///
/// `score` must be in `[0, 1)`. Non-positive weights are never chosen.
/// Returns `None` for an empty list or a non-positive total.
pub fn weighted_selection(score: f64, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if weights.is_empty() || total <= 0.0 {
        return None;
    }

    let target = score * total;
    let mut acc = 0.0;
    let mut last_positive = None;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        acc += w;
        last_positive = Some(i);
        if target < acc {
            return Some(i);
        }
    }
    // Floating point accumulation can leave target == total.
    last_positive
}
