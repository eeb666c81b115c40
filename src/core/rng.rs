//! Deterministic random number generation for combat resolution.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces identical roll sequence
//! - **Forkable**: Create independent branches for speculative resolution
//! - **Serializable**: O(1) state capture and restore for room snapshots
//! - **Context streams**: Independent sequences for different purposes
//!
//! Every probability in the engine (critical hits, effect application,
//! luck and agility checks) is a single [`BattleRng::percent`] roll
//! against an integer chance, so replaying a room from its seed
//! reproduces every outcome.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Deterministic RNG for combat rolls.
///
/// Uses ChaCha8 for speed while maintaining cryptographic quality
/// randomness. Supports forking for speculative branches and
/// context-based independent streams.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "BattleRngState", from = "BattleRngState")]
pub struct BattleRng {
    inner: ChaCha8Rng,
    seed: u64,
    fork_counter: u64,
}

impl BattleRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
            fork_counter: 0,
        }
    }

    /// Fork this RNG to create an independent branch.
    ///
    /// Each fork produces a different but deterministic sequence. Used
    /// when resolving something speculatively without disturbing the
    /// room's main roll stream.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        self.fork_counter += 1;
        let fork_seed = self
            .seed
            .wrapping_add(self.fork_counter.wrapping_mul(0x9E3779B97F4A7C15));
        Self {
            inner: ChaCha8Rng::seed_from_u64(fork_seed),
            seed: fork_seed,
            fork_counter: 0,
        }
    }

    /// Create an independent stream for a specific context.
    ///
    /// Useful for separating randomness domains (e.g., setup rolls vs
    /// combat rolls). The same context always produces the same stream
    /// from the same RNG state.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;

        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        context.hash(&mut hasher);
        let context_seed = hasher.finish();

        Self {
            inner: ChaCha8Rng::seed_from_u64(context_seed),
            seed: context_seed,
            fork_counter: 0,
        }
    }

    /// Generate a random integer in the given range.
    pub fn gen_range(&mut self, range: std::ops::Range<i64>) -> i64 {
        self.inner.gen_range(range)
    }

    /// Roll a single die with the given number of sides (1..=sides).
    pub fn die(&mut self, sides: u32) -> i64 {
        if sides == 0 {
            return 0;
        }
        self.inner.gen_range(1..=i64::from(sides))
    }

    /// One percentile roll, uniform in 1..=100.
    ///
    /// A roll succeeds against a chance when `roll <= chance`, so a
    /// chance of 0 never succeeds and a chance of 100 always does.
    pub fn percent(&mut self) -> i32 {
        self.inner.gen_range(1..=100)
    }

    /// Get the current state for serialization.
    #[must_use]
    pub fn state(&self) -> BattleRngState {
        BattleRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
            fork_counter: self.fork_counter,
        }
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &BattleRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
            fork_counter: state.fork_counter,
        }
    }
}

/// Serializable RNG state for checkpointing.
///
/// Uses the ChaCha8 word position for O(1) serialization regardless of
/// how many rolls have been made.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRngState {
    /// Original seed
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter)
    pub word_pos: u128,
    /// Fork counter for deterministic branching
    pub fork_counter: u64,
}

impl From<BattleRng> for BattleRngState {
    fn from(rng: BattleRng) -> Self {
        rng.state()
    }
}

impl From<BattleRngState> for BattleRng {
    fn from(state: BattleRngState) -> Self {
        Self::from_state(&state)
    }
}
