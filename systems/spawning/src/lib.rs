#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawn oracle that defines the untouched content of every cell.
//!
//! The oracle never stores anything. Each answer is recomputed from the world
//! seed and the cell address, so a cell that was never acted on renders the
//! same token no matter how many times it is queried or in which order.

use geomerge_core::{CellCoord, GameRules, Token};
use sha2::{Digest, Sha256};

const UNIT_SCALE: f64 = 1.0 / (1_u64 << 53) as f64;

/// Pure function from cell address to initial content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnOracle {
    seed: u64,
    probability: f64,
}

impl SpawnOracle {
    /// Creates an oracle spawning base tokens with the provided probability.
    #[must_use]
    pub const fn new(seed: u64, probability: f64) -> Self {
        Self { seed, probability }
    }

    /// Creates an oracle using the seed and probability configured in `rules`.
    #[must_use]
    pub const fn from_rules(rules: &GameRules) -> Self {
        Self::new(rules.seed, rules.spawn_probability)
    }

    /// Deterministic sample in `[0, 1)` derived from the seed and the cell key.
    #[must_use]
    pub fn luck(&self, cell: CellCoord) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(cell.key().as_bytes());
        unit_from_digest(hasher)
    }

    /// Initial content of a cell that was never acted on.
    #[must_use]
    pub fn spawn_of(&self, cell: CellCoord) -> Option<Token> {
        if self.luck(cell) < self.probability {
            Some(Token::BASE)
        } else {
            None
        }
    }
}

fn unit_from_digest(hasher: Sha256) -> f64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    // Top 53 bits fill the f64 mantissa exactly, keeping the result below 1.0.
    (u64::from_le_bytes(bytes) >> 11) as f64 * UNIT_SCALE
}
