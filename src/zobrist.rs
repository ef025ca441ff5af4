//! Zobrist hashing for incremental position fingerprints.
//!
//! Every (cell, colour) pair owns an independent 64-bit key. A position's
//! hash is the XOR of the keys of its occupied cells, so placing or removing
//! a stone is a single XOR.

use std::sync::LazyLock;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};

use crate::board::Color;
use crate::constants::GRID;

/// Fixed key for the key-stream; changing it changes every hash.
const SEED: [u8; 32] = *b"go board zobrist hash table key!";

/// Keys indexed by `[cell][colour]`.
pub struct ZobristKeys {
    keys: [[u64; 2]; GRID],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = ChaCha20Rng::from_seed(SEED);
        let mut keys = [[0u64; 2]; GRID];
        for cell in keys.iter_mut() {
            for key in cell.iter_mut() {
                *key = rng.next_u64();
            }
        }
        ZobristKeys { keys }
    }
}

/// Global Zobrist keys, read-only once built.
pub static ZOBRIST: LazyLock<ZobristKeys> = LazyLock::new(ZobristKeys::new);

/// Build the key table now rather than on first use.
///
/// Call this before fanning work out across threads.
pub fn init() {
    LazyLock::force(&ZOBRIST);
}

/// Key contribution of a `color` stone on padded-grid cell `idx`.
#[inline]
pub fn stone_key(idx: usize, color: Color) -> u64 {
    ZOBRIST.keys[idx][color.index()]
}
