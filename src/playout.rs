//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays uniformly random legal moves until two consecutive passes
//! score the game. Candidates are drawn from the cheap "every empty point"
//! enumeration and re-drawn until one passes the exact legality check.

use log::debug;
use rayon::prelude::*;

use crate::board::Board;
use crate::zobrist;

/// Play random moves until `state` is scored, returning the raw score
/// (Black minus White, before komi).
pub fn random_playout(state: &mut Board, rng: &mut fastrand::Rng) -> i32 {
    while !state.scored() {
        // always holds at least the pass
        let moves = state.moves_loose();
        let mv = loop {
            let mv = moves[rng.usize(..moves.len())];
            if state.legal(mv) {
                break mv;
            }
        };
        if let Err(e) = state.play(mv) {
            unreachable!("legal move {mv} rejected: {e}");
        }
    }
    state.score()
}

/// Aggregate result of many independent playouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayoutSummary {
    pub playouts: usize,
    /// Playouts whose score exceeded the win margin
    pub black_wins: usize,
    pub total_score: i64,
}

impl PlayoutSummary {
    fn record(mut self, score: i32, margin: i32) -> Self {
        self.playouts += 1;
        self.black_wins += usize::from(score > margin);
        self.total_score += i64::from(score);
        self
    }

    fn merge(self, other: Self) -> Self {
        PlayoutSummary {
            playouts: self.playouts + other.playouts,
            black_wins: self.black_wins + other.black_wins,
            total_score: self.total_score + other.total_score,
        }
    }

    /// Fraction of playouts Black won, or 0 with no playouts.
    pub fn black_winrate(&self) -> f64 {
        if self.playouts == 0 {
            0.0
        } else {
            self.black_wins as f64 / self.playouts as f64
        }
    }

    pub fn mean_score(&self) -> f64 {
        if self.playouts == 0 {
            0.0
        } else {
            self.total_score as f64 / self.playouts as f64
        }
    }
}

/// Run `count` independent playouts from `state` across the rayon pool.
///
/// Every playout works on its own copy of the board; only the counts are
/// brought back together.
pub fn parallel_playouts(state: &Board, count: usize, margin: i32) -> PlayoutSummary {
    zobrist::init();
    let summary = (0..count)
        .into_par_iter()
        .map_init(fastrand::Rng::new, |rng, _| {
            let mut board = state.clone();
            random_playout(&mut board, rng)
        })
        .fold(PlayoutSummary::default, |acc, score| acc.record(score, margin))
        .reduce(PlayoutSummary::default, PlayoutSummary::merge);
    debug!(
        "{} playouts: black winrate {:.3}, mean score {:+.2}",
        summary.playouts,
        summary.black_winrate(),
        summary.mean_score()
    );
    summary
}
