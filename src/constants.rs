//! Constants for board geometry, search parameters and the tag schema.
//!
//! The board uses a 1D array representation with a one-cell sentinel border,
//! sized once for the largest supported board so every size from 1 to
//! [`MAX_SIZE`] shares the same layout.

// =============================================================================
// Board Geometry
// =============================================================================

/// Largest supported board side length.
pub const MAX_SIZE: usize = 21;

/// Row stride of the padded grid (one sentinel cell on each side).
pub const STRIDE: usize = MAX_SIZE + 2;

/// Total number of cells in the padded grid.
pub const GRID: usize = STRIDE * STRIDE;

/// Largest possible string (or empty region) on a supported board.
pub const MAX_STRING: usize = MAX_SIZE * MAX_SIZE;

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Visits a non-root node needs before its children are expanded.
pub const EXPAND_VISITS: u32 = 2;

/// Exploration bias added (for Black) or subtracted (for White) from a
/// child's win count before dividing by its visits.
pub const EXPLORATION_BIAS: f64 = 1.0;

/// Black wins a playout when its raw score exceeds this margin.
/// With integer area scores this is equivalent to a komi of 7.5.
pub const WIN_MARGIN: i32 = 7;

/// Scale of the random jitter used to break ties between equal children.
pub const JITTER: f64 = 1e-6;

/// Default number of search iterations per move.
pub const N_ITERATIONS: usize = 1000;

// =============================================================================
// Game Tree Schema
// =============================================================================

/// Maximum number of tags a schema may register.
pub const MAX_TAGS: usize = 32;
