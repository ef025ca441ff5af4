//! Goban-MCTS: Go rules, a schema-tagged game tree and a random-playout
//! Monte Carlo Tree Search.
//!
//! ## Modules
//!
//! - [`constants`] - Board geometry, search defaults and schema limits
//! - [`zobrist`] - Process-wide position hash keys
//! - [`board`] - Core game logic (board state, moves, captures, scoring)
//! - [`schema`] - Tag registry for per-node and per-move tree data
//! - [`gtree`] - Generic game tree over board positions
//! - [`playout`] - Random game simulation, single and parallel
//! - [`mcts`] - Monte Carlo Tree Search
//! - [`record`] - Game records and replay
//!
//! ## Example
//!
//! ```
//! use goban_mcts::board::{Board, Move};
//! use goban_mcts::mcts::{tree_search, SearchNode, SearchParams};
//!
//! # fn main() -> Result<(), goban_mcts::gtree::TreeError> {
//! // Create a new game
//! let mut board = Board::new(5);
//!
//! // Play a move
//! board.play(Move::at(3, 3)).unwrap();
//!
//! // Run MCTS to find the best response
//! let mut root = SearchNode::new(&board)?;
//! let mut rng = fastrand::Rng::with_seed(1);
//! let best = tree_search(&mut root, 100, &SearchParams::default(), &mut rng)?;
//! println!("Best move: {}", best.unwrap_or(Move::Pass));
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod constants;
pub mod gtree;
pub mod mcts;
pub mod playout;
pub mod record;
pub mod schema;
pub mod zobrist;
