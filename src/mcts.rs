//! Monte Carlo Tree Search with uniform random playouts.
//!
//! Each iteration runs four phases:
//! - Selection: walk down from the root. A node that is eligible for
//!   expansion and still has an unexpanded move grows a child for the first
//!   such move and the walk stops there. Otherwise the mover picks the child
//!   with the best biased winrate.
//! - Simulation: a random playout from the selected node's position.
//! - Backpropagation: every node on the path, root included, gains a visit,
//!   and a win if Black's score beat the win margin.
//!
//! Win counts are always kept for Black. Black maximises the biased winrate
//! and White minimises it.

use log::{debug, trace};

use crate::board::{Board, Color, Move};
use crate::constants::{EXPAND_VISITS, EXPLORATION_BIAS, JITTER, WIN_MARGIN};
use crate::gtree::TreeError;
use crate::playout::random_playout;

/// Tunable search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Visits a non-root node needs before it grows children
    pub expand_visits: u32,
    /// Bonus wins granted to the mover's side when rating a child
    pub bias: f64,
    /// Black wins a playout when its raw score is above this
    pub win_margin: i32,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            expand_visits: EXPAND_VISITS,
            bias: EXPLORATION_BIAS,
            win_margin: WIN_MARGIN,
        }
    }
}

/// A node in the search tree.
///
/// Holds one child slot per legal move of its position, filled on expansion.
#[derive(Debug)]
pub struct SearchNode {
    state: Board,
    /// Number of playouts through this node
    visits: u32,
    /// Playouts through this node won by Black
    wins: u32,
    moves: Vec<Move>,
    children: Vec<Option<Box<SearchNode>>>,
}

impl SearchNode {
    /// A one-ply tree for `state` with zero counters.
    pub fn new(state: &Board) -> Result<Self, TreeError> {
        let moves = state.moves();
        let mut children = Vec::new();
        children.try_reserve_exact(moves.len())?;
        children.resize_with(moves.len(), || None);
        Ok(Self {
            state: state.clone(),
            visits: 0,
            wins: 0,
            moves,
            children,
        })
    }

    pub fn state(&self) -> &Board {
        &self.state
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }

    /// Black wins recorded through this node.
    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Legal moves of the position, ascending.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Black's winrate, or -0.1 for an unvisited node.
    #[inline]
    pub fn winrate(&self) -> f64 {
        if self.visits > 0 {
            self.wins as f64 / self.visits as f64
        } else {
            -0.1
        }
    }

    /// The expanded child for `mv`.
    pub fn child(&self, mv: Move) -> Option<&SearchNode> {
        let index = self.moves.binary_search(&mv).ok()?;
        self.children[index].as_deref()
    }

    /// Expanded children with their moves, in move order.
    pub fn children(&self) -> impl Iterator<Item = (Move, &SearchNode)> {
        self.moves
            .iter()
            .zip(&self.children)
            .filter_map(|(&mv, c)| c.as_deref().map(|c| (mv, c)))
    }

    /// Total number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children().map(|(_, c)| c.size()).sum::<usize>()
    }

    /// Keep only the subtree for `mv`, detached as a new root.
    ///
    /// Every sibling subtree is freed along with `self`. If `mv` was never
    /// expanded the whole tree is handed back untouched as `Err`.
    pub fn descend(mut self, mv: Move) -> Result<SearchNode, SearchNode> {
        let Ok(index) = self.moves.binary_search(&mv) else {
            return Err(self);
        };
        match self.children[index].take() {
            Some(child) => Ok(*child),
            None => Err(self),
        }
    }

    /// Grow the child for the move at `index`.
    fn expand(&mut self, index: usize) -> Result<(), TreeError> {
        let mv = self.moves[index];
        let mut state = self.state.clone();
        if let Err(e) = state.play(mv) {
            panic!("move {mv} from the node's own legal list failed to apply: {e}");
        }
        self.children[index] = Some(Box::new(SearchNode::new(&state)?));
        Ok(())
    }
}

/// Biased winrate of `child` as seen from `mover`, plus tie-breaking jitter.
///
/// The bias counts as extra wins for the mover, so lightly visited children
/// look better to whoever is choosing.
fn urgency(
    child: &SearchNode,
    mover: Color,
    params: &SearchParams,
    rng: &mut fastrand::Rng,
) -> f64 {
    let bias = match mover {
        Color::Black => params.bias,
        Color::White => -params.bias,
    };
    let visits = child.visits.max(1) as f64;
    (child.wins as f64 + bias) / visits + rng.f64() * JITTER
}

/// Index of the mover's preferred expanded child.
fn most_urgent(
    node: &SearchNode,
    params: &SearchParams,
    rng: &mut fastrand::Rng,
) -> Option<usize> {
    let mover = node.state.turn();
    let rated = node
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.as_deref().map(|c| (i, urgency(c, mover, params, rng))));
    let best = match mover {
        Color::Black => rated.max_by(|a, b| a.1.total_cmp(&b.1)),
        Color::White => rated.min_by(|a, b| a.1.total_cmp(&b.1)),
    };
    best.map(|(i, _)| i)
}

/// Walk down from the root, expanding at most one node.
///
/// Returns the path of child indices from root to the selected node.
fn tree_descend(
    root: &mut SearchNode,
    params: &SearchParams,
    rng: &mut fastrand::Rng,
) -> Result<Vec<usize>, TreeError> {
    let mut path = Vec::new();
    let mut node = root;

    loop {
        // the root is always open for expansion
        let eligible = path.is_empty() || node.visits >= params.expand_visits;
        if node.moves.is_empty() || !eligible {
            break;
        }

        if let Some(index) = node.children.iter().position(Option::is_none) {
            node.expand(index)?;
            path.push(index);
            break;
        }

        let Some(index) = most_urgent(node, params, rng) else {
            break;
        };
        path.push(index);
        node = match node.children[index].as_deref_mut() {
            Some(child) => child,
            None => break,
        };
    }

    Ok(path)
}

/// Propagate one playout result along `path`, root included.
fn tree_update(root: &mut SearchNode, path: &[usize], black_won: bool) {
    let mut node = root;
    node.visits += 1;
    node.wins += u32::from(black_won);
    for &index in path {
        node = match node.children[index].as_deref_mut() {
            Some(child) => child,
            None => return,
        };
        node.visits += 1;
        node.wins += u32::from(black_won);
    }
}

/// Get the node reached by following the given path.
fn leaf<'a>(root: &'a SearchNode, path: &[usize]) -> &'a SearchNode {
    path.iter()
        .try_fold(root, |node, &i| node.children[i].as_deref())
        .unwrap_or(root)
}

/// Run one selection, simulation and backpropagation pass.
///
/// Returns the playout's raw score. If the new node cannot be allocated the
/// tree is left as it was.
pub fn run_iteration(
    root: &mut SearchNode,
    params: &SearchParams,
    rng: &mut fastrand::Rng,
) -> Result<i32, TreeError> {
    let path = tree_descend(root, params, rng)?;
    let mut state = leaf(root, &path).state.clone();
    let score = random_playout(&mut state, rng);
    tree_update(root, &path, score > params.win_margin);
    Ok(score)
}

/// Run `iterations` search iterations and return the chosen move.
pub fn tree_search(
    root: &mut SearchNode,
    iterations: usize,
    params: &SearchParams,
    rng: &mut fastrand::Rng,
) -> Result<Option<Move>, TreeError> {
    for _ in 0..iterations {
        run_iteration(root, params, rng)?;
    }

    let choice = choose_move(root, params, rng);
    debug!(
        "{} iterations, {} nodes, black winrate {:.3}, {} to play chooses {}",
        iterations,
        root.size(),
        root.winrate(),
        root.state.turn(),
        choice.map_or_else(|| "nothing".to_string(), |mv| mv.to_string())
    );
    Ok(choice)
}

/// The side to move's preferred move among the root's expanded children.
///
/// Unexpanded moves are never chosen; `None` if nothing is expanded.
pub fn choose_move(
    root: &SearchNode,
    params: &SearchParams,
    rng: &mut fastrand::Rng,
) -> Option<Move> {
    most_urgent(root, params, rng).map(|i| root.moves[i])
}

/// Log statistics for each of the root's expanded children.
pub fn dump_children(root: &SearchNode) {
    for (mv, child) in root.children() {
        trace!(
            "move {} v={} w={} wr={:.3}",
            mv,
            child.visits,
            child.wins,
            child.winrate()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> fastrand::Rng {
        fastrand::Rng::with_seed(0x5EED)
    }

    #[test]
    fn test_new_node() {
        let root = SearchNode::new(&Board::new(3)).unwrap();
        assert_eq!(root.visits(), 0);
        assert_eq!(root.wins(), 0);
        assert_eq!(root.moves().len(), 10);
        assert_eq!(root.children().count(), 0);
        assert_eq!(root.winrate(), -0.1);
    }

    #[test]
    fn test_first_iteration_expands_first_move() {
        let mut root = SearchNode::new(&Board::new(5)).unwrap();
        run_iteration(&mut root, &SearchParams::default(), &mut seeded()).unwrap();
        assert_eq!(root.visits(), 1);
        assert_eq!(root.size(), 2);
        let child = root.child(Move::Pass).unwrap();
        assert_eq!(child.visits(), 1);
        assert_eq!(child.wins(), root.wins());
    }

    #[test]
    fn test_root_children_expand_in_order() {
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        let params = SearchParams::default();
        let mut rng = seeded();
        for _ in 0..4 {
            run_iteration(&mut root, &params, &mut rng).unwrap();
        }
        let expanded: Vec<Move> = root.children().map(|(mv, _)| mv).collect();
        assert_eq!(expanded, root.moves()[..4].to_vec());
    }

    #[test]
    fn test_visits_are_conserved() {
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        let params = SearchParams::default();
        let mut rng = seeded();
        for _ in 0..60 {
            run_iteration(&mut root, &params, &mut rng).unwrap();
        }
        assert_eq!(root.visits(), 60);
        let through_children: u32 = root.children().map(|(_, c)| c.visits()).sum();
        assert_eq!(through_children, 60);
        // every root move expanded, and some grandchildren since
        assert_eq!(root.children().count(), root.moves().len());
        assert!(root.size() > 1 + root.moves().len());
    }

    #[test]
    fn test_low_visit_children_are_not_expanded() {
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        let params = SearchParams { expand_visits: 100, ..SearchParams::default() };
        let mut rng = seeded();
        for _ in 0..30 {
            run_iteration(&mut root, &params, &mut rng).unwrap();
        }
        assert_eq!(root.size(), 1 + root.moves().len());
    }

    #[test]
    fn test_terminal_root_is_simulated_in_place() {
        let mut board = Board::new(3);
        board.play(Move::at(2, 2)).unwrap();
        board.play(Move::Pass).unwrap();
        board.play(Move::Pass).unwrap();
        let mut root = SearchNode::new(&board).unwrap();
        assert!(root.moves().is_empty());
        let score = run_iteration(&mut root, &SearchParams::default(), &mut seeded()).unwrap();
        assert_eq!(score, 9);
        assert_eq!(root.visits(), 1);
        assert_eq!(root.wins(), 1);
        assert_eq!(choose_move(&root, &SearchParams::default(), &mut seeded()), None);
    }

    fn with_stats(state: &Board, visits: u32, wins: u32) -> Box<SearchNode> {
        let mut node = SearchNode::new(state).unwrap();
        node.visits = visits;
        node.wins = wins;
        Box::new(node)
    }

    #[test]
    fn test_choice_depends_on_mover() {
        let params = SearchParams::default();
        let mut rng = seeded();

        let mut black = SearchNode::new(&Board::new(3)).unwrap();
        black.children[1] = Some(with_stats(&black.state, 10, 9));
        black.children[2] = Some(with_stats(&black.state, 10, 1));
        assert_eq!(choose_move(&black, &params, &mut rng), Some(black.moves[1]));

        let mut board = Board::new(3);
        board.play(Move::Pass).unwrap();
        let mut white = SearchNode::new(&board).unwrap();
        white.children[1] = Some(with_stats(&white.state, 10, 9));
        white.children[2] = Some(with_stats(&white.state, 10, 1));
        assert_eq!(choose_move(&white, &params, &mut rng), Some(white.moves[2]));
    }

    #[test]
    fn test_bias_favours_unexplored_for_mover() {
        let params = SearchParams { bias: 1.0, ..SearchParams::default() };
        let mut rng = seeded();
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        // same winrate, fewer visits: bonus is worth more
        root.children[1] = Some(with_stats(&root.state, 2, 1));
        root.children[2] = Some(with_stats(&root.state, 20, 10));
        assert_eq!(choose_move(&root, &params, &mut rng), Some(root.moves[1]));
    }

    #[test]
    fn test_unexpanded_move_never_chosen() {
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        run_iteration(&mut root, &SearchParams::default(), &mut seeded()).unwrap();
        assert_eq!(
            choose_move(&root, &SearchParams::default(), &mut seeded()),
            Some(Move::Pass)
        );
    }

    #[test]
    fn test_descend_keeps_subtree() {
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        let params = SearchParams::default();
        let mut rng = seeded();
        for _ in 0..40 {
            run_iteration(&mut root, &params, &mut rng).unwrap();
        }
        let mv = root.moves()[3];
        let (visits, size) = {
            let child = root.child(mv).unwrap();
            (child.visits(), child.size())
        };
        let child = root.descend(mv).unwrap();
        assert_eq!(child.visits(), visits);
        assert_eq!(child.size(), size);
    }

    #[test]
    fn test_descend_unexpanded_keeps_tree() {
        let mut root = SearchNode::new(&Board::new(3)).unwrap();
        let params = SearchParams::default();
        let mut rng = seeded();
        for _ in 0..3 {
            run_iteration(&mut root, &params, &mut rng).unwrap();
        }
        let size = root.size();
        let mv = root.moves()[5];
        assert!(root.child(mv).is_none());

        let root = root.descend(mv).unwrap_err();
        assert_eq!(root.size(), size);
        assert_eq!(root.visits(), 3);
        let root = root.descend(Move::at(4, 4)).unwrap_err();
        assert_eq!(root.size(), size);
    }
}
