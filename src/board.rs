//! Go board state and rules.
//!
//! This module provides the core game logic, including:
//! - Board representation using a 1D array with a sentinel border
//! - Stone placement, capture and suicide detection
//! - Territory scoring after two consecutive passes
//! - Incremental Zobrist hashing of the occupied set
//!
//! Every board size from 1 to [`MAX_SIZE`] shares one padded layout of
//! [`STRIDE`] x [`STRIDE`] cells. Cells outside the playable square read as
//! empty, so neighbor lookups never branch on the edge; liberty tests check
//! that an empty neighbor is actually on the board.

use std::fmt;
use std::str::FromStr;

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::constants::{GRID, MAX_SIZE, MAX_STRING, STRIDE};
use crate::zobrist::stone_key;

/// Stone colour, also used for the side to move.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "BLACK"),
            Color::White => write!(f, "WHITE"),
        }
    }
}

/// A 1-indexed board intersection.
///
/// Ordering is row-major, which is the order move lists are kept in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: u8,
    pub col: u8,
}

impl Point {
    pub const fn new(row: u8, col: u8) -> Self {
        Point { row, col }
    }

    /// Index into the padded grid. Only meaningful for points inside it.
    #[inline]
    fn idx(self) -> usize {
        self.row as usize * STRIDE + self.col as usize
    }

    #[inline]
    fn from_idx(idx: usize) -> Self {
        Point::new((idx / STRIDE) as u8, (idx % STRIDE) as u8)
    }
}

/// A ply: a stone placement or a pass.
///
/// `Pass` sorts before every stone, so a sorted move list starts with it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Move {
    Pass,
    Stone(Point),
}

impl Move {
    pub const fn at(row: u8, col: u8) -> Self {
        Move::Stone(Point::new(row, col))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Pass => write!(f, "pass"),
            Move::Stone(p) => write!(f, "{},{}", p.row, p.col),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected `pass` or `row,col`, got `{0}`")]
pub struct ParseMoveError(String);

impl FromStr for Move {
    type Err = ParseMoveError;

    /// Parses `pass` (any case) or a 1-indexed `row,col` pair.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("pass") {
            return Ok(Move::Pass);
        }
        let err = || ParseMoveError(s.to_string());
        let (row, col) = s.split_once(',').ok_or_else(err)?;
        let row = row.trim().parse::<u8>().map_err(|_| err())?;
        let col = col.trim().parse::<u8>().map_err(|_| err())?;
        Ok(Move::at(row, col))
    }
}

/// Why a ply was rejected. The board is unchanged whenever one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The game has already been scored
    #[error("illegal move: game is over")]
    GameOver,
    /// Point is outside the board
    #[error("illegal move: point is off the board")]
    OutOfRange,
    /// Point is not empty
    #[error("illegal move: point not empty")]
    Occupied,
    /// Move would leave its own string without liberties
    #[error("illegal move: suicide")]
    Suicide,
}

/// Work list for flood fills; a string can never exceed the board area.
type Cells = ArrayVec<usize, MAX_STRING>;

/// A Go position.
///
/// Created by [`Board::setup`], changed only by [`Board::play`], and frozen
/// once two consecutive passes have scored it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Color>; GRID],
    hash: u64,
    size: usize,
    turn: Color,
    passed: bool,
    scored: bool,
    /// Black minus White area (stones plus territory), before komi
    score: i32,
    /// Stones captured *by* each colour
    captures: [u32; 2],
}

impl Board {
    /// An empty board with Black to move.
    pub fn new(size: usize) -> Self {
        Self::setup(size, &[])
    }

    /// Set up a board with handicap stones.
    ///
    /// Handicap stones are Black and do not alternate the turn; with at least
    /// one of them White moves first.
    ///
    /// # Panics
    /// If `size` is not in `1..=MAX_SIZE`, or a handicap point is off the
    /// board or given twice.
    pub fn setup(size: usize, handicaps: &[Point]) -> Self {
        assert!(
            (1..=MAX_SIZE).contains(&size),
            "board size {size} outside 1..={MAX_SIZE}"
        );
        let mut board = Board {
            cells: [None; GRID],
            hash: 0,
            size,
            turn: if handicaps.is_empty() { Color::Black } else { Color::White },
            passed: false,
            scored: false,
            score: 0,
            captures: [0; 2],
        };
        for &pt in handicaps {
            let idx = board
                .checked_index(pt)
                .unwrap_or_else(|| panic!("handicap point {pt:?} is off the board"));
            assert!(board.cells[idx].is_none(), "handicap point {pt:?} given twice");
            board.cells[idx] = Some(Color::Black);
            board.hash ^= stone_key(idx, Color::Black);
        }
        board
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Whether the previous ply was a pass.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Whether the game has ended and been scored.
    pub fn scored(&self) -> bool {
        self.scored
    }

    /// Black area minus White area, before komi. Zero until scored.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Number of stones `color` has captured.
    pub fn captures(&self, color: Color) -> u32 {
        self.captures[color.index()]
    }

    /// Incrementally maintained position hash.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The stone at `pt`, or `None` if empty or off the board.
    pub fn get(&self, pt: Point) -> Option<Color> {
        self.checked_index(pt).and_then(|idx| self.cells[idx])
    }

    /// Hash recomputed from scratch over the occupied cells.
    pub fn recompute_hash(&self) -> u64 {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| c.map(|color| stone_key(idx, color)))
            .fold(0, |h, k| h ^ k)
    }

    #[inline]
    fn on_board(&self, idx: usize) -> bool {
        let (row, col) = (idx / STRIDE, idx % STRIDE);
        (1..=self.size).contains(&row) && (1..=self.size).contains(&col)
    }

    fn checked_index(&self, pt: Point) -> Option<usize> {
        let (row, col) = (pt.row as usize, pt.col as usize);
        if row == 0 || row > self.size || col == 0 || col > self.size {
            return None;
        }
        Some(pt.idx())
    }

    /// Colour at `idx`, treating `placed` as a stone that is not on the grid.
    #[inline]
    fn at(&self, idx: usize, placed: Option<(usize, Color)>) -> Option<Color> {
        match placed {
            Some((p, color)) if p == idx => Some(color),
            _ => self.cells[idx],
        }
    }

    /// Flood fill the string containing `seed`.
    ///
    /// Stops at the first liberty found and returns `None`. If the frontier is
    /// exhausted without one, returns every stone of the string.
    fn dead_string(&self, seed: usize, placed: Option<(usize, Color)>) -> Option<Cells> {
        let color = self.at(seed, placed)?;
        let mut visited = [false; GRID];
        let mut stack = Cells::new();
        let mut string = Cells::new();

        visited[seed] = true;
        stack.push(seed);
        while let Some(pt) = stack.pop() {
            string.push(pt);
            for n in neighbors(pt) {
                match self.at(n, placed) {
                    None if self.on_board(n) => return None,
                    Some(c) if c == color && !visited[n] => {
                        visited[n] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }
        Some(string)
    }

    /// Play a stone or a pass for the side to move.
    ///
    /// A second consecutive pass scores the game. On `Err` nothing changed.
    pub fn play(&mut self, mv: Move) -> Result<(), MoveError> {
        if self.scored {
            return Err(MoveError::GameOver);
        }

        let pt = match mv {
            Move::Pass => {
                if self.passed {
                    self.score_area();
                } else {
                    self.passed = true;
                }
                self.turn = self.turn.opponent();
                return Ok(());
            }
            Move::Stone(pt) => pt,
        };

        let idx = self.checked_index(pt).ok_or(MoveError::OutOfRange)?;
        if self.cells[idx].is_some() {
            return Err(MoveError::Occupied);
        }

        let own = self.turn;
        let opp = own.opponent();
        self.cells[idx] = Some(own);

        let mut captured = 0;
        for n in neighbors(idx) {
            // an earlier neighbor may already have taken this string
            if self.cells[n] != Some(opp) {
                continue;
            }
            if let Some(string) = self.dead_string(n, None) {
                for &s in &string {
                    self.hash ^= stone_key(s, opp);
                    self.cells[s] = None;
                }
                captured += string.len();
            }
        }

        if captured == 0 && self.dead_string(idx, None).is_some() {
            self.cells[idx] = None;
            return Err(MoveError::Suicide);
        }

        self.captures[own.index()] += captured as u32;
        self.hash ^= stone_key(idx, own);
        self.passed = false;
        self.turn = opp;
        Ok(())
    }

    /// Whether [`Board::play`] would accept `mv`, without changing anything.
    pub fn legal(&self, mv: Move) -> bool {
        if self.scored {
            return false;
        }
        let pt = match mv {
            Move::Pass => return true,
            Move::Stone(pt) => pt,
        };
        let Some(idx) = self.checked_index(pt) else {
            return false;
        };
        if self.cells[idx].is_some() {
            return false;
        }

        let own = self.turn;
        let placed = Some((idx, own));
        for n in neighbors(idx) {
            match self.cells[n] {
                None if self.on_board(n) => return true,
                Some(c) if c != own && self.dead_string(n, placed).is_some() => return true,
                _ => {}
            }
        }
        self.dead_string(idx, placed).is_none()
    }

    /// Pass followed by every empty point, in ascending order.
    ///
    /// Fast, but may include suicides.
    pub fn moves_loose(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(self.size * self.size + 1);
        moves.push(Move::Pass);
        moves.extend(
            self.points()
                .filter(|&idx| self.cells[idx].is_none())
                .map(|idx| Move::Stone(Point::from_idx(idx))),
        );
        moves
    }

    /// Exactly the legal moves, in ascending order. Empty once scored.
    pub fn moves(&self) -> Vec<Move> {
        if self.scored {
            return Vec::new();
        }
        let mut moves = self.moves_loose();
        moves.retain(|&mv| self.legal(mv));
        moves
    }

    /// Padded-grid indices of the playable points, row-major.
    fn points(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.size).flat_map(|row| (1..=self.size).map(move |col| row * STRIDE + col))
    }

    /// Fill single-owner empty regions and tally the area score.
    fn score_area(&mut self) {
        let mut visited = [false; GRID];
        for row in 1..=self.size {
            for col in 1..=self.size {
                let idx = row * STRIDE + col;
                if self.cells[idx].is_some() || visited[idx] {
                    continue;
                }

                let mut stack = Cells::new();
                let mut region = Cells::new();
                let mut borders = [false; 2];

                visited[idx] = true;
                stack.push(idx);
                while let Some(pt) = stack.pop() {
                    region.push(pt);
                    for n in neighbors(pt) {
                        match self.cells[n] {
                            None => {
                                if self.on_board(n) && !visited[n] {
                                    visited[n] = true;
                                    stack.push(n);
                                }
                            }
                            Some(c) => borders[c.index()] = true,
                        }
                    }
                }

                let owner = match borders {
                    [true, false] => Color::Black,
                    [false, true] => Color::White,
                    _ => continue,
                };
                for &pt in &region {
                    self.cells[pt] = Some(owner);
                    self.hash ^= stone_key(pt, owner);
                }
            }
        }

        let (mut black, mut white) = (0i32, 0i32);
        for idx in self.points() {
            match self.cells[idx] {
                Some(Color::Black) => black += 1,
                Some(Color::White) => white += 1,
                None => {}
            }
        }
        self.score = black - white;
        self.scored = true;
    }
}

/// The 4 orthogonal neighbors of a padded-grid cell.
#[inline]
fn neighbors(idx: usize) -> [usize; 4] {
    [idx - STRIDE, idx + 1, idx + STRIDE, idx - 1]
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 1..=self.size {
            write!(f, "{col:>2}")?;
        }
        writeln!(f)?;
        for row in 1..=self.size {
            write!(f, "{row:>2} ")?;
            for col in 1..=self.size {
                let ch = match self.cells[row * STRIDE + col] {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, " {ch}")?;
            }
            writeln!(f)?;
        }
        if self.scored {
            writeln!(f, "GAME OVER; score = {:+}", self.score)
        } else if self.passed {
            writeln!(f, "{} to play; previous player PASSED", self.turn)
        } else {
            writeln!(f, "{} to play", self.turn)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_all(board: &mut Board, moves: &[Move]) {
        for &mv in moves {
            board.play(mv).unwrap_or_else(|e| panic!("{mv}: {e}"));
        }
    }

    #[test]
    fn test_setup_turn() {
        assert_eq!(Board::new(9).turn(), Color::Black);
        let board = Board::setup(9, &[Point::new(3, 3)]);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.get(Point::new(3, 3)), Some(Color::Black));
        assert_eq!(board.hash(), board.recompute_hash());
    }

    #[test]
    #[should_panic]
    fn test_setup_rejects_oversize() {
        Board::new(MAX_SIZE + 1);
    }

    #[test]
    fn test_border_reads_empty() {
        let board = Board::new(5);
        assert!(board.cells[Point::new(0, 3).idx()].is_none());
        assert!(!board.on_board(Point::new(0, 3).idx()));
        assert!(!board.on_board(Point::new(6, 3).idx()));
        assert!(board.on_board(Point::new(5, 5).idx()));
    }

    #[test]
    fn test_capture_updates_hash_by_one_cell() {
        let mut board = Board::new(5);
        // Black surrounds White at 1,1 in the corner
        play_all(&mut board, &[Move::at(1, 2), Move::at(1, 1)]);
        let before = board.hash();
        play_all(&mut board, &[Move::at(2, 1)]);
        assert_eq!(board.get(Point::new(1, 1)), None);
        assert_eq!(board.captures(Color::Black), 1);
        let white_key = stone_key(Point::new(1, 1).idx(), Color::White);
        let black_key = stone_key(Point::new(2, 1).idx(), Color::Black);
        assert_eq!(board.hash(), before ^ white_key ^ black_key);
    }

    #[test]
    fn test_suicide_rejected_without_mutation() {
        let mut board = Board::new(5);
        play_all(
            &mut board,
            &[Move::at(1, 2), Move::at(5, 5), Move::at(2, 1)],
        );
        let snapshot = board.clone();
        assert!(!board.legal(Move::at(1, 1)));
        assert_eq!(board.play(Move::at(1, 1)), Err(MoveError::Suicide));
        assert_eq!(board, snapshot);
    }

    #[test]
    fn test_capture_beats_suicide() {
        let mut board = Board::new(3);
        // Black 1,1 has no empty neighbor, but takes White 1,2's last liberty
        play_all(
            &mut board,
            &[Move::at(1, 3), Move::at(1, 2), Move::at(2, 2), Move::at(2, 1)],
        );
        assert!(board.legal(Move::at(1, 1)));
        play_all(&mut board, &[Move::at(1, 1)]);
        assert_eq!(board.get(Point::new(1, 2)), None);
        assert_eq!(board.get(Point::new(2, 1)), Some(Color::White));
        assert_eq!(board.captures(Color::Black), 1);
        assert_eq!(board.hash(), board.recompute_hash());
    }

    #[test]
    fn test_occupied_and_out_of_range() {
        let mut board = Board::new(5);
        play_all(&mut board, &[Move::at(3, 3)]);
        assert_eq!(board.play(Move::at(3, 3)), Err(MoveError::Occupied));
        assert_eq!(board.play(Move::at(0, 3)), Err(MoveError::OutOfRange));
        assert_eq!(board.play(Move::at(6, 1)), Err(MoveError::OutOfRange));
        assert!(!board.legal(Move::at(6, 1)));
    }

    #[test]
    fn test_two_passes_score() {
        let mut board = Board::new(5);
        play_all(&mut board, &[Move::Pass]);
        assert!(board.passed());
        assert!(!board.scored());
        play_all(&mut board, &[Move::Pass]);
        assert!(board.scored());
        assert_eq!(board.score(), 0);
        let snapshot = board.clone();
        assert_eq!(board.play(Move::at(1, 1)), Err(MoveError::GameOver));
        assert_eq!(board.play(Move::Pass), Err(MoveError::GameOver));
        assert_eq!(board, snapshot);
        assert!(board.moves().is_empty());
    }

    #[test]
    fn test_stone_clears_passed() {
        let mut board = Board::new(5);
        play_all(&mut board, &[Move::Pass, Move::at(1, 1), Move::Pass]);
        assert!(!board.scored());
    }

    #[test]
    fn test_moves_sorted() {
        let board = Board::new(3);
        let moves = board.moves();
        assert_eq!(moves.len(), 10);
        assert_eq!(moves[0], Move::Pass);
        assert!(moves.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_exact_moves_exclude_suicide() {
        let mut board = Board::new(3);
        play_all(&mut board, &[Move::at(1, 2), Move::Pass, Move::at(2, 1)]);
        // White to move; 1,1 is suicide for White
        assert!(board.moves_loose().contains(&Move::at(1, 1)));
        assert!(!board.moves().contains(&Move::at(1, 1)));
    }

    #[test]
    fn test_parse_move() {
        assert_eq!("pass".parse::<Move>(), Ok(Move::Pass));
        assert_eq!("PASS".parse::<Move>(), Ok(Move::Pass));
        assert_eq!("3,4".parse::<Move>(), Ok(Move::at(3, 4)));
        assert_eq!(" 10 , 2 ".parse::<Move>(), Ok(Move::at(10, 2)));
        assert!("D4".parse::<Move>().is_err());
        assert_eq!(Move::at(3, 4).to_string(), "3,4");
    }

    #[test]
    fn test_render_status_line() {
        let mut board = Board::new(3);
        assert!(board.to_string().ends_with("BLACK to play\n"));
        board.play(Move::Pass).unwrap();
        assert!(board.to_string().ends_with("WHITE to play; previous player PASSED\n"));
        board.play(Move::at(2, 2)).unwrap();
        board.play(Move::Pass).unwrap();
        board.play(Move::Pass).unwrap();
        assert!(board.to_string().ends_with("GAME OVER; score = -9\n"));
    }
}
