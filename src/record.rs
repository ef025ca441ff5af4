//! Game records and replay.
//!
//! A [`GameRecord`] is a fully parsed, non-branching game: board size,
//! handicap stones, komi and the move sequence. Turning text into a record is
//! left to the caller. [`Replay`] walks a record through the rules engine,
//! stopping at the first ply the engine rejects.

use crate::board::{Board, Move, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub size: usize,
    pub handicaps: Vec<Point>,
    /// Points added to White's score
    pub komi: f32,
    pub moves: Vec<Move>,
}

impl GameRecord {
    pub fn new(size: usize) -> Self {
        GameRecord {
            size,
            handicaps: Vec::new(),
            komi: 0.0,
            moves: Vec::new(),
        }
    }

    /// Replay the whole record, returning the final position and how many
    /// plies were accepted.
    pub fn replay(&self) -> (Board, usize) {
        let mut replay = Replay::start(self);
        while replay.step() {}
        let played = replay.move_num();
        (replay.into_state(), played)
    }

    /// Whether every ply of the record is legal.
    pub fn is_valid(&self) -> bool {
        self.replay().1 == self.moves.len()
    }
}

/// Iterator-style cursor over a record's plies.
pub struct Replay<'a> {
    record: &'a GameRecord,
    move_num: usize,
    state: Board,
}

impl<'a> Replay<'a> {
    pub fn start(record: &'a GameRecord) -> Self {
        Replay {
            record,
            move_num: 0,
            state: Board::setup(record.size, &record.handicaps),
        }
    }

    /// Apply the next ply. Returns false at the end of the record or on an
    /// illegal ply, leaving the position before it.
    pub fn step(&mut self) -> bool {
        let Some(&mv) = self.record.moves.get(self.move_num) else {
            return false;
        };
        if !self.state.legal(mv) {
            return false;
        }
        if let Err(e) = self.state.play(mv) {
            unreachable!("legality check passed but {mv} was rejected: {e}");
        }
        self.move_num += 1;
        true
    }

    /// Plies applied so far.
    pub fn move_num(&self) -> usize {
        self.move_num
    }

    pub fn state(&self) -> &Board {
        &self.state
    }

    pub fn into_state(self) -> Board {
        self.state
    }

    /// Black's margin after komi, once the game has been scored.
    pub fn result(&self) -> Option<f32> {
        self.state
            .scored()
            .then(|| self.state.score() as f32 - self.record.komi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    #[test]
    fn test_replay_to_end() {
        let mut record = GameRecord::new(5);
        record.komi = 0.5;
        record.moves = vec![Move::at(3, 3), Move::Pass, Move::Pass];

        let mut replay = Replay::start(&record);
        assert!(replay.result().is_none());
        while replay.step() {}
        assert_eq!(replay.move_num(), 3);
        assert_eq!(replay.result(), Some(24.5));
        assert!(record.is_valid());
    }

    #[test]
    fn test_replay_stops_at_illegal_ply() {
        let mut record = GameRecord::new(5);
        record.moves = vec![Move::at(3, 3), Move::at(3, 3), Move::at(1, 1)];
        let (state, played) = record.replay();
        assert_eq!(played, 1);
        assert_eq!(state.turn(), Color::White);
        assert!(!record.is_valid());
    }

    #[test]
    fn test_handicap_record() {
        let mut record = GameRecord::new(9);
        record.handicaps = vec![Point::new(3, 3), Point::new(7, 7)];
        record.moves = vec![Move::at(5, 5)];
        let (state, played) = record.replay();
        assert_eq!(played, 1);
        assert_eq!(state.get(Point::new(5, 5)), Some(Color::White));
        assert_eq!(state.get(Point::new(7, 7)), Some(Color::Black));
    }
}
