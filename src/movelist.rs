//! Ply-partitioned move list shared by every depth of a tree walk.
//!
//! This module provides `MoveList`, a single flat buffer that is carved into one
//! segment per ply by start offsets rather than allocating a list per node. Generation
//! at ply `p` appends after whatever ply `p - 1` left behind, so a recursive walk keeps
//! every ancestor's moves intact while it explores a child.

use std::ops::Range;

use crate::types::Move;

/// Deepest ply the list can hold.
pub const MAX_PLY: usize = 128;

/// Total slots in the flat buffer.
pub const MOVE_LIST_SIZE: usize = MAX_PLY * 256;

/// Flat move buffer partitioned by ply.
///
/// The protocol for one ply is `start_ply(p)`, any number of `add`, then `end_ply()`.
/// Afterwards `get_moves(p)` is the slice between ply `p`'s start and ply `p + 1`'s
/// start, which stays valid until `start_ply(p)` is called again.
#[derive(Clone)]
pub struct MoveList {
    moves: Vec<Move>,
    first_move: [usize; MAX_PLY + 1],
    insert: usize,
    ply: usize,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            moves: vec![Move::null(); MOVE_LIST_SIZE],
            first_move: [0; MAX_PLY + 1],
            insert: 0,
            ply: 0,
        }
    }

    /// Begin appending moves for `ply` at that ply's recorded start.
    #[inline]
    pub fn start_ply(&mut self, ply: usize) {
        debug_assert!(ply < MAX_PLY, "MoveList ply out of range: {ply}");
        self.ply = ply;
        self.insert = self.first_move[ply];
        self.first_move[ply + 1] = self.insert;
    }

    /// Add a move to the ply being generated.
    #[inline(always)]
    pub fn add(&mut self, mv: Move) {
        debug_assert!(self.insert < MOVE_LIST_SIZE, "MoveList overflow");
        self.moves[self.insert] = mv;
        self.insert += 1;
    }

    /// Close the ply being generated; the next ply starts at the cursor.
    #[inline]
    pub fn end_ply(&mut self) {
        self.first_move[self.ply + 1] = self.insert;
    }

    /// Index range of `ply`'s moves in the flat buffer.
    #[inline(always)]
    pub fn ply_range(&self, ply: usize) -> Range<usize> {
        debug_assert!(ply < MAX_PLY);
        self.first_move[ply]..self.first_move[ply + 1]
    }

    #[inline]
    pub fn get_moves(&self, ply: usize) -> &[Move] {
        &self.moves[self.ply_range(ply)]
    }

    #[inline]
    pub fn get_moves_mut(&mut self, ply: usize) -> &mut [Move] {
        let range = self.ply_range(ply);
        &mut self.moves[range]
    }

    /// Get a move by flat index (copy by value).
    /// This is the key to avoiding borrow checker issues in recursive walks.
    #[inline(always)]
    pub fn get(&self, idx: usize) -> Move {
        debug_assert!(idx < MOVE_LIST_SIZE, "MoveList index out of bounds");
        self.moves[idx]
    }

    /// Number of moves recorded for `ply`.
    #[inline]
    pub fn count(&self, ply: usize) -> usize {
        self.ply_range(ply).len()
    }

    /// Forget every ply.
    pub fn clear(&mut self) {
        self.first_move = [0; MAX_PLY + 1];
        self.insert = 0;
        self.ply = 0;
    }

    /// One step of selection sort: move the best-scoring entry of `moves[from..]` to
    /// `from` and return it. Calling this with `from = 0, 1, 2, ...` yields the moves
    /// in descending score order without sorting the tail that is never visited.
    #[inline]
    pub fn get_next_move(moves: &mut [Move], from: usize) -> Move {
        debug_assert!(from < moves.len(), "get_next_move: start out of bounds");

        let mut best_idx = from;
        let mut best_score = moves[from].score;

        for (i, mv) in moves.iter().enumerate().skip(from + 1) {
            if mv.score > best_score {
                best_score = mv.score;
                best_idx = i;
            }
        }

        if best_idx != from {
            moves.swap(from, best_idx);
        }

        moves[from]
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}
