//! Mutable chess position with reversible make/unmake.
//!
//! The position keeps redundant views of the same placement (a square-indexed mailbox,
//! per-kind bitboards, per-color aggregates and an all-pieces board) plus the scalar
//! game state and two incrementally maintained Zobrist hashes. Every placement change
//! goes through [`Board::add_piece`], [`Board::remove_piece`] or [`Board::update_piece`],
//! which keep all views and both hashes in step.
//!
//! Legality is decided after the fact: generation is pseudo-legal and
//! [`Board::make_move`] rejects a move that leaves the mover's king attacked, undoing
//! it before returning `false`. Castling is the exception, rejected before any piece
//! moves when the king starts on or passes through an attacked square.

use std::fmt;

use log::error;

use crate::bitboard::{self, ATTACK_TABLES};
use crate::bitops::{get_bit, lsb_index, pop_count, reset_bit, set_bit, BitboardIter};
use crate::stack::BoundedStack;
use crate::types::squares::*;
use crate::types::{Bitboard, CastlingRights, Color, Move, MoveFlag, PieceType, Square};
use crate::zobrist::{hash_castling, hash_en_passant, hash_piece, hash_side_to_move};

pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Capacity of the undo and repetition stacks.
pub const MAX_GAME_PLY: usize = 1024;

/// Castling rights that survive a move touching each square. A move keeps
/// `mask[from] & mask[to]`, so vacating or capturing on a king or rook home square
/// clears the matching rights for good.
#[rustfmt::skip]
const CASTLE_MASK: [u8; 64] = [
    13, 15, 15, 15, 12, 15, 15, 14,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
     7, 15, 15, 15,  3, 15, 15, 11,
];

/// Squares involved in one castling move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastleRookMove {
    pub king_from: Square,
    pub king_to: Square,
    pub king_through: Square,
    pub rook_from: Square,
    pub rook_to: Square,
}

const CASTLE_ROOK_MOVES: [CastleRookMove; 4] = [
    CastleRookMove { king_from: E1, king_to: C1, king_through: D1, rook_from: A1, rook_to: D1 },
    CastleRookMove { king_from: E1, king_to: G1, king_through: F1, rook_from: H1, rook_to: F1 },
    CastleRookMove { king_from: E8, king_to: C8, king_through: D8, rook_from: A8, rook_to: D8 },
    CastleRookMove { king_from: E8, king_to: G8, king_through: F8, rook_from: H8, rook_to: F8 },
];

/// The castling move whose king lands on `king_to`.
pub fn lookup_castle_rook_move(king_to: Square) -> Option<&'static CastleRookMove> {
    let found = match king_to {
        C1 => Some(&CASTLE_ROOK_MOVES[0]),
        G1 => Some(&CASTLE_ROOK_MOVES[1]),
        C8 => Some(&CASTLE_ROOK_MOVES[2]),
        G8 => Some(&CASTLE_ROOK_MOVES[3]),
        _ => None,
    };
    if found.is_none() {
        error!("Invalid castling move with king moving to square {king_to}");
        debug_assert!(false, "invalid castling destination {king_to}");
    }
    found
}

/// Square of the pawn taken by an en passant capture landing on `to`.
#[inline(always)]
fn en_passant_victim(mover: Color, to: Square) -> Square {
    match mover {
        Color::White => to - 8,
        Color::Black => to + 8,
    }
}

/// Scalar state saved before a move so unmake can restore it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoardState {
    mv: Move,
    ply: usize,
    half_move_clock: u32,
    full_move_counter: u32,
    castling: CastlingRights,
    en_passant: Option<Square>,
    en_passant_validated: Option<Square>,
    side_to_move: Color,
    hash: u64,
    pawn_hash: u64,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    pub(crate) board: [Option<PieceType>; 64],
    pub(crate) pieces: [[Bitboard; 6]; 2],
    pub(crate) units: [Bitboard; 2],
    pub(crate) all: Bitboard,
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    /// Raw target square after a double push
    pub(crate) en_passant: Option<Square>,
    /// Target that an enemy pawn can actually capture on; only this one is hashed
    pub(crate) en_passant_validated: Option<Square>,
    pub(crate) half_move_clock: u32,
    pub(crate) full_move_counter: u32,
    pub(crate) ply: usize,
    pub(crate) hash: u64,
    pub(crate) pawn_hash: u64,
    history: Box<[[i32; 64]; 64]>,
    state_stack: BoundedStack<BoardState>,
    pub(crate) repeat_stack: BoundedStack<u64>,
}

impl Board {
    /// An empty board, white to move, no castling rights.
    pub fn new() -> Self {
        bitboard::init();
        Board {
            board: [None; 64],
            pieces: [[0; 6]; 2],
            units: [0; 2],
            all: 0,
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            en_passant_validated: None,
            half_move_clock: 0,
            full_move_counter: 0,
            ply: 0,
            hash: 0,
            pawn_hash: 0,
            history: Box::new([[0; 64]; 64]),
            state_stack: BoundedStack::with_capacity(MAX_GAME_PLY),
            repeat_stack: BoundedStack::with_capacity(MAX_GAME_PLY),
        }
    }

    /// A board holding the standard initial position.
    pub fn start_position() -> Self {
        let mut board = Board::new();
        board.load_new_game_position();
        board
    }

    /// Reset to the empty board.
    pub fn clear(&mut self) {
        self.board = [None; 64];
        self.pieces = [[0; 6]; 2];
        self.units = [0; 2];
        self.all = 0;
        self.side_to_move = Color::White;
        self.castling = CastlingRights::NONE;
        self.en_passant = None;
        self.en_passant_validated = None;
        self.half_move_clock = 0;
        self.full_move_counter = 0;
        self.ply = 0;
        self.hash = 0;
        self.pawn_hash = 0;
        for row in self.history.iter_mut() {
            row.fill(0);
        }
        self.state_stack.clear();
        self.repeat_stack.clear();
    }

    // =========================================================================
    // State access
    // =========================================================================

    #[inline(always)]
    pub fn piece_on(&self, sq: Square) -> Option<PieceType> {
        self.board[sq as usize]
    }

    pub fn color_on(&self, sq: Square) -> Option<Color> {
        if get_bit(self.units[Color::White.index()], sq) {
            Some(Color::White)
        } else if get_bit(self.units[Color::Black.index()], sq) {
            Some(Color::Black)
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn pieces(&self, color: Color, piece: PieceType) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    #[inline(always)]
    pub fn units(&self, color: Color) -> Bitboard {
        self.units[color.index()]
    }

    #[inline(always)]
    pub fn all(&self) -> Bitboard {
        self.all
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// Target square left by the last double push, capturable or not.
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Target square only when a pawn of the side to move can capture there.
    pub fn en_passant_validated(&self) -> Option<Square> {
        self.en_passant_validated
    }

    pub fn half_move_clock(&self) -> u32 {
        self.half_move_clock
    }

    pub fn full_move_counter(&self) -> u32 {
        self.full_move_counter
    }

    #[inline(always)]
    pub fn ply(&self) -> usize {
        self.ply
    }

    /// Renumber the current position's ply. Move generation indexes the move list by
    /// ply, so a tree walk rooted in a long game resets it to 0 at the root.
    pub fn set_ply(&mut self, ply: usize) {
        self.ply = ply;
    }

    #[inline(always)]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    #[inline(always)]
    pub fn history(&self, from: Square, to: Square) -> i32 {
        self.history[from as usize][to as usize]
    }

    /// Bump the quiet-move ordering score for `from -> to`.
    pub fn add_history(&mut self, from: Square, to: Square, bonus: i32) {
        let slot = &mut self.history[from as usize][to as usize];
        *slot = slot.saturating_add(bonus);
    }

    /// Number of moves that can currently be unmade.
    pub fn undo_depth(&self) -> usize {
        self.state_stack.len()
    }

    /// How many earlier positions with the same side to move, inside the current
    /// reversible stretch of the game, share the current hash.
    pub fn repetition_count(&self) -> usize {
        let Some((&current, earlier)) = self.repeat_stack.as_slice().split_last() else {
            return 0;
        };
        earlier
            .iter()
            .rev()
            .skip(1)
            .step_by(2)
            .take(self.half_move_clock as usize / 2)
            .filter(|&&h| h == current)
            .count()
    }

    // =========================================================================
    // Piece primitives
    // =========================================================================

    pub fn add_piece(&mut self, color: Color, piece: PieceType, sq: Square) {
        debug_assert!(sq < 64, "square out of range: {sq}");
        debug_assert!(self.board[sq as usize].is_none(), "square {sq} already occupied");
        self.hash_piece(color, piece, sq);
        let (c, p) = (color.index(), piece.index());
        self.board[sq as usize] = Some(piece);
        self.pieces[c][p] = set_bit(self.pieces[c][p], sq);
        self.units[c] = set_bit(self.units[c], sq);
        self.all = self.units[0] | self.units[1];
    }

    pub fn remove_piece(&mut self, color: Color, piece: PieceType, sq: Square) {
        debug_assert!(sq < 64, "square out of range: {sq}");
        debug_assert_eq!(self.board[sq as usize], Some(piece), "no {piece:?} on square {sq}");
        self.hash_piece(color, piece, sq);
        let (c, p) = (color.index(), piece.index());
        self.board[sq as usize] = None;
        self.pieces[c][p] = reset_bit(self.pieces[c][p], sq);
        self.units[c] = reset_bit(self.units[c], sq);
        self.all = self.units[0] | self.units[1];
    }

    /// Move a piece between two squares; `to` must be empty.
    pub fn update_piece(&mut self, color: Color, piece: PieceType, from: Square, to: Square) {
        debug_assert!(from < 64 && to < 64, "square out of range: {from} -> {to}");
        debug_assert_eq!(self.board[from as usize], Some(piece), "no {piece:?} on square {from}");
        debug_assert!(self.board[to as usize].is_none(), "square {to} already occupied");
        self.hash_piece(color, piece, from);
        self.hash_piece(color, piece, to);
        let change = (1u64 << from) | (1u64 << to);
        self.board[from as usize] = None;
        self.board[to as usize] = Some(piece);
        self.pieces[color.index()][piece.index()] ^= change;
        self.units[color.index()] ^= change;
        self.all = self.units[0] | self.units[1];
    }

    #[inline(always)]
    fn hash_piece(&mut self, color: Color, piece: PieceType, sq: Square) {
        hash_piece(&mut self.hash, color, piece, sq);
        if piece == PieceType::Pawn {
            hash_piece(&mut self.pawn_hash, color, piece, sq);
        }
    }

    // =========================================================================
    // Attack detection
    // =========================================================================

    /// Is `sq` attacked by any piece of `color`?
    pub fn is_square_attacked_by_color(&self, sq: Square, color: Color) -> bool {
        debug_assert!(sq < 64, "square out of range: {sq}");
        let tables = &*ATTACK_TABLES;
        let s = sq as usize;
        let c = color.index();

        if tables.pawn_defends[c][s] & self.pieces[c][PieceType::Pawn.index()] != 0 {
            return true;
        }
        if tables.knight[s] & self.pieces[c][PieceType::Knight.index()] != 0 {
            return true;
        }
        if tables.king[s] & self.pieces[c][PieceType::King.index()] != 0 {
            return true;
        }

        let queens = self.pieces[c][PieceType::Queen.index()];
        let sliders = (tables.piece_moves[PieceType::Rook.index()][s]
            & (self.pieces[c][PieceType::Rook.index()] | queens))
            | (tables.piece_moves[PieceType::Bishop.index()][s]
                & (self.pieces[c][PieceType::Bishop.index()] | queens));

        BitboardIter(sliders).any(|from| tables.between(from, sq) & self.all == 0)
    }

    /// Is the king of `color` attacked? A side without a king is never in check.
    #[inline]
    pub fn is_king_attacked(&self, color: Color) -> bool {
        let king = self.pieces(color, PieceType::King);
        if king == 0 {
            return false;
        }
        self.is_square_attacked_by_color(lsb_index(king) as Square, color.other_color())
    }

    /// Is the side to move in check?
    pub fn is_check(&self) -> bool {
        self.is_king_attacked(self.side_to_move)
    }

    /// Can a pawn of `color` capture on the current en passant target?
    pub(crate) fn is_en_passant_valid(&self, color: Color) -> bool {
        match self.en_passant {
            Some(ep) => {
                ATTACK_TABLES.pawn_defends[color.index()][ep as usize]
                    & self.pieces(color, PieceType::Pawn)
                    != 0
            }
            None => false,
        }
    }

    // =========================================================================
    // Make / unmake
    // =========================================================================

    /// Play `mv` for the side to move.
    ///
    /// Returns `false` when the move would leave the mover's king attacked, or when a
    /// castle starts from or passes through an attacked square. A rejected move leaves
    /// no trace: the board is exactly as it was before the call and must not be
    /// unmade.
    pub fn make_move(&mut self, mv: Move) -> bool {
        let us = self.side_to_move;
        let them = us.other_color();
        self.push_state(mv);

        if let Some(ep) = self.en_passant_validated {
            hash_en_passant(&mut self.hash, ep);
        }
        self.en_passant = None;
        self.en_passant_validated = None;

        hash_castling(&mut self.hash, self.castling);
        self.ply += 1;

        match mv.flag {
            MoveFlag::Normal => {
                self.update_piece(us, mv.piece, mv.from, mv.to);
                self.revoke_castling(mv.from, mv.to);
                self.half_move_clock += 1;
            }
            MoveFlag::Capture => {
                let Some(victim) = self.expect_capture(&mv) else {
                    return false;
                };
                self.remove_piece(them, victim, mv.to);
                self.update_piece(us, mv.piece, mv.from, mv.to);
                self.revoke_castling(mv.from, mv.to);
                self.half_move_clock = 0;
            }
            MoveFlag::Castle => {
                let Some(rook_move) = lookup_castle_rook_move(mv.to) else {
                    self.pop_state();
                    return false;
                };
                if self.is_square_attacked_by_color(mv.from, them)
                    || self.is_square_attacked_by_color(rook_move.king_through, them)
                {
                    self.pop_state();
                    return false;
                }
                self.update_piece(us, mv.piece, mv.from, mv.to);
                self.update_piece(us, PieceType::Rook, rook_move.rook_from, rook_move.rook_to);
                self.revoke_castling(mv.from, mv.to);
                self.half_move_clock += 1;
            }
            MoveFlag::EnPassant => {
                self.remove_piece(them, PieceType::Pawn, en_passant_victim(us, mv.to));
                self.update_piece(us, mv.piece, mv.from, mv.to);
                self.half_move_clock = 0;
            }
            MoveFlag::PawnMove => {
                self.update_piece(us, mv.piece, mv.from, mv.to);
                self.half_move_clock = 0;
            }
            MoveFlag::DoublePawn => {
                self.update_piece(us, mv.piece, mv.from, mv.to);
                let ep = en_passant_victim(us, mv.to);
                self.en_passant = Some(ep);
                if self.is_en_passant_valid(them) {
                    self.en_passant_validated = Some(ep);
                    hash_en_passant(&mut self.hash, ep);
                }
                self.half_move_clock = 0;
            }
            MoveFlag::Promote => {
                let Some(promote) = self.expect_promotion(&mv) else {
                    return false;
                };
                self.remove_piece(us, mv.piece, mv.from);
                self.add_piece(us, promote, mv.to);
                self.half_move_clock = 0;
            }
            MoveFlag::PromoteCapture => {
                let Some(victim) = self.expect_capture(&mv) else {
                    return false;
                };
                let Some(promote) = self.expect_promotion(&mv) else {
                    return false;
                };
                self.remove_piece(them, victim, mv.to);
                self.remove_piece(us, mv.piece, mv.from);
                self.add_piece(us, promote, mv.to);
                self.revoke_castling(mv.from, mv.to);
                self.half_move_clock = 0;
            }
            MoveFlag::Null => {}
        }

        if us == Color::Black {
            self.full_move_counter += 1;
        }

        hash_castling(&mut self.hash, self.castling);
        hash_side_to_move(&mut self.hash);
        self.side_to_move = them;
        self.repeat_stack.push(self.hash);

        if self.is_king_attacked(us) {
            self.unmake_move();
            return false;
        }

        true
    }

    /// Take back the last successful [`Board::make_move`].
    pub fn unmake_move(&mut self) {
        let Some(&state) = self.state_stack.peek() else {
            error!("unmake_move called with no move to take back");
            debug_assert!(false, "unmake_move on an empty undo stack");
            return;
        };
        let mv = state.mv;
        let us = state.side_to_move;
        let them = us.other_color();
        self.side_to_move = us;

        match mv.flag {
            MoveFlag::Normal | MoveFlag::PawnMove | MoveFlag::DoublePawn => {
                self.update_piece(us, mv.piece, mv.to, mv.from);
            }
            MoveFlag::Capture => {
                self.update_piece(us, mv.piece, mv.to, mv.from);
                if let Some(victim) = mv.capture {
                    self.add_piece(them, victim, mv.to);
                }
            }
            MoveFlag::Castle => {
                if let Some(rook_move) = lookup_castle_rook_move(mv.to) {
                    self.update_piece(us, PieceType::Rook, rook_move.rook_to, rook_move.rook_from);
                }
                self.update_piece(us, mv.piece, mv.to, mv.from);
            }
            MoveFlag::EnPassant => {
                self.update_piece(us, mv.piece, mv.to, mv.from);
                self.add_piece(them, PieceType::Pawn, en_passant_victim(us, mv.to));
            }
            MoveFlag::Promote | MoveFlag::PromoteCapture => {
                if let Some(promote) = mv.promote {
                    self.remove_piece(us, promote, mv.to);
                }
                self.add_piece(us, mv.piece, mv.from);
                if let Some(victim) = mv.capture {
                    self.add_piece(them, victim, mv.to);
                }
            }
            MoveFlag::Null => {}
        }

        self.pop_state();
        self.repeat_stack.pop();
    }

    #[inline(always)]
    fn revoke_castling(&mut self, from: Square, to: Square) {
        self.castling
            .retain(CASTLE_MASK[from as usize] & CASTLE_MASK[to as usize]);
    }

    /// Captured kind of a capturing move; a missing one is a generator bug, so the
    /// half-made move is rolled back.
    fn expect_capture(&mut self, mv: &Move) -> Option<PieceType> {
        if mv.capture.is_none() {
            error!("Invalid move encountered in make_move: {mv} has no captured piece");
            debug_assert!(false, "capture without victim: {mv:?}");
            self.pop_state();
        }
        mv.capture
    }

    fn expect_promotion(&mut self, mv: &Move) -> Option<PieceType> {
        if mv.promote.is_none() {
            error!("Invalid move encountered in make_move: {mv} has no promotion piece");
            debug_assert!(false, "promotion without piece: {mv:?}");
            self.pop_state();
        }
        mv.promote
    }

    fn push_state(&mut self, mv: Move) {
        self.state_stack.push(BoardState {
            mv,
            ply: self.ply,
            half_move_clock: self.half_move_clock,
            full_move_counter: self.full_move_counter,
            castling: self.castling,
            en_passant: self.en_passant,
            en_passant_validated: self.en_passant_validated,
            side_to_move: self.side_to_move,
            hash: self.hash,
            pawn_hash: self.pawn_hash,
        });
    }

    fn pop_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.ply = state.ply;
            self.half_move_clock = state.half_move_clock;
            self.full_move_counter = state.full_move_counter;
            self.castling = state.castling;
            self.en_passant = state.en_passant;
            self.en_passant_validated = state.en_passant_validated;
            self.side_to_move = state.side_to_move;
            self.hash = state.hash;
            self.pawn_hash = state.pawn_hash;
        }
    }

    // =========================================================================
    // Consistency checks
    // =========================================================================

    /// Recompute `(hash, pawn_hash)` from scratch.
    pub fn compute_hashes(&self) -> (u64, u64) {
        let mut hash = 0u64;
        let mut pawn_hash = 0u64;
        for color in Color::ALL {
            for piece in PieceType::ALL {
                for sq in BitboardIter(self.pieces(color, piece)) {
                    hash_piece(&mut hash, color, piece, sq);
                    if piece == PieceType::Pawn {
                        hash_piece(&mut pawn_hash, color, piece, sq);
                    }
                }
            }
        }
        if self.side_to_move == Color::Black {
            hash_side_to_move(&mut hash);
        }
        hash_castling(&mut hash, self.castling);
        if let Some(ep) = self.en_passant_validated {
            hash_en_passant(&mut hash, ep);
        }
        (hash, pawn_hash)
    }

    /// Check that every redundant view of the position agrees.
    pub fn validate(&self) -> bool {
        let mut seen = 0u64;
        for color in Color::ALL {
            let mut union = 0u64;
            for piece in PieceType::ALL {
                let bb = self.pieces(color, piece);
                if bb & seen != 0 {
                    return false;
                }
                seen |= bb;
                union |= bb;
                if BitboardIter(bb).any(|sq| self.board[sq as usize] != Some(piece)) {
                    return false;
                }
            }
            if union != self.units(color) {
                return false;
            }
        }

        let mailbox_count = self.board.iter().filter(|p| p.is_some()).count();
        self.all == self.units[0] | self.units[1]
            && self.units[0] & self.units[1] == 0
            && mailbox_count == pop_count(self.all) as usize
            && (self.hash, self.pawn_hash) == self.compute_hashes()
    }

    pub fn draw_board(&self) -> String {
        let mut string = String::new();

        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let sq = rank * 8 + file;
                let symbol = match (self.piece_on(sq), self.color_on(sq)) {
                    (Some(piece), Some(Color::White)) => piece.to_char(),
                    (Some(piece), _) => piece.to_char().to_ascii_lowercase(),
                    (None, _) => '.',
                };
                string.push(' ');
                string.push(symbol);
            }
            string.push('\n');
        }
        string
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("fen", &self.to_fen())
            .field("hash", &format_args!("{:#018x}", self.hash))
            .field("pawn_hash", &format_args!("{:#018x}", self.pawn_hash))
            .field("ply", &self.ply)
            .field("undo_depth", &self.state_stack.len())
            .finish()
    }
}
