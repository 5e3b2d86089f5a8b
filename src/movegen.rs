//! Pseudo-legal move generation.
//!
//! Moves are appended to a [`MoveList`] under the board's current ply in a fixed order:
//! en passant, castling, pawns, then knight through king with captures before quiets.
//! Moves that leave the mover's king attacked are still emitted; [`Board::make_move`]
//! filters them out.

use crate::bitboard::ATTACK_TABLES;
use crate::bitops::{and_not, BitboardIter};
use crate::board::Board;
use crate::movelist::MoveList;
use crate::types::squares::*;
use crate::types::{
    rank_of, Bitboard, CastlingRights, Color, Move, MoveFlag, PieceType, Square,
    PIECES_CAN_PROMOTE_TO,
};

const FILE_A: Bitboard = 0x0101_0101_0101_0101;
const FILE_H: Bitboard = 0x8080_8080_8080_8080;
const RANK_2: Bitboard = 0x0000_0000_0000_FF00;
const RANK_7: Bitboard = 0x00FF_0000_0000_0000;

/// Ordering score for a capture: most valuable victim first, cheapest attacker first.
#[inline(always)]
pub fn capture_score(victim: PieceType, attacker: PieceType) -> i32 {
    1000 + victim.value() * 10 / attacker.value()
}

impl Board {
    /// Append every pseudo-legal move for the side to move at the board's ply.
    pub fn generate_moves(&self, list: &mut MoveList) {
        MoveGenerator::new(self).generate_all(list);
    }
}

pub struct MoveGenerator<'a> {
    board: &'a Board,
    color: Color,
}

impl<'a> MoveGenerator<'a> {
    pub fn new(board: &'a Board) -> Self {
        MoveGenerator {
            board,
            color: board.side_to_move(),
        }
    }

    pub fn generate_all(&self, list: &mut MoveList) {
        list.start_ply(self.board.ply());

        self.generate_en_passant(list);
        self.generate_castling(list);
        self.generate_pawn_moves(list);

        for piece in [
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            self.generate_piece_moves(piece, list);
        }

        list.end_ply();
    }

    // =========================================================================
    // Pieces
    // =========================================================================

    fn piece_targets(&self, piece: PieceType, from: Square) -> Bitboard {
        let tables = &*ATTACK_TABLES;
        let occupied = self.board.all();
        match piece {
            PieceType::Knight => tables.knight[from as usize],
            PieceType::Bishop => tables.bishop_attacks(from, occupied),
            PieceType::Rook => tables.rook_attacks(from, occupied),
            PieceType::Queen => tables.queen_attacks(from, occupied),
            PieceType::King => tables.king[from as usize],
            PieceType::Pawn => 0,
        }
    }

    fn generate_piece_moves(&self, piece: PieceType, list: &mut MoveList) {
        let board = self.board;
        let enemies = board.units(self.color.other_color());

        for from in BitboardIter(board.pieces(self.color, piece)) {
            let targets = self.piece_targets(piece, from);

            for to in BitboardIter(targets & enemies) {
                if let Some(victim) = board.piece_on(to) {
                    list.add(Move::new(
                        piece,
                        from,
                        to,
                        MoveFlag::Capture,
                        Some(victim),
                        None,
                        capture_score(victim, piece),
                    ));
                }
            }

            for to in BitboardIter(and_not(targets, board.all())) {
                list.add(
                    Move::quiet(piece, from, to, MoveFlag::Normal)
                        .with_score(board.history(from, to)),
                );
            }
        }
    }

    // =========================================================================
    // Pawns
    // =========================================================================

    /// Add a pawn move, expanding it into one move per promotion piece when it lands
    /// on the first or last rank.
    fn add_pawn_move(
        list: &mut MoveList,
        from: Square,
        to: Square,
        flag: MoveFlag,
        capture: Option<PieceType>,
        score: i32,
    ) {
        let rank = rank_of(to);
        if rank == 0 || rank == 7 {
            let flag = if flag == MoveFlag::Capture {
                MoveFlag::PromoteCapture
            } else {
                MoveFlag::Promote
            };
            for promote in PIECES_CAN_PROMOTE_TO {
                list.add(Move::new(
                    PieceType::Pawn,
                    from,
                    to,
                    flag,
                    capture,
                    Some(promote),
                    score,
                ));
            }
        } else {
            list.add(Move::new(PieceType::Pawn, from, to, flag, capture, None, score));
        }
    }

    fn add_pawn_capture(&self, list: &mut MoveList, from: Square, to: Square) {
        if let Some(victim) = self.board.piece_on(to) {
            Self::add_pawn_move(
                list,
                from,
                to,
                MoveFlag::Capture,
                Some(victim),
                capture_score(victim, PieceType::Pawn),
            );
        }
    }

    fn generate_pawn_moves(&self, list: &mut MoveList) {
        let board = self.board;
        let pawns = board.pieces(self.color, PieceType::Pawn);
        let enemies = board.units(self.color.other_color());
        let all = board.all();

        // Each set holds the pawns able to make that kind of move
        let (left, right, single, double) = match self.color {
            Color::White => {
                let single = and_not(pawns, all >> 8);
                (
                    pawns & (and_not(enemies, FILE_H) >> 7),
                    pawns & (and_not(enemies, FILE_A) >> 9),
                    single,
                    and_not(single & RANK_2, all >> 16),
                )
            }
            Color::Black => {
                let single = and_not(pawns, all << 8);
                (
                    pawns & (and_not(enemies, FILE_H) << 9),
                    pawns & (and_not(enemies, FILE_A) << 7),
                    single,
                    and_not(single & RANK_7, all << 16),
                )
            }
        };

        let forward = |from: Square, step: u8| -> Square {
            match self.color {
                Color::White => from + step,
                Color::Black => from - step,
            }
        };

        for from in BitboardIter(left) {
            let to = match self.color {
                Color::White => from + 7,
                Color::Black => from - 9,
            };
            self.add_pawn_capture(list, from, to);
        }

        for from in BitboardIter(right) {
            let to = match self.color {
                Color::White => from + 9,
                Color::Black => from - 7,
            };
            self.add_pawn_capture(list, from, to);
        }

        for from in BitboardIter(single) {
            let to = forward(from, 8);
            Self::add_pawn_move(
                list,
                from,
                to,
                MoveFlag::PawnMove,
                None,
                board.history(from, to),
            );
        }

        for from in BitboardIter(double) {
            let to = forward(from, 16);
            list.add(
                Move::quiet(PieceType::Pawn, from, to, MoveFlag::DoublePawn)
                    .with_score(board.history(from, to)),
            );
        }
    }

    fn generate_en_passant(&self, list: &mut MoveList) {
        let board = self.board;
        let Some(ep) = board.en_passant_validated() else {
            return;
        };

        let victim_sq = match self.color {
            Color::White => ep - 8,
            Color::Black => ep + 8,
        };
        let Some(victim) = board.piece_on(victim_sq) else {
            return;
        };

        let attackers = ATTACK_TABLES.pawn_defends[self.color.index()][ep as usize]
            & board.pieces(self.color, PieceType::Pawn);
        for from in BitboardIter(attackers) {
            list.add(Move::new(
                PieceType::Pawn,
                from,
                ep,
                MoveFlag::EnPassant,
                Some(victim),
                None,
                capture_score(victim, PieceType::Pawn),
            ));
        }
    }

    // =========================================================================
    // Castling
    // =========================================================================

    /// Only the right and the empty gap to the rook are checked here; attacked start
    /// and transit squares are rejected when the move is made.
    fn generate_castling(&self, list: &mut MoveList) {
        let board = self.board;
        let rights = board.castling();
        let all = board.all();
        let tables = &*ATTACK_TABLES;

        let candidates = match self.color {
            Color::White => [
                (CastlingRights::WHITE_KINGSIDE, E1, H1, G1),
                (CastlingRights::WHITE_QUEENSIDE, E1, A1, C1),
            ],
            Color::Black => [
                (CastlingRights::BLACK_KINGSIDE, E8, H8, G8),
                (CastlingRights::BLACK_QUEENSIDE, E8, A8, C8),
            ],
        };

        for (right, king, rook, to) in candidates {
            if rights.contains(right) && tables.between(king, rook) & all == 0 {
                list.add(
                    Move::quiet(PieceType::King, king, to, MoveFlag::Castle)
                        .with_score(board.history(king, to)),
                );
            }
        }
    }
}
