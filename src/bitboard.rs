//! Precomputed attack tables for move generation and attack detection.
//!
//! Square indexing: a1 = 0, b1 = 1, ..., h1 = 7, a2 = 8, ..., h8 = 63, so
//! `file = sq & 7` and `rank = sq >> 3`.
//!
//! Sliding pieces are not looked up from magic tables. Instead each of the eight edge
//! rays is walked on demand: the nearest blocker along the ray is found with a single
//! bit scan, and the part of the ray lying beyond the blocker is removed by XOR with
//! the blocker's own ray in the same direction. The blocker itself stays in the
//! result so it shows up as a capture target.
//!
//! The tables are built once, behind a `Lazy`, and are read-only afterwards. Call
//! [`init`] before the first position is created to pay the construction cost up
//! front; any later access is a plain read.

use once_cell::sync::Lazy;

use crate::bitops::{lsb_index, msb_index};
use crate::types::{Bitboard, Color, PieceType, Square};

// Ray directions. Directions 0, 1, 2 and 7 walk towards higher square indices.
pub const NORTH: usize = 0;
pub const NORTH_EAST: usize = 1;
pub const EAST: usize = 2;
pub const SOUTH_EAST: usize = 3;
pub const SOUTH: usize = 4;
pub const SOUTH_WEST: usize = 5;
pub const WEST: usize = 6;
pub const NORTH_WEST: usize = 7;

/// (file delta, rank delta) per direction
const DIRECTION_DELTAS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (1, 2), (2, 1), (-1, 2), (-2, 1),
    (1, -2), (2, -1), (-1, -2), (-2, -1),
];

#[inline(always)]
const fn is_positive(direction: usize) -> bool {
    matches!(direction, NORTH | NORTH_EAST | EAST | NORTH_WEST)
}

/// Step `(df, dr)` from `sq`, returning `None` when it falls off the board.
fn offset(sq: Square, df: i8, dr: i8) -> Option<Square> {
    let file = (sq & 7) as i8 + df;
    let rank = (sq >> 3) as i8 + dr;
    if (0..8).contains(&file) && (0..8).contains(&rank) {
        Some((rank * 8 + file) as Square)
    } else {
        None
    }
}

/// Precomputed attack tables
pub struct AttackTables {
    /// Knight targets for each square
    pub knight: [Bitboard; 64],
    /// King targets for each square
    pub king: [Bitboard; 64],
    /// Squares a pawn of `color` standing on `sq` captures on: `pawn_captures[color][sq]`
    pub pawn_captures: [[Bitboard; 64]; 2],
    /// Squares from which a pawn of `color` would capture on `sq`
    pub pawn_defends: [[Bitboard; 64]; 2],
    /// Edge rays per direction; entry 64 is the empty ray so a scan sentinel indexes it safely
    pub rays: [[Bitboard; 65]; 8],
    /// Squares strictly between two aligned squares, zero when unaligned
    pub between: Box<[[Bitboard; 64]; 64]>,
    /// Empty-board targets per piece kind (pawn row is unused)
    pub piece_moves: [[Bitboard; 64]; 6],
}

impl AttackTables {
    pub fn new() -> Self {
        let mut knight = [0u64; 64];
        let mut king = [0u64; 64];
        let mut pawn_captures = [[0u64; 64]; 2];
        let mut pawn_defends = [[0u64; 64]; 2];
        let mut rays = [[0u64; 65]; 8];
        let mut between = Box::new([[0u64; 64]; 64]);
        let mut piece_moves = [[0u64; 64]; 6];

        for sq in 0..64u8 {
            let s = sq as usize;

            for (df, dr) in KNIGHT_DELTAS {
                if let Some(to) = offset(sq, df, dr) {
                    knight[s] |= 1u64 << to;
                }
            }

            for (dir, &(df, dr)) in DIRECTION_DELTAS.iter().enumerate() {
                if let Some(to) = offset(sq, df, dr) {
                    king[s] |= 1u64 << to;
                }

                // walk to the edge; everything passed so far lies strictly between
                let mut passed = 0u64;
                let mut cur = sq;
                while let Some(next) = offset(cur, df, dr) {
                    between[s][next as usize] = passed;
                    rays[dir][s] |= 1u64 << next;
                    passed |= 1u64 << next;
                    cur = next;
                }
            }

            // White pawns capture upward, black pawns downward
            for df in [-1i8, 1] {
                if let Some(to) = offset(sq, df, 1) {
                    pawn_captures[Color::White.index()][s] |= 1u64 << to;
                }
                if let Some(to) = offset(sq, df, -1) {
                    pawn_captures[Color::Black.index()][s] |= 1u64 << to;
                }
            }
        }

        for s in 0..64 {
            pawn_defends[Color::White.index()][s] = pawn_captures[Color::Black.index()][s];
            pawn_defends[Color::Black.index()][s] = pawn_captures[Color::White.index()][s];

            let rook = rays[NORTH][s] | rays[EAST][s] | rays[SOUTH][s] | rays[WEST][s];
            let bishop = rays[NORTH_EAST][s]
                | rays[SOUTH_EAST][s]
                | rays[SOUTH_WEST][s]
                | rays[NORTH_WEST][s];
            piece_moves[PieceType::Knight.index()][s] = knight[s];
            piece_moves[PieceType::Bishop.index()][s] = bishop;
            piece_moves[PieceType::Rook.index()][s] = rook;
            piece_moves[PieceType::Queen.index()][s] = rook | bishop;
            piece_moves[PieceType::King.index()][s] = king[s];
        }

        AttackTables {
            knight,
            king,
            pawn_captures,
            pawn_defends,
            rays,
            between,
            piece_moves,
        }
    }

    /// Get rook attacks from a square given occupied squares
    #[inline]
    pub fn rook_attacks(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.ray_attacks(sq, occupied, NORTH)
            | self.ray_attacks(sq, occupied, EAST)
            | self.ray_attacks(sq, occupied, SOUTH)
            | self.ray_attacks(sq, occupied, WEST)
    }

    /// Get bishop attacks from a square given occupied squares
    #[inline]
    pub fn bishop_attacks(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.ray_attacks(sq, occupied, NORTH_EAST)
            | self.ray_attacks(sq, occupied, SOUTH_EAST)
            | self.ray_attacks(sq, occupied, SOUTH_WEST)
            | self.ray_attacks(sq, occupied, NORTH_WEST)
    }

    /// Get queen attacks from a square given occupied squares
    #[inline]
    pub fn queen_attacks(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.rook_attacks(sq, occupied) | self.bishop_attacks(sq, occupied)
    }

    /// Ray from `sq` in `direction`, cut after the first occupied square.
    /// For rays towards higher indices the nearest blocker is the lowest set bit,
    /// otherwise the highest. An empty scan yields 64, whose ray is empty.
    #[inline]
    pub fn ray_attacks(&self, sq: Square, occupied: Bitboard, direction: usize) -> Bitboard {
        debug_assert!(sq < 64 && direction < 8);
        let ray = self.rays[direction][sq as usize];
        let blockers = ray & occupied;
        let blocker = if is_positive(direction) {
            lsb_index(blockers)
        } else {
            msb_index(blockers)
        };
        ray ^ self.rays[direction][blocker as usize]
    }

    #[inline(always)]
    pub fn between(&self, a: Square, b: Square) -> Bitboard {
        self.between[a as usize][b as usize]
    }
}

impl Default for AttackTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Global precomputed attack tables
pub static ATTACK_TABLES: Lazy<AttackTables> = Lazy::new(AttackTables::new);

/// Build the attack tables now rather than on first use.
pub fn init() {
    Lazy::force(&ATTACK_TABLES);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::squares::*;

    fn bb(squares: &[Square]) -> Bitboard {
        squares.iter().fold(0, |acc, &sq| acc | (1u64 << sq))
    }

    #[test]
    fn test_knight_attacks() {
        let attacks = ATTACK_TABLES.knight[E4 as usize];
        assert_eq!(attacks, bb(&[D2, F2, C3, G3, C5, G5, D6, F6]));
        assert_eq!(attacks.count_ones(), 8);
    }

    #[test]
    fn test_knight_corner() {
        let attacks = ATTACK_TABLES.knight[A1 as usize];
        assert_eq!(attacks, bb(&[C2, B3]));
    }

    #[test]
    fn test_king_attacks() {
        assert_eq!(ATTACK_TABLES.king[E4 as usize].count_ones(), 8);
        assert_eq!(ATTACK_TABLES.king[A1 as usize], bb(&[A2, B1, B2]));
    }

    #[test]
    fn test_pawn_captures_and_defends() {
        let white = Color::White.index();
        let black = Color::Black.index();
        assert_eq!(ATTACK_TABLES.pawn_captures[white][E4 as usize], bb(&[D5, F5]));
        assert_eq!(ATTACK_TABLES.pawn_captures[black][E5 as usize], bb(&[D4, F4]));
        assert_eq!(ATTACK_TABLES.pawn_captures[white][A2 as usize], bb(&[B3]));
        assert_eq!(ATTACK_TABLES.pawn_captures[white][H8 as usize], 0);

        // a white pawn on d5 or f5 would capture on e6
        assert_eq!(ATTACK_TABLES.pawn_defends[white][E6 as usize], bb(&[D5, F5]));
        assert_eq!(ATTACK_TABLES.pawn_defends[black][E3 as usize], bb(&[D4, F4]));
    }

    #[test]
    fn test_rays() {
        assert_eq!(ATTACK_TABLES.rays[NORTH][E4 as usize], bb(&[E5, E6, E7, E8]));
        assert_eq!(ATTACK_TABLES.rays[SOUTH_WEST][C3 as usize], bb(&[B2, A1]));
        assert_eq!(ATTACK_TABLES.rays[EAST][H1 as usize], 0);
        for dir in 0..8 {
            assert_eq!(ATTACK_TABLES.rays[dir][64], 0);
        }
    }

    #[test]
    fn test_between() {
        assert_eq!(ATTACK_TABLES.between(A1, H8), bb(&[B2, C3, D4, E5, F6, G7]));
        assert_eq!(ATTACK_TABLES.between(E1, H1), bb(&[F1, G1]));
        assert_eq!(ATTACK_TABLES.between(E1, A1), bb(&[B1, C1, D1]));
        assert_eq!(ATTACK_TABLES.between(E1, E2), 0);
        assert_eq!(ATTACK_TABLES.between(A1, B3), 0);
        for a in 0..64u8 {
            for b in 0..64u8 {
                assert_eq!(ATTACK_TABLES.between(a, b), ATTACK_TABLES.between(b, a));
            }
        }
    }

    #[test]
    fn test_rook_attacks_empty_board() {
        let attacks = ATTACK_TABLES.rook_attacks(E4, 0);
        assert_eq!(attacks.count_ones(), 14);
        assert_eq!(attacks, ATTACK_TABLES.piece_moves[PieceType::Rook.index()][E4 as usize]);
    }

    #[test]
    fn test_rook_attacks_with_blockers() {
        let occupied = bb(&[E2, G4]);
        let attacks = ATTACK_TABLES.rook_attacks(E4, occupied);

        // blockers are included as capture targets, squares beyond are not
        assert!(attacks & bb(&[E2]) != 0);
        assert!(attacks & bb(&[G4]) != 0);
        assert!(attacks & bb(&[E1]) == 0);
        assert!(attacks & bb(&[H4]) == 0);
        assert_eq!(attacks.count_ones(), 12);
    }

    #[test]
    fn test_bishop_attacks() {
        assert_eq!(ATTACK_TABLES.bishop_attacks(E4, 0).count_ones(), 13);
        let attacks = ATTACK_TABLES.bishop_attacks(C1, bb(&[E3, B2]));
        assert_eq!(attacks, bb(&[B2, D2, E3]));
    }

    #[test]
    fn test_queen_is_rook_plus_bishop() {
        let occupied = bb(&[D4, F6, B7, H3, E8]);
        for sq in 0..64u8 {
            assert_eq!(
                ATTACK_TABLES.queen_attacks(sq, occupied),
                ATTACK_TABLES.rook_attacks(sq, occupied) | ATTACK_TABLES.bishop_attacks(sq, occupied)
            );
        }
    }
}
