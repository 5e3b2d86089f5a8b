//! Bit-level primitives on 64-bit boards.
//!
//! Everything here is a pure O(1) function. Scans over an empty board return the
//! sentinel [`NO_SQUARE`] (64) instead of panicking, so callers can index a 65-entry
//! table with the result.

use crate::types::{Bitboard, Square};

/// Sentinel returned by bit scans on an empty board.
pub const NO_SQUARE: u32 = 64;

#[inline(always)]
pub fn set_bit(bb: Bitboard, sq: Square) -> Bitboard {
    debug_assert!(sq < 64, "square out of range: {sq}");
    bb | (1u64 << sq)
}

#[inline(always)]
pub fn reset_bit(bb: Bitboard, sq: Square) -> Bitboard {
    debug_assert!(sq < 64, "square out of range: {sq}");
    bb & !(1u64 << sq)
}

#[inline(always)]
pub fn get_bit(bb: Bitboard, sq: Square) -> bool {
    debug_assert!(sq < 64, "square out of range: {sq}");
    (bb >> sq) & 1 != 0
}

/// `a & !b`
#[inline(always)]
pub fn and_not(a: Bitboard, b: Bitboard) -> Bitboard {
    a & !b
}

/// Clear the lowest set bit.
#[inline(always)]
pub fn reset_lsb(bb: Bitboard) -> Bitboard {
    bb & bb.wrapping_sub(1)
}

#[inline(always)]
pub fn tzcnt(bb: Bitboard) -> u32 {
    bb.trailing_zeros()
}

#[inline(always)]
pub fn lzcnt(bb: Bitboard) -> u32 {
    bb.leading_zeros()
}

#[inline(always)]
pub fn pop_count(bb: Bitboard) -> u32 {
    bb.count_ones()
}

/// Index of the lowest set bit, or [`NO_SQUARE`] for an empty board.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[inline(always)]
pub fn lsb_index(bb: Bitboard) -> u32 {
    // trailing_zeros already yields 64 for zero
    tzcnt(bb)
}

/// Index of the lowest set bit, or [`NO_SQUARE`] for an empty board.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
pub fn lsb_index(bb: Bitboard) -> u32 {
    debruijn_lsb_index(bb)
}

/// Index of the highest set bit, or [`NO_SQUARE`] for an empty board.
#[inline(always)]
pub fn msb_index(bb: Bitboard) -> u32 {
    if bb == 0 {
        NO_SQUARE
    } else {
        63 - lzcnt(bb)
    }
}

const DEBRUIJN_MAGIC: u32 = 0x7829_1ACF;

#[rustfmt::skip]
const LSB_64_TABLE: [u8; 64] = [
    63, 30,  3, 32, 59, 14, 11, 33,
    60, 24, 50,  9, 55, 19, 21, 34,
    61, 29,  2, 53, 51, 23, 41, 18,
    56, 28,  1, 43, 46, 27,  0, 35,
    62, 31, 58,  4,  5, 49, 54,  6,
    15, 52, 12, 40,  7, 42, 45, 16,
    25, 57, 48, 13, 10, 39,  8, 44,
    20, 47, 38, 22, 17, 37, 36, 26,
];

/// Portable lowest-set-bit scan (folded 32-bit de Bruijn multiply).
///
/// Used where no hardware bit scan is available. Must agree with the hardware path
/// for every input, including the empty-board sentinel.
#[inline]
pub fn debruijn_lsb_index(bb: Bitboard) -> u32 {
    if bb == 0 {
        return NO_SQUARE;
    }
    let isolated = bb ^ bb.wrapping_sub(1);
    let folded = (isolated as u32) ^ ((isolated >> 32) as u32);
    LSB_64_TABLE[(folded.wrapping_mul(DEBRUIJN_MAGIC) >> 26) as usize] as u32
}

/// Iterate over set bits in a bitboard, returning square indices
pub struct BitboardIter(pub Bitboard);

impl Iterator for BitboardIter {
    type Item = Square;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            let sq = lsb_index(self.0) as Square;
            self.0 = reset_lsb(self.0);
            Some(sq)
        }
    }
}
