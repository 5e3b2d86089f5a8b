use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{CastlingRights, Color, PieceType, Square};

/// Seed for the key generator; fixed so hashes are reproducible between runs.
const ZOBRIST_SEED: u64 = 0x1234_5678_90AB_CDEF;

/// Zobrist hashing keys for chess positions.
/// These are pseudo-random u64 values XORed together to create a unique hash for each position.
pub struct ZobristKeys {
    /// Keys for each (color, piece_type, square) combination: 2 * 6 * 64 = 768 keys
    /// Indexed as: pieces[color][piece_type][square]
    pub pieces: [[[u64; 64]; 6]; 2],
    /// Key for side to move (XORed when it's black's turn)
    pub side_to_move: u64,
    /// One key per castling flag, in `KQkq` order
    pub castling: [u64; 4],
    /// Keys for en passant file (0-7 for files a-h)
    pub en_passant: [u64; 8],
}

impl ZobristKeys {
    /// Initialize Zobrist keys with deterministic pseudo-random values.
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);

        let mut pieces = [[[0u64; 64]; 6]; 2];
        for color in pieces.iter_mut() {
            for piece in color.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let side_to_move = rng.gen();
        let castling = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];

        let mut en_passant = [0u64; 8];
        for key in en_passant.iter_mut() {
            *key = rng.gen();
        }

        ZobristKeys {
            pieces,
            side_to_move,
            castling,
            en_passant,
        }
    }

    /// Get the key for a piece on a square
    #[inline(always)]
    pub fn piece_key(&self, color: Color, piece_type: PieceType, sq: Square) -> u64 {
        self.pieces[color.index()][piece_type.index()][sq as usize]
    }

    /// Combined key of every flag set in `rights`
    #[inline]
    pub fn castling_key(&self, rights: CastlingRights) -> u64 {
        let bits = rights.bits();
        let mut key = 0;
        for (i, k) in self.castling.iter().enumerate() {
            if bits & (1 << i) != 0 {
                key ^= k;
            }
        }
        key
    }

    /// Key for an en passant target; only the file contributes
    #[inline(always)]
    pub fn en_passant_key(&self, sq: Square) -> u64 {
        self.en_passant[(sq & 7) as usize]
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Global static Zobrist keys (initialized once)
pub static ZOBRIST_KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

#[inline(always)]
pub fn hash_piece(hash: &mut u64, color: Color, piece: PieceType, sq: Square) {
    *hash ^= ZOBRIST_KEYS.piece_key(color, piece, sq);
}

#[inline(always)]
pub fn hash_castling(hash: &mut u64, rights: CastlingRights) {
    *hash ^= ZOBRIST_KEYS.castling_key(rights);
}

#[inline(always)]
pub fn hash_en_passant(hash: &mut u64, sq: Square) {
    *hash ^= ZOBRIST_KEYS.en_passant_key(sq);
}

#[inline(always)]
pub fn hash_side_to_move(hash: &mut u64) {
    *hash ^= ZOBRIST_KEYS.side_to_move;
}
