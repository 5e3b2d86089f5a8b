pub mod bitboard;
pub mod bitops;
pub mod board;
pub mod error;
pub mod fen;
pub mod movegen;
pub mod movelist;
pub mod perft;
pub mod stack;
pub mod tt;
pub mod types;
pub mod zobrist;
