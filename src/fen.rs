//! FEN loading and serialization for [`Board`].
//!
//! Every field has its own loader. A loader that rejects its input logs a warning and
//! returns the error without touching the board. A full load checks the whole string
//! before clearing anything, so a bad FEN leaves the previous position in place.

use itertools::Itertools;
use log::{error, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::board::{Board, STARTING_POSITION_FEN};
use crate::error::FenError;
use crate::types::squares::*;
use crate::types::{
    parse_square, square, square_to_string, CastlingRights, Color, PieceType, Square,
};
use crate::zobrist::{hash_castling, hash_en_passant, hash_side_to_move};

static FEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([rnbqkpRNBQKP1-8]+/){7}[rnbqkpRNBQKP1-8]+\s[bw]\s(-|K?Q?k?q?)\s(-|[a-h][36])\s\d+\s\d+\s*$",
    )
    .expect("valid FEN regex")
});

/// The six fields of a FEN string that passed the shape check.
struct FenFields<'a> {
    placement: &'a str,
    side_to_move: &'a str,
    castling: &'a str,
    en_passant: &'a str,
    half_move_clock: &'a str,
    full_move_counter: &'a str,
}

impl<'a> FenFields<'a> {
    fn split(fen: &'a str) -> Result<Self, FenError> {
        if !FEN_REGEX.is_match(fen) {
            return Err(FenError::Malformed(fen.to_string()));
        }
        let Some((placement, side_to_move, castling, en_passant, half_move_clock, full_move_counter)) =
            fen.split_whitespace().collect_tuple()
        else {
            return Err(FenError::Malformed(fen.to_string()));
        };

        // The regex admits ranks of the wrong width, and counters that overflow
        let pieces = parse_placement(placement)?;
        check_castling_pieces(parse_castling(castling)?, |sq| {
            pieces
                .iter()
                .find(|&&(_, _, at)| at == sq)
                .map(|&(color, piece, _)| (color, piece))
        })?;
        parse_counter("half move clock", half_move_clock)?;
        parse_counter("full move counter", full_move_counter)?;

        Ok(FenFields {
            placement,
            side_to_move,
            castling,
            en_passant,
            half_move_clock,
            full_move_counter,
        })
    }
}

fn parse_placement(placement: &str) -> Result<Vec<(Color, PieceType, Square)>, FenError> {
    let invalid = || FenError::InvalidPlacement(placement.to_string());

    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(invalid());
    }

    let mut pieces = Vec::with_capacity(32);
    for (i, text) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file = 0u8;
        for ch in text.chars() {
            if let Some(skip) = ch.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(invalid());
                }
                file += skip as u8;
            } else {
                let piece = PieceType::from_char(ch).ok_or(FenError::InvalidPiece(ch))?;
                let color = if ch.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                if file >= 8 {
                    return Err(invalid());
                }
                pieces.push((color, piece, square(file, rank)));
                file += 1;
            }
            if file > 8 {
                return Err(invalid());
            }
        }
        if file != 8 {
            return Err(invalid());
        }
    }
    Ok(pieces)
}

fn parse_castling(text: &str) -> Result<CastlingRights, FenError> {
    if text == "-" {
        return Ok(CastlingRights::NONE);
    }
    let mut rights = CastlingRights::NONE;
    for ch in text.chars() {
        let flag = CastlingRights::FLAGS
            .iter()
            .find(|(_, c)| *c == ch)
            .map(|(flag, _)| *flag)
            .ok_or_else(|| FenError::InvalidCastling(text.to_string()))?;
        rights.insert(flag);
    }
    if rights.is_empty() {
        return Err(FenError::InvalidCastling(text.to_string()));
    }
    Ok(rights)
}

/// King and rook squares each right depends on, in [`CastlingRights::FLAGS`] order.
const CASTLING_HOMES: [(Color, Square, Square); 4] = [
    (Color::White, E1, H1),
    (Color::White, E1, A1),
    (Color::Black, E8, H8),
    (Color::Black, E8, A8),
];

/// Every right in `rights` needs its king and rook at home; `occupant` reports what
/// stands on a square.
fn check_castling_pieces(
    rights: CastlingRights,
    occupant: impl Fn(Square) -> Option<(Color, PieceType)>,
) -> Result<(), FenError> {
    for ((flag, ch), (color, king, rook)) in CastlingRights::FLAGS.into_iter().zip(CASTLING_HOMES) {
        if rights.contains(flag)
            && (occupant(king) != Some((color, PieceType::King))
                || occupant(rook) != Some((color, PieceType::Rook)))
        {
            return Err(FenError::CastlingPiecesMissing(ch));
        }
    }
    Ok(())
}

fn parse_counter(field: &'static str, text: &str) -> Result<u32, FenError> {
    text.parse().map_err(|_| FenError::InvalidCounter {
        field,
        value: text.to_string(),
    })
}

fn log_rejected(err: &FenError) {
    warn!("Rejected FEN input: {err}");
}

impl Board {
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let mut board = Board::new();
        board.load_fen(fen)?;
        Ok(board)
    }

    /// Replace the position with the one described by `fen`.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let fields = FenFields::split(fen).inspect_err(|err| {
            warn!("Attempted to load invalid FEN board: '{fen}' ({err})");
        })?;

        self.clear();
        self.load_fen_pieces(fields.placement)?;
        self.load_fen_side_to_move(fields.side_to_move)?;
        self.load_fen_castling(fields.castling)?;
        self.load_fen_en_passant(fields.en_passant)?;
        self.load_fen_half_move_clock(fields.half_move_clock)?;
        self.load_fen_full_move_counter(fields.full_move_counter)?;

        self.repeat_stack.push(self.hash);
        Ok(())
    }

    pub fn load_new_game_position(&mut self) {
        if let Err(err) = self.load_fen(STARTING_POSITION_FEN) {
            error!("Failed to load the starting position: {err}");
        }
    }

    /// Place the pieces of a FEN placement field. The target squares must be empty.
    pub fn load_fen_pieces(&mut self, placement: &str) -> Result<(), FenError> {
        let pieces = parse_placement(placement).inspect_err(log_rejected)?;
        if pieces.iter().any(|&(_, _, sq)| self.piece_on(sq).is_some()) {
            let err = FenError::InvalidPlacement(placement.to_string());
            log_rejected(&err);
            return Err(err);
        }
        for (color, piece, sq) in pieces {
            self.add_piece(color, piece, sq);
        }
        Ok(())
    }

    pub fn load_fen_side_to_move(&mut self, text: &str) -> Result<(), FenError> {
        let mut chars = text.chars();
        let color = match (chars.next().and_then(Color::from_char), chars.next()) {
            (Some(color), None) => color,
            _ => {
                let err = FenError::InvalidColor(text.to_string());
                log_rejected(&err);
                return Err(err);
            }
        };
        if color != self.side_to_move {
            hash_side_to_move(&mut self.hash);
            self.side_to_move = color;
        }
        Ok(())
    }

    pub fn load_fen_castling(&mut self, text: &str) -> Result<(), FenError> {
        let rights = parse_castling(text).inspect_err(log_rejected)?;
        check_castling_pieces(rights, |sq| Some((self.color_on(sq)?, self.piece_on(sq)?)))
            .inspect_err(log_rejected)?;
        hash_castling(&mut self.hash, self.castling);
        self.castling = rights;
        hash_castling(&mut self.hash, self.castling);
        Ok(())
    }

    /// Set the en passant target. It only counts as validated, and only enters the
    /// hash, when a pawn of the side to move can capture there.
    pub fn load_fen_en_passant(&mut self, text: &str) -> Result<(), FenError> {
        let target = if text == "-" {
            None
        } else {
            let Some(sq) = parse_square(text) else {
                let err = FenError::InvalidSquare(text.to_string());
                log_rejected(&err);
                return Err(err);
            };
            Some(sq)
        };

        if let Some(ep) = self.en_passant_validated {
            hash_en_passant(&mut self.hash, ep);
        }
        self.en_passant = target;
        self.en_passant_validated = None;
        if self.is_en_passant_valid(self.side_to_move) {
            self.en_passant_validated = self.en_passant;
            if let Some(ep) = self.en_passant_validated {
                hash_en_passant(&mut self.hash, ep);
            }
        }
        Ok(())
    }

    pub fn load_fen_half_move_clock(&mut self, text: &str) -> Result<(), FenError> {
        self.half_move_clock = parse_counter("half move clock", text).inspect_err(log_rejected)?;
        Ok(())
    }

    pub fn load_fen_full_move_counter(&mut self, text: &str) -> Result<(), FenError> {
        self.full_move_counter =
            parse_counter("full move counter", text).inspect_err(log_rejected)?;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let placement = (0..8u8)
            .rev()
            .map(|rank| {
                let mut text = String::with_capacity(8);
                let mut empty = 0;
                for file in 0..8u8 {
                    let sq = square(file, rank);
                    match (self.piece_on(sq), self.color_on(sq)) {
                        (Some(piece), Some(color)) => {
                            if empty > 0 {
                                text.push(char::from(b'0' + empty));
                                empty = 0;
                            }
                            text.push(match color {
                                Color::White => piece.to_char(),
                                Color::Black => piece.to_char().to_ascii_lowercase(),
                            });
                        }
                        _ => empty += 1,
                    }
                }
                if empty > 0 {
                    text.push(char::from(b'0' + empty));
                }
                text
            })
            .join("/");

        let en_passant = self
            .en_passant
            .map_or_else(|| "-".to_string(), square_to_string);

        let mut fen = placement;
        fen.push_str(&format!(
            " {} {} {} {} {}",
            self.side_to_move.to_char(),
            self.castling,
            en_passant,
            self.half_move_clock,
            self.full_move_counter
        ));
        fen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::squares::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let fens = [
            STARTING_POSITION_FEN,
            "rnb1k2r/pp3ppp/3bpq2/2p5/2B2P2/1P3Q2/P1PPN1PP/2B2RK1 w kq - 2 11",
            "rnbqkbnr/p1pppppp/8/8/PpP4P/8/1P1PPPP1/RNBQKBNR b KQkq c3 0 3",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.to_fen(), fen);
            let reloaded = Board::from_fen(&board.to_fen()).unwrap();
            assert_eq!(reloaded.hash(), board.hash());
            assert!(board.validate());
        }
    }

    #[test]
    fn test_surrounding_whitespace_accepted() {
        let board = Board::from_fen(&format!("  {STARTING_POSITION_FEN}  ")).unwrap();
        assert_eq!(board.to_fen(), STARTING_POSITION_FEN);
    }

    #[test]
    fn test_start_position_fields() {
        let board = Board::from_fen(STARTING_POSITION_FEN).unwrap();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.castling(), CastlingRights::ALL);
        assert_eq!(board.en_passant(), None);
        assert_eq!(board.half_move_clock(), 0);
        assert_eq!(board.full_move_counter(), 1);
        assert_eq!(board.piece_on(E1), Some(PieceType::King));
        assert_eq!(board.color_on(E8), Some(Color::Black));
    }

    #[test]
    fn test_hash_deterministic() {
        let a = Board::from_fen(STARTING_POSITION_FEN).unwrap();
        let b = Board::from_fen(STARTING_POSITION_FEN).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!((a.hash(), a.pawn_hash()), a.compute_hashes());

        let black = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_ne!(a.hash(), black.hash());
        assert_eq!(a.pawn_hash(), black.pawn_hash());
    }

    #[test]
    fn test_en_passant_validation_on_load() {
        // c3 is capturable by the b4 pawn
        let board = Board::from_fen("rnbqkbnr/p1pppppp/8/8/PpP4P/8/1P1PPPP1/RNBQKBNR b KQkq c3 0 3").unwrap();
        assert_eq!(board.en_passant(), Some(C3));
        assert_eq!(board.en_passant_validated(), Some(C3));

        // e3 with no black pawn next to e4
        let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        assert_eq!(board.en_passant(), Some(E3));
        assert_eq!(board.en_passant_validated(), None);
        let plain = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_eq!(board.hash(), plain.hash());
    }

    #[test]
    fn test_invalid_fen_leaves_board_untouched() {
        let mut board = Board::start_position();
        let before = board.clone();
        let bad = [
            "",
            "not a fen",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 99999999999",
        ];
        for fen in bad {
            assert!(board.load_fen(fen).is_err(), "accepted '{fen}'");
            assert_eq!(board, before);
        }
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            Board::from_fen("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::InvalidPlacement(_))
        ));
        assert!(matches!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 4294967296"),
            Err(FenError::InvalidCounter { field: "full move counter", .. })
        ));
        assert!(matches!(Board::from_fen("x"), Err(FenError::Malformed(_))));
    }

    #[test]
    fn test_field_loaders_reject_without_side_effects() {
        let mut board = Board::start_position();
        let before = board.clone();
        assert_eq!(board.load_fen_side_to_move("x"), Err(FenError::InvalidColor("x".into())));
        assert_eq!(board.load_fen_castling("KX"), Err(FenError::InvalidCastling("KX".into())));
        assert_eq!(board.load_fen_en_passant("z9"), Err(FenError::InvalidSquare("z9".into())));
        assert!(board.load_fen_half_move_clock("-1").is_err());
        assert!(board.load_fen_full_move_counter("abc").is_err());
        assert!(board.load_fen_pieces("8/8/8/8/8/8/8/4K3").is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn test_field_loaders_keep_hash_consistent() {
        let mut board = Board::start_position();
        board.load_fen_side_to_move("b").unwrap();
        board.load_fen_castling("Kq").unwrap();
        assert_eq!(board.castling().to_string(), "Kq");
        board.load_fen_half_move_clock("7").unwrap();
        assert_eq!(board.half_move_clock(), 7);
        assert!(board.validate());
        board.load_fen_castling("-").unwrap();
        board.load_fen_side_to_move("w").unwrap();
        assert_eq!(board.castling(), CastlingRights::NONE);
        assert!(board.validate());
    }

    #[test]
    fn test_castling_needs_king_and_rook_at_home() {
        assert_eq!(
            Board::from_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1"),
            Err(FenError::CastlingPiecesMissing('K'))
        );
        assert_eq!(
            Board::from_fen("r3k2r/8/8/8/8/8/8/R2K3R w Q - 0 1"),
            Err(FenError::CastlingPiecesMissing('Q'))
        );
        // a black rook on h1 does not back white's right
        assert_eq!(
            Board::from_fen("4k3/8/8/8/8/8/8/4K2r w K - 0 1"),
            Err(FenError::CastlingPiecesMissing('K'))
        );
        assert_eq!(
            Board::from_fen("r3k3/8/8/8/8/8/8/4K2R w Kq - 0 1").map(|b| b.castling().to_string()),
            Ok("Kq".to_string())
        );

        // the failed full load leaves the previous position in place
        let mut board = Board::start_position();
        let before = board.clone();
        assert!(board.load_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1").is_err());
        assert_eq!(board, before);

        let mut bare = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let before = bare.clone();
        assert_eq!(bare.load_fen_castling("K"), Err(FenError::CastlingPiecesMissing('K')));
        assert_eq!(bare, before);

        let mut list = crate::movelist::MoveList::new();
        bare.generate_moves(&mut list);
        assert!(list.get_moves(0).iter().all(|mv| mv.flag != crate::types::MoveFlag::Castle));
    }

    #[test]
    fn test_load_pushes_repetition_hash() {
        let board = Board::start_position();
        assert_eq!(board.repeat_stack.as_slice(), &[board.hash()]);
    }
}
