use std::fmt;

/// 64-bit set of squares; bit `i` is square `i`.
pub type Bitboard = u64;

/// Square index 0-63: a1 = 0, b1 = 1, ..., h8 = 63.
pub type Square = u8;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn other_color(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn to_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PieceType {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

/// Pieces a pawn may promote to, in generation order.
pub const PIECES_CAN_PROMOTE_TO: [PieceType; 4] = [
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
];

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    /// Parse a piece letter, ignoring case.
    pub fn from_char(c: char) -> Option<PieceType> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Uppercase letter for the piece.
    pub fn to_char(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    /// Material value used for capture ordering.
    pub const fn value(self) -> i32 {
        match self {
            Self::Pawn => 100,
            Self::Knight => 300,
            Self::Bishop => 300,
            Self::Rook => 500,
            Self::Queen => 900,
            Self::King => 15000,
        }
    }
}

/// Castling rights as four independent flags.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: CastlingRights = CastlingRights(1);
    pub const WHITE_QUEENSIDE: CastlingRights = CastlingRights(2);
    pub const BLACK_KINGSIDE: CastlingRights = CastlingRights(4);
    pub const BLACK_QUEENSIDE: CastlingRights = CastlingRights(8);
    pub const ALL: CastlingRights = CastlingRights(15);

    /// The individual flags in FEN order (`KQkq`).
    pub const FLAGS: [(CastlingRights, char); 4] = [
        (Self::WHITE_KINGSIDE, 'K'),
        (Self::WHITE_QUEENSIDE, 'Q'),
        (Self::BLACK_KINGSIDE, 'k'),
        (Self::BLACK_QUEENSIDE, 'q'),
    ];

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub fn contains(self, other: CastlingRights) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline(always)]
    pub fn insert(&mut self, other: CastlingRights) {
        self.0 |= other.0;
    }

    /// Keep only the rights whose bits are set in `mask`.
    #[inline(always)]
    pub fn retain(&mut self, mask: u8) {
        self.0 &= mask;
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (flag, c) in Self::FLAGS {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum MoveFlag {
    Normal,
    Capture,
    Castle,
    EnPassant,
    PawnMove,
    DoublePawn,
    Promote,
    PromoteCapture,
    Null,
}

impl MoveFlag {
    #[inline(always)]
    pub fn is_promotion(self) -> bool {
        matches!(self, MoveFlag::Promote | MoveFlag::PromoteCapture)
    }
}

/// An immutable move as produced by move generation.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Move {
    pub piece: PieceType,
    pub from: Square,
    pub to: Square,
    pub flag: MoveFlag,
    pub capture: Option<PieceType>,
    pub promote: Option<PieceType>,
    pub score: i32,
}

impl Move {
    pub fn new(
        piece: PieceType,
        from: Square,
        to: Square,
        flag: MoveFlag,
        capture: Option<PieceType>,
        promote: Option<PieceType>,
        score: i32,
    ) -> Self {
        debug_assert!(from < 64 && to < 64, "move squares out of range: {from} -> {to}");
        Move {
            piece,
            from,
            to,
            flag,
            capture,
            promote,
            score,
        }
    }

    /// A non-capturing, non-promoting move with no ordering score.
    pub fn quiet(piece: PieceType, from: Square, to: Square, flag: MoveFlag) -> Self {
        Self::new(piece, from, to, flag, None, None, 0)
    }

    /// The "pass" move: only the side to move changes.
    pub const fn null() -> Self {
        Move {
            piece: PieceType::King,
            from: 0,
            to: 0,
            flag: MoveFlag::Null,
            capture: None,
            promote: None,
            score: 0,
        }
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.flag == MoveFlag::Null
    }

    /// Same move carrying a different ordering score.
    pub fn with_score(self, score: i32) -> Self {
        Move { score, ..self }
    }
}

impl fmt::Display for Move {
    /// Long algebraic notation, e.g. `e2e4` or `e7e8q`. The null move prints as `0000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("0000");
        }
        write!(f, "{}{}", square_to_string(self.from), square_to_string(self.to))?;
        if let Some(p) = self.promote {
            write!(f, "{}", p.to_char().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

#[inline(always)]
pub const fn square(file: u8, rank: u8) -> Square {
    (rank << 3) | file
}

#[inline(always)]
pub const fn file_of(sq: Square) -> u8 {
    sq & 7
}

#[inline(always)]
pub const fn rank_of(sq: Square) -> u8 {
    sq >> 3
}

pub fn square_to_string(sq: Square) -> String {
    format!(
        "{}{}",
        (b'a' + file_of(sq)) as char,
        (b'1' + rank_of(sq)) as char
    )
}

/// Parse an algebraic square such as `e3`.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = chars.next()?;
    let rank = chars.next()?;
    if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    Some(square(file as u8 - b'a', rank as u8 - b'1'))
}

#[rustfmt::skip]
pub mod squares {
    use super::Square;

    pub const A1: Square = 0;  pub const B1: Square = 1;  pub const C1: Square = 2;  pub const D1: Square = 3;
    pub const E1: Square = 4;  pub const F1: Square = 5;  pub const G1: Square = 6;  pub const H1: Square = 7;
    pub const A2: Square = 8;  pub const B2: Square = 9;  pub const C2: Square = 10; pub const D2: Square = 11;
    pub const E2: Square = 12; pub const F2: Square = 13; pub const G2: Square = 14; pub const H2: Square = 15;
    pub const A3: Square = 16; pub const B3: Square = 17; pub const C3: Square = 18; pub const D3: Square = 19;
    pub const E3: Square = 20; pub const F3: Square = 21; pub const G3: Square = 22; pub const H3: Square = 23;
    pub const A4: Square = 24; pub const B4: Square = 25; pub const C4: Square = 26; pub const D4: Square = 27;
    pub const E4: Square = 28; pub const F4: Square = 29; pub const G4: Square = 30; pub const H4: Square = 31;
    pub const A5: Square = 32; pub const B5: Square = 33; pub const C5: Square = 34; pub const D5: Square = 35;
    pub const E5: Square = 36; pub const F5: Square = 37; pub const G5: Square = 38; pub const H5: Square = 39;
    pub const A6: Square = 40; pub const B6: Square = 41; pub const C6: Square = 42; pub const D6: Square = 43;
    pub const E6: Square = 44; pub const F6: Square = 45; pub const G6: Square = 46; pub const H6: Square = 47;
    pub const A7: Square = 48; pub const B7: Square = 49; pub const C7: Square = 50; pub const D7: Square = 51;
    pub const E7: Square = 52; pub const F7: Square = 53; pub const G7: Square = 54; pub const H7: Square = 55;
    pub const A8: Square = 56; pub const B8: Square = 57; pub const C8: Square = 58; pub const D8: Square = 59;
    pub const E8: Square = 60; pub const F8: Square = 61; pub const G8: Square = 62; pub const H8: Square = 63;
}
