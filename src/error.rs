use thiserror::Error;

/// Reasons a FEN string or one of its fields was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("malformed FEN: '{0}'")]
    Malformed(String),

    #[error("invalid piece placement: '{0}'")]
    InvalidPlacement(String),

    #[error("invalid piece character '{0}'")]
    InvalidPiece(char),

    #[error("invalid side to move: '{0}'")]
    InvalidColor(String),

    #[error("invalid castling specification: '{0}'")]
    InvalidCastling(String),

    #[error("castling right '{0}' needs its king and rook on their home squares")]
    CastlingPiecesMissing(char),

    #[error("invalid en passant square: '{0}'")]
    InvalidSquare(String),

    #[error("invalid {field} field: '{value}'")]
    InvalidCounter { field: &'static str, value: String },
}

/// Failures of the perft driver itself (never of the count).
#[derive(Error, Debug)]
pub enum PerftError {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
