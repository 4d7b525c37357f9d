//! Error types for the rules engine and session layer.
//!
//! Every engine operation is total: rejections come back as values and leave
//! the board and session untouched.

use thiserror::Error;

use crate::types::{Color, Position};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The destination is not among the piece's legal moves.
    #[error("invalid move: {from} -> {to}")]
    InvalidMove { from: Position, to: Position },

    /// A quiet move was submitted while a capture is available (standard rules).
    #[error("mandatory capture: a capturing move is available")]
    MandatoryCapture,

    #[error("it is not {0}'s turn")]
    NotYourTurn(Color),

    #[error("game is not active")]
    GameNotActive,

    #[error("game is full")]
    SessionFull,

    #[error("game {0} not found")]
    SessionNotFound(String),

    /// Every session code of the configured length is in use.
    #[error("no free session code of length {0}")]
    CodeSpaceExhausted(usize),

    #[error("no {color} piece at {position}")]
    NoPieceAt { position: Position, color: Color },

    #[error("turn can only be passed in the middle of a capture chain")]
    PassNotAllowed,

    #[error("player {0} has no seat in this game")]
    NotSeated(String),

    #[error("only the game creator can change the variant")]
    NotCreator,

    #[error("variant is locked once the game has started")]
    VariantLocked,

    #[error("there is no pending draw offer")]
    NoDrawOffer,

    #[error("a draw offer is already pending")]
    DrawAlreadyOffered,

    #[error("square ({row}, {col}) is off the board")]
    InvalidPosition { row: i32, col: i32 },

    #[error("invalid player id: {0:?}")]
    InvalidPlayerId(String),

    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    #[error("invalid board: {0}")]
    InvalidBoard(String),
}

impl EngineError {
    /// Stable tag for clients that branch on the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidMove { .. } => "invalid_move",
            EngineError::MandatoryCapture => "mandatory_capture",
            EngineError::NotYourTurn(_) => "not_your_turn",
            EngineError::GameNotActive => "game_not_active",
            EngineError::SessionFull => "session_full",
            EngineError::SessionNotFound(_) => "session_not_found",
            EngineError::CodeSpaceExhausted(_) => "code_space_exhausted",
            EngineError::NoPieceAt { .. } => "no_piece_at",
            EngineError::PassNotAllowed => "pass_not_allowed",
            EngineError::NotSeated(_) => "not_seated",
            EngineError::NotCreator => "not_creator",
            EngineError::VariantLocked => "variant_locked",
            EngineError::NoDrawOffer => "no_draw_offer",
            EngineError::DrawAlreadyOffered => "draw_already_offered",
            EngineError::InvalidPosition { .. } => "invalid_position",
            EngineError::InvalidPlayerId(_) => "invalid_player_id",
            EngineError::InvalidColor(_) => "invalid_color",
            EngineError::InvalidBoard(_) => "invalid_board",
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
