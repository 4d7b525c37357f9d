//! Side-wide move enumeration and the mandatory-capture policy.

use crate::board::Board;
use crate::movegen::{captures_for_piece, moves_for_piece};
use crate::types::{Color, Move, PieceId, Position};

/// All legal moves of `color`, in board order. Mid-chain only captures remain.
pub fn all_valid_moves(
    board: &Board,
    color: Color,
    must_capture_from: Option<Position>,
) -> Vec<Move> {
    let moves = board
        .pieces_of(color)
        .flat_map(|piece| moves_for_piece(board, piece, must_capture_from));

    if must_capture_from.is_some() {
        moves.filter(|m| m.is_capture).collect()
    } else {
        moves.collect()
    }
}

/// Captures `color` could make right now, ignoring any chain in progress.
pub fn available_captures(board: &Board, color: Color) -> Vec<Move> {
    all_valid_moves(board, color, None)
        .into_iter()
        .filter(|m| m.is_capture)
        .collect()
}

pub fn has_any_move(board: &Board, color: Color, must_capture_from: Option<Position>) -> bool {
    board
        .pieces_of(color)
        .any(|piece| !moves_for_piece(board, piece, must_capture_from).is_empty())
}

/// How the mandatory-capture rule treats a submitted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    /// Standard rules: a capture was available, the quiet move is refused.
    MandatoryCapture,
    /// Fuki rules: the quiet move stands but a piece that could capture burns.
    Burn {
        piece_id: PieceId,
        position: Position,
        /// The burned piece is the one that moved, so the move is void.
        nullifies_move: bool,
    },
}

/// Applies the mandatory-capture rule to an already legal `mv` of `color`.
///
/// In fuki mode the moved piece burns when it could have captured itself.
/// Otherwise the owner of the first available capture in board order burns.
/// That tie-break is arbitrary; it only has to be deterministic.
pub fn capture_verdict(board: &Board, color: Color, mv: &Move, fuki_mode: bool) -> Verdict {
    if mv.is_capture {
        return Verdict::Proceed;
    }

    let mut capturers = board
        .pieces_of(color)
        .filter(|piece| !captures_for_piece(board, piece).is_empty());
    let Some(first) = capturers.next() else {
        return Verdict::Proceed;
    };
    if !fuki_mode {
        return Verdict::MandatoryCapture;
    }

    let guilty = if first.position == mv.from {
        first
    } else {
        capturers.find(|piece| piece.position == mv.from).unwrap_or(first)
    };
    Verdict::Burn {
        piece_id: guilty.id.clone(),
        position: guilty.position,
        nullifies_move: guilty.position == mv.from,
    }
}
