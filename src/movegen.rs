//! Per-piece move generation for Russian draughts.
//!
//! Men step one square forward and capture an adjacent enemy in any of the
//! four diagonals. Kings fly: they slide over any run of empty squares and
//! capture from a distance, landing on any empty square past the victim.

use crate::board::Board;
use crate::types::{Move, Piece, Position};

const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Legal moves of `piece` alone.
///
/// With `must_capture_from` set, only the piece standing there may move and
/// only by capturing; every other piece gets an empty list.
pub fn moves_for_piece(
    board: &Board,
    piece: &Piece,
    must_capture_from: Option<Position>,
) -> Vec<Move> {
    if let Some(anchor) = must_capture_from
        && anchor != piece.position
    {
        return Vec::new();
    }
    let mid_chain = must_capture_from.is_some();

    let mut moves = Vec::new();
    for (dr, dc) in DIAGONALS {
        if piece.is_king {
            push_king_captures(board, piece, dr, dc, &mut moves);
            if !mid_chain {
                push_king_slides(board, piece, dr, dc, &mut moves);
            }
        } else {
            push_man_capture(board, piece, dr, dc, &mut moves);
            if !mid_chain && dr == piece.color.forward() {
                push_man_step(board, piece, dr, dc, &mut moves);
            }
        }
    }

    moves
}

/// Captures available to `piece` from its current square.
pub fn captures_for_piece(board: &Board, piece: &Piece) -> Vec<Move> {
    moves_for_piece(board, piece, Some(piece.position))
}

fn push_man_step(board: &Board, piece: &Piece, dr: i8, dc: i8, moves: &mut Vec<Move>) {
    if let Some(to) = piece.position.offset(dr, dc)
        && board.is_empty_at(to)
    {
        moves.push(Move::quiet(piece.position, to));
    }
}

fn push_man_capture(board: &Board, piece: &Piece, dr: i8, dc: i8, moves: &mut Vec<Move>) {
    let Some(over) = piece.position.offset(dr, dc) else {
        return;
    };
    let Some(victim) = board.piece_on(over) else {
        return;
    };
    if victim.color == piece.color {
        return;
    }
    if let Some(landing) = over.offset(dr, dc)
        && board.is_empty_at(landing)
    {
        moves.push(Move::capture(piece.position, landing, victim));
    }
}

fn push_king_slides(board: &Board, piece: &Piece, dr: i8, dc: i8, moves: &mut Vec<Move>) {
    let mut cursor = piece.position;
    while let Some(next) = cursor.offset(dr, dc) {
        if !board.is_empty_at(next) {
            break;
        }
        moves.push(Move::quiet(piece.position, next));
        cursor = next;
    }
}

fn push_king_captures(board: &Board, piece: &Piece, dr: i8, dc: i8, moves: &mut Vec<Move>) {
    let mut victim: Option<&Piece> = None;
    let mut cursor = piece.position;

    while let Some(next) = cursor.offset(dr, dc) {
        match board.piece_on(next) {
            // Own piece blocks; a second piece before any landing square blocks too.
            Some(other) if other.color == piece.color || victim.is_some() => break,
            Some(other) => victim = Some(other),
            None => {
                if let Some(captured) = victim {
                    moves.push(Move::capture(piece.position, next, captured));
                }
            }
        }
        cursor = next;
    }
}
