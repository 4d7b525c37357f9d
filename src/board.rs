use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{BOARD_SIZE, Color, Piece, PieceId, Position};

const NUM_SQUARES: usize = BOARD_SIZE as usize * BOARD_SIZE as usize;
const STARTING_ROWS: u8 = 3;
pub const MAX_PIECES_PER_COLOR: usize = 12;

pub const CELL_EMPTY: u8 = 0;
pub const CELL_WHITE_MAN: u8 = 1;
pub const CELL_BLACK_MAN: u8 = 2;
pub const CELL_WHITE_KING: u8 = 3;
pub const CELL_BLACK_KING: u8 = 4;

/// Playable squares in row-major order.
pub static DARK_SQUARES: Lazy<Vec<Position>> = Lazy::new(|| {
    (0..BOARD_SIZE)
        .flat_map(|row| (0..BOARD_SIZE).map(move |col| Position::new(row, col)))
        .filter(|pos| pos.is_dark())
        .collect()
});

/// Draughts position stored as a list of pieces keyed by their squares.
///
/// The list order never changes while pieces move, and it is the enumeration
/// order for every "first found" rule in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Piece>", into = "Vec<Piece>")]
pub struct Board {
    pieces: Vec<Piece>,
}

impl Board {
    /// Creates the starting position:
    /// black men on the dark squares of rows 0-2, white men on rows 5-7.
    pub fn new() -> Self {
        let mut pieces = Vec::with_capacity(2 * MAX_PIECES_PER_COLOR);
        let black_rows = 0..STARTING_ROWS;
        let white_rows = BOARD_SIZE - STARTING_ROWS..BOARD_SIZE;

        for pos in DARK_SQUARES.iter().filter(|pos| black_rows.contains(&pos.row)) {
            pieces.push(Piece::man(format!("b-{}", pieces.len()), Color::Black, *pos));
        }
        for pos in DARK_SQUARES.iter().filter(|pos| white_rows.contains(&pos.row)) {
            pieces.push(Piece::man(format!("w-{}", pieces.len()), Color::White, *pos));
        }

        Self { pieces }
    }

    pub fn empty() -> Self {
        Self { pieces: Vec::new() }
    }

    /// Builds a board from an arbitrary piece list, keeping its order.
    pub fn from_pieces(pieces: Vec<Piece>) -> EngineResult<Self> {
        let mut squares = HashSet::new();
        let mut ids = HashSet::new();

        for piece in &pieces {
            let pos = piece.position;
            if !pos.is_on_board() {
                return Err(EngineError::InvalidBoard(format!(
                    "piece {} is off the board at {pos}",
                    piece.id
                )));
            }
            if !pos.is_dark() {
                return Err(EngineError::InvalidBoard(format!(
                    "piece {} stands on light square {pos}",
                    piece.id
                )));
            }
            if !squares.insert(pos) {
                return Err(EngineError::InvalidBoard(format!("two pieces share {pos}")));
            }
            if !ids.insert(&piece.id) {
                return Err(EngineError::InvalidBoard(format!(
                    "duplicate piece id {}",
                    piece.id
                )));
            }
        }

        for color in [Color::White, Color::Black] {
            let count = pieces.iter().filter(|p| p.color == color).count();
            if count > MAX_PIECES_PER_COLOR {
                return Err(EngineError::InvalidBoard(format!(
                    "{color} has {count} pieces, at most {MAX_PIECES_PER_COLOR} allowed"
                )));
            }
        }

        Ok(Self { pieces })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(move |p| p.color == color)
    }

    /// Returns the piece on `(row, col)`; off-board coordinates yield `None`.
    pub fn piece_at(&self, row: i32, col: i32) -> Option<&Piece> {
        Position::checked(row, col).and_then(|pos| self.piece_on(pos))
    }

    pub fn piece_on(&self, pos: Position) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.position == pos)
    }

    pub fn piece_by_id(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| &p.id == id)
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.piece_on(pos).is_none()
    }

    /// Returns `(white_count, black_count)`.
    pub fn count(&self) -> (u8, u8) {
        (
            self.count_of(Color::White) as u8,
            self.count_of(Color::Black) as u8,
        )
    }

    pub fn count_of(&self, color: Color) -> usize {
        self.pieces_of(color).count()
    }

    /// Grid view `[u8; 64]`, index `row * 8 + col`:
    /// 0=empty, 1=white man, 2=black man, 3=white king, 4=black king.
    pub fn to_array(&self) -> [u8; NUM_SQUARES] {
        let mut cells = [CELL_EMPTY; NUM_SQUARES];
        for piece in &self.pieces {
            cells[piece.position.index()] = match (piece.color, piece.is_king) {
                (Color::White, false) => CELL_WHITE_MAN,
                (Color::Black, false) => CELL_BLACK_MAN,
                (Color::White, true) => CELL_WHITE_KING,
                (Color::Black, true) => CELL_BLACK_KING,
            };
        }
        cells
    }

    /// Moves a piece to `to` and crowns it when a man lands on its far row.
    /// Returns whether the piece was crowned by this move.
    pub(crate) fn advance(&mut self, id: &PieceId, to: Position) -> bool {
        let Some(piece) = self.pieces.iter_mut().find(|p| &p.id == id) else {
            return false;
        };

        piece.position = to;
        if !piece.is_king && to.row == piece.color.promotion_row() {
            piece.is_king = true;
            return true;
        }
        false
    }

    pub(crate) fn remove(&mut self, id: &PieceId) -> Option<Piece> {
        let idx = self.pieces.iter().position(|p| &p.id == id)?;
        Some(self.pieces.remove(idx))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Piece>> for Board {
    type Error = EngineError;

    fn try_from(pieces: Vec<Piece>) -> Result<Self, Self::Error> {
        Self::from_pieces(pieces)
    }
}

impl From<Board> for Vec<Piece> {
    fn from(board: Board) -> Self {
        board.pieces
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_board_has_twelve_men_per_side_on_dark_squares() {
        let board = Board::new();

        assert_eq!(board.count(), (12, 12));
        for piece in board.pieces() {
            assert!(piece.position.is_dark());
            assert!(!piece.is_king);
            match piece.color {
                Color::White => assert!((5..=7).contains(&piece.position.row)),
                Color::Black => assert!((0..=2).contains(&piece.position.row)),
            }
        }
        for col in 0..8 {
            assert!(board.piece_at(3, col).is_none());
            assert!(board.piece_at(4, col).is_none());
        }
    }

    #[test]
    fn initial_ids_follow_a_single_counter_black_first() {
        let board = Board::new();

        assert_eq!(board.piece_at(0, 1).unwrap().id.as_str(), "b-0");
        assert_eq!(board.piece_at(5, 0).unwrap().id.as_str(), "w-12");
        assert_eq!(board.piece_at(7, 6).unwrap().id.as_str(), "w-23");
    }

    #[test]
    fn piece_at_ignores_off_board_coordinates() {
        let board = Board::new();

        assert!(board.piece_at(-1, 0).is_none());
        assert!(board.piece_at(0, 8).is_none());
        assert_eq!(board.piece_at(7, 0).unwrap().color, Color::White);
    }

    #[test]
    fn from_pieces_rejects_broken_layouts() {
        let light = vec![Piece::man("w-1", Color::White, Position::new(0, 0))];
        assert!(matches!(
            Board::from_pieces(light),
            Err(EngineError::InvalidBoard(_))
        ));

        let shared = vec![
            Piece::man("w-1", Color::White, Position::new(5, 0)),
            Piece::man("w-2", Color::White, Position::new(5, 0)),
        ];
        assert!(Board::from_pieces(shared).is_err());

        let same_id = vec![
            Piece::man("w-1", Color::White, Position::new(5, 0)),
            Piece::man("w-1", Color::White, Position::new(5, 2)),
        ];
        assert!(Board::from_pieces(same_id).is_err());

        let too_many: Vec<Piece> = DARK_SQUARES
            .iter()
            .take(13)
            .enumerate()
            .map(|(i, pos)| Piece::man(format!("w-{i}"), Color::White, *pos))
            .collect();
        assert!(Board::from_pieces(too_many).is_err());
    }

    #[test]
    fn to_array_marks_men_and_kings() {
        let board = test_support::board_from_rows([
            ".W......", "........", "........", "........", "........", "b.......",
            "........", "......B.",
        ]);

        let cells = board.to_array();
        assert_eq!(cells[1], CELL_WHITE_KING);
        assert_eq!(cells[5 * 8], CELL_BLACK_MAN);
        assert_eq!(cells[7 * 8 + 6], CELL_BLACK_KING);
        assert_eq!(cells.iter().filter(|&&c| c != CELL_EMPTY).count(), 3);
    }

    #[test]
    fn advance_crowns_only_on_the_far_row() {
        let mut board = test_support::board_from_rows([
            "........", "w.......", "........", "........", "........", "........",
            ".......b", "........",
        ]);
        let white = PieceId::new("w-10");
        let black = PieceId::new("b-67");

        assert!(board.advance(&white, Position::new(0, 1)));
        assert!(board.piece_by_id(&white).unwrap().is_king);
        assert!(!board.advance(&white, Position::new(1, 2)));

        assert!(board.advance(&black, Position::new(7, 6)));
        assert!(board.remove(&black).is_some());
        assert!(board.remove(&black).is_none());
    }

    #[test]
    fn serde_round_trip_keeps_order_and_validates() {
        let board = Board::new();
        let json = serde_json::to_string(&board).unwrap();
        let restored: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, board);

        let broken = r#"[{"id":"x","color":"WHITE","is_king":false,"position":{"row":0,"col":0}}]"#;
        assert!(serde_json::from_str::<Board>(broken).is_err());
    }
}
