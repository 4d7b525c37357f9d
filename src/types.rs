use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub const BOARD_SIZE: u8 = 8;

/// Side of a piece or player. White moves first and advances toward row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta of a man's quiet step.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row on which a man of this color is crowned.
    pub fn promotion_row(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => BOARD_SIZE - 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("WHITE"),
            Color::Black => f.write_str("BLACK"),
        }
    }
}

impl FromStr for Color {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            _ => Err(EngineError::InvalidColor(s.to_string())),
        }
    }
}

/// Returns true when both coordinates lie in `0..8`.
pub fn is_on_board(row: i32, col: i32) -> bool {
    let range = 0..BOARD_SIZE as i32;
    range.contains(&row) && range.contains(&col)
}

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Builds a position from signed coordinates, `None` when off the board.
    pub fn checked(row: i32, col: i32) -> Option<Self> {
        is_on_board(row, col).then(|| Self::new(row as u8, col as u8))
    }

    /// Like [`Position::checked`] but reports off-board input as an error.
    pub fn parse(row: i32, col: i32) -> EngineResult<Self> {
        Self::checked(row, col).ok_or(EngineError::InvalidPosition { row, col })
    }

    pub fn is_on_board(self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// Playable squares are the dark ones, where `row + col` is odd.
    pub fn is_dark(self) -> bool {
        (self.row as u16 + self.col as u16) % 2 == 1
    }

    /// Row-major square index (0..=63).
    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE as usize + self.col as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        let width = BOARD_SIZE as usize;
        (index < width * width).then(|| Self::new((index / width) as u8, (index % width) as u8))
    }

    pub(crate) fn offset(self, dr: i8, dc: i8) -> Option<Self> {
        Self::checked(self.row as i32 + dr as i32, self.col as i32 + dc as i32)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Stable identity of a piece for its whole life on the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub color: Color,
    pub is_king: bool,
    pub position: Position,
}

impl Piece {
    pub fn man(id: impl Into<String>, color: Color, position: Position) -> Self {
        Self {
            id: PieceId::new(id),
            color,
            is_king: false,
            position,
        }
    }

    pub fn king(id: impl Into<String>, color: Color, position: Position) -> Self {
        Self {
            is_king: true,
            ..Self::man(id, color, position)
        }
    }
}

/// One atomic step or jump. Capture chains are sequences of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub is_capture: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_piece_id: Option<PieceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_position: Option<Position>,
}

impl Move {
    pub fn quiet(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            is_capture: false,
            captured_piece_id: None,
            captured_position: None,
        }
    }

    pub fn capture(from: Position, to: Position, victim: &Piece) -> Self {
        Self {
            from,
            to,
            is_capture: true,
            captured_piece_id: Some(victim.id.clone()),
            captured_position: Some(victim.position),
        }
    }
}

/// Canonical player identifier, normalized once on ingress.
///
/// Numeric ids (the common case for chat-platform users) are stored in their
/// plain decimal form, so `"0042"`, `" 42 "` and `42` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidPlayerId(raw.to_string()));
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit())
            && let Ok(numeric) = trimmed.parse::<u64>()
        {
            return Ok(Self::from(numeric));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Session code. Lookups are case-insensitive, so codes are stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "WHITE")]
    White,
    #[serde(rename = "BLACK")]
    Black,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Color> for Winner {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Winner::White,
            Color::Black => Winner::Black,
        }
    }
}

/// What an accepted move did to the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    /// The move that was carried out; `None` when a fuki burn nullified it.
    pub executed: Option<Move>,
    pub became_king: bool,
    pub must_continue_capture: bool,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub fuki_burned: bool,
    pub burned_piece_id: Option<PieceId>,
    pub burned_position: Option<Position>,
}

/// Flat move result handed across the JS boundary.
///
/// Contract:
/// - `success == false` implies every flag is `false` and the game is untouched.
/// - `error_code` is a stable machine-readable tag, `error` a human message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub success: bool,
    pub error: Option<String>,
    pub error_code: Option<&'static str>,
    pub became_king: bool,
    pub must_continue_capture: bool,
    pub game_over: bool,
    pub winner: Option<Winner>,
    pub fuki_burned: bool,
    pub burned_position: Option<Position>,
}

impl From<EngineResult<MoveOutcome>> for MoveReport {
    fn from(result: EngineResult<MoveOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                error: None,
                error_code: None,
                became_king: outcome.became_king,
                must_continue_capture: outcome.must_continue_capture,
                game_over: outcome.game_over,
                winner: outcome.winner,
                fuki_burned: outcome.fuki_burned,
                burned_position: outcome.burned_position,
            },
            Err(err) => Self {
                error: Some(err.to_string()),
                error_code: Some(err.code()),
                ..Self::default()
            },
        }
    }
}

/// `{success, error?}` result for actions with no payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub success: bool,
    pub error: Option<String>,
    pub error_code: Option<&'static str>,
}

impl<T> From<EngineResult<T>> for ActionReport {
    fn from(result: EngineResult<T>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                ..Self::default()
            },
            Err(err) => Self {
                success: false,
                error: Some(err.to_string()),
                error_code: Some(err.code()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub color: Color,
    pub both_joined: bool,
    /// The player already had a seat; nothing changed.
    pub already_joined: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadyState {
    pub white: bool,
    pub black: bool,
    pub started: bool,
}

/// Public session state returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStateView {
    pub session_id: SessionId,
    pub pieces: Vec<Piece>,
    /// Grid view, see [`crate::board::Board::to_array`].
    pub grid: Vec<u8>,
    pub current_player: Color,
    pub status: GameStatus,
    pub winner: Option<Winner>,
    pub white: Option<Player>,
    pub black: Option<Player>,
    pub ready: ReadyState,
    /// Contract:
    /// - `None` when no viewer was given or the viewer holds no seat.
    pub my_color: Option<Color>,
    pub opponent: Option<Player>,
    pub must_capture_from: Option<Position>,
    pub fuki_mode: bool,
    pub draw_offer: Option<Color>,
    pub created_at_ms: u64,
    pub last_activity_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_ids_are_normalized_on_parse() {
        assert_eq!(PlayerId::parse(" 0042 ").unwrap(), PlayerId::from(42));
        assert_eq!(PlayerId::parse("alice").unwrap().as_str(), "alice");
        assert!(matches!(
            PlayerId::parse("   "),
            Err(EngineError::InvalidPlayerId(_))
        ));
    }

    #[test]
    fn session_ids_are_case_insensitive() {
        assert_eq!(SessionId::from(" ab12cd "), SessionId::from("AB12CD"));
    }

    #[test]
    fn colors_parse_and_serialize_in_upper_case() {
        assert_eq!("white".parse::<Color>().unwrap(), Color::White);
        assert_eq!(" BLACK ".parse::<Color>().unwrap(), Color::Black);
        assert!("red".parse::<Color>().is_err());
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "\"WHITE\"");
        assert_eq!(serde_json::to_string(&Winner::Draw).unwrap(), "\"draw\"");
    }

    #[test]
    fn positions_outside_the_board_are_rejected() {
        assert_eq!(Position::checked(7, 0), Some(Position::new(7, 0)));
        assert_eq!(Position::checked(8, 0), None);
        assert_eq!(Position::checked(0, -1), None);
        assert!(matches!(
            Position::parse(-1, 3),
            Err(EngineError::InvalidPosition { row: -1, col: 3 })
        ));
        assert_eq!(Position::from_index(63), Some(Position::new(7, 7)));
        assert_eq!(Position::from_index(64), None);
    }

    #[test]
    fn failed_move_report_carries_no_flags() {
        let report = MoveReport::from(Err(EngineError::MandatoryCapture));

        assert!(!report.success);
        assert_eq!(report.error_code, Some("mandatory_capture"));
        assert!(!report.fuki_burned && !report.game_over && !report.became_king);
    }
}
