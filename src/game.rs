use tracing::{debug, info};

use crate::board::Board;
use crate::config::RulesConfig;
use crate::error::{EngineError, EngineResult};
use crate::movegen::{captures_for_piece, moves_for_piece};
use crate::rules::{Verdict, all_valid_moves, capture_verdict, has_any_move};
use crate::types::{Color, GameStatus, Move, MoveOutcome, Position, Winner};

/// Rules state machine for one match: board, turn, chain and result.
///
/// Seats and readiness live in [`crate::session::GameSession`]; this type
/// only knows colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    current_player: Color,
    status: GameStatus,
    winner: Option<Winner>,
    must_capture_from: Option<Position>,
    fuki_mode: bool,
    allow_chain_pass: bool,
    draw_offer: Option<Color>,
}

impl Game {
    /// A fresh game in the `waiting` state. White moves first.
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            board: Board::new(),
            current_player: Color::White,
            status: GameStatus::Waiting,
            winner: None,
            must_capture_from: None,
            fuki_mode: rules.fuki_mode,
            allow_chain_pass: rules.allow_chain_pass,
            draw_offer: None,
        }
    }

    /// An active game resumed from an arbitrary position.
    pub fn with_board(board: Board, current_player: Color, rules: &RulesConfig) -> Self {
        Self {
            board,
            current_player,
            status: GameStatus::Active,
            ..Self::new(rules)
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Color {
        self.current_player
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn must_capture_from(&self) -> Option<Position> {
        self.must_capture_from
    }

    pub fn fuki_mode(&self) -> bool {
        self.fuki_mode
    }

    pub fn draw_offer(&self) -> Option<Color> {
        self.draw_offer
    }

    pub fn is_over(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// `waiting -> active`.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::GameNotActive);
        }
        self.status = GameStatus::Active;
        Ok(())
    }

    /// The variant can only change before the first move.
    pub fn set_fuki_mode(&mut self, enabled: bool) -> EngineResult<()> {
        if self.status != GameStatus::Waiting {
            return Err(EngineError::VariantLocked);
        }
        self.fuki_mode = enabled;
        Ok(())
    }

    /// Moves of the piece on `(row, col)` if it belongs to the side to move.
    pub fn possible_moves(&self, row: i32, col: i32) -> Vec<Move> {
        match self.board.piece_at(row, col) {
            Some(piece) if piece.color == self.current_player => {
                moves_for_piece(&self.board, piece, self.must_capture_from)
            }
            _ => Vec::new(),
        }
    }

    /// Every legal move of the side to move.
    pub fn valid_moves(&self) -> Vec<Move> {
        all_valid_moves(&self.board, self.current_player, self.must_capture_from)
    }

    pub fn make_move(
        &mut self,
        color: Color,
        from: Position,
        to: Position,
    ) -> EngineResult<MoveOutcome> {
        self.ensure_turn(color)?;

        let piece = self
            .board
            .piece_on(from)
            .filter(|p| p.color == color)
            .ok_or(EngineError::NoPieceAt {
                position: from,
                color,
            })?;
        let piece_id = piece.id.clone();
        let mv = moves_for_piece(&self.board, piece, self.must_capture_from)
            .into_iter()
            .find(|m| m.to == to)
            .ok_or(EngineError::InvalidMove { from, to })?;

        let mut outcome = MoveOutcome::default();
        match capture_verdict(&self.board, color, &mv, self.fuki_mode) {
            Verdict::Proceed => {}
            Verdict::MandatoryCapture => {
                debug!(%color, %from, %to, "quiet move refused, capture is mandatory");
                return Err(EngineError::MandatoryCapture);
            }
            Verdict::Burn {
                piece_id: burned,
                position,
                nullifies_move,
            } => {
                debug!(%color, piece = %burned, %position, nullifies_move, "fuki burn");
                self.board.remove(&burned);
                outcome.fuki_burned = true;
                outcome.burned_piece_id = Some(burned);
                outcome.burned_position = Some(position);

                if nullifies_move {
                    self.end_turn();
                    self.conclude(&mut outcome);
                    return Ok(outcome);
                }
            }
        }

        if let Some(captured) = &mv.captured_piece_id {
            self.board.remove(captured);
        }
        outcome.became_king = self.board.advance(&piece_id, to);

        let continues = mv.is_capture
            && self
                .board
                .piece_by_id(&piece_id)
                .is_some_and(|moved| !captures_for_piece(&self.board, moved).is_empty());
        if continues {
            self.must_capture_from = Some(to);
            outcome.must_continue_capture = true;
        } else {
            self.end_turn();
        }

        outcome.executed = Some(mv);
        self.conclude(&mut outcome);
        Ok(outcome)
    }

    /// Stops a capture chain early and hands the turn over.
    pub fn pass_turn(&mut self, color: Color) -> EngineResult<()> {
        self.ensure_turn(color)?;
        if !self.allow_chain_pass || self.must_capture_from.is_none() {
            return Err(EngineError::PassNotAllowed);
        }

        self.end_turn();
        self.settle();
        Ok(())
    }

    pub fn surrender(&mut self, color: Color) -> EngineResult<Winner> {
        self.ensure_active()?;
        let winner = Winner::from(color.opponent());
        info!(%color, "surrender");
        self.finish(winner);
        Ok(winner)
    }

    pub fn offer_draw(&mut self, color: Color) -> EngineResult<()> {
        self.ensure_active()?;
        if self.draw_offer.is_some() {
            return Err(EngineError::DrawAlreadyOffered);
        }
        self.draw_offer = Some(color);
        Ok(())
    }

    /// Accepts the opponent's pending offer; the game ends drawn.
    pub fn accept_draw(&mut self, color: Color) -> EngineResult<()> {
        self.ensure_active()?;
        self.ensure_offer_from(color.opponent())?;
        self.finish(Winner::Draw);
        Ok(())
    }

    pub fn reject_draw(&mut self, color: Color) -> EngineResult<()> {
        self.ensure_active()?;
        self.ensure_offer_from(color.opponent())?;
        self.draw_offer = None;
        Ok(())
    }

    fn ensure_active(&self) -> EngineResult<()> {
        if self.status != GameStatus::Active {
            return Err(EngineError::GameNotActive);
        }
        Ok(())
    }

    fn ensure_turn(&self, color: Color) -> EngineResult<()> {
        self.ensure_active()?;
        if color != self.current_player {
            return Err(EngineError::NotYourTurn(color));
        }
        Ok(())
    }

    fn ensure_offer_from(&self, offerer: Color) -> EngineResult<()> {
        match self.draw_offer {
            Some(color) if color == offerer => Ok(()),
            _ => Err(EngineError::NoDrawOffer),
        }
    }

    fn end_turn(&mut self) {
        self.must_capture_from = None;
        self.current_player = self.current_player.opponent();
    }

    fn conclude(&mut self, outcome: &mut MoveOutcome) {
        if let Some(winner) = self.settle() {
            outcome.game_over = true;
            outcome.winner = Some(winner);
        }
    }

    /// Ends the game when a side is out of pieces or the side to move is stuck.
    fn settle(&mut self) -> Option<Winner> {
        let winner = if self.board.count_of(Color::White) == 0 {
            Color::Black
        } else if self.board.count_of(Color::Black) == 0 {
            Color::White
        } else if !has_any_move(&self.board, self.current_player, self.must_capture_from) {
            self.current_player.opponent()
        } else {
            return None;
        };

        let winner = Winner::from(winner);
        self.finish(winner);
        Some(winner)
    }

    fn finish(&mut self, winner: Winner) {
        info!(?winner, "game finished");
        self.status = GameStatus::Finished;
        self.winner = Some(winner);
        self.must_capture_from = None;
        self.draw_offer = None;
    }
}
