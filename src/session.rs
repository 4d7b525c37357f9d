//! One match's lifecycle around the rules engine: seats, readiness gate,
//! variant toggle and activity tracking.

use std::time::Duration;

use rand::Rng;
use tracing::info;
use web_time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::RulesConfig;
use crate::error::{EngineError, EngineResult};
use crate::game::Game;
use crate::types::{
    Color, GameStateView, GameStatus, JoinOutcome, Move, MoveOutcome, Player, PlayerId, Position,
    ReadyState, SessionId, Winner,
};

#[derive(Debug, Clone)]
struct Seat {
    player: Player,
    ready: bool,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    creator: PlayerId,
    white: Option<Seat>,
    black: Option<Seat>,
    game: Game,
    created_at: SystemTime,
    last_activity_at: SystemTime,
    last_activity: Instant,
}

impl GameSession {
    /// Opens a session; the creator takes a uniformly random seat.
    pub fn new<R: Rng>(id: SessionId, creator: Player, rules: &RulesConfig, rng: &mut R) -> Self {
        let color = if rng.gen_bool(0.5) {
            Color::White
        } else {
            Color::Black
        };
        let seat = Some(Seat {
            player: creator.clone(),
            ready: false,
        });
        let (white, black) = match color {
            Color::White => (seat, None),
            Color::Black => (None, seat),
        };

        Self {
            id,
            creator: creator.id,
            white,
            black,
            game: Game::new(rules),
            created_at: SystemTime::now(),
            last_activity_at: SystemTime::now(),
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn creator(&self) -> &PlayerId {
        &self.creator
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn status(&self) -> GameStatus {
        self.game.status()
    }

    pub fn player(&self, color: Color) -> Option<&Player> {
        self.seat(color).map(|seat| &seat.player)
    }

    /// Color of the seat held by `player`, if any.
    pub fn color_of(&self, player: &PlayerId) -> Option<Color> {
        [Color::White, Color::Black]
            .into_iter()
            .find(|&color| self.seat(color).is_some_and(|seat| &seat.player.id == player))
    }

    pub fn both_joined(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState {
            white: self.seat(Color::White).is_some_and(|seat| seat.ready),
            black: self.seat(Color::Black).is_some_and(|seat| seat.ready),
            started: self.game.status() != GameStatus::Waiting,
        }
    }

    /// Seats `player` in the free slot. Joining twice is a no-op.
    pub fn join(&mut self, player: Player) -> EngineResult<JoinOutcome> {
        if let Some(color) = self.color_of(&player.id) {
            return Ok(JoinOutcome {
                color,
                both_joined: self.both_joined(),
                already_joined: true,
            });
        }

        let color = match (&self.white, &self.black) {
            (None, _) => Color::White,
            (_, None) => Color::Black,
            _ => return Err(EngineError::SessionFull),
        };
        info!(session = %self.id, player = %player.id, %color, "player joined");
        *self.seat_mut(color) = Some(Seat {
            player,
            ready: false,
        });
        self.touch();

        Ok(JoinOutcome {
            color,
            both_joined: self.both_joined(),
            already_joined: false,
        })
    }

    /// Marks `player` ready; the game starts once both seats are filled and ready.
    pub fn set_ready(&mut self, player: &PlayerId) -> EngineResult<ReadyState> {
        let color = self.seated_color(player)?;
        if self.game.status() != GameStatus::Waiting {
            return Err(EngineError::GameNotActive);
        }
        if let Some(seat) = self.seat_mut(color) {
            seat.ready = true;
        }
        self.touch();

        let ready = self.ready_state();
        if ready.white && ready.black {
            self.game.start()?;
            info!(session = %self.id, fuki_mode = self.game.fuki_mode(), "game started");
        }
        Ok(self.ready_state())
    }

    /// Flips fuki mode before the game starts. Only the creator may do it.
    pub fn toggle_fuki_mode(&mut self, requester: &PlayerId) -> EngineResult<bool> {
        if self.game.status() != GameStatus::Waiting {
            return Err(EngineError::VariantLocked);
        }
        if requester != &self.creator {
            return Err(EngineError::NotCreator);
        }

        let enabled = !self.game.fuki_mode();
        self.game.set_fuki_mode(enabled)?;
        self.touch();
        Ok(enabled)
    }

    pub fn possible_moves(&self, row: i32, col: i32) -> Vec<Move> {
        self.game.possible_moves(row, col)
    }

    /// Plays for the side to move.
    pub fn make_move(&mut self, from: Position, to: Position) -> EngineResult<MoveOutcome> {
        let color = self.game.current_player();
        let result = self.game.make_move(color, from, to);
        self.touch_on_ok(result)
    }

    /// Plays for `player`, who must hold the seat of the side to move.
    pub fn make_move_by(
        &mut self,
        player: &PlayerId,
        from: Position,
        to: Position,
    ) -> EngineResult<MoveOutcome> {
        let color = self.seated_color(player)?;
        let result = self.game.make_move(color, from, to);
        self.touch_on_ok(result)
    }

    pub fn pass_turn(&mut self, color: Color) -> EngineResult<()> {
        let result = self.game.pass_turn(color);
        self.touch_on_ok(result)
    }

    /// Surrender on behalf of the side to move.
    pub fn surrender(&mut self) -> EngineResult<Winner> {
        let color = self.game.current_player();
        let result = self.game.surrender(color);
        self.touch_on_ok(result)
    }

    pub fn surrender_by(&mut self, player: &PlayerId) -> EngineResult<Winner> {
        let color = self.seated_color(player)?;
        let result = self.game.surrender(color);
        self.touch_on_ok(result)
    }

    pub fn offer_draw(&mut self, player: &PlayerId) -> EngineResult<()> {
        let color = self.seated_color(player)?;
        let result = self.game.offer_draw(color);
        self.touch_on_ok(result)
    }

    pub fn accept_draw(&mut self, player: &PlayerId) -> EngineResult<()> {
        let color = self.seated_color(player)?;
        let result = self.game.accept_draw(color);
        self.touch_on_ok(result)
    }

    pub fn reject_draw(&mut self, player: &PlayerId) -> EngineResult<()> {
        let color = self.seated_color(player)?;
        let result = self.game.reject_draw(color);
        self.touch_on_ok(result)
    }

    /// Snapshot for clients; `viewer` only fills the perspective fields.
    pub fn state(&self, viewer: Option<&PlayerId>) -> GameStateView {
        let my_color = viewer.and_then(|id| self.color_of(id));
        let board = self.game.board();

        GameStateView {
            session_id: self.id.clone(),
            pieces: board.pieces().to_vec(),
            grid: board.to_array().to_vec(),
            current_player: self.game.current_player(),
            status: self.game.status(),
            winner: self.game.winner(),
            white: self.player(Color::White).cloned(),
            black: self.player(Color::Black).cloned(),
            ready: self.ready_state(),
            my_color,
            opponent: my_color.and_then(|color| self.player(color.opponent()).cloned()),
            must_capture_from: self.game.must_capture_from(),
            fuki_mode: self.game.fuki_mode(),
            draw_offer: self.game.draw_offer(),
            created_at_ms: unix_millis(self.created_at),
            last_activity_at_ms: unix_millis(self.last_activity_at),
        }
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn is_inactive(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.last_activity_at = SystemTime::now();
    }

    fn touch_on_ok<T>(&mut self, result: EngineResult<T>) -> EngineResult<T> {
        if result.is_ok() {
            self.touch();
        }
        result
    }

    fn seated_color(&self, player: &PlayerId) -> EngineResult<Color> {
        self.color_of(player)
            .ok_or_else(|| EngineError::NotSeated(player.to_string()))
    }

    fn seat(&self, color: Color) -> Option<&Seat> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    fn seat_mut(&mut self, color: Color) -> &mut Option<Seat> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
