//! JavaScript facade over [`SessionStore`].
//!
//! Every method returns plain JS objects built with `serde-wasm-bindgen`.
//! Failures surface as thrown `Error`s, except `makeMove` and `passTurn`
//! which always resolve to a report object.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_time::Instant;

use crate::config::StoreConfig;
use crate::error::{EngineError, EngineResult};
use crate::snapshot;
use crate::store::SessionStore;
use crate::types::{
    ActionReport, Color, MoveOutcome, MoveReport, Player, PlayerId, Position, SessionId,
};

#[wasm_bindgen]
pub struct CheckersEngine {
    store: SessionStore,
}

#[wasm_bindgen]
impl CheckersEngine {
    /// `config` is an optional partial `StoreConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<CheckersEngine, JsError> {
        let config: StoreConfig = if config.is_undefined() || config.is_null() {
            StoreConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            store: SessionStore::new(config),
        })
    }

    #[wasm_bindgen(js_name = createSession)]
    pub fn create_session(&mut self, player_id: &str, name: &str) -> Result<String, JsError> {
        let creator = Player::new(PlayerId::parse(player_id)?, name);
        Ok(self.store.create(creator)?.to_string())
    }

    #[wasm_bindgen(js_name = joinSession)]
    pub fn join_session(
        &mut self,
        session_id: &str,
        player_id: &str,
        name: &str,
    ) -> Result<JsValue, JsError> {
        let player = Player::new(PlayerId::parse(player_id)?, name);
        to_js(&self.store.join(&SessionId::from(session_id), player)?)
    }

    #[wasm_bindgen(js_name = setReady)]
    pub fn set_ready(&mut self, session_id: &str, player_id: &str) -> Result<JsValue, JsError> {
        let player = PlayerId::parse(player_id)?;
        to_js(&self.store.set_ready(&SessionId::from(session_id), &player)?)
    }

    /// `viewer` may be omitted for a spectator view.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self, session_id: &str, viewer: Option<String>) -> Result<JsValue, JsError> {
        let viewer = viewer.as_deref().map(PlayerId::parse).transpose()?;
        to_js(&self.store.state(&SessionId::from(session_id), viewer.as_ref())?)
    }

    #[wasm_bindgen(js_name = getPossibleMoves)]
    pub fn get_possible_moves(
        &self,
        session_id: &str,
        row: i32,
        col: i32,
    ) -> Result<JsValue, JsError> {
        to_js(&self.store.possible_moves(&SessionId::from(session_id), row, col)?)
    }

    #[wasm_bindgen(js_name = makeMove)]
    pub fn make_move(
        &mut self,
        session_id: &str,
        player_id: &str,
        from_row: i32,
        from_col: i32,
        to_row: i32,
        to_col: i32,
    ) -> JsValue {
        let result = (|| -> EngineResult<MoveOutcome> {
            let player = PlayerId::parse(player_id)?;
            let from = Position::parse(from_row, from_col)?;
            let to = Position::parse(to_row, to_col)?;
            self.store.make_move_by(&SessionId::from(session_id), &player, from, to)
        })();
        report(&MoveReport::from(result))
    }

    #[wasm_bindgen(js_name = passTurn)]
    pub fn pass_turn(&mut self, session_id: &str, color: &str) -> JsValue {
        let result = color
            .parse::<Color>()
            .and_then(|color| self.store.pass_turn(&SessionId::from(session_id), color));
        report(&ActionReport::from(result))
    }

    /// Resigns for `player_id` and returns the winner tag.
    pub fn surrender(&mut self, session_id: &str, player_id: &str) -> Result<JsValue, JsError> {
        let player = PlayerId::parse(player_id)?;
        to_js(&self.store.surrender_by(&SessionId::from(session_id), &player)?)
    }

    #[wasm_bindgen(js_name = offerDraw)]
    pub fn offer_draw(&mut self, session_id: &str, player_id: &str) -> Result<(), JsError> {
        self.with_player(session_id, player_id, SessionStore::offer_draw)
    }

    #[wasm_bindgen(js_name = acceptDraw)]
    pub fn accept_draw(&mut self, session_id: &str, player_id: &str) -> Result<(), JsError> {
        self.with_player(session_id, player_id, SessionStore::accept_draw)
    }

    #[wasm_bindgen(js_name = rejectDraw)]
    pub fn reject_draw(&mut self, session_id: &str, player_id: &str) -> Result<(), JsError> {
        self.with_player(session_id, player_id, SessionStore::reject_draw)
    }

    /// Returns the new fuki flag.
    #[wasm_bindgen(js_name = toggleFukiMode)]
    pub fn toggle_fuki_mode(&mut self, session_id: &str, player_id: &str) -> Result<bool, JsError> {
        let player = PlayerId::parse(player_id)?;
        Ok(self.store.toggle_fuki_mode(&SessionId::from(session_id), &player)?)
    }

    /// Removes idle sessions and returns their codes.
    #[wasm_bindgen(js_name = sweepInactive)]
    pub fn sweep_inactive(&mut self) -> Vec<String> {
        self.store
            .sweep(Instant::now())
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    /// Binary snapshot of the session's board.
    #[wasm_bindgen(js_name = boardSnapshot)]
    pub fn board_snapshot(&self, session_id: &str) -> Result<Vec<u8>, JsError> {
        let id = SessionId::from(session_id);
        let session = self
            .store
            .get(&id)
            .ok_or_else(|| EngineError::SessionNotFound(id.to_string()))?;
        Ok(snapshot::encode(session.game().board()))
    }

    #[wasm_bindgen(js_name = sessionCount)]
    pub fn session_count(&self) -> usize {
        self.store.len()
    }
}

impl CheckersEngine {
    fn with_player(
        &mut self,
        session_id: &str,
        player_id: &str,
        op: fn(&mut SessionStore, &SessionId, &PlayerId) -> EngineResult<()>,
    ) -> Result<(), JsError> {
        let player = PlayerId::parse(player_id)?;
        Ok(op(&mut self.store, &SessionId::from(session_id), &player)?)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}

fn report<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}
