//! Registry of live sessions keyed by session code.
//!
//! The store owns every [`GameSession`] and never runs timers of its own: the
//! host decides when to call [`SessionStore::sweep`]. All methods taking
//! `&mut self` are the serialization point for mutations.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use web_time::Instant;

use crate::config::StoreConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::GameSession;
use crate::types::{
    Color, GameStateView, JoinOutcome, Move, MoveOutcome, Player, PlayerId, Position, ReadyState,
    SessionId, Winner,
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 64;
// Code spaces up to this size are scanned in order once random draws keep colliding.
const SCANNABLE_CODES: usize = 36 * 36 * 36;

pub struct SessionStore {
    sessions: HashMap<SessionId, GameSession>,
    config: StoreConfig,
    rng: StdRng,
}

impl SessionStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic codes and seat draws, for tests and replays.
    pub fn with_seed(config: StoreConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: StoreConfig, rng: StdRng) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// Opens a session for `creator` and returns its fresh code.
    pub fn create(&mut self, creator: Player) -> EngineResult<SessionId> {
        let id = self.generate_code()?;
        let creator_id = creator.id.clone();
        let session = GameSession::new(id.clone(), creator, &self.config.rules, &mut self.rng);
        info!(session = %id, creator = %creator_id, "session created");
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    pub fn get(&self, id: &SessionId) -> Option<&GameSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut GameSession> {
        self.sessions.get_mut(id)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<GameSession> {
        self.sessions.remove(id)
    }

    /// Drops every session idle for longer than the configured timeout.
    pub fn sweep(&mut self, now: Instant) -> Vec<SessionId> {
        let timeout = self.config.inactivity_timeout();
        let stale: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_inactive(now, timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            self.sessions.remove(id);
            info!(session = %id, "inactive session removed");
        }
        if !stale.is_empty() {
            info!(removed = stale.len(), remaining = self.sessions.len(), "sweep finished");
        }
        stale
    }

    pub fn join(&mut self, id: &SessionId, player: Player) -> EngineResult<JoinOutcome> {
        self.session_mut(id)?.join(player)
    }

    pub fn set_ready(&mut self, id: &SessionId, player: &PlayerId) -> EngineResult<ReadyState> {
        self.session_mut(id)?.set_ready(player)
    }

    pub fn state(&self, id: &SessionId, viewer: Option<&PlayerId>) -> EngineResult<GameStateView> {
        Ok(self.session(id)?.state(viewer))
    }

    pub fn possible_moves(&self, id: &SessionId, row: i32, col: i32) -> EngineResult<Vec<Move>> {
        Ok(self.session(id)?.possible_moves(row, col))
    }

    pub fn make_move(
        &mut self,
        id: &SessionId,
        from: Position,
        to: Position,
    ) -> EngineResult<MoveOutcome> {
        self.session_mut(id)?.make_move(from, to)
    }

    pub fn make_move_by(
        &mut self,
        id: &SessionId,
        player: &PlayerId,
        from: Position,
        to: Position,
    ) -> EngineResult<MoveOutcome> {
        self.session_mut(id)?.make_move_by(player, from, to)
    }

    pub fn pass_turn(&mut self, id: &SessionId, color: Color) -> EngineResult<()> {
        self.session_mut(id)?.pass_turn(color)
    }

    pub fn surrender(&mut self, id: &SessionId) -> EngineResult<Winner> {
        self.session_mut(id)?.surrender()
    }

    pub fn surrender_by(&mut self, id: &SessionId, player: &PlayerId) -> EngineResult<Winner> {
        self.session_mut(id)?.surrender_by(player)
    }

    pub fn offer_draw(&mut self, id: &SessionId, player: &PlayerId) -> EngineResult<()> {
        self.session_mut(id)?.offer_draw(player)
    }

    pub fn accept_draw(&mut self, id: &SessionId, player: &PlayerId) -> EngineResult<()> {
        self.session_mut(id)?.accept_draw(player)
    }

    pub fn reject_draw(&mut self, id: &SessionId, player: &PlayerId) -> EngineResult<()> {
        self.session_mut(id)?.reject_draw(player)
    }

    pub fn toggle_fuki_mode(&mut self, id: &SessionId, requester: &PlayerId) -> EngineResult<bool> {
        self.session_mut(id)?.toggle_fuki_mode(requester)
    }

    fn session(&self, id: &SessionId) -> EngineResult<&GameSession> {
        self.sessions
            .get(id)
            .ok_or_else(|| EngineError::SessionNotFound(id.to_string()))
    }

    fn session_mut(&mut self, id: &SessionId) -> EngineResult<&mut GameSession> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| EngineError::SessionNotFound(id.to_string()))
    }

    fn generate_code(&mut self) -> EngineResult<SessionId> {
        let len = self.config.session_code_len.max(1);
        let capacity = u32::try_from(len)
            .ok()
            .and_then(|len| CODE_ALPHABET.len().checked_pow(len));
        if capacity.is_some_and(|capacity| self.sessions.len() >= capacity) {
            return Err(EngineError::CodeSpaceExhausted(len));
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code: String = (0..len)
                .map(|_| CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            let id = SessionId::from(code.as_str());
            if !self.sessions.contains_key(&id) {
                return Ok(id);
            }
        }

        match capacity {
            Some(capacity) if capacity <= SCANNABLE_CODES => (0..capacity)
                .map(|index| code_at(index, len))
                .find(|id| !self.sessions.contains_key(id))
                .ok_or(EngineError::CodeSpaceExhausted(len)),
            _ => Err(EngineError::CodeSpaceExhausted(len)),
        }
    }
}

/// The `index`-th code of length `len` in alphabet order.
fn code_at(mut index: usize, len: usize) -> SessionId {
    let base = CODE_ALPHABET.len();
    let mut code = vec![CODE_ALPHABET[0]; len];
    for slot in code.iter_mut().rev() {
        *slot = CODE_ALPHABET[index % base];
        index /= base;
    }
    let code: String = code.into_iter().map(char::from).collect();
    SessionId::from(code.as_str())
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::RulesConfig;
    use crate::types::GameStatus;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn player(id: u64, name: &str) -> Player {
        Player::new(PlayerId::from(id), name)
    }

    fn store() -> SessionStore {
        init_tracing();
        SessionStore::with_seed(StoreConfig::default(), 42)
    }

    fn started(store: &mut SessionStore) -> SessionId {
        let id = store.create(player(1, "alice")).unwrap();
        store.join(&id, player(2, "bob")).unwrap();
        store.set_ready(&id, &PlayerId::from(1)).unwrap();
        store.set_ready(&id, &PlayerId::from(2)).unwrap();
        id
    }

    #[test]
    fn created_codes_are_uppercase_alphanumeric_and_unique() {
        let mut store = store();

        let ids: Vec<_> = (0..50).map(|i| store.create(player(i, "p")).unwrap()).collect();

        assert_eq!(store.len(), 50);
        for id in &ids {
            assert_eq!(id.as_str().len(), 6);
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
    }

    #[test]
    fn create_reports_an_exhausted_code_space() {
        init_tracing();
        let config = StoreConfig {
            session_code_len: 1,
            ..StoreConfig::default()
        };
        let mut store = SessionStore::with_seed(config, 7);

        for i in 0..36 {
            store.create(player(i, "p")).unwrap();
        }

        assert_eq!(store.len(), 36);
        assert_eq!(
            store.create(player(36, "late")),
            Err(EngineError::CodeSpaceExhausted(1))
        );
        assert_eq!(store.len(), 36);

        let freed = store.ids().next().cloned().unwrap();
        store.remove(&freed);
        assert_eq!(store.create(player(37, "again")), Ok(freed));
    }

    #[test]
    fn codes_are_enumerated_in_alphabet_order() {
        assert_eq!(code_at(0, 2).as_str(), "AA");
        assert_eq!(code_at(37, 2).as_str(), "BB");
        assert_eq!(code_at(35, 1).as_str(), "9");
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let mut store = store();
        let id = store.create(player(1, "alice")).unwrap();

        let lower = SessionId::from(id.as_str().to_ascii_lowercase().as_str());

        assert!(store.get(&lower).is_some());
    }

    #[test]
    fn unknown_sessions_are_reported() {
        let mut store = store();
        let missing = SessionId::from("NOPE00");

        assert_eq!(
            store.join(&missing, player(1, "alice")),
            Err(EngineError::SessionNotFound("NOPE00".to_string()))
        );
        assert!(store.state(&missing, None).is_err());
        assert!(store.surrender(&missing).is_err());
    }

    #[test]
    fn full_match_flow_through_the_store() {
        let mut store = store();
        let id = store.create(player(1, "alice")).unwrap();

        let joined = store.join(&id, player(2, "bob")).unwrap();
        assert!(joined.both_joined);
        let creator_color = store.get(&id).unwrap().color_of(&PlayerId::from(1)).unwrap();
        assert_eq!(creator_color, joined.color.opponent());
        assert_eq!(
            store.join(&id, player(3, "carol")),
            Err(EngineError::SessionFull)
        );

        store.set_ready(&id, &PlayerId::from(1)).unwrap();
        let ready = store.set_ready(&id, &PlayerId::from(2)).unwrap();
        assert!(ready.started);

        let outcome = store
            .make_move(&id, Position::new(5, 0), Position::new(4, 1))
            .unwrap();
        assert!(!outcome.fuki_burned);
        store
            .make_move(&id, Position::new(2, 1), Position::new(3, 0))
            .unwrap();
        let hints = store.possible_moves(&id, 4, 1).unwrap();
        assert!(hints.iter().all(|m| !m.is_capture));

        let state = store.state(&id, Some(&PlayerId::from(2))).unwrap();
        assert_eq!(state.status, GameStatus::Active);
        assert_eq!(state.my_color, Some(joined.color));
        assert_eq!(state.current_player, Color::White);

        assert_eq!(store.surrender(&id), Ok(Winner::Black));
        assert_eq!(
            store.state(&id, None).unwrap().status,
            GameStatus::Finished
        );
    }

    #[test]
    fn edge_contact_without_landing_square_is_not_a_capture() {
        let mut store = store();
        let id = started(&mut store);
        let session = store.get(&id).unwrap();
        let white = session.player(Color::White).unwrap().id.clone();
        let black = session.player(Color::Black).unwrap().id.clone();

        store
            .make_move_by(&id, &white, Position::new(5, 2), Position::new(4, 1))
            .unwrap();
        let reply = store
            .make_move_by(&id, &black, Position::new(2, 1), Position::new(3, 0))
            .unwrap();
        assert!(!reply.must_continue_capture);

        // (4,1) touches the black man on (3,0) but the landing square is off the board.
        let moves = store.possible_moves(&id, 4, 1).unwrap();
        assert!(moves.iter().all(|m| !m.is_capture));
        assert!(moves.iter().any(|m| m.to == Position::new(3, 2)));
        store
            .make_move_by(&id, &white, Position::new(4, 1), Position::new(3, 2))
            .unwrap();
        assert_eq!(store.state(&id, None).unwrap().current_player, Color::Black);
    }

    #[test]
    fn sessions_start_with_the_configured_variant() {
        let config = StoreConfig {
            rules: RulesConfig {
                fuki_mode: true,
                ..RulesConfig::default()
            },
            ..StoreConfig::default()
        };
        let mut store = SessionStore::with_seed(config, 1);
        let id = store.create(player(1, "alice")).unwrap();

        assert!(store.state(&id, None).unwrap().fuki_mode);
        assert_eq!(store.toggle_fuki_mode(&id, &PlayerId::from(1)), Ok(false));
    }

    #[test]
    fn draw_agreement_through_the_store() {
        let mut store = store();
        let id = started(&mut store);

        store.offer_draw(&id, &PlayerId::from(1)).unwrap();
        assert_eq!(
            store.accept_draw(&id, &PlayerId::from(1)),
            Err(EngineError::NoDrawOffer)
        );
        store.reject_draw(&id, &PlayerId::from(2)).unwrap();
        store.offer_draw(&id, &PlayerId::from(2)).unwrap();
        store.accept_draw(&id, &PlayerId::from(1)).unwrap();

        let state = store.state(&id, None).unwrap();
        assert_eq!(state.winner, Some(Winner::Draw));
    }

    #[test]
    fn pass_turn_outside_a_chain_is_refused() {
        let mut store = store();
        let id = started(&mut store);

        assert_eq!(
            store.pass_turn(&id, Color::White),
            Err(EngineError::PassNotAllowed)
        );
    }

    #[test]
    fn sweep_removes_only_idle_sessions() {
        let mut store = store();
        let idle = store.create(player(1, "alice")).unwrap();
        let busy = store.create(player(2, "bob")).unwrap();
        let timeout = store.config().inactivity_timeout();

        std::thread::sleep(Duration::from_millis(5));
        store.get_mut(&busy).unwrap().touch();
        let idle_since = store.get(&idle).unwrap().last_activity();
        let busy_since = store.get(&busy).unwrap().last_activity();

        assert!(store.sweep(idle_since + timeout).is_empty());

        let removed = store.sweep(busy_since + timeout);
        assert_eq!(removed, vec![idle.clone()]);
        assert!(store.get(&idle).is_none());
        assert!(store.get(&busy).is_some());

        let removed = store.sweep(busy_since + timeout + Duration::from_secs(1));
        assert_eq!(removed, vec![busy]);
        assert!(store.is_empty());
    }
}
