//! Configuration for the rules engine and the session store.
//!
//! Both structs deserialize with per-field defaults, so a host can pass a
//! partial JSON object (or JS object through the wasm facade).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Quiet moves are allowed while a capture exists, at the price of a burned piece.
    pub fuki_mode: bool,
    /// The side to move may stop a capture chain early with `pass_turn`.
    pub allow_chain_pass: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            fuki_mode: false,
            allow_chain_pass: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    // Session lifecycle
    pub inactivity_timeout_secs: u64,
    pub session_code_len: usize,

    // Rules for newly created sessions
    pub rules: RulesConfig,
}

impl StoreConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 30 * 60,
            session_code_len: 6,
            rules: RulesConfig::default(),
        }
    }
}
