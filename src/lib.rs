use wasm_bindgen::prelude::*;

pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod movegen;
pub mod rules;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod wasm;

pub use config::{RulesConfig, StoreConfig};
pub use error::{EngineError, EngineResult};
pub use store::SessionStore;

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}
