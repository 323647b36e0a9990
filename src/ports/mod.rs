//! Ports: contracts the engine consumes.
//!
//! The text-generation service and the durable store live behind these
//! traits; adapters implement them.

mod game_store;
mod generator;

pub use game_store::{GameStore, StoreError};
pub use generator::{ChatMessage, ChatRequest, ChatRole, GeneratorError, TextGenerator};
