//! Adapters: concrete implementations of the ports.

mod generator;
mod store;

pub use generator::{MockGenerator, OpenAiConfig, OpenAiGenerator};
pub use store::InMemoryStore;
