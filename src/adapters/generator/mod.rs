//! Text generator adapters.

mod mock;
mod openai;

pub use mock::MockGenerator;
pub use openai::{OpenAiConfig, OpenAiGenerator};
