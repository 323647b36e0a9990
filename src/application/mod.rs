//! Application layer: agents and the per-turn orchestrator.

mod compactor;
mod doorman;
mod game;
mod judge;
mod prompts;
mod structured;

pub use compactor::MemoryCompactor;
pub use doorman::Doorman;
pub use game::{GameHistory, GameOpened, GameService, GameStatus, TurnOutcome};
pub use judge::{Judge, JudgeVerdict};
pub use prompts::OPENING_LINE;
pub use structured::StructuredOutputClient;
