//! The turn orchestrator.
//!
//! One accepted player message drives the whole pipeline: validation,
//! safety screening, judging, state resolution, compaction, reply
//! generation, the entry gate, and a single atomic commit. Turns within a
//! session are serialized through a per-session lock; different sessions
//! proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::compactor::MemoryCompactor;
use super::doorman::Doorman;
use super::judge::Judge;
use super::prompts::OPENING_LINE;
use super::structured::StructuredOutputClient;
use crate::config::AppConfig;
use crate::domain::{
    recent_window, turn_count, DomainError, EntryGate, GameSession, GameState, MessageRecord,
    SafetyCategory, SafetyScreen, ScoreEngine,
};
use crate::ports::{GameStore, StoreError, TextGenerator};

const SELF_HARM_REPLY: &str = "*Viktor's expression hardens, then he steps closer, voice lower.* \
     No. Threats don't get you in. If you're thinking about harming yourself, \
     I'm calling for help right now—step aside with me and breathe. \
     If you're in immediate danger, call your local emergency number.";

const VIOLENT_THREAT_REPLY: &str = "*Viktor's face goes cold.* That's a threat. You're done here. \
     Step away from the rope—security will deal with this.";

const SELF_HARM_REASONING: &str =
    "User threatened self-harm to coerce entry (safety violation).";
const VIOLENT_THREAT_REASONING: &str =
    "User used threats, violence, or blackmail to coerce entry (safety violation).";
const INJECTION_REASONING: &str = "Prompt injection attempt (explicit rule violation).";
const JUDGE_UNAVAILABLE_REASONING: &str = "Judge unavailable; applied neutral score.";

/// A freshly opened or resumed game.
#[derive(Debug, Clone, Serialize)]
pub struct GameOpened {
    pub session_id: Uuid,
    pub reply: String,
    pub score: i32,
    pub state: GameState,
}

/// Result of one accepted turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session_id: Uuid,
    pub reply: String,
    pub score_delta: i32,
    pub score: i32,
    pub state: GameState,
}

/// Session snapshot without the transcript.
#[derive(Debug, Clone, Serialize)]
pub struct GameStatus {
    pub session_id: Uuid,
    pub score: i32,
    pub state: GameState,
    pub turn: u32,
    pub created_at: DateTime<Utc>,
}

/// Full transcript of a session.
#[derive(Debug, Clone, Serialize)]
pub struct GameHistory {
    pub session_id: Uuid,
    pub score: i32,
    pub state: GameState,
    pub messages: Vec<MessageRecord>,
}

/// Owns the per-turn pipeline. Everything behind it is injected: the store
/// and generator are ports, the rules come from configuration.
pub struct GameService {
    store: Arc<dyn GameStore>,
    judge: Judge,
    doorman: Doorman,
    compactor: MemoryCompactor,
    engine: ScoreEngine,
    starting_score: i32,
    recent_window: u32,
    max_message_chars: usize,
    max_message_words: usize,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl GameService {
    /// Wires the agents from the injected ports and configuration.
    /// Configuration is expected to be validated before this point.
    pub fn new(
        store: Arc<dyn GameStore>,
        generator: Arc<dyn TextGenerator>,
        config: &AppConfig,
    ) -> Self {
        let client = StructuredOutputClient::new(generator.clone(), config.llm.json_retries);
        Self {
            store,
            judge: Judge::new(client.clone(), &config.llm.judge_model),
            doorman: Doorman::new(generator, &config.llm.doorman_model),
            compactor: MemoryCompactor::new(
                client,
                config.llm.compactor_model(),
                config.game.compaction_threshold,
                config.game.recent_window,
            ),
            engine: ScoreEngine::new(config.game.win_threshold, config.game.lose_threshold),
            starting_score: config.game.starting_score,
            recent_window: config.game.recent_window,
            max_message_chars: config.game.max_message_chars,
            max_message_words: config.game.max_message_words,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a new session with Viktor's scripted opening line.
    pub async fn start_game(&self) -> Result<GameOpened, DomainError> {
        let session = GameSession::new(self.starting_score);
        self.store
            .create_session(&session)
            .await
            .map_err(|err| map_store_error(err, &session.id))?;
        self.store
            .commit_turn(&session, &[MessageRecord::doorman(OPENING_LINE)])
            .await
            .map_err(|err| map_store_error(err, &session.id))?;

        info!(session_id = %session.id, "game started");
        Ok(GameOpened {
            session_id: session.id,
            reply: OPENING_LINE.to_string(),
            score: session.score,
            state: session.state,
        })
    }

    /// Reopens an existing session, returning Viktor's latest line so the
    /// conversation can be re-rendered.
    pub async fn resume_game(&self, session_id: &Uuid) -> Result<GameOpened, DomainError> {
        let session = self.load_session(session_id).await?;
        let last = self
            .store
            .last_doorman_message(session_id)
            .await
            .map_err(|err| map_store_error(err, session_id))?;
        Ok(GameOpened {
            session_id: session.id,
            reply: last
                .map(|record| record.content)
                .unwrap_or_else(|| OPENING_LINE.to_string()),
            score: session.score,
            state: session.state,
        })
    }

    /// One full turn: screen, judge, resolve, reply, commit.
    ///
    /// Nothing is persisted unless the whole turn succeeds; a reply
    /// generation failure leaves the session exactly as it was.
    pub async fn play_turn(
        &self,
        session_id: &Uuid,
        message: &str,
    ) -> Result<TurnOutcome, DomainError> {
        let message = self.validate_message(message)?;

        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut session = self.load_session(session_id).await?;
        if session.state.is_terminal() {
            return Err(DomainError::game_over(session.state));
        }

        let log = self
            .store
            .list_messages(session_id)
            .await
            .map_err(|err| map_store_error(err, session_id))?;
        let current_turn = turn_count(&log);
        let recent = recent_window(&log, current_turn, self.recent_window);
        // The judge scores against the memory as it stood when the turn
        // began; compaction below refreshes it for the reply.
        let memory = session.memory_blob_or_empty();

        // Classify, score, and resolve the new state.
        let screened = SafetyScreen::default_rules().classify(&message);
        let (delta, reasoning) = match screened {
            Some(category) => {
                warn!(session_id = %session.id, ?category, "safety screen hit");
                let reasoning = match category {
                    SafetyCategory::SelfHarmCoercion => SELF_HARM_REASONING,
                    SafetyCategory::ViolentCoercion => VIOLENT_THREAT_REASONING,
                    SafetyCategory::PromptInjection => INJECTION_REASONING,
                };
                (category.score_delta(), reasoning.to_string())
            }
            None => match self.judge.evaluate(&memory, &recent, &message).await {
                Ok(verdict) => (verdict.delta, verdict.reasoning),
                Err(err) => {
                    warn!(session_id = %session.id, error = %err, "judge failed, using neutral score");
                    (0, JUDGE_UNAVAILABLE_REASONING.to_string())
                }
            },
        };
        session.score += delta;
        session.state = match screened {
            Some(category) if category.forces_loss() => GameState::Lost,
            _ => self.engine.resolve(session.score),
        };

        self.compactor
            .maybe_compact(&mut session, &log, current_turn)
            .await;

        let reply = match screened {
            Some(SafetyCategory::SelfHarmCoercion) => SELF_HARM_REPLY.to_string(),
            Some(SafetyCategory::ViolentCoercion) => VIOLENT_THREAT_REPLY.to_string(),
            _ => {
                let directive = self.engine.directive(session.state);
                self.doorman
                    .respond(&session.memory_blob_or_empty(), &recent, &message, directive)
                    .await
                    .map_err(|err| DomainError::generator(err.to_string()))?
            }
        };
        let reply = EntryGate::enforce(session.state, &reply);

        let user_record = MessageRecord::user(message.as_str()).with_judgement(delta, reasoning);
        let doorman_record = MessageRecord::doorman(reply.as_str());
        self.store
            .commit_turn(&session, &[user_record, doorman_record])
            .await
            .map_err(|err| map_store_error(err, session_id))?;

        info!(
            session_id = %session.id,
            turn = current_turn + 1,
            score_delta = delta,
            score = session.score,
            state = %session.state,
            "turn committed"
        );
        Ok(TurnOutcome {
            session_id: session.id,
            reply,
            score_delta: delta,
            score: session.score,
            state: session.state,
        })
    }

    /// Session snapshot: score, state, and turn count.
    pub async fn get_status(&self, session_id: &Uuid) -> Result<GameStatus, DomainError> {
        let session = self.load_session(session_id).await?;
        let turn = self
            .store
            .count_user_messages(session_id)
            .await
            .map_err(|err| map_store_error(err, session_id))?;
        Ok(GameStatus {
            session_id: session.id,
            score: session.score,
            state: session.state,
            turn,
            created_at: session.created_at,
        })
    }

    /// Full ordered transcript of a session.
    pub async fn get_history(&self, session_id: &Uuid) -> Result<GameHistory, DomainError> {
        let session = self.load_session(session_id).await?;
        let messages = self
            .store
            .list_messages(session_id)
            .await
            .map_err(|err| map_store_error(err, session_id))?;
        Ok(GameHistory {
            session_id: session.id,
            score: session.score,
            state: session.state,
            messages,
        })
    }

    /// Snapshots of every known session, oldest first.
    pub async fn list_sessions(&self) -> Result<Vec<GameStatus>, DomainError> {
        let sessions = self
            .store
            .list_sessions()
            .await
            .map_err(|err| DomainError::store(err.to_string()))?;
        try_join_all(sessions.into_iter().map(|session| async move {
            let turn = self
                .store
                .count_user_messages(&session.id)
                .await
                .map_err(|err| map_store_error(err, &session.id))?;
            Ok(GameStatus {
                session_id: session.id,
                score: session.score,
                state: session.state,
                turn,
                created_at: session.created_at,
            })
        }))
        .await
    }

    fn validate_message(&self, message: &str) -> Result<String, DomainError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::validation("message", "Message cannot be empty."));
        }
        if message.chars().count() > self.max_message_chars {
            return Err(DomainError::validation(
                "message",
                format!("Message exceeds {} characters.", self.max_message_chars),
            ));
        }
        if message.split_whitespace().count() > self.max_message_words {
            return Err(DomainError::validation(
                "message",
                format!("Message exceeds {} words.", self.max_message_words),
            ));
        }
        Ok(message.to_string())
    }

    async fn load_session(&self, session_id: &Uuid) -> Result<GameSession, DomainError> {
        self.store
            .find_session(session_id)
            .await
            .map_err(|err| map_store_error(err, session_id))?
            .ok_or_else(|| DomainError::session_not_found(session_id))
    }

    async fn session_lock(&self, session_id: &Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(*session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn map_store_error(err: StoreError, session_id: &Uuid) -> DomainError {
    match err {
        StoreError::SessionNotFound => DomainError::session_not_found(session_id),
        StoreError::Backend(message) => DomainError::store(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, MockGenerator};
    use crate::domain::ErrorCode;

    fn service(generator: Arc<MockGenerator>) -> GameService {
        GameService::new(
            Arc::new(InMemoryStore::new()),
            generator,
            &AppConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_lookup() {
        let service = service(Arc::new(MockGenerator::new()));
        let err = service.play_turn(&Uuid::new_v4(), "   ").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let service = service(Arc::new(MockGenerator::new()));
        let long = "x".repeat(751);
        let err = service.play_turn(&Uuid::new_v4(), &long).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let wordy = "word ".repeat(151);
        let err = service.play_turn(&Uuid::new_v4(), &wordy).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let service = service(Arc::new(MockGenerator::new()));
        let err = service.play_turn(&Uuid::new_v4(), "hello").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn start_game_opens_with_the_scripted_line() {
        let service = service(Arc::new(MockGenerator::new()));
        let opened = service.start_game().await.unwrap();
        assert_eq!(opened.reply, OPENING_LINE);
        assert_eq!(opened.score, 30);
        assert_eq!(opened.state, GameState::Active);

        let history = service.get_history(&opened.session_id).await.unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].content, OPENING_LINE);

        // The opening line is not a turn.
        let status = service.get_status(&opened.session_id).await.unwrap();
        assert_eq!(status.turn, 0);
    }

    #[tokio::test]
    async fn resume_returns_the_latest_doorman_line() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply(r#"{"reasoning": "fine", "score": 5}"#)
                .with_reply("*Viktor nods once.* Keep talking."),
        );
        let service = service(generator);
        let opened = service.start_game().await.unwrap();
        service.play_turn(&opened.session_id, "evening").await.unwrap();

        let resumed = service.resume_game(&opened.session_id).await.unwrap();
        assert_eq!(resumed.reply, "*Viktor nods once.* Keep talking.");
        assert_eq!(resumed.score, 35);
    }
}
