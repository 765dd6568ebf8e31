//! RefinementSession - the finite-state orchestrator
//!
//! ```text
//!   Idle --start--> Loading --refining--> Refining --submit--> Loading
//!                      |                                          |
//!                      +--complete--> Final --acknowledge--> Idle |
//!                      +--failure---> Error --acknowledge--> Idle |
//! ```
//!
//! Every transition is published before the next await point, so `Loading`
//! is always observable. `start` and `submit` never return while the session
//! is still `Loading`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::input::IdeaSanitizer;
use super::state::{SessionError, SessionState};
use crate::collab::{CredentialProvider, HistoryStore};
use crate::config::Config;
use crate::context::{ContextBuilder, ContextError};
use crate::domain::{
    AnswerSubmission, ConversationContext, NO_ANSWER, OrchestrationResult, Preferences, PromptHistoryItem,
    RefinementTurn,
};
use crate::error::RefineError;
use crate::events::{EventEmitter, Telemetry};
use crate::llm::{GenerationRequest, LlmClient};
use crate::repair;
use crate::retry::{RetryController, RetryPolicy, Sleeper, TokioSleeper};

/// Per-session settings
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub model: String,
    pub max_output_tokens: u32,
    pub preferences: Preferences,
    pub retry: RetryPolicy,
    /// Replaces the built-in base system instruction
    pub base_instruction: Option<String>,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm.model.clone(),
            max_output_tokens: config.llm.max_output_tokens,
            preferences: config.session.preferences(),
            retry: config.retry.policy(),
            base_instruction: config.session.base_instruction.clone(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives one refinement conversation at a time
pub struct RefinementSession {
    client: Arc<dyn LlmClient>,
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn HistoryStore>,
    emitter: EventEmitter,
    builder: ContextBuilder,
    retry: RetryController,
    options: SessionOptions,
    sanitizer: IdeaSanitizer,
    state: SessionState,
    context: Option<ConversationContext>,
    history: Vec<PromptHistoryItem>,
}

impl RefinementSession {
    /// Create an idle session and load the stored history.
    ///
    /// An unreadable history is logged and replaced by an empty one.
    pub fn new(
        client: Arc<dyn LlmClient>,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn HistoryStore>,
        telemetry: Arc<dyn Telemetry>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let session_id = Uuid::now_v7().to_string();
        debug!(%session_id, model = %options.model, "RefinementSession::new: called");

        let mut builder = ContextBuilder::new()?;
        if let Some(base) = &options.base_instruction {
            builder = builder.with_base_instruction(base.clone());
        }
        let sanitizer = IdeaSanitizer::new().map_err(ContextError::Pattern)?;
        let history = match store.load() {
            Ok(history) => history,
            Err(e) => {
                error!(error = %e, "RefinementSession::new: history unreadable, starting empty");
                Vec::new()
            }
        };
        debug!(entries = history.len(), "RefinementSession::new: history loaded");

        Ok(Self {
            client,
            credentials,
            store,
            emitter: EventEmitter::new(telemetry, session_id),
            builder,
            retry: RetryController::new(options.retry.clone(), Arc::new(TokioSleeper)),
            options,
            sanitizer,
            state: SessionState::Idle,
            context: None,
            history,
        })
    }

    /// Replace the sleeper used between retries
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.retry = RetryController::new(self.options.retry.clone(), sleeper);
        self
    }

    pub fn session_id(&self) -> &str {
        self.emitter.session_id()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The active conversation, if any
    pub fn context(&self) -> Option<&ConversationContext> {
        self.context.as_ref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Begin a conversation from a raw idea
    pub async fn start(&mut self, idea: &str) -> Result<&SessionState, SessionError> {
        debug!(idea_len = idea.len(), "start: called");
        self.require(matches!(self.state, SessionState::Idle), "start a refinement")?;

        let idea = self.sanitizer.accept(idea)?;

        self.context = Some(ConversationContext::new(idea, self.options.preferences.clone()));
        self.orchestrate().await;
        Ok(&self.state)
    }

    /// Answer the current batch of questions and request the next step
    pub async fn submit(&mut self, answers: Vec<AnswerSubmission>) -> Result<&SessionState, SessionError> {
        debug!(count = answers.len(), "submit: called");
        let SessionState::Refining { questions } = &self.state else {
            return Err(self.invalid("submit answers"));
        };
        let Some(context) = &self.context else {
            return Err(self.invalid("submit answers"));
        };

        let mut given: HashMap<&str, &str> = HashMap::new();
        for submission in &answers {
            if !questions.iter().any(|q| q.id == submission.question_id) {
                return Err(SessionError::UnknownQuestion(submission.question_id.clone()));
            }
            given.insert(submission.question_id.as_str(), submission.answer.trim());
        }

        let round = context.round();
        let mut batch = Vec::with_capacity(questions.len());
        for question in questions {
            let answer = given.get(question.id.as_str()).copied().unwrap_or_default();
            let answer = if answer.is_empty() {
                if question.required {
                    return Err(SessionError::MissingAnswer(question.id.clone()));
                }
                NO_ANSWER
            } else {
                answer
            };
            batch.push(RefinementTurn::record(question, answer, round));
        }

        if let Some(context) = self.context.as_mut() {
            context.advance(batch);
        }
        self.orchestrate().await;
        Ok(&self.state)
    }

    /// Leave `Final` or `Error` and return to `Idle`
    pub fn acknowledge(&mut self) -> Result<&SessionState, SessionError> {
        debug!(state = %self.state, "acknowledge: called");
        self.require(self.state.is_terminal(), "acknowledge")?;
        self.context = None;
        self.transition(SessionState::Idle);
        Ok(&self.state)
    }

    /// Completed refinements, newest first
    pub fn history(&self) -> &[PromptHistoryItem] {
        &self.history
    }

    pub fn view_history(&self, id: &str) -> Option<&PromptHistoryItem> {
        self.history.iter().find(|item| item.id == id)
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete_history(&mut self, id: &str) -> Result<bool, SessionError> {
        debug!(%id, "delete_history: called");
        let before = self.history.len();
        self.history.retain(|item| item.id != id);
        if self.history.len() == before {
            return Ok(false);
        }
        self.store.save(&self.history)?;
        info!(%id, remaining = self.history.len(), "History entry deleted");
        Ok(true)
    }

    pub fn clear_history(&mut self) -> Result<(), SessionError> {
        debug!(entries = self.history.len(), "clear_history: called");
        self.history.clear();
        self.store.save(&self.history)?;
        info!("History cleared");
        Ok(())
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), SessionError> {
        if allowed { Ok(()) } else { Err(self.invalid(action)) }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        warn!(action, state = %self.state, "Rejected operation");
        SessionError::InvalidTransition {
            action,
            state: self.state.label(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        let round = self.context.as_ref().map(|c| c.round()).unwrap_or(1);
        info!(from = %self.state, to = %next, round, "Session transition");
        self.state = next;
        self.emitter.session_changed(self.state.label(), round);
    }

    /// Run one request through retry and repair, then settle the state
    async fn orchestrate(&mut self) {
        self.transition(SessionState::Loading);

        let outcome = self.attempt().await;
        match &outcome {
            Ok(result) => self.emitter.result_ready(result.status()),
            Err(e) => self.emitter.result_ready(e.kind().as_str()),
        }

        let next = match outcome {
            Ok(OrchestrationResult::Refining { questions }) => SessionState::Refining { questions },
            Ok(OrchestrationResult::Complete {
                prompts,
                confidence,
                approach,
                next_steps,
            }) => {
                self.record_history(&prompts);
                SessionState::Final {
                    prompts,
                    confidence,
                    approach,
                    next_steps,
                }
            }
            Ok(OrchestrationResult::Error { message, kind }) => {
                warn!(%kind, %message, "Model reported an error");
                SessionState::Error { kind, message }
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Orchestration failed");
                SessionState::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };
        self.transition(next);
    }

    async fn attempt(&self) -> Result<OrchestrationResult, RefineError> {
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| RefineError::Unknown("no active conversation".to_string()))?;

        let Some(credential) = self.credentials.credential() else {
            warn!("attempt: no credential configured");
            return Err(RefineError::AuthMissing {
                hint: self.credentials.hint(),
            });
        };

        let built = self
            .builder
            .build(context)
            .map_err(|e| RefineError::Unknown(e.to_string()))?;
        self.emitter
            .request_built(context.round(), built.instruction.len(), built.text.len());

        let request = GenerationRequest::new(
            self.options.model.clone(),
            built.text,
            built.instruction,
            self.options.max_output_tokens,
        );

        let client = &self.client;
        let emitter = &self.emitter;
        let request = &request;
        let credential = credential.as_str();
        let idea = context.idea();

        self.retry
            .run(emitter, move |attempt| async move {
                debug!(attempt, "attempt: sending request");
                let raw = client.complete(credential, request).await.map_err(RefineError::from)?;
                repair::repair(&raw, idea, emitter)
            })
            .await
    }

    fn record_history(&mut self, prompts: &[String]) {
        let Some(context) = &self.context else {
            return;
        };
        let item = PromptHistoryItem::new(context.idea(), context.turns().to_vec(), prompts.to_vec());
        let id = item.id.clone();
        self.history.insert(0, item);

        match self.store.save(&self.history) {
            Ok(()) => self.emitter.history_saved(&id, self.history.len()),
            Err(e) => error!(error = %e, "Failed to persist history"),
        }
    }
}
