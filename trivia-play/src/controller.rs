//! Game progression state machine.
//!
//! A [`GameController`] owns the client-side copy of one trivia session and
//! moves it through the phases of a game in response to player intents.
//! Every intent takes `&mut self`, so at most one gateway call is in flight
//! per controller. The screen layer reads a [`GameSnapshot`] after each
//! intent.

use std::time::{Duration, Instant};

use trivia_client::{
    AnswerOutcome, AnswerSubmission, CatalogGateway, ClientError, ExternalQuery, Question,
    SessionGateway, SessionProgress, SessionRecord, TriviaSummary,
};

use crate::catalog;
use crate::clock::Clock;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::reconciler::CompletionReconciler;
use crate::resume::{display_pointer, plan_resume, ResumePlan};
use crate::session::GameSession;
use crate::timer::QuestionTimer;

/// Where trivias come from when browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    /// Trivias authored on this platform.
    Own,
    /// Trivias imported from an external question bank.
    External,
}

/// Answer result on screen, and when the player may move on.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub outcome: AnswerOutcome,
    pub ready_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayState {
    Answering,
    Feedback(Feedback),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    TypeSelection,
    GameTypeBrowse {
        game_type: GameType,
        trivias: Vec<TriviaSummary>,
    },
    InProgressSessions { sessions: Vec<SessionRecord> },
    SessionConflict { active: SessionRecord },
    Playing(PlayState),
    Completed,
}

/// Data-free discriminant of [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    TypeSelection,
    GameTypeBrowse,
    InProgressSessions,
    SessionConflict,
    Answering,
    Feedback,
    Completed,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::TypeSelection => PhaseKind::TypeSelection,
            Phase::GameTypeBrowse { .. } => PhaseKind::GameTypeBrowse,
            Phase::InProgressSessions { .. } => PhaseKind::InProgressSessions,
            Phase::SessionConflict { .. } => PhaseKind::SessionConflict,
            Phase::Playing(PlayState::Answering) => PhaseKind::Answering,
            Phase::Playing(PlayState::Feedback(_)) => PhaseKind::Feedback,
            Phase::Completed => PhaseKind::Completed,
        }
    }
}

/// Result of an abandon intent. The controller always returns to type
/// selection; the variant says what the backend made of it.
#[derive(Debug)]
pub enum AbandonOutcome {
    Abandoned,
    /// The session was already completed or abandoned elsewhere.
    AlreadyFinished,
    /// The backend call failed. The session may still be in progress
    /// server-side.
    Unconfirmed(GameError),
}

/// Read-only view of the controller for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub phase: PhaseKind,
    pub game_type: Option<GameType>,
    pub trivias: Vec<TriviaSummary>,
    pub session: Option<GameSession>,
    pub question: Option<Question>,
    pub selected_option: Option<String>,
    pub elapsed_seconds: u32,
    pub feedback: Option<AnswerOutcome>,
    pub can_advance: bool,
    pub advance_in: Option<Duration>,
    pub in_progress: Vec<SessionRecord>,
    pub active_session: Option<SessionRecord>,
    pub error: Option<String>,
}

pub struct GameController<G, C> {
    gateway: G,
    clock: C,
    config: GameConfig,
    phase: Phase,
    session: Option<GameSession>,
    question: Option<Question>,
    selected_option: Option<String>,
    timer: QuestionTimer,
    error: Option<String>,
}

impl<G, C> GameController<G, C>
where
    G: SessionGateway,
    C: Clock,
{
    pub fn new(gateway: G, clock: C, config: GameConfig) -> Self {
        Self {
            gateway,
            clock,
            config,
            phase: Phase::TypeSelection,
            session: None,
            question: None,
            selected_option: None,
            timer: QuestionTimer::new(),
            error: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let now = self.clock.now();
        let advance_in = self.advance_remaining();
        let (game_type, trivias) = match &self.phase {
            Phase::GameTypeBrowse { game_type, trivias } => (Some(*game_type), trivias.clone()),
            _ => (None, Vec::new()),
        };
        let (feedback, in_progress, active_session) = match &self.phase {
            Phase::Playing(PlayState::Feedback(f)) => (Some(f.outcome.clone()), Vec::new(), None),
            Phase::InProgressSessions { sessions } => (None, sessions.clone(), None),
            Phase::SessionConflict { active } => (None, Vec::new(), Some(active.clone())),
            _ => (None, Vec::new(), None),
        };

        GameSnapshot {
            phase: self.phase.kind(),
            game_type,
            trivias,
            session: self.session.clone(),
            question: self.question.clone(),
            selected_option: self.selected_option.clone(),
            elapsed_seconds: self.timer.elapsed_secs(now),
            feedback,
            can_advance: advance_in == Some(Duration::ZERO),
            advance_in,
            in_progress,
            active_session,
            error: self.error.clone(),
        }
    }

    // ---- Selection intents ----

    pub fn select_game_type(&mut self, game_type: GameType) -> GameResult<()> {
        match self.phase.kind() {
            PhaseKind::TypeSelection | PhaseKind::GameTypeBrowse => {
                self.transition(Phase::GameTypeBrowse {
                    game_type,
                    trivias: Vec::new(),
                });
                Ok(())
            }
            _ => self.reject("select a game type"),
        }
    }

    /// Leave a browsing or completed screen. Use [`Self::abandon`] or
    /// [`Self::save_and_exit`] to leave a game in progress.
    pub fn back_to_selection(&mut self) -> GameResult<()> {
        if matches!(self.phase, Phase::Playing(_)) {
            return self.reject("go back to selection");
        }
        self.discard_session();
        self.transition(Phase::TypeSelection);
        Ok(())
    }

    /// Ask the backend for an in-progress session before starting a new one.
    /// Returns whether one was found, in which case the controller moves to
    /// the conflict screen.
    pub async fn check_active_session(&mut self) -> GameResult<bool> {
        if !matches!(
            self.phase.kind(),
            PhaseKind::TypeSelection | PhaseKind::GameTypeBrowse
        ) {
            return self.reject("check for an active session");
        }

        match self.gateway.current_session().await {
            Ok(active) if !active.status.is_terminal() => {
                tracing::info!(session_id = %active.session_id, "found active session");
                self.transition(Phase::SessionConflict { active });
                Ok(true)
            }
            Ok(_) | Err(ClientError::NoActiveSession) => Ok(false),
            Err(e) => self.fail(e.into()),
        }
    }

    pub async fn continue_active_session(&mut self) -> GameResult<()> {
        let active = match &self.phase {
            Phase::SessionConflict { active } => active.clone(),
            _ => return self.reject("continue the active session"),
        };
        self.error = None;
        self.resume_from_record(active).await
    }

    pub fn dismiss_active_session(&mut self) -> GameResult<()> {
        if self.phase.kind() != PhaseKind::SessionConflict {
            return self.reject("dismiss the active session");
        }
        self.transition(Phase::TypeSelection);
        Ok(())
    }

    pub async fn view_in_progress_sessions(&mut self) -> GameResult<()> {
        if !matches!(
            self.phase.kind(),
            PhaseKind::TypeSelection | PhaseKind::InProgressSessions
        ) {
            return self.reject("list in-progress sessions");
        }

        match self.gateway.in_progress_sessions().await {
            Ok(sessions) => {
                tracing::debug!(count = sessions.len(), "loaded in-progress sessions");
                self.transition(Phase::InProgressSessions { sessions });
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    // ---- Game lifecycle intents ----

    pub async fn start_game(&mut self, trivia_id: &str) -> GameResult<()> {
        if self.phase.kind() != PhaseKind::GameTypeBrowse {
            return self.reject("start a game");
        }
        self.error = None;

        let record = match self.gateway.create_session(trivia_id).await {
            Ok(record) => record,
            Err(e) => return self.fail(e.into()),
        };
        tracing::info!(
            session_id = %record.session_id,
            trivia_id,
            total_questions = record.total_questions,
            "session started"
        );

        let first = display_pointer(record.answered_count);
        self.adopt(&record);
        self.transition(Phase::Playing(PlayState::Answering));
        self.load_question(first).await
    }

    pub async fn resume_session(&mut self, session_id: &str) -> GameResult<()> {
        if !matches!(
            self.phase.kind(),
            PhaseKind::TypeSelection | PhaseKind::InProgressSessions | PhaseKind::SessionConflict
        ) {
            return self.reject("resume a session");
        }
        self.error = None;

        match self.gateway.session_by_id(session_id).await {
            Ok(record) => self.resume_from_record(record).await,
            Err(e) => {
                self.transition(Phase::TypeSelection);
                self.fail(e.into())
            }
        }
    }

    /// Retry loading the question the pointer names, after a failed load.
    /// Once every question is answered there is nothing to load, so this
    /// retries completion instead.
    pub async fn reload_question(&mut self) -> GameResult<()> {
        if self.phase.kind() != PhaseKind::Answering {
            return self.reject("reload the question");
        }
        let (pointer, all_answered) = match &self.session {
            Some(session) => (session.current_question_pointer, session.all_answered()),
            None => return self.reject("reload the question"),
        };
        self.error = None;
        if all_answered {
            return self.finish().await;
        }
        self.load_question(pointer).await
    }

    pub fn select_option(&mut self, option_id: &str) -> GameResult<()> {
        if self.phase.kind() != PhaseKind::Answering {
            return self.reject("select an option");
        }
        let known = match &self.question {
            Some(question) => question.has_option(option_id),
            None => return self.reject("select an option"),
        };
        if !known {
            return self.fail(GameError::UnknownOption(option_id.to_string()));
        }
        self.selected_option = Some(option_id.to_string());
        Ok(())
    }

    pub async fn submit_answer(&mut self) -> GameResult<()> {
        if self.phase.kind() != PhaseKind::Answering {
            return self.reject("submit an answer");
        }
        let (session_id, question_id) = match (&self.session, &self.question) {
            (Some(session), Some(question)) => {
                (session.session_id.clone(), question.question_id.clone())
            }
            _ => return self.reject("submit an answer"),
        };
        let selected_option_id = match self.selected_option.clone() {
            Some(option) => option,
            None => return self.fail(GameError::NoOptionSelected),
        };

        let now = self.clock.now();
        self.timer.pause(now);
        let submission = AnswerSubmission {
            question_id,
            selected_option_id,
            time_taken_seconds: self.timer.elapsed_secs(now),
        };
        self.error = None;

        match self.gateway.submit_answer(&session_id, &submission).await {
            Ok(outcome) => {
                self.record_outcome(&outcome, submission.time_taken_seconds);
                let delay = if outcome.is_last() {
                    self.config.final_feedback_delay
                } else {
                    self.config.feedback_delay
                };
                tracing::info!(
                    session_id = %session_id,
                    question_id = %submission.question_id,
                    is_correct = outcome.is_correct,
                    points = outcome.points_earned,
                    "answer recorded"
                );
                let ready_at = self.clock.now() + delay;
                self.transition(Phase::Playing(PlayState::Feedback(Feedback {
                    outcome,
                    ready_at,
                })));
                Ok(())
            }
            Err(e) if e.is_already_terminal() => self.settle_finished(&session_id, e).await,
            Err(e) => {
                self.timer.resume(self.clock.now());
                self.fail(e.into())
            }
        }
    }

    /// Time left before [`Self::advance`] is allowed, while feedback is on
    /// screen.
    pub fn advance_remaining(&self) -> Option<Duration> {
        match &self.phase {
            Phase::Playing(PlayState::Feedback(f)) => {
                Some(f.ready_at.saturating_duration_since(self.clock.now()))
            }
            _ => None,
        }
    }

    pub fn can_advance(&self) -> bool {
        self.advance_remaining() == Some(Duration::ZERO)
    }

    /// Move past the feedback screen: load the next question, or complete
    /// the session after the last one. Fails with `FeedbackPending` while
    /// the feedback countdown is running.
    pub async fn advance(&mut self) -> GameResult<()> {
        let feedback = match &self.phase {
            Phase::Playing(PlayState::Feedback(f)) => f.clone(),
            _ => return self.reject("advance"),
        };
        let remaining = feedback.ready_at.saturating_duration_since(self.clock.now());
        if !remaining.is_zero() {
            return Err(GameError::FeedbackPending { remaining });
        }

        let total = self.session.as_ref().map_or(0, |s| s.total_questions);
        match feedback.outcome.next_question {
            Some(next) if next <= total => self.load_question(next).await,
            Some(next) => {
                tracing::warn!(next, total, "next question out of range, completing");
                self.finish().await
            }
            None => self.finish().await,
        }
    }

    /// Sleep out the feedback countdown, then advance.
    pub async fn wait_and_advance(&mut self) -> GameResult<()> {
        if let Some(remaining) = self.advance_remaining() {
            if !remaining.is_zero() {
                self.clock.sleep(remaining).await;
            }
        }
        self.advance().await
    }

    /// Run completion explicitly, e.g. after a completion timeout.
    pub async fn complete_now(&mut self) -> GameResult<()> {
        if !matches!(self.phase, Phase::Playing(_)) {
            return self.reject("complete the session");
        }
        self.error = None;
        self.finish().await
    }

    pub async fn abandon(&mut self) -> GameResult<AbandonOutcome> {
        if !matches!(self.phase, Phase::Playing(_)) {
            return self.reject("abandon");
        }
        let session_id = match &self.session {
            Some(session) => session.session_id.clone(),
            None => return self.reject("abandon"),
        };

        let result = self.gateway.abandon_session(&session_id).await;
        self.discard_session();
        self.transition(Phase::TypeSelection);

        match result {
            Ok(()) => {
                tracing::info!(session_id = %session_id, "session abandoned");
                self.error = None;
                Ok(AbandonOutcome::Abandoned)
            }
            Err(e) if e.is_already_terminal() => {
                tracing::info!(session_id = %session_id, "session was already finished");
                self.error = None;
                Ok(AbandonOutcome::AlreadyFinished)
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "abandon not confirmed");
                self.error = Some(format!("abandon not confirmed: {e}"));
                Ok(AbandonOutcome::Unconfirmed(e.into()))
            }
        }
    }

    /// Leave the game without touching the backend. Returns the session id
    /// to resume later.
    pub fn save_and_exit(&mut self) -> GameResult<String> {
        if !matches!(self.phase, Phase::Playing(_)) {
            return self.reject("save and exit");
        }
        let session_id = match &self.session {
            Some(session) => session.session_id.clone(),
            None => return self.reject("save and exit"),
        };
        tracing::info!(session_id = %session_id, "saved for later");
        self.discard_session();
        self.transition(Phase::TypeSelection);
        Ok(session_id)
    }

    pub fn play_again(&mut self) -> GameResult<()> {
        if self.phase.kind() != PhaseKind::Completed {
            return self.reject("play again");
        }
        self.discard_session();
        self.error = None;
        self.transition(Phase::TypeSelection);
        Ok(())
    }

    // ---- Internals ----

    async fn resume_from_record(&mut self, record: SessionRecord) -> GameResult<()> {
        tracing::info!(
            session_id = %record.session_id,
            answered = record.answered_count,
            total = record.total_questions,
            status = record.status.as_str(),
            "resuming session"
        );
        self.adopt(&record);

        match plan_resume(&record) {
            ResumePlan::Finished => {
                self.transition(Phase::Completed);
                Ok(())
            }
            ResumePlan::Complete => {
                self.transition(Phase::Playing(PlayState::Answering));
                self.finish().await
            }
            ResumePlan::Fetch(number) => {
                self.transition(Phase::Playing(PlayState::Answering));
                let result = self.load_question(number).await;
                if result.is_err() {
                    self.discard_session();
                    self.transition(Phase::TypeSelection);
                }
                result
            }
        }
    }

    fn adopt(&mut self, record: &SessionRecord) {
        self.session = Some(GameSession::from_record(record));
        self.question = None;
        self.selected_option = None;
        self.timer.reset();
    }

    fn discard_session(&mut self) {
        self.session = None;
        self.question = None;
        self.selected_option = None;
        self.timer.reset();
    }

    /// Fetch question `number` and show it. On failure the current phase and
    /// question stay as they were.
    async fn load_question(&mut self, number: u32) -> GameResult<()> {
        let session_id = match &self.session {
            Some(session) => session.session_id.clone(),
            None => return self.reject("load a question"),
        };

        let question = match self.gateway.question(&session_id, number).await {
            Ok(question) => question,
            Err(e) => return self.fail(GameError::from_question_load(e)),
        };
        if question.options.is_empty() {
            return self.fail(GameError::DataIntegrity(format!(
                "question {number} has no options"
            )));
        }
        tracing::debug!(session_id = %session_id, number, "question loaded");

        if let Some(session) = self.session.as_mut() {
            session.point_at(number);
        }
        self.question = Some(question);
        self.selected_option = None;
        self.timer.restart(self.clock.now());
        self.transition(Phase::Playing(PlayState::Answering));
        Ok(())
    }

    fn record_outcome(&mut self, outcome: &AnswerOutcome, seconds: u32) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let progress = outcome.progress.unwrap_or(SessionProgress {
            answered_count: session.current_question_pointer,
            correct_answers: session.correct_answers + u32::from(outcome.is_correct),
            total_score: session.total_score + outcome.points_earned,
        });
        session.apply_progress(&progress);
        session.add_time_spent(seconds);
    }

    /// Run the completion reconciler and move to `Completed` on success.
    async fn finish(&mut self) -> GameResult<()> {
        let session_id = match &self.session {
            Some(session) => session.session_id.clone(),
            None => return self.reject("complete the session"),
        };

        let result = CompletionReconciler::new(&self.gateway, &self.clock, self.config.completion)
            .complete(&session_id)
            .await;
        match result {
            Ok(record) => {
                if let Some(session) = self.session.as_mut() {
                    session.apply_record(&record);
                }
                self.timer.reset();
                self.transition(Phase::Completed);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// The backend says the session is already over. Fetch its final state
    /// and show it; surface the conflict only if that fetch does not confirm.
    async fn settle_finished(&mut self, session_id: &str, conflict: ClientError) -> GameResult<()> {
        tracing::info!(session_id, "session finished elsewhere, fetching final state");
        match self.gateway.session_by_id(session_id).await {
            Ok(record) if record.status.is_terminal() => {
                if let Some(session) = self.session.as_mut() {
                    session.apply_record(&record);
                }
                self.timer.reset();
                self.transition(Phase::Completed);
                Ok(())
            }
            Ok(_) | Err(_) => {
                self.timer.resume(self.clock.now());
                self.fail(conflict.into())
            }
        }
    }

    fn transition(&mut self, next: Phase) {
        let from = self.phase.kind();
        let to = next.kind();
        if from != to {
            tracing::debug!(?from, ?to, "phase transition");
        }
        self.phase = next;
    }

    fn reject<T>(&mut self, intent: &'static str) -> GameResult<T> {
        self.fail(GameError::InvalidIntent {
            phase: self.phase.kind(),
            intent,
        })
    }

    fn fail<T>(&mut self, err: GameError) -> GameResult<T> {
        tracing::warn!(phase = ?self.phase.kind(), error = %err, "intent failed");
        self.error = Some(err.to_string());
        Err(err)
    }
}

impl<G, C> GameController<G, C>
where
    G: SessionGateway + CatalogGateway,
    C: Clock,
{
    /// Fill the browse screen with the platform's published trivias.
    pub async fn load_trivias(&mut self) -> GameResult<()> {
        if !matches!(
            self.phase,
            Phase::GameTypeBrowse {
                game_type: GameType::Own,
                ..
            }
        ) {
            return self.reject("list trivias");
        }

        match self.gateway.published_trivias().await {
            Ok(trivias) => {
                tracing::debug!(count = trivias.len(), "loaded trivias");
                self.error = None;
                self.transition(Phase::GameTypeBrowse {
                    game_type: GameType::Own,
                    trivias,
                });
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Import a trivia from the external question bank and start playing it.
    /// When the import fails the controller stays on the browse screen.
    pub async fn start_external_game(&mut self, query: &ExternalQuery) -> GameResult<()> {
        if !matches!(
            self.phase,
            Phase::GameTypeBrowse {
                game_type: GameType::External,
                ..
            }
        ) {
            return self.reject("start an external game");
        }
        self.error = None;

        let trivia = match catalog::import_external(&self.gateway, query).await {
            Ok(trivia) => trivia,
            Err(e) => return self.fail(e),
        };
        self.start_game(&trivia.trivia_id).await
    }
}
