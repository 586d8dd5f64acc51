//! Gateway trait abstractions for client implementations

use crate::error::ClientResult;
use crate::types::*;
use async_trait::async_trait;

/// Session lifecycle operations against the backend.
/// Implemented by both the HTTP `TriviaClient` and `MockSessionGateway`.
///
/// Implementations never retry and never hold session state of their own.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Start a new play-through of a trivia
    async fn create_session(&self, trivia_id: &str) -> ClientResult<SessionRecord>;

    /// Get the player's current in-progress session
    async fn current_session(&self) -> ClientResult<SessionRecord>;

    /// Get a session by id
    async fn session_by_id(&self, session_id: &str) -> ClientResult<SessionRecord>;

    /// Fetch the question at a 1-based position
    async fn question(&self, session_id: &str, question_number: u32) -> ClientResult<Question>;

    /// Answer a question
    async fn submit_answer(
        &self,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> ClientResult<AnswerOutcome>;

    /// Mark the session completed
    async fn complete_session(&self, session_id: &str) -> ClientResult<SessionRecord>;

    /// Mark the session abandoned
    async fn abandon_session(&self, session_id: &str) -> ClientResult<()>;

    /// List the player's in-progress sessions
    async fn in_progress_sessions(&self) -> ClientResult<Vec<SessionRecord>>;

    /// List sessions matching a history query
    async fn session_history(&self, query: &HistoryQuery) -> ClientResult<Vec<SessionRecord>>;
}

/// Trivia catalog and the external question bank.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Published trivias of the platform's own catalog
    async fn published_trivias(&self) -> ClientResult<Vec<TriviaSummary>>;

    async fn categories(&self) -> ClientResult<Vec<Category>>;

    async fn external_categories(&self) -> ClientResult<Vec<ExternalCategory>>;

    /// Fetch questions from the external bank
    async fn external_questions(&self, query: &ExternalQuery)
        -> ClientResult<Vec<ExternalQuestion>>;

    async fn create_trivia(&self, trivia: &NewTrivia) -> ClientResult<TriviaSummary>;

    async fn create_question(&self, question: &NewQuestion) -> ClientResult<()>;
}

/// Account operations.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> ClientResult<AuthSession>;

    async fn register(&self, registration: &Registration) -> ClientResult<AuthSession>;

    /// Profile of the user owning the bearer token
    async fn profile(&self) -> ClientResult<User>;

    /// Use `token` (or none) as the bearer for subsequent calls.
    fn authorize(&mut self, _token: Option<&str>) {}
}
