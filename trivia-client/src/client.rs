//! HTTP implementation of the trivia gateways

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult, ErrorKind};
use crate::traits::{AuthGateway, CatalogGateway, SessionGateway};
use crate::types::*;
use crate::wire::{
    decode_failure, decode_payload, WireAnswer, WireExternalCategories, WireExternalResponse,
    WireHistory, WireQuestionEnvelope, WireSession, WireTrivia,
};

/// Network client for communicating with the trivia backend
#[derive(Clone)]
pub struct TriviaClient {
    http: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl TriviaClient {
    /// Build a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        Url::parse(base_url).map_err(|e| ClientError::InvalidAddress(format!("{base_url}: {e}")))?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    /// Attach a bearer token to every subsequent request.
    pub fn with_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<&str>) {
        self.token = token.map(Arc::from);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token.as_ref()),
            None => builder,
        }
    }

    async fn execute_raw(&self, builder: RequestBuilder, path: &str) -> ClientResult<Vec<u8>> {
        tracing::debug!(path, "sending request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = decode_failure(status.as_u16(), status.canonical_reason(), &body);
            tracing::debug!(path, status = status.as_u16(), error = %err, "request failed");
            return Err(err);
        }
        Ok(body.to_vec())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> ClientResult<T> {
        let body = self.execute_raw(builder, path).await?;
        decode_payload(&body, path)
    }

    async fn fetch_session(&self, builder: RequestBuilder, path: &str) -> ClientResult<SessionRecord> {
        let wire: WireSession = self.execute(builder, path).await?;
        SessionRecord::try_from(wire)
    }
}

#[async_trait]
impl SessionGateway for TriviaClient {
    async fn create_session(&self, trivia_id: &str) -> ClientResult<SessionRecord> {
        let path = "/game-sessions";
        let body = serde_json::json!({ "trivia_id": trivia_id });
        let record = self
            .fetch_session(self.request(Method::POST, path).json(&body), path)
            .await?;

        tracing::info!(
            session_id = %record.session_id,
            trivia_id = %record.trivia_id,
            total_questions = record.total_questions,
            "session created"
        );
        Ok(record)
    }

    async fn current_session(&self) -> ClientResult<SessionRecord> {
        let path = "/game-sessions/current";
        match self.fetch_session(self.request(Method::GET, path), path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ClientError::NoActiveSession),
            other => other,
        }
    }

    async fn session_by_id(&self, session_id: &str) -> ClientResult<SessionRecord> {
        let path = format!("/game-sessions/{session_id}");
        self.fetch_session(self.request(Method::GET, &path), &path)
            .await
    }

    async fn question(&self, session_id: &str, question_number: u32) -> ClientResult<Question> {
        let path = format!("/game-sessions/{session_id}/questions/{question_number}");
        let wire: WireQuestionEnvelope = self.execute(self.request(Method::GET, &path), &path).await?;
        Question::try_from(wire)
    }

    async fn submit_answer(
        &self,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> ClientResult<AnswerOutcome> {
        let path = format!("/game-sessions/{session_id}/answer");
        let wire: WireAnswer = self
            .execute(self.request(Method::POST, &path).json(submission), &path)
            .await?;
        Ok(AnswerOutcome::from(wire))
    }

    async fn complete_session(&self, session_id: &str) -> ClientResult<SessionRecord> {
        let path = format!("/game-sessions/{session_id}/complete");
        self.fetch_session(self.request(Method::PUT, &path), &path)
            .await
    }

    async fn abandon_session(&self, session_id: &str) -> ClientResult<()> {
        let path = format!("/game-sessions/{session_id}/abandon");
        self.execute_raw(self.request(Method::PUT, &path), &path)
            .await?;
        Ok(())
    }

    async fn in_progress_sessions(&self) -> ClientResult<Vec<SessionRecord>> {
        self.session_history(&HistoryQuery::in_progress()).await
    }

    async fn session_history(&self, query: &HistoryQuery) -> ClientResult<Vec<SessionRecord>> {
        let path = "/game-sessions/history";
        let builder = self.request(Method::GET, path).query(&query.to_pairs());
        let history: WireHistory = self.execute(builder, path).await?;
        history
            .sessions
            .into_iter()
            .map(SessionRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl CatalogGateway for TriviaClient {
    async fn published_trivias(&self) -> ClientResult<Vec<TriviaSummary>> {
        let path = "/trivias";
        let builder = self
            .request(Method::GET, path)
            .query(&[("status", "published")]);
        let trivias: Vec<WireTrivia> = self.execute(builder, path).await?;
        Ok(trivias.into_iter().map(TriviaSummary::from).collect())
    }

    async fn categories(&self) -> ClientResult<Vec<Category>> {
        let path = "/categories";
        self.execute(self.request(Method::GET, path), path).await
    }

    async fn external_categories(&self) -> ClientResult<Vec<ExternalCategory>> {
        let path = "/external-api/categories";
        let wire: WireExternalCategories = self.execute(self.request(Method::GET, path), path).await?;
        Ok(wire.trivia_categories)
    }

    async fn external_questions(
        &self,
        query: &ExternalQuery,
    ) -> ClientResult<Vec<ExternalQuestion>> {
        let path = "/external-api/questions";
        let builder = self.request(Method::GET, path).query(&query.to_pairs());
        let wire: WireExternalResponse = self.execute(builder, path).await?;
        let questions = wire.into_questions()?;
        tracing::debug!(count = questions.len(), "fetched external questions");
        Ok(questions)
    }

    async fn create_trivia(&self, trivia: &NewTrivia) -> ClientResult<TriviaSummary> {
        let path = "/trivias";
        let wire: WireTrivia = self
            .execute(self.request(Method::POST, path).json(trivia), path)
            .await?;
        let created = TriviaSummary::from(wire);
        tracing::info!(trivia_id = %created.trivia_id, title = %created.title, "trivia created");
        Ok(created)
    }

    async fn create_question(&self, question: &NewQuestion) -> ClientResult<()> {
        let path = "/questions";
        self.execute_raw(self.request(Method::POST, path).json(question), path)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for TriviaClient {
    async fn login(&self, credentials: &Credentials) -> ClientResult<AuthSession> {
        let path = "/auth/login";
        self.execute(self.request(Method::POST, path).json(credentials), path)
            .await
    }

    async fn register(&self, registration: &Registration) -> ClientResult<AuthSession> {
        let path = "/auth/register";
        self.execute(self.request(Method::POST, path).json(registration), path)
            .await
    }

    async fn profile(&self) -> ClientResult<User> {
        let path = "/auth/profile";
        self.execute(self.request(Method::GET, path), path).await
    }

    fn authorize(&mut self, token: Option<&str>) {
        self.set_token(token);
    }
}
