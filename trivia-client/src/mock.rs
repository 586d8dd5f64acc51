//! Mock gateway implementations for testing

use crate::error::{ClientError, ClientResult};
use crate::traits::{AuthGateway, CatalogGateway, SessionGateway};
use crate::types::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Responder<A, T> = Box<dyn FnMut(A) -> ClientResult<T> + Send>;

/// Mock session gateway - only compiled in test mode or with mock feature.
///
/// Each operation answers from, in order: a configured closure, the scripted
/// in-memory backend, or `NotConfigured`. Clones share state, so a test can
/// keep a handle after moving one into a controller.
#[derive(Clone, Default)]
pub struct MockSessionGateway {
    responses: Arc<Mutex<MockResponses>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    backend: Arc<Mutex<Option<ScriptedBackend>>>,
}

#[derive(Default)]
struct MockResponses {
    create_session: Option<Responder<String, SessionRecord>>,
    current_session: Option<Responder<(), SessionRecord>>,
    session_by_id: Option<Responder<String, SessionRecord>>,
    question: Option<Responder<u32, Question>>,
    submit_answer: Option<Responder<AnswerSubmission, AnswerOutcome>>,
    complete_session: Option<Responder<String, SessionRecord>>,
    abandon_session: Option<Responder<String, ()>>,
    external_questions: Option<Responder<ExternalQuery, Vec<ExternalQuestion>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateSession {
        trivia_id: String,
    },
    CurrentSession,
    SessionById {
        session_id: String,
    },
    Question {
        session_id: String,
        question_number: u32,
    },
    SubmitAnswer {
        session_id: String,
        submission: AnswerSubmission,
    },
    CompleteSession {
        session_id: String,
    },
    AbandonSession {
        session_id: String,
    },
    InProgressSessions,
    SessionHistory {
        query: HistoryQuery,
    },
    PublishedTrivias,
    Categories,
    ExternalCategories,
    ExternalQuestions {
        query: ExternalQuery,
    },
    CreateTrivia {
        trivia: NewTrivia,
    },
    CreateQuestion {
        question: NewQuestion,
    },
}

/// A question in a scripted trivia, with the id of its correct option.
#[derive(Debug, Clone)]
pub struct ScriptedQuestion {
    pub question: Question,
    pub correct_option_id: String,
}

impl ScriptedQuestion {
    /// A multiple-choice question whose first option is correct.
    pub fn new(order: u32, text: &str, points_value: u32, options: &[&str]) -> Self {
        let options: Vec<QuestionOption> = options
            .iter()
            .enumerate()
            .map(|(i, text)| QuestionOption {
                option_id: format!("q{order}-o{}", i + 1),
                text: text.to_string(),
            })
            .collect();
        let correct_option_id = options
            .first()
            .map(|o| o.option_id.clone())
            .unwrap_or_default();

        Self {
            question: Question {
                question_id: format!("q{order}"),
                order,
                text: text.to_string(),
                question_type: QuestionType::MultipleChoice,
                points_value,
                options,
            },
            correct_option_id,
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedTrivia {
    title: String,
    difficulty: Option<Difficulty>,
    published: bool,
    questions: Vec<ScriptedQuestion>,
}

#[derive(Debug, Clone)]
struct ScriptedSession {
    record: SessionRecord,
    /// Reads that still observe the answered count before the latest answer.
    stale_reads: u32,
}

impl ScriptedSession {
    fn observed(&mut self) -> SessionRecord {
        let mut record = self.record.clone();
        if self.stale_reads > 0 {
            self.stale_reads -= 1;
            record.answered_count = record.answered_count.saturating_sub(1);
        }
        record
    }
}

/// In-memory stand-in for the backend's session rules.
#[derive(Debug, Default)]
struct ScriptedBackend {
    trivias: HashMap<String, ScriptedTrivia>,
    sessions: Vec<ScriptedSession>,
    visibility_lag: u32,
    /// Another client completes the session just before ours does.
    completion_race: bool,
    categories: Vec<Category>,
    external_categories: Vec<ExternalCategory>,
    external_bank: Vec<ExternalQuestion>,
}

impl ScriptedBackend {
    fn session_mut(&mut self, session_id: &str) -> ClientResult<&mut ScriptedSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.record.session_id == session_id)
            .ok_or_else(|| ClientError::NotFound(format!("session {session_id}")))
    }

    fn questions_of(&self, trivia_id: &str) -> ClientResult<&[ScriptedQuestion]> {
        self.trivias
            .get(trivia_id)
            .map(|t| t.questions.as_slice())
            .ok_or_else(|| ClientError::NotFound(format!("trivia {trivia_id}")))
    }

    fn terminal_conflict(status: SessionStatus) -> Option<ClientError> {
        match status {
            SessionStatus::Completed => Some(ClientError::already_completed()),
            SessionStatus::Abandoned => Some(ClientError::already_abandoned()),
            SessionStatus::InProgress => None,
        }
    }

    fn create_session(&mut self, trivia_id: &str) -> ClientResult<SessionRecord> {
        let trivia = self
            .trivias
            .get(trivia_id)
            .ok_or_else(|| ClientError::NotFound(format!("trivia {trivia_id}")))?;
        if !trivia.published {
            return Err(ClientError::Validation(format!(
                "trivia {trivia_id} is not published"
            )));
        }
        if trivia.questions.is_empty() {
            return Err(ClientError::NotFound(format!(
                "trivia {trivia_id} has no questions"
            )));
        }

        let record = SessionRecord {
            session_id: uuid::Uuid::new_v4().to_string(),
            trivia_id: trivia_id.to_string(),
            trivia_title: Some(trivia.title.clone()),
            player_id: Some("player-1".to_string()),
            status: SessionStatus::InProgress,
            answered_count: 0,
            total_questions: trivia.questions.len() as u32,
            correct_answers: 0,
            total_score: 0,
            time_spent_seconds: 0,
            started_at: Some(Utc::now()),
            completed_at: None,
        };
        self.sessions.push(ScriptedSession {
            record: record.clone(),
            stale_reads: 0,
        });
        Ok(record)
    }

    fn current_session(&mut self) -> ClientResult<SessionRecord> {
        self.sessions
            .iter()
            .rev()
            .find(|s| s.record.status == SessionStatus::InProgress)
            .map(|s| s.record.clone())
            .ok_or(ClientError::NoActiveSession)
    }

    fn session_by_id(&mut self, session_id: &str) -> ClientResult<SessionRecord> {
        Ok(self.session_mut(session_id)?.observed())
    }

    fn question(&mut self, session_id: &str, question_number: u32) -> ClientResult<Question> {
        let trivia_id = self.session_mut(session_id)?.record.trivia_id.clone();
        let questions = self.questions_of(&trivia_id)?;
        question_number
            .checked_sub(1)
            .and_then(|i| questions.get(i as usize))
            .map(|q| q.question.clone())
            .ok_or_else(|| ClientError::NotFound(format!("question {question_number}")))
    }

    fn submit_answer(
        &mut self,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> ClientResult<AnswerOutcome> {
        let lag = self.visibility_lag;
        let record = self.session_mut(session_id)?.record.clone();
        if let Some(conflict) = Self::terminal_conflict(record.status) {
            return Err(conflict);
        }

        let questions = self.questions_of(&record.trivia_id)?;
        let scripted = questions
            .iter()
            .find(|q| q.question.question_id == submission.question_id)
            .ok_or_else(|| ClientError::NotFound(format!("question {}", submission.question_id)))?;
        if !scripted.question.has_option(&submission.selected_option_id) {
            return Err(ClientError::Validation(format!(
                "option {} does not belong to question {}",
                submission.selected_option_id, submission.question_id
            )));
        }

        let is_correct = scripted.correct_option_id == submission.selected_option_id;
        let points_earned = if is_correct {
            scripted.question.points_value
        } else {
            0
        };
        let correct_option = scripted
            .question
            .options
            .iter()
            .find(|o| o.option_id == scripted.correct_option_id)
            .cloned();
        let total = questions.len() as u32;

        let session = self.session_mut(session_id)?;
        session.record.answered_count = (session.record.answered_count + 1).min(total);
        session.record.correct_answers += u32::from(is_correct);
        session.record.total_score += points_earned;
        session.record.time_spent_seconds += submission.time_taken_seconds;
        session.stale_reads = lag;

        let answered = session.record.answered_count;
        Ok(AnswerOutcome {
            is_correct,
            points_earned,
            correct_option,
            next_question: (answered < total).then_some(answered + 1),
            progress: Some(SessionProgress {
                answered_count: answered,
                correct_answers: session.record.correct_answers,
                total_score: session.record.total_score,
            }),
        })
    }

    fn complete_session(&mut self, session_id: &str) -> ClientResult<SessionRecord> {
        let race = self.completion_race;
        let session = self.session_mut(session_id)?;
        if let Some(conflict) = Self::terminal_conflict(session.record.status) {
            return Err(conflict);
        }
        if !session.observed().all_answered() {
            return Err(ClientError::not_all_answered());
        }
        session.record.status = SessionStatus::Completed;
        session.record.completed_at = Some(Utc::now());
        if race {
            return Err(ClientError::already_completed());
        }
        Ok(session.record.clone())
    }

    fn abandon_session(&mut self, session_id: &str) -> ClientResult<()> {
        let session = self.session_mut(session_id)?;
        if let Some(conflict) = Self::terminal_conflict(session.record.status) {
            return Err(conflict);
        }
        session.record.status = SessionStatus::Abandoned;
        session.record.completed_at = Some(Utc::now());
        Ok(())
    }

    fn published_trivias(&self) -> Vec<TriviaSummary> {
        let mut trivias: Vec<TriviaSummary> = self
            .trivias
            .iter()
            .filter(|(_, t)| t.published)
            .map(|(id, t)| TriviaSummary {
                trivia_id: id.clone(),
                title: t.title.clone(),
                difficulty: t.difficulty,
                category: None,
            })
            .collect();
        trivias.sort_by(|a, b| a.trivia_id.cmp(&b.trivia_id));
        trivias
    }

    fn external_questions(&self, query: &ExternalQuery) -> ClientResult<Vec<ExternalQuestion>> {
        let amount = query.amount as usize;
        if self.external_bank.len() < amount {
            return Err(ClientError::NotFound(
                "not enough external questions for this query".to_string(),
            ));
        }
        Ok(self.external_bank[..amount].to_vec())
    }

    fn create_trivia(&mut self, trivia: &NewTrivia) -> TriviaSummary {
        let trivia_id = uuid::Uuid::new_v4().to_string();
        self.trivias.insert(
            trivia_id.clone(),
            ScriptedTrivia {
                title: trivia.title.clone(),
                difficulty: Some(trivia.difficulty_level),
                published: trivia.status == "published",
                questions: Vec::new(),
            },
        );
        TriviaSummary {
            trivia_id,
            title: trivia.title.clone(),
            difficulty: Some(trivia.difficulty_level),
            category: None,
        }
    }

    fn create_question(&mut self, new: &NewQuestion) -> ClientResult<()> {
        let trivia = self
            .trivias
            .get_mut(&new.trivia_id)
            .ok_or_else(|| ClientError::NotFound(format!("trivia {}", new.trivia_id)))?;
        let order = trivia.questions.len() as u32 + 1;
        let options: Vec<QuestionOption> = new
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| QuestionOption {
                option_id: format!("q{order}-o{}", i + 1),
                text: o.text.clone(),
            })
            .collect();
        let correct_option_id = new
            .options
            .iter()
            .position(|o| o.is_correct)
            .map(|i| options[i].option_id.clone())
            .ok_or_else(|| ClientError::Validation("question has no correct option".to_string()))?;

        trivia.questions.push(ScriptedQuestion {
            question: Question {
                question_id: format!("q{order}"),
                order,
                text: new.question_text.clone(),
                question_type: new.question_type,
                points_value: new.points_value,
                options,
            },
            correct_option_id,
        });
        Ok(())
    }

    fn history(&self, query: &HistoryQuery) -> Vec<SessionRecord> {
        let limit = query.limit.unwrap_or(u32::MAX) as usize;
        self.sessions
            .iter()
            .map(|s| &s.record)
            .filter(|r| query.status.map_or(true, |st| r.status == st))
            .filter(|r| query.trivia_id.as_ref().map_or(true, |t| &r.trivia_id == t))
            .take(limit)
            .cloned()
            .collect()
    }
}

impl MockSessionGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_backend<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut ScriptedBackend),
    {
        {
            let mut backend = self.backend.lock().unwrap();
            f(backend.get_or_insert_with(ScriptedBackend::default));
        }
        self
    }

    /// Register a published trivia in the scripted backend
    pub fn with_trivia(self, trivia_id: &str, title: &str, questions: Vec<ScriptedQuestion>) -> Self {
        let trivia = ScriptedTrivia {
            title: title.to_string(),
            difficulty: None,
            published: true,
            questions,
        };
        let trivia_id = trivia_id.to_string();
        self.with_backend(move |b| {
            b.trivias.insert(trivia_id, trivia);
        })
    }

    /// Register an unpublished trivia in the scripted backend
    pub fn with_draft_trivia(self, trivia_id: &str, questions: Vec<ScriptedQuestion>) -> Self {
        let trivia = ScriptedTrivia {
            title: trivia_id.to_string(),
            difficulty: None,
            published: false,
            questions,
        };
        let trivia_id = trivia_id.to_string();
        self.with_backend(move |b| {
            b.trivias.insert(trivia_id, trivia);
        })
    }

    /// Number of reads after each answer that still see the previous
    /// answered count.
    pub fn with_visibility_lag(self, reads: u32) -> Self {
        self.with_backend(move |b| b.visibility_lag = reads)
    }

    /// Make every completion lose a race: the session ends up completed but
    /// the call fails with an already-completed conflict.
    pub fn with_completion_race(self) -> Self {
        self.with_backend(|b| b.completion_race = true)
    }

    /// Categories of the platform's own catalog
    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        self.with_backend(move |b| b.categories = categories)
    }

    /// Questions the external bank hands out, in order, under a single
    /// "General Knowledge" category.
    pub fn with_external_bank(self, questions: Vec<ExternalQuestion>) -> Self {
        self.with_backend(move |b| {
            b.external_categories = vec![ExternalCategory {
                id: 9,
                name: "General Knowledge".to_string(),
            }];
            b.external_bank = questions;
        })
    }

    /// Pre-configure with a three-question trivia `trivia-A` worth 10, 20
    /// and 30 points.
    pub fn with_standard_trivia(self) -> Self {
        self.with_trivia(
            "trivia-A",
            "Capitals",
            vec![
                ScriptedQuestion::new(1, "Capital of France?", 10, &["Paris", "Lyon", "Nice"]),
                ScriptedQuestion::new(2, "Capital of Peru?", 20, &["Lima", "Cusco"]),
                ScriptedQuestion::new(3, "Capital of Japan?", 30, &["Tokyo", "Osaka", "Kyoto"]),
            ],
        )
    }

    /// Configure create_session response
    pub fn with_create_session_response<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> ClientResult<SessionRecord> + Send + 'static,
    {
        self.responses.lock().unwrap().create_session = Some(Box::new(f));
        self
    }

    /// Configure current_session response
    pub fn with_current_session_response<F>(self, mut f: F) -> Self
    where
        F: FnMut() -> ClientResult<SessionRecord> + Send + 'static,
    {
        self.responses.lock().unwrap().current_session = Some(Box::new(move |()| f()));
        self
    }

    /// Configure session_by_id response
    pub fn with_session_by_id_response<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> ClientResult<SessionRecord> + Send + 'static,
    {
        self.responses.lock().unwrap().session_by_id = Some(Box::new(f));
        self
    }

    /// Configure question response (argument is the question number)
    pub fn with_question_response<F>(self, f: F) -> Self
    where
        F: FnMut(u32) -> ClientResult<Question> + Send + 'static,
    {
        self.responses.lock().unwrap().question = Some(Box::new(f));
        self
    }

    /// Configure submit_answer response
    pub fn with_submit_answer_response<F>(self, f: F) -> Self
    where
        F: FnMut(AnswerSubmission) -> ClientResult<AnswerOutcome> + Send + 'static,
    {
        self.responses.lock().unwrap().submit_answer = Some(Box::new(f));
        self
    }

    /// Configure complete_session response
    pub fn with_complete_session_response<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> ClientResult<SessionRecord> + Send + 'static,
    {
        self.responses.lock().unwrap().complete_session = Some(Box::new(f));
        self
    }

    /// Configure abandon_session response
    pub fn with_abandon_session_response<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> ClientResult<()> + Send + 'static,
    {
        self.responses.lock().unwrap().abandon_session = Some(Box::new(f));
        self
    }

    /// Configure external_questions response
    pub fn with_external_questions_response<F>(self, f: F) -> Self
    where
        F: FnMut(ExternalQuery) -> ClientResult<Vec<ExternalQuestion>> + Send + 'static,
    {
        self.responses.lock().unwrap().external_questions = Some(Box::new(f));
        self
    }

    /// Get recorded calls for verification
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear call history
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    fn respond<A, T>(
        &self,
        select: impl FnOnce(&mut MockResponses) -> &mut Option<Responder<A, T>>,
        arg: A,
    ) -> Option<ClientResult<T>> {
        let mut responses = self.responses.lock().unwrap();
        select(&mut responses).as_mut().map(|f| f(arg))
    }

    fn record(&self, call: MockCall) {
        self.call_log.lock().unwrap().push(call);
    }

    fn scripted<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut ScriptedBackend) -> ClientResult<T>,
    ) -> ClientResult<T> {
        match self.backend.lock().unwrap().as_mut() {
            Some(backend) => f(backend),
            None => Err(ClientError::NotConfigured(operation.to_string())),
        }
    }
}

#[async_trait]
impl SessionGateway for MockSessionGateway {
    async fn create_session(&self, trivia_id: &str) -> ClientResult<SessionRecord> {
        self.record(MockCall::CreateSession {
            trivia_id: trivia_id.to_string(),
        });

        if let Some(result) = self.respond(|r| &mut r.create_session, trivia_id.to_string()) {
            return result;
        }
        self.scripted("create_session", |b| b.create_session(trivia_id))
    }

    async fn current_session(&self) -> ClientResult<SessionRecord> {
        self.record(MockCall::CurrentSession);

        if let Some(result) = self.respond(|r| &mut r.current_session, ()) {
            return result;
        }
        match self.backend.lock().unwrap().as_mut() {
            Some(backend) => backend.current_session(),
            None => Err(ClientError::NoActiveSession),
        }
    }

    async fn session_by_id(&self, session_id: &str) -> ClientResult<SessionRecord> {
        self.record(MockCall::SessionById {
            session_id: session_id.to_string(),
        });

        if let Some(result) = self.respond(|r| &mut r.session_by_id, session_id.to_string()) {
            return result;
        }
        self.scripted("session_by_id", |b| b.session_by_id(session_id))
    }

    async fn question(&self, session_id: &str, question_number: u32) -> ClientResult<Question> {
        self.record(MockCall::Question {
            session_id: session_id.to_string(),
            question_number,
        });

        if let Some(result) = self.respond(|r| &mut r.question, question_number) {
            return result;
        }
        self.scripted("question", |b| b.question(session_id, question_number))
    }

    async fn submit_answer(
        &self,
        session_id: &str,
        submission: &AnswerSubmission,
    ) -> ClientResult<AnswerOutcome> {
        self.record(MockCall::SubmitAnswer {
            session_id: session_id.to_string(),
            submission: submission.clone(),
        });

        if let Some(result) = self.respond(|r| &mut r.submit_answer, submission.clone()) {
            return result;
        }
        self.scripted("submit_answer", |b| b.submit_answer(session_id, submission))
    }

    async fn complete_session(&self, session_id: &str) -> ClientResult<SessionRecord> {
        self.record(MockCall::CompleteSession {
            session_id: session_id.to_string(),
        });

        if let Some(result) = self.respond(|r| &mut r.complete_session, session_id.to_string()) {
            return result;
        }
        self.scripted("complete_session", |b| b.complete_session(session_id))
    }

    async fn abandon_session(&self, session_id: &str) -> ClientResult<()> {
        self.record(MockCall::AbandonSession {
            session_id: session_id.to_string(),
        });

        if let Some(result) = self.respond(|r| &mut r.abandon_session, session_id.to_string()) {
            return result;
        }
        self.scripted("abandon_session", |b| b.abandon_session(session_id))
    }

    async fn in_progress_sessions(&self) -> ClientResult<Vec<SessionRecord>> {
        self.record(MockCall::InProgressSessions);
        self.scripted("in_progress_sessions", |b| {
            Ok(b.history(&HistoryQuery::in_progress()))
        })
    }

    async fn session_history(&self, query: &HistoryQuery) -> ClientResult<Vec<SessionRecord>> {
        self.record(MockCall::SessionHistory {
            query: query.clone(),
        });
        self.scripted("session_history", |b| Ok(b.history(query)))
    }
}

#[async_trait]
impl CatalogGateway for MockSessionGateway {
    async fn published_trivias(&self) -> ClientResult<Vec<TriviaSummary>> {
        self.record(MockCall::PublishedTrivias);
        self.scripted("published_trivias", |b| Ok(b.published_trivias()))
    }

    async fn categories(&self) -> ClientResult<Vec<Category>> {
        self.record(MockCall::Categories);
        self.scripted("categories", |b| Ok(b.categories.clone()))
    }

    async fn external_categories(&self) -> ClientResult<Vec<ExternalCategory>> {
        self.record(MockCall::ExternalCategories);
        self.scripted("external_categories", |b| Ok(b.external_categories.clone()))
    }

    async fn external_questions(
        &self,
        query: &ExternalQuery,
    ) -> ClientResult<Vec<ExternalQuestion>> {
        self.record(MockCall::ExternalQuestions {
            query: query.clone(),
        });

        if let Some(result) = self.respond(|r| &mut r.external_questions, query.clone()) {
            return result;
        }
        self.scripted("external_questions", |b| b.external_questions(query))
    }

    async fn create_trivia(&self, trivia: &NewTrivia) -> ClientResult<TriviaSummary> {
        self.record(MockCall::CreateTrivia {
            trivia: trivia.clone(),
        });
        self.scripted("create_trivia", |b| Ok(b.create_trivia(trivia)))
    }

    async fn create_question(&self, question: &NewQuestion) -> ClientResult<()> {
        self.record(MockCall::CreateQuestion {
            question: question.clone(),
        });
        self.scripted("create_question", |b| b.create_question(question))
    }
}

/// Mock auth gateway with fixed responses
#[derive(Clone, Default)]
pub struct MockAuthGateway {
    session: Option<AuthSession>,
    profile: Arc<Mutex<Option<Responder<(), User>>>>,
    token: Arc<Mutex<Option<String>>>,
}

impl MockAuthGateway {
    /// Login and register both succeed with this session
    pub fn accepting(session: AuthSession) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    /// Bearer token last passed to `authorize`
    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    /// Configure profile response
    pub fn with_profile_response<F>(self, mut f: F) -> Self
    where
        F: FnMut() -> ClientResult<User> + Send + 'static,
    {
        *self.profile.lock().unwrap() = Some(Box::new(move |()| f()));
        self
    }
}

#[async_trait]
impl AuthGateway for MockAuthGateway {
    async fn login(&self, _credentials: &Credentials) -> ClientResult<AuthSession> {
        self.session
            .clone()
            .ok_or_else(|| ClientError::Unauthorized("invalid credentials".to_string()))
    }

    async fn register(&self, _registration: &Registration) -> ClientResult<AuthSession> {
        self.session
            .clone()
            .ok_or_else(|| ClientError::Validation("registration rejected".to_string()))
    }

    async fn profile(&self) -> ClientResult<User> {
        match self.profile.lock().unwrap().as_mut() {
            Some(f) => f(()),
            None => self
                .session
                .as_ref()
                .map(|s| s.user.clone())
                .ok_or_else(|| ClientError::Unauthorized("no token".to_string())),
        }
    }

    fn authorize(&mut self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question: &Question, option_index: usize) -> AnswerSubmission {
        AnswerSubmission {
            question_id: question.question_id.clone(),
            selected_option_id: question.options[option_index].option_id.clone(),
            time_taken_seconds: 4,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_operation() {
        let mock = MockSessionGateway::new();
        let err = mock.create_session("t").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConfigured(_)));
        assert_eq!(
            mock.get_calls(),
            vec![MockCall::CreateSession {
                trivia_id: "t".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_scripted_session_rules() {
        let mock = MockSessionGateway::new().with_standard_trivia();
        let record = mock.create_session("trivia-A").await.unwrap();
        assert_eq!(record.total_questions, 3);
        assert_eq!(record.answered_count, 0);

        let err = mock.complete_session(&record.session_id).await.unwrap_err();
        assert!(err.is_not_all_answered());

        for n in 1..=3 {
            let q = mock.question(&record.session_id, n).await.unwrap();
            let outcome = mock.submit_answer(&record.session_id, &answer(&q, 0)).await.unwrap();
            assert!(outcome.is_correct);
            assert_eq!(outcome.next_question, (n < 3).then_some(n + 1));
        }

        let done = mock.complete_session(&record.session_id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.total_score, 60);

        let again = mock.complete_session(&record.session_id).await.unwrap_err();
        assert!(again.is_already_terminal());
    }

    #[tokio::test]
    async fn test_visibility_lag_hides_last_answer() {
        let mock = MockSessionGateway::new()
            .with_standard_trivia()
            .with_visibility_lag(2);
        let record = mock.create_session("trivia-A").await.unwrap();
        let q = mock.question(&record.session_id, 1).await.unwrap();
        mock.submit_answer(&record.session_id, &answer(&q, 1)).await.unwrap();

        let id = &record.session_id;
        assert_eq!(mock.session_by_id(id).await.unwrap().answered_count, 0);
        assert_eq!(mock.session_by_id(id).await.unwrap().answered_count, 0);
        assert_eq!(mock.session_by_id(id).await.unwrap().answered_count, 1);
    }

    #[tokio::test]
    async fn test_unpublished_and_missing_trivia() {
        let mock = MockSessionGateway::new()
            .with_draft_trivia("draft", vec![ScriptedQuestion::new(1, "?", 5, &["a", "b"])])
            .with_trivia("empty", "Empty", vec![]);

        assert!(matches!(
            mock.create_session("draft").await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            mock.create_session("empty").await,
            Err(ClientError::NotFound(_))
        ));
        assert!(matches!(
            mock.create_session("nope").await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_created_trivia_is_playable() {
        let mock = MockSessionGateway::new().with_categories(vec![Category {
            id: "c1".into(),
            name: "General".into(),
        }]);
        let trivia = mock
            .create_trivia(&NewTrivia {
                title: "Imported".into(),
                category_id: "c1".into(),
                difficulty_level: Difficulty::Easy,
                status: "published".into(),
                is_public: true,
            })
            .await
            .unwrap();
        mock.create_question(&NewQuestion {
            trivia_id: trivia.trivia_id.clone(),
            question_text: "Sky?".into(),
            question_type: QuestionType::MultipleChoice,
            options: vec![
                NewOption {
                    text: "Green".into(),
                    is_correct: false,
                },
                NewOption {
                    text: "Blue".into(),
                    is_correct: true,
                },
            ],
            correct_answer: "Blue".into(),
            points_value: 5,
        })
        .await
        .unwrap();

        assert_eq!(mock.published_trivias().await.unwrap(), vec![trivia.clone()]);
        let record = mock.create_session(&trivia.trivia_id).await.unwrap();
        let q = mock.question(&record.session_id, 1).await.unwrap();
        let outcome = mock.submit_answer(&record.session_id, &answer(&q, 1)).await.unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.points_earned, 5);
    }

    #[tokio::test]
    async fn test_override_takes_precedence() {
        let mock = MockSessionGateway::new()
            .with_standard_trivia()
            .with_abandon_session_response(|_| Err(ClientError::NotFound("gone".to_string())));
        let record = mock.create_session("trivia-A").await.unwrap();
        assert!(mock.abandon_session(&record.session_id).await.is_err());
        assert_eq!(
            mock.in_progress_sessions().await.unwrap().len(),
            1,
            "override must not touch scripted state"
        );
    }
}
