//! Domain types exchanged with the trivia backend.
//!
//! These are the normalized shapes the rest of the workspace sees. Raw JSON
//! layouts live in [`crate::wire`] and are converted on receipt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a game session. Once terminal, a session never
/// returns to `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

/// A session record as reported by the backend.
///
/// `answered_count` is the backend's `current_question` field: the number of
/// questions answered so far, not the question on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub trivia_id: String,
    pub trivia_title: Option<String>,
    pub player_id: Option<String>,
    pub status: SessionStatus,
    pub answered_count: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub total_score: u32,
    pub time_spent_seconds: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// True once every question has been answered server-side.
    pub fn all_answered(&self) -> bool {
        self.answered_count >= self.total_questions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOption {
    pub option_id: String,
    pub text: String,
}

/// A question at a fixed position of a trivia. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub question_id: String,
    /// 1-based position within the trivia.
    pub order: u32,
    pub text: String,
    pub question_type: QuestionType,
    pub points_value: u32,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.option_id == option_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSubmission {
    pub question_id: String,
    pub selected_option_id: String,
    pub time_taken_seconds: u32,
}

/// Aggregate counters reported alongside an answer outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub answered_count: u32,
    pub correct_answers: u32,
    pub total_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub points_earned: u32,
    pub correct_option: Option<QuestionOption>,
    /// Number of the next question. `None` means the answered question was
    /// the last one.
    pub next_question: Option<u32>,
    pub progress: Option<SessionProgress>,
}

impl AnswerOutcome {
    pub fn is_last(&self) -> bool {
        self.next_question.is_none()
    }
}

/// Filters for the session history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<SessionStatus>,
    pub trivia_id: Option<String>,
}

impl HistoryQuery {
    pub fn in_progress() -> Self {
        Self {
            status: Some(SessionStatus::InProgress),
            limit: Some(100),
            ..Self::default()
        }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(ref trivia_id) = self.trivia_id {
            pairs.push(("trivia_id", trivia_id.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Points a question of this difficulty is worth when imported.
    pub fn points(self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }
}

/// A trivia that can be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriviaSummary {
    pub trivia_id: String,
    pub title: String,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
}

/// A category of the platform's own catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A category of the external question bank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalCategory {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalQuestionKind {
    Multiple,
    Boolean,
}

impl ExternalQuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalQuestionKind::Multiple => "multiple",
            ExternalQuestionKind::Boolean => "boolean",
        }
    }

    pub fn question_type(self) -> QuestionType {
        match self {
            ExternalQuestionKind::Multiple => QuestionType::MultipleChoice,
            ExternalQuestionKind::Boolean => QuestionType::TrueFalse,
        }
    }
}

/// What to ask the external question bank for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalQuery {
    pub amount: u32,
    pub category: Option<u32>,
    pub difficulty: Difficulty,
    pub kind: ExternalQuestionKind,
    /// Language of the returned questions.
    pub lang: String,
}

impl Default for ExternalQuery {
    fn default() -> Self {
        Self {
            amount: 10,
            category: None,
            difficulty: Difficulty::Medium,
            kind: ExternalQuestionKind::Multiple,
            lang: "es".to_string(),
        }
    }
}

impl ExternalQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("amount", self.amount.to_string())];
        if let Some(category) = self.category {
            pairs.push(("category", category.to_string()));
        }
        pairs.push(("difficulty", self.difficulty.as_str().to_string()));
        pairs.push(("type", self.kind.as_str().to_string()));
        pairs.push(("lang", self.lang.clone()));
        pairs
    }
}

/// A question from the external bank, with HTML entities decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalQuestion {
    pub text: String,
    pub kind: ExternalQuestionKind,
    pub difficulty: Difficulty,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTrivia {
    pub title: String,
    pub category_id: String,
    pub difficulty_level: Difficulty,
    pub status: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOption {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewQuestion {
    pub trivia_id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<NewOption>,
    pub correct_answer: String,
    pub points_value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A logged-in user and the bearer token issued for them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::InProgress.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Abandoned.is_terminal());
    }

    #[test]
    fn in_progress_query_pairs() {
        let pairs = HistoryQuery::in_progress().to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("limit", "100".to_string()),
                ("status", "in_progress".to_string())
            ]
        );
    }

    #[test]
    fn external_query_pairs() {
        let query = ExternalQuery {
            amount: 5,
            category: Some(9),
            difficulty: Difficulty::Hard,
            kind: ExternalQuestionKind::Boolean,
            ..ExternalQuery::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("amount", "5".to_string()),
                ("category", "9".to_string()),
                ("difficulty", "hard".to_string()),
                ("type", "boolean".to_string()),
                ("lang", "es".to_string()),
            ]
        );
    }

    #[test]
    fn difficulty_points() {
        assert_eq!(Difficulty::Easy.points(), 5);
        assert_eq!(Difficulty::Medium.points(), 10);
        assert_eq!(Difficulty::Hard.points(), 15);
    }

    #[test]
    fn user_role_deserializes_lowercase() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","name":"Ana","email":"ana@example.com","role":"admin"}"#,
        )
        .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.total_score, 0);
    }
}
