//! JSON layouts of the backend API and their normalization into
//! [`crate::types`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{classify_failure, ClientError, ClientResult};
use crate::types::{
    AnswerOutcome, Difficulty, ExternalCategory, ExternalQuestion, ExternalQuestionKind, Question,
    QuestionOption, QuestionType, SessionProgress, SessionRecord, SessionStatus, TriviaSummary,
};

/// Imported questions carry HTML entities (`&quot;`, `&#039;`) in their text.
fn decode_text(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Successful bodies come either wrapped as `{ success, data }` or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Enveloped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Payload::Enveloped { data } => data,
            Payload::Bare(inner) => inner,
        }
    }
}

/// Decode a successful response body, unwrapping the envelope if present.
pub(crate) fn decode_payload<T: DeserializeOwned>(body: &[u8], path: &str) -> ClientResult<T> {
    serde_json::from_slice::<Payload<T>>(body)
        .map(Payload::into_inner)
        .map_err(|e| ClientError::InvalidData(format!("{path}: {e}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<ErrorMessage>,
}

/// Build the error for a non-success response.
pub(crate) fn decode_failure(status: u16, reason: Option<&str>, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| match m {
            ErrorMessage::One(msg) => msg,
            ErrorMessage::Many(msgs) => msgs.join("; "),
        })
        .unwrap_or_else(|| reason.unwrap_or("request failed").to_string());
    classify_failure(status, &message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTriviaRef {
    id: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePlayerRef {
    id: String,
}

/// Session shape; id fields come flat or nested depending on the endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct WireSession {
    session_id: Option<String>,
    id: Option<String>,
    trivia_id: Option<String>,
    trivia_title: Option<String>,
    trivia: Option<WireTriviaRef>,
    player_id: Option<String>,
    player: Option<WirePlayerRef>,
    status: SessionStatus,
    #[serde(default)]
    current_question: u32,
    total_questions: u32,
    #[serde(default)]
    correct_answers: u32,
    #[serde(default)]
    total_score: u32,
    #[serde(default)]
    time_spent_seconds: u32,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireSession> for SessionRecord {
    type Error = ClientError;

    fn try_from(wire: WireSession) -> ClientResult<Self> {
        let session_id = wire
            .session_id
            .or(wire.id)
            .ok_or_else(|| ClientError::InvalidData("session without id".to_string()))?;

        let (nested_trivia_id, nested_title) = match wire.trivia {
            Some(t) => (Some(t.id), t.title),
            None => (None, None),
        };
        let trivia_id = wire.trivia_id.or(nested_trivia_id).ok_or_else(|| {
            ClientError::InvalidData(format!("session {session_id} without trivia id"))
        })?;

        Ok(SessionRecord {
            session_id,
            trivia_id,
            trivia_title: nested_title.or(wire.trivia_title),
            player_id: wire.player.map(|p| p.id).or(wire.player_id),
            status: wire.status,
            answered_count: wire.current_question,
            total_questions: wire.total_questions,
            correct_answers: wire.correct_answers,
            total_score: wire.total_score,
            time_spent_seconds: wire.time_spent_seconds,
            started_at: wire.started_at,
            completed_at: wire.completed_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireHistory {
    #[serde(default)]
    pub sessions: Vec<WireSession>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireOption {
    option_id: String,
    option_text: String,
}

impl From<WireOption> for QuestionOption {
    fn from(wire: WireOption) -> Self {
        QuestionOption {
            option_id: wire.option_id,
            text: decode_text(&wire.option_text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    question_id: String,
    question_text: String,
    question_type: QuestionType,
    #[serde(default)]
    points_value: u32,
    options: Option<Vec<WireOption>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireQuestionEnvelope {
    question: WireQuestion,
    question_number: u32,
}

impl TryFrom<WireQuestionEnvelope> for Question {
    type Error = ClientError;

    fn try_from(wire: WireQuestionEnvelope) -> ClientResult<Self> {
        let options: Vec<QuestionOption> = wire
            .question
            .options
            .unwrap_or_default()
            .into_iter()
            .map(QuestionOption::from)
            .collect();

        if options.is_empty() {
            return Err(ClientError::InvalidData(format!(
                "question {} has no options",
                wire.question_number
            )));
        }

        Ok(Question {
            question_id: wire.question.question_id,
            order: wire.question_number,
            text: decode_text(&wire.question.question_text),
            question_type: wire.question.question_type,
            points_value: wire.question.points_value,
            options,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireNextQuestion {
    question_number: u32,
}

#[derive(Debug, Deserialize)]
struct WireProgress {
    current_question: u32,
    correct_answers: u32,
    total_score: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnswer {
    is_correct: bool,
    #[serde(default)]
    points_earned: u32,
    correct_option: Option<WireOption>,
    next_question: Option<WireNextQuestion>,
    session_progress: Option<WireProgress>,
}

impl From<WireAnswer> for AnswerOutcome {
    fn from(wire: WireAnswer) -> Self {
        AnswerOutcome {
            is_correct: wire.is_correct,
            points_earned: wire.points_earned,
            correct_option: wire.correct_option.map(QuestionOption::from),
            next_question: wire.next_question.map(|n| n.question_number),
            progress: wire.session_progress.map(|p| SessionProgress {
                answered_count: p.current_question,
                correct_answers: p.correct_answers,
                total_score: p.total_score,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCategoryRef {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTrivia {
    id: String,
    title: String,
    difficulty_level: Option<Difficulty>,
    category: Option<WireCategoryRef>,
}

impl From<WireTrivia> for TriviaSummary {
    fn from(wire: WireTrivia) -> Self {
        TriviaSummary {
            trivia_id: wire.id,
            title: decode_text(&wire.title),
            difficulty: wire.difficulty_level,
            category: wire.category.map(|c| c.name),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireExternalCategories {
    pub trivia_categories: Vec<ExternalCategory>,
}

#[derive(Debug, Deserialize)]
struct WireExternalQuestion {
    #[serde(rename = "type")]
    kind: ExternalQuestionKind,
    difficulty: Difficulty,
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

/// Question bank response; `response_code` 0 means success.
#[derive(Debug, Deserialize)]
pub(crate) struct WireExternalResponse {
    response_code: u32,
    #[serde(default)]
    results: Vec<WireExternalQuestion>,
}

impl WireExternalResponse {
    pub(crate) fn into_questions(self) -> ClientResult<Vec<ExternalQuestion>> {
        match self.response_code {
            0 => {}
            1 => {
                return Err(ClientError::NotFound(
                    "not enough external questions for this query".to_string(),
                ))
            }
            2 => {
                return Err(ClientError::Validation(
                    "external question bank rejected the query".to_string(),
                ))
            }
            code => {
                return Err(ClientError::Server {
                    status: 502,
                    message: format!("external question bank returned code {code}"),
                })
            }
        }

        Ok(self
            .results
            .into_iter()
            .map(|q| ExternalQuestion {
                text: decode_text(&q.question),
                kind: q.kind,
                difficulty: q.difficulty,
                correct_answer: decode_text(&q.correct_answer),
                incorrect_answers: q.incorrect_answers.iter().map(|a| decode_text(a)).collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_enveloped_and_bare_sessions_normalize_alike() {
        let enveloped = br#"{"success":true,"data":{"session_id":"s1","trivia_id":"t1",
            "status":"in_progress","current_question":2,"total_questions":5}}"#;
        let bare = br#"{"id":"s1","trivia":{"id":"t1","title":"Capitals"},
            "player":{"id":"p1"},"status":"in_progress","current_question":2,
            "total_questions":5,"correct_answers":1,"total_score":10}"#;

        let a: SessionRecord = decode_payload::<WireSession>(enveloped, "/s")
            .unwrap()
            .try_into()
            .unwrap();
        let b: SessionRecord = decode_payload::<WireSession>(bare, "/s")
            .unwrap()
            .try_into()
            .unwrap();

        assert_eq!(a.session_id, b.session_id);
        assert_eq!(a.trivia_id, b.trivia_id);
        assert_eq!(a.answered_count, 2);
        assert_eq!(b.trivia_title.as_deref(), Some("Capitals"));
        assert_eq!(b.player_id.as_deref(), Some("p1"));
        assert_eq!(b.total_score, 10);
    }

    #[test]
    fn test_session_without_trivia_is_invalid() {
        let body = br#"{"session_id":"s1","status":"completed","total_questions":3}"#;
        let err = SessionRecord::try_from(decode_payload::<WireSession>(body, "/s").unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_completed_at_parsed() {
        let body = br#"{"session_id":"s1","trivia_id":"t1","status":"completed",
            "current_question":3,"total_questions":3,
            "completed_at":"2025-03-01T10:15:00.000Z"}"#;
        let record =
            SessionRecord::try_from(decode_payload::<WireSession>(body, "/s").unwrap()).unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_question_normalized() {
        let body = br#"{"success":true,"data":{"question_number":3,"question":{
            "question_id":"q3","question_text":"2+2?","question_type":"multiple_choice",
            "points_value":20,"options":[{"option_id":"o1","option_text":"4"},
            {"option_id":"o2","option_text":"5"}]}}}"#;
        let question: Question = decode_payload::<WireQuestionEnvelope>(body, "/q")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(question.order, 3);
        assert_eq!(question.options.len(), 2);
        assert!(question.has_option("o1"));
    }

    #[test]
    fn test_question_without_options_is_integrity_failure() {
        let missing = br#"{"question_number":1,"question":{"question_id":"q1",
            "question_text":"?","question_type":"true_false","points_value":5}}"#;
        let empty = br#"{"question_number":1,"question":{"question_id":"q1",
            "question_text":"?","question_type":"true_false","points_value":5,"options":[]}}"#;

        for body in [&missing[..], &empty[..]] {
            let err = Question::try_from(
                decode_payload::<WireQuestionEnvelope>(body, "/q").unwrap(),
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData);
        }
    }

    #[test]
    fn test_last_answer_has_no_next_question() {
        let body = br#"{"data":{"is_correct":true,"points_earned":30,"next_question":null,
            "session_progress":{"current_question":3,"correct_answers":3,"total_score":60}}}"#;
        let outcome = AnswerOutcome::from(decode_payload::<WireAnswer>(body, "/a").unwrap());
        assert!(outcome.is_last());
        assert_eq!(outcome.progress.unwrap().answered_count, 3);
    }

    #[test]
    fn test_entities_decoded_in_question_and_options() {
        let body = br#"{"question_number":1,"question":{"question_id":"q1",
            "question_text":"Who wrote &quot;Hamlet&quot;?","question_type":"multiple_choice",
            "points_value":10,"options":[{"option_id":"o1","option_text":"Shakespeare&#039;s ghost"},
            {"option_id":"o2","option_text":"Marlowe &amp; Kyd"}]}}"#;
        let question = Question::try_from(
            decode_payload::<WireQuestionEnvelope>(body, "/q").unwrap(),
        )
        .unwrap();
        assert_eq!(question.text, "Who wrote \"Hamlet\"?");
        assert_eq!(question.options[0].text, "Shakespeare's ghost");
        assert_eq!(question.options[1].text, "Marlowe & Kyd");
    }

    #[test]
    fn test_entities_decoded_in_correct_option() {
        let body = br#"{"is_correct":false,"points_earned":0,
            "correct_option":{"option_id":"o1","option_text":"&lt;b&gt; tag"},
            "next_question":{"question_number":2}}"#;
        let outcome = AnswerOutcome::from(decode_payload::<WireAnswer>(body, "/a").unwrap());
        assert_eq!(outcome.correct_option.unwrap().text, "<b> tag");
        assert_eq!(outcome.next_question, Some(2));
    }

    #[test]
    fn test_trivia_listing_normalized() {
        let body = br#"{"data":[{"id":"t1","title":"Rock &amp; Roll","difficulty_level":"easy",
            "category":{"id":"c1","name":"Music"},"status":"published"},
            {"id":"t2","title":"Plain","status":"published"}]}"#;
        let trivias: Vec<TriviaSummary> = decode_payload::<Vec<WireTrivia>>(body, "/trivias")
            .unwrap()
            .into_iter()
            .map(TriviaSummary::from)
            .collect();
        assert_eq!(trivias[0].title, "Rock & Roll");
        assert_eq!(trivias[0].difficulty, Some(Difficulty::Easy));
        assert_eq!(trivias[0].category.as_deref(), Some("Music"));
        assert_eq!(trivias[1].difficulty, None);
    }

    #[test]
    fn test_external_questions_decoded() {
        let body = br#"{"response_code":0,"results":[{"category":"Science","type":"boolean",
            "difficulty":"hard","question":"&quot;H2O&quot; is water?","correct_answer":"True",
            "incorrect_answers":["False"]}]}"#;
        let questions = decode_payload::<WireExternalResponse>(body, "/x")
            .unwrap()
            .into_questions()
            .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "\"H2O\" is water?");
        assert_eq!(questions[0].kind, ExternalQuestionKind::Boolean);
        assert_eq!(questions[0].incorrect_answers, vec!["False".to_string()]);
    }

    #[test]
    fn test_external_no_results_is_not_found() {
        let body = br#"{"response_code":1,"results":[]}"#;
        let err = decode_payload::<WireExternalResponse>(body, "/x")
            .unwrap()
            .into_questions()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_failure_message_forms() {
        let single = decode_failure(
            400,
            Some("Bad Request"),
            r#"{"message":"La sesión ya fue completada"}"#.as_bytes(),
        );
        assert!(single.is_already_terminal());

        let many = decode_failure(422, None, br#"{"message":["trivia_id must be a UUID","x"]}"#);
        assert_eq!(many.to_string(), "Validation failed: trivia_id must be a UUID; x");

        let opaque = decode_failure(503, Some("Service Unavailable"), b"<html>");
        assert_eq!(opaque.kind(), ErrorKind::Server);
        assert!(opaque.to_string().contains("Service Unavailable"));
    }
}
