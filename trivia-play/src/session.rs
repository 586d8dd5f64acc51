//! Client-side copy of a game session.
//!
//! The backend is the source of truth; this is a read-through cache that the
//! controller reconciles. Counters never move backwards and a terminal
//! status is never reverted, whatever order records arrive in.

use chrono::{DateTime, Utc};
use trivia_client::{SessionProgress, SessionRecord, SessionStatus};

use crate::resume::display_pointer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub session_id: String,
    pub trivia_id: String,
    pub trivia_title: Option<String>,
    pub status: SessionStatus,
    /// 1-based number of the question on screen, never past the last one.
    pub current_question_pointer: u32,
    /// Questions answered so far, as last reported.
    pub answered_count: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub total_score: u32,
    pub time_spent_seconds: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// Build client state from a backend record, translating the answered
    /// count into a display pointer. A fully answered record points at the
    /// last question; [`Self::all_answered`] says completion is due.
    pub fn from_record(record: &SessionRecord) -> Self {
        let last = record.total_questions.max(1);
        let pointer = if record.status.is_terminal() {
            record.answered_count.clamp(1, last)
        } else {
            display_pointer(record.answered_count).min(last)
        };

        Self {
            session_id: record.session_id.clone(),
            trivia_id: record.trivia_id.clone(),
            trivia_title: record.trivia_title.clone(),
            status: record.status,
            current_question_pointer: pointer,
            answered_count: record.answered_count,
            total_questions: record.total_questions,
            correct_answers: record.correct_answers,
            total_score: record.total_score,
            time_spent_seconds: record.time_spent_seconds,
            started_at: record.started_at,
            completed_at: record.completed_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Every question is answered; the next step is completion, not a fetch.
    pub fn all_answered(&self) -> bool {
        self.answered_count >= self.total_questions
    }

    /// Fold the counters reported with an answer outcome.
    pub fn apply_progress(&mut self, progress: &SessionProgress) {
        if self.is_terminal() {
            return;
        }
        self.answered_count = self.answered_count.max(progress.answered_count);
        self.raise_counters(progress.correct_answers, progress.total_score);
    }

    pub fn add_time_spent(&mut self, seconds: u32) {
        if !self.is_terminal() {
            self.time_spent_seconds = self.time_spent_seconds.saturating_add(seconds);
        }
    }

    /// Move the display pointer to a freshly loaded question.
    pub fn point_at(&mut self, question_number: u32) {
        if !self.is_terminal() {
            self.current_question_pointer = question_number.clamp(1, self.total_questions.max(1));
        }
    }

    /// Reconcile with a fresh backend record of the same session.
    pub fn apply_record(&mut self, record: &SessionRecord) {
        if record.session_id != self.session_id {
            tracing::warn!(
                expected = %self.session_id,
                got = %record.session_id,
                "ignoring record of another session"
            );
            return;
        }
        if self.is_terminal() {
            return;
        }

        self.raise_counters(record.correct_answers, record.total_score);
        self.answered_count = self.answered_count.max(record.answered_count);
        self.time_spent_seconds = self.time_spent_seconds.max(record.time_spent_seconds);
        if self.trivia_title.is_none() {
            self.trivia_title = record.trivia_title.clone();
        }

        if record.status.is_terminal() {
            self.status = record.status;
            self.completed_at = record.completed_at.or_else(|| Some(Utc::now()));
        } else {
            let pointer = display_pointer(record.answered_count).min(self.total_questions.max(1));
            self.current_question_pointer = self.current_question_pointer.max(pointer);
        }
    }

    fn raise_counters(&mut self, correct_answers: u32, total_score: u32) {
        if correct_answers < self.correct_answers || total_score < self.total_score {
            tracing::warn!(
                session_id = %self.session_id,
                correct_answers,
                total_score,
                "backend reported lower counters than already seen"
            );
        }
        self.correct_answers = self.correct_answers.max(correct_answers);
        self.total_score = self.total_score.max(total_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(answered: u32, status: SessionStatus) -> SessionRecord {
        SessionRecord {
            session_id: "s1".into(),
            trivia_id: "t1".into(),
            trivia_title: Some("Capitals".into()),
            player_id: None,
            status,
            answered_count: answered,
            total_questions: 5,
            correct_answers: answered,
            total_score: answered * 10,
            time_spent_seconds: answered * 3,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_new_session_points_at_first_question() {
        let s = GameSession::from_record(&record(0, SessionStatus::InProgress));
        assert_eq!(s.current_question_pointer, 1);
    }

    #[test]
    fn test_resumed_session_points_past_answered() {
        let s = GameSession::from_record(&record(2, SessionStatus::InProgress));
        assert_eq!(s.current_question_pointer, 3);
    }

    #[test]
    fn test_fully_answered_open_session_points_at_last_question() {
        let s = GameSession::from_record(&record(5, SessionStatus::InProgress));
        assert_eq!(s.current_question_pointer, 5);
        assert!(s.all_answered());
        assert!(!GameSession::from_record(&record(4, SessionStatus::InProgress)).all_answered());
    }

    #[test]
    fn test_terminal_pointer_frozen_within_range() {
        let s = GameSession::from_record(&record(5, SessionStatus::Completed));
        assert_eq!(s.current_question_pointer, 5);
    }

    #[test]
    fn test_counters_never_decrease() {
        let mut s = GameSession::from_record(&record(3, SessionStatus::InProgress));
        s.apply_progress(&SessionProgress {
            answered_count: 2,
            correct_answers: 1,
            total_score: 5,
        });
        assert_eq!(s.correct_answers, 3);
        assert_eq!(s.total_score, 30);

        s.apply_record(&record(1, SessionStatus::InProgress));
        assert_eq!(s.total_score, 30);
        assert_eq!(s.current_question_pointer, 4);
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut s = GameSession::from_record(&record(4, SessionStatus::InProgress));
        let mut done = record(5, SessionStatus::Completed);
        done.total_score = 70;
        s.apply_record(&done);
        assert_eq!(s.status, SessionStatus::Completed);
        assert!(s.completed_at.is_some());
        assert_eq!(s.total_score, 70);

        s.apply_record(&record(5, SessionStatus::InProgress));
        s.apply_progress(&SessionProgress {
            answered_count: 5,
            correct_answers: 5,
            total_score: 999,
        });
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.total_score, 70);
    }

    #[test]
    fn test_foreign_record_ignored() {
        let mut s = GameSession::from_record(&record(1, SessionStatus::InProgress));
        let mut other = record(4, SessionStatus::Completed);
        other.session_id = "s2".into();
        s.apply_record(&other);
        assert_eq!(s.status, SessionStatus::InProgress);
        assert_eq!(s.current_question_pointer, 2);
    }
}
