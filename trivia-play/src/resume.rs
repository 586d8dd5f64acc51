//! Mapping backend session records onto the client's question pointer.
//!
//! The backend's `current_question` counts answered questions; the client
//! pointer names the question to display. Every place that turns a raw
//! record into client state goes through [`display_pointer`].

use trivia_client::SessionRecord;

/// Question number to show after `answered_count` answers.
pub fn display_pointer(answered_count: u32) -> u32 {
    answered_count.saturating_add(1)
}

/// What resuming a fetched record requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Load this question and keep playing.
    Fetch(u32),
    /// Every question is answered but the session is still open.
    Complete,
    /// The session is already completed or abandoned.
    Finished,
}

pub fn plan_resume(record: &SessionRecord) -> ResumePlan {
    if record.status.is_terminal() {
        ResumePlan::Finished
    } else if record.all_answered() {
        ResumePlan::Complete
    } else {
        ResumePlan::Fetch(display_pointer(record.answered_count))
    }
}
