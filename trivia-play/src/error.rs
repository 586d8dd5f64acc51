//! Errors raised by the game controller

use std::time::Duration;
use thiserror::Error;
use trivia_client::{ClientError, ErrorKind};

use crate::controller::PhaseKind;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("could not complete session {session_id} after {attempts} attempts; try again")]
    CompletionTimeout { session_id: String, attempts: u32 },

    #[error("cannot {intent} while in {phase:?}")]
    InvalidIntent {
        phase: PhaseKind,
        intent: &'static str,
    },

    #[error("next question unlocks in {remaining:?}")]
    FeedbackPending { remaining: Duration },

    #[error("select an option first")]
    NoOptionSelected,

    #[error("option {0} is not part of the current question")]
    UnknownOption(String),

    #[error("question data is corrupt: {0}")]
    DataIntegrity(String),

    #[error("cannot build an external trivia: {0}")]
    InvalidImport(String),
}

impl GameError {
    /// Whether the user can retry the same intent as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            GameError::CompletionTimeout { .. } | GameError::FeedbackPending { .. } => true,
            GameError::Client(e) => matches!(e.kind(), ErrorKind::Transport | ErrorKind::Server),
            _ => false,
        }
    }

    pub(crate) fn from_question_load(err: ClientError) -> Self {
        match err {
            ClientError::InvalidData(msg) => GameError::DataIntegrity(msg),
            other => GameError::Client(other),
        }
    }
}
