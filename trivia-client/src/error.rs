//! Error types for the trivia client

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict {
        reason: ConflictReason,
        message: String,
    },

    #[error("No active session")]
    NoActiveSession,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Server returned invalid data: {0}")]
    InvalidData(String),

    #[error("Mock response not configured for: {0}")]
    NotConfigured(String),
}

/// Which state precondition a conflict violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    AlreadyCompleted,
    AlreadyAbandoned,
    NotAllAnswered,
    Other,
}

/// Flat classification of a [`ClientError`], used by callers instead of
/// inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyTerminal,
    NotAllAnswered,
    Conflict,
    NoActiveSession,
    Unauthorized,
    Forbidden,
    Transport,
    Server,
    InvalidData,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidAddress(_) | ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Conflict { reason, .. } => match reason {
                ConflictReason::AlreadyCompleted | ConflictReason::AlreadyAbandoned => {
                    ErrorKind::AlreadyTerminal
                }
                ConflictReason::NotAllAnswered => ErrorKind::NotAllAnswered,
                ConflictReason::Other => ErrorKind::Conflict,
            },
            ClientError::NoActiveSession => ErrorKind::NoActiveSession,
            ClientError::Unauthorized(_) => ErrorKind::Unauthorized,
            ClientError::Forbidden(_) => ErrorKind::Forbidden,
            ClientError::Server { .. } => ErrorKind::Server,
            ClientError::InvalidData(_) | ClientError::NotConfigured(_) => ErrorKind::InvalidData,
        }
    }

    pub fn is_already_terminal(&self) -> bool {
        self.kind() == ErrorKind::AlreadyTerminal
    }

    pub fn is_not_all_answered(&self) -> bool {
        self.kind() == ErrorKind::NotAllAnswered
    }

    pub fn already_completed() -> Self {
        ClientError::Conflict {
            reason: ConflictReason::AlreadyCompleted,
            message: "La sesión ya fue completada".to_string(),
        }
    }

    pub fn already_abandoned() -> Self {
        ClientError::Conflict {
            reason: ConflictReason::AlreadyAbandoned,
            message: "La sesión ya fue abandonada".to_string(),
        }
    }

    pub fn not_all_answered() -> Self {
        ClientError::Conflict {
            reason: ConflictReason::NotAllAnswered,
            message: "Debes responder todas las preguntas antes de completar".to_string(),
        }
    }
}

const ALREADY_COMPLETED_MARKER: &str = "ya fue completada";
const ALREADY_ABANDONED_MARKER: &str = "ya fue abandonada";
const NOT_ALL_ANSWERED_MARKER: &str = "responder todas";

/// Translate a failed HTTP response into a tagged error.
///
/// This is the only place that looks at backend message text. The backend
/// signals session-state conflicts through human-readable messages, so those
/// are matched first regardless of status code.
pub fn classify_failure(status: u16, message: &str) -> ClientError {
    let lowered = message.to_lowercase();
    let message = message.to_string();

    if lowered.contains(ALREADY_COMPLETED_MARKER) {
        return ClientError::Conflict {
            reason: ConflictReason::AlreadyCompleted,
            message,
        };
    }
    if lowered.contains(ALREADY_ABANDONED_MARKER) {
        return ClientError::Conflict {
            reason: ConflictReason::AlreadyAbandoned,
            message,
        };
    }
    if lowered.contains(NOT_ALL_ANSWERED_MARKER) {
        return ClientError::Conflict {
            reason: ConflictReason::NotAllAnswered,
            message,
        };
    }

    match status {
        400 | 422 => ClientError::Validation(message),
        401 => ClientError::Unauthorized(message),
        403 => ClientError::Forbidden(message),
        404 => ClientError::NotFound(message),
        409 => ClientError::Conflict {
            reason: ConflictReason::Other,
            message,
        },
        _ => ClientError::Server { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_completed_wins_over_status() {
        let err = classify_failure(400, "La sesión ya fue completada");
        assert_eq!(err.kind(), ErrorKind::AlreadyTerminal);
        assert!(matches!(
            err,
            ClientError::Conflict {
                reason: ConflictReason::AlreadyCompleted,
                ..
            }
        ));
    }

    #[test]
    fn test_already_abandoned() {
        let err = classify_failure(409, "Esta sesión YA FUE ABANDONADA");
        assert!(err.is_already_terminal());
    }

    #[test]
    fn test_not_all_answered() {
        let err = classify_failure(400, "Debes responder todas las preguntas");
        assert!(err.is_not_all_answered());
        assert!(!err.is_already_terminal());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify_failure(400, "bad").kind(), ErrorKind::Validation);
        assert_eq!(classify_failure(422, "bad").kind(), ErrorKind::Validation);
        assert_eq!(classify_failure(401, "no").kind(), ErrorKind::Unauthorized);
        assert_eq!(classify_failure(403, "no").kind(), ErrorKind::Forbidden);
        assert_eq!(classify_failure(404, "gone").kind(), ErrorKind::NotFound);
        assert_eq!(classify_failure(409, "clash").kind(), ErrorKind::Conflict);
        assert_eq!(classify_failure(502, "down").kind(), ErrorKind::Server);
    }

    #[test]
    fn test_message_preserved() {
        let err = classify_failure(404, "Trivia no encontrada");
        assert_eq!(err.to_string(), "Not found: Trivia no encontrada");
    }

    #[test]
    fn test_constructors_classify_consistently() {
        assert!(ClientError::already_completed().is_already_terminal());
        assert!(ClientError::already_abandoned().is_already_terminal());
        assert!(ClientError::not_all_answered().is_not_all_answered());
    }
}
