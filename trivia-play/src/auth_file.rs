use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use trivia_client::{AuthSession, User};

const AUTH_FILE_NAME: &str = "auth.json";

#[derive(Error, Debug)]
pub enum AuthStoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize auth: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted login: the bearer token and the user it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedAuth {
    pub access_token: String,
    pub user: User,
    pub saved_at: DateTime<Utc>,
}

impl SavedAuth {
    pub fn from_session(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.clone(),
            user: session.user.clone(),
            saved_at: Utc::now(),
        }
    }
}

/// Get the path to the auth file inside `dir`.
pub fn auth_file_path(dir: &Path) -> PathBuf {
    dir.join(AUTH_FILE_NAME)
}

/// Save auth to `dir`, creating the directory if needed.
pub fn save_auth(auth: &SavedAuth, dir: &Path) -> Result<PathBuf, AuthStoreError> {
    std::fs::create_dir_all(dir).map_err(|source| AuthStoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = auth_file_path(dir);
    let json = serde_json::to_string_pretty(auth)?;
    std::fs::write(&path, json).map_err(|source| AuthStoreError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "auth saved");
    Ok(path)
}

/// Load saved auth from `dir`, if any.
pub fn load_auth(dir: &Path) -> Result<Option<SavedAuth>, AuthStoreError> {
    let path = auth_file_path(dir);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| AuthStoreError::Io {
        path: path.clone(),
        source,
    })?;
    let auth = serde_json::from_str(&contents)
        .map_err(|source| AuthStoreError::Parse { path, source })?;

    Ok(Some(auth))
}

/// Delete the auth file in `dir`.
pub fn clear_auth(dir: &Path) -> Result<(), AuthStoreError> {
    let path = auth_file_path(dir);
    if path.exists() {
        std::fs::remove_file(&path).map_err(|source| AuthStoreError::Io { path, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_client::Role;

    fn sample_auth() -> SavedAuth {
        SavedAuth {
            access_token: "tok-123".to_string(),
            user: User {
                id: "u1".to_string(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                role: Role::Player,
                total_score: 140,
                profile_image: None,
            },
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let auth = sample_auth();

        let path = save_auth(&auth, dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(load_auth(dir.path()).unwrap(), Some(auth));
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_auth(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        save_auth(&sample_auth(), &nested).unwrap();
        assert!(auth_file_path(&nested).exists());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        save_auth(&sample_auth(), dir.path()).unwrap();
        clear_auth(dir.path()).unwrap();
        assert_eq!(load_auth(dir.path()).unwrap(), None);
        clear_auth(dir.path()).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(auth_file_path(dir.path()), "{not json").unwrap();
        assert!(matches!(
            load_auth(dir.path()),
            Err(AuthStoreError::Parse { .. })
        ));
    }
}
