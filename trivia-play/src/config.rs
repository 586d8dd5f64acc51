//! Configuration for the trivia client runtime.
//!
//! Every tunable has a compile-time default and can be overridden through a
//! dedicated environment variable. Values that fail to parse fall back to the
//! default.

use std::path::PathBuf;
use std::time::Duration;

/// Default backend base URL.
const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Default HTTP request timeout (in seconds).
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default feedback countdown before the next question (in milliseconds).
const DEFAULT_FEEDBACK_DELAY_MS: u64 = 2000;

/// Default feedback countdown after the last question (in milliseconds).
const DEFAULT_FINAL_FEEDBACK_DELAY_MS: u64 = 3000;

/// Default number of completion attempts.
const DEFAULT_COMPLETE_MAX_ATTEMPTS: u32 = 5;

/// Default delay between completion attempts (in milliseconds).
const DEFAULT_COMPLETE_RETRY_DELAY_MS: u64 = 2000;

/// Directory under `$HOME` holding persisted auth.
const DEFAULT_DATA_DIR: &str = ".trivia";

/// Default log directory.
const DEFAULT_LOG_DIR: &str = "logs";

/// Bounded retry parameters for session completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_COMPLETE_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_COMPLETE_RETRY_DELAY_MS),
        }
    }
}

/// Pacing and retry settings consumed by the game controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    /// Minimum time feedback stays on screen before the next question.
    pub feedback_delay: Duration,
    /// Minimum time feedback stays on screen after the last question.
    pub final_feedback_delay: Duration,
    pub completion: RetryPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            feedback_delay: Duration::from_millis(DEFAULT_FEEDBACK_DELAY_MS),
            final_feedback_delay: Duration::from_millis(DEFAULT_FINAL_FEEDBACK_DELAY_MS),
            completion: RetryPolicy::default(),
        }
    }
}

/// All runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub http_timeout: Duration,
    pub game: GameConfig,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str, default: u64| -> u64 {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!(key, value = %raw, "ignoring unparseable setting");
                    default
                }),
                None => default,
            }
        };

        let max_attempts = parsed(
            "TRIVIA_COMPLETE_MAX_ATTEMPTS",
            u64::from(DEFAULT_COMPLETE_MAX_ATTEMPTS),
        );

        Self {
            api_url: lookup("TRIVIA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            http_timeout: Duration::from_secs(parsed(
                "TRIVIA_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            game: GameConfig {
                feedback_delay: Duration::from_millis(parsed(
                    "TRIVIA_FEEDBACK_DELAY_MS",
                    DEFAULT_FEEDBACK_DELAY_MS,
                )),
                final_feedback_delay: Duration::from_millis(parsed(
                    "TRIVIA_FINAL_FEEDBACK_DELAY_MS",
                    DEFAULT_FINAL_FEEDBACK_DELAY_MS,
                )),
                completion: RetryPolicy {
                    max_attempts: u32::try_from(max_attempts)
                        .unwrap_or(DEFAULT_COMPLETE_MAX_ATTEMPTS)
                        .max(1),
                    delay: Duration::from_millis(parsed(
                        "TRIVIA_COMPLETE_RETRY_DELAY_MS",
                        DEFAULT_COMPLETE_RETRY_DELAY_MS,
                    )),
                },
            },
            data_dir: data_dir_from(lookup("TRIVIA_DATA_DIR"), lookup("HOME")),
            log_dir: lookup("TRIVIA_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        }
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `TRIVIA_DATA_DIR` if set
/// 2. `$HOME/.trivia` if HOME is set
/// 3. `./.trivia` as fallback
fn data_dir_from(explicit: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }
    home.map(PathBuf::from)
        .or_else(dirs::home_dir)
        .map(|h| h.join(DEFAULT_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_DATA_DIR))
}
