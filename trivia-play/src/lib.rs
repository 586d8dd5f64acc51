//! Client-side game session controller for the trivia platform.
//!
//! [`GameController`] drives one play-through against a
//! [`trivia_client::SessionGateway`]: starting or resuming a session,
//! answering with paced feedback, and reconciling completion against a
//! backend that may lag behind the last answer. [`catalog`] turns questions
//! from the external bank into a playable trivia. [`AppContext`] holds the
//! authenticated identity; [`ui`] is the ratatui front end used by the
//! `trivia` binary.

pub mod auth_file;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod resume;
pub mod session;
pub mod timer;
pub mod ui;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{GameConfig, RetryPolicy, Settings};
pub use context::{AppContext, ContextError};
pub use controller::{
    AbandonOutcome, Feedback, GameController, GameSnapshot, GameType, Phase, PhaseKind, PlayState,
};
pub use error::{GameError, GameResult};
pub use reconciler::CompletionReconciler;
pub use resume::{display_pointer, plan_resume, ResumePlan};
pub use session::GameSession;
pub use timer::QuestionTimer;
