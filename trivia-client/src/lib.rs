//! Trivia REST client library
//!
//! Typed boundary to the trivia backend. Sessions are played through
//! [`SessionGateway`]; [`CatalogGateway`] lists and imports trivias and
//! [`AuthGateway`] covers accounts.
//! Backend responses are normalized on receipt and failures are classified
//! into tagged [`ErrorKind`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use trivia_client::{SessionGateway, TriviaClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TriviaClient::new("http://localhost:3000/api", Duration::from_secs(30))?
//!         .with_token("token");
//!     let session = client.create_session("trivia-id").await?;
//!     println!("Created session: {}", session.session_id);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod traits;
mod types;
mod wire;

#[cfg(any(test, feature = "mock"))]
mod mock;

pub use client::TriviaClient;
pub use error::{classify_failure, ClientError, ClientResult, ConflictReason, ErrorKind};
pub use traits::{AuthGateway, CatalogGateway, SessionGateway};
pub use types::*;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockAuthGateway, MockCall, MockSessionGateway, ScriptedQuestion};
