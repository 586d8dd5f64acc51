//! Idempotent session completion over an eventually consistent backend.
//!
//! Right after the last answer the backend may not yet count it, so
//! completion is a bounded poll: fetch, complete once everything is
//! answered, otherwise back off and fetch again. A session that turns out to
//! be completed or abandoned already is returned as success.

use trivia_client::{ClientError, SessionGateway, SessionRecord};

use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::error::{GameError, GameResult};

pub struct CompletionReconciler<'a, G: ?Sized, C: ?Sized> {
    gateway: &'a G,
    clock: &'a C,
    policy: RetryPolicy,
}

/// Result of one fetch/complete round.
enum Round {
    Done(SessionRecord),
    Lagging,
}

impl<'a, G, C> CompletionReconciler<'a, G, C>
where
    G: SessionGateway + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(gateway: &'a G, clock: &'a C, policy: RetryPolicy) -> Self {
        Self {
            gateway,
            clock,
            policy,
        }
    }

    /// Drive the session to a terminal state and return its final record.
    pub async fn complete(&self, session_id: &str) -> GameResult<SessionRecord> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(session_id, attempt, max_attempts, "completion attempt");

            match self.round(session_id).await? {
                Round::Done(record) => {
                    tracing::info!(
                        session_id,
                        attempt,
                        status = record.status.as_str(),
                        total_score = record.total_score,
                        "session finished"
                    );
                    return Ok(record);
                }
                Round::Lagging if attempt >= max_attempts => {
                    tracing::warn!(session_id, attempt, "backend never caught up");
                    return Err(GameError::CompletionTimeout {
                        session_id: session_id.to_string(),
                        attempts: attempt,
                    });
                }
                Round::Lagging => {
                    tracing::debug!(
                        session_id,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        "answers not yet visible, backing off"
                    );
                    self.clock.sleep(self.policy.delay).await;
                }
            }
        }
    }

    async fn round(&self, session_id: &str) -> GameResult<Round> {
        let fresh = self.gateway.session_by_id(session_id).await?;
        if fresh.status.is_terminal() {
            return Ok(Round::Done(fresh));
        }
        if !fresh.all_answered() {
            return Ok(Round::Lagging);
        }

        match self.gateway.complete_session(session_id).await {
            Ok(record) => Ok(Round::Done(record)),
            Err(e) if e.is_already_terminal() => self.refetch_after_race(session_id, e).await,
            Err(e) if e.is_not_all_answered() => Ok(Round::Lagging),
            Err(e) => Err(e.into()),
        }
    }

    /// Another path finished the session between our fetch and complete.
    async fn refetch_after_race(
        &self,
        session_id: &str,
        conflict: ClientError,
    ) -> GameResult<Round> {
        tracing::info!(session_id, "session finished concurrently, fetching final state");
        match self.gateway.session_by_id(session_id).await {
            Ok(record) if record.status.is_terminal() => Ok(Round::Done(record)),
            Ok(_) => Ok(Round::Lagging),
            Err(fetch_err) => {
                tracing::warn!(session_id, error = %fetch_err, "could not fetch final state");
                Err(conflict.into())
            }
        }
    }
}
