use std::time::{Duration, Instant};

/// Elapsed-time counter for the question on screen.
///
/// Runs only while the player is answering. The value is advisory telemetry
/// sent with the answer; scoring happens server-side.
#[derive(Debug, Clone, Default)]
pub struct QuestionTimer {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl QuestionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the counter and start it at `now`. Called on every question load.
    pub fn restart(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(now);
    }

    /// Stop the counter, keeping the time accumulated so far.
    pub fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    /// Continue from the accumulated value.
    pub fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    /// Zero the counter and leave it stopped.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }

    /// Whole seconds elapsed, as reported to the backend.
    pub fn elapsed_secs(&self, now: Instant) -> u32 {
        u32::try_from(self.elapsed(now).as_secs()).unwrap_or(u32::MAX)
    }

    /// Format a duration for display as M:SS.
    pub fn format_time(duration: Duration) -> String {
        let total_secs = duration.as_secs();
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}
