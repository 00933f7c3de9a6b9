use std::time::Duration;

use tokio::time::Instant;

/// Holds at most one pending retry deadline.
///
/// Scheduling again replaces whatever was pending. Polling past the deadline
/// clears it and reports that it fired, exactly once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetryScheduler {
    deadline: Option<Instant>,
}

impl RetryScheduler {
    pub fn new() -> RetryScheduler {
        RetryScheduler::default()
    }

    /// Sets the deadline to `now + delay`, superseding any pending one.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration) {
        if let Some(previous) = self.deadline {
            log::debug!("superseding retry deadline {:?}", previous);
        }
        self.deadline = Some(now + delay);
    }

    /// Returns `true` and clears the deadline if `now` has reached it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}
