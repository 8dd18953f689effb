//! Reconnection backoff policy.
//!
//! The wait between attempts grows linearly: each retry adds `delay` to an
//! accumulator, and the scheduled timeout is the accumulator capped at
//! `max_delay`. The policy object lives for the duration of one `connect()`
//! call, across every retry it spawns; a successful connection does not
//! reset it mid-session.

use std::time::Duration;

use crate::client::config::ReconnectOptions;

/// Retry state consulted after every recoverable close.
#[derive(Clone, Debug)]
pub(crate) struct ReconnectPolicy {
    /// Remaining attempts, or `None` for unlimited.
    attempts_remaining: Option<u32>,
    delay: Duration,
    max_delay: Duration,
    wait: Duration,
}

impl ReconnectPolicy {
    pub(crate) fn new(options: &ReconnectOptions) -> Self {
        Self {
            attempts_remaining: options.attempts,
            delay: options.delay,
            max_delay: options.max_delay,
            wait: Duration::ZERO,
        }
    }

    /// Consume one attempt and return the timeout before the next one, or
    /// `None` when attempts are exhausted.
    pub(crate) fn next_timeout(&mut self) -> Option<Duration> {
        match self.attempts_remaining.as_mut() {
            Some(0) => return None,
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        self.wait += self.delay;
        Some(self.wait.min(self.max_delay))
    }
}
