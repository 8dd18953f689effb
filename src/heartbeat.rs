//! Heartbeat liveness monitor.
//!
//! The gateway announces its heartbeat cadence in the hello frame; from then
//! on the client must prove liveness every period. A probe is only sent when
//! the previous one was acknowledged; an unacknowledged probe at the next
//! cadence point means the connection is dead.

use std::time::Duration;

use tokio::time::{self, Instant, Interval};

/// Outcome of a probe decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Liveness {
    /// The previous probe was acknowledged; a new one was marked pending.
    Alive,
    /// The previous probe was never acknowledged; the connection is dead.
    Dead,
}

/// Per-connection heartbeat state: an acknowledgement flag and the cadence
/// timer. Armed once at hello, disarmed unconditionally during cleanup.
pub(crate) struct Heartbeat {
    acked: bool,
    timer: Option<Interval>,
}

impl Heartbeat {
    pub(crate) fn new() -> Self {
        Self {
            acked: true,
            timer: None,
        }
    }

    /// Arm the cadence timer. The first tick fires one full period from now.
    pub(crate) fn arm(&mut self, period: Duration) {
        self.timer = Some(time::interval_at(Instant::now() + period, period));
    }

    pub(crate) fn disarm(&mut self) {
        self.timer = None;
        self.acked = true;
    }

    /// Mark the pending probe acknowledged. No other side effect.
    pub(crate) fn ack(&mut self) { self.acked = true; }

    /// Decide whether a probe may go out, marking it pending if so.
    ///
    /// Shared by the cadence tick and a server-requested out-of-cadence
    /// heartbeat: both paths treat an unacknowledged predecessor as a dead
    /// connection.
    #[must_use]
    pub(crate) fn begin_probe(&mut self) -> Liveness {
        if !self.acked {
            return Liveness::Dead;
        }
        self.acked = false;
        Liveness::Alive
    }

    /// Wait for the next cadence tick; pends forever while disarmed.
    pub(crate) async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
