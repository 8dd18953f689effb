//! Rate-limited outbound queue.
//!
//! Outbound frames are buffered in a FIFO channel and released under a
//! rolling token budget: [`RATE_LIMIT_TOTAL`](crate::protocol::RATE_LIMIT_TOTAL)
//! frames per [`RATE_LIMIT_WINDOW`](crate::protocol::RATE_LIMIT_WINDOW). A
//! dedicated writer task drains the channel so a rate-limited backlog never
//! stalls inbound frame processing. Frames are deferred, never dropped or
//! reordered; heartbeat probes and control frames share the same FIFO.

use leaky_bucket::RateLimiter;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{protocol, transport::FrameSink};

/// Producer side and writer task of one connection's outbound path.
///
/// Owned by the lifecycle worker for exactly the lifetime of one transport;
/// [`shutdown`](Self::shutdown) stops the writer immediately (pending frames
/// are discarded with the connection) and returns the sink so the worker can
/// close it with an appropriate code.
pub(crate) struct OutboundQueue {
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    writer: JoinHandle<Box<dyn FrameSink>>,
}

impl OutboundQueue {
    /// Spawn the writer task over a freshly opened sink.
    pub(crate) fn start(sink: Box<dyn FrameSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let limiter = RateLimiter::builder()
            .initial(protocol::RATE_LIMIT_TOTAL)
            .refill(protocol::RATE_LIMIT_TOTAL)
            .max(protocol::RATE_LIMIT_TOTAL)
            .interval(protocol::RATE_LIMIT_WINDOW)
            .build();
        let writer = tokio::spawn(run_writer(sink, rx, limiter, cancel.clone()));
        Self { tx, cancel, writer }
    }

    /// A sender handle for the client-facing `send()` path.
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<String> { self.tx.clone() }

    /// Append one serialized frame to the pending sequence.
    pub(crate) fn enqueue(&self, text: String) {
        if self.tx.send(text).is_err() {
            warn!("outbound writer stopped; frame dropped");
        }
    }

    /// Stop the writer without draining and reclaim the sink.
    pub(crate) async fn shutdown(self) -> Option<Box<dyn FrameSink>> {
        self.cancel.cancel();
        drop(self.tx);
        self.writer.await.ok()
    }
}

/// Drain the queue through the token budget until cancelled or the channel
/// closes, then hand the sink back.
async fn run_writer(
    mut sink: Box<dyn FrameSink>,
    mut rx: mpsc::UnboundedReceiver<String>,
    limiter: RateLimiter,
    cancel: CancellationToken,
) -> Box<dyn FrameSink> {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = rx.recv() => next,
        };
        let Some(text) = next else { break };

        // The close path must never wait out a depleted budget: frames still
        // deferred at shutdown die with the connection.
        tokio::select! {
            biased;
            () = cancel.cancelled() => return sink,
            () = limiter.acquire(1) => {}
        }

        if let Err(e) = sink.send(text).await {
            debug!("outbound write failed: {e}");
            return sink;
        }
        debug!("frame written");
    }

    // Flush frames that were already queued when the shutdown arrived and
    // still fit the budget, so a frame enqueued moments before a close is
    // not lost to task scheduling.
    while let Ok(text) = rx.try_recv() {
        if !limiter.try_acquire(1) || sink.send(text).await.is_err() {
            break;
        }
    }
    sink
}
