//! Connection lifecycle worker.
//!
//! One worker task is spawned per `connect()` call and owns every piece of
//! mutable connection state: the session, the heartbeat monitor, the
//! reconnection policy, and the transport halves. Inbound frames, heartbeat
//! ticks, and shutdown are multiplexed through a single `tokio::select!`
//! loop with shutdown observed first, so each frame is fully processed
//! before the next frame or timer callback runs.

use std::{sync::Arc, time::Duration};

use log::info;
use serde_json::Value;
use tokio::{sync::oneshot, time};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    config::ClientConfig,
    error::ClientError,
    hooks::{Disconnect, Hooks},
    runtime::Shared,
};
use crate::{
    backoff::ReconnectPolicy,
    heartbeat::{Heartbeat, Liveness},
    outbound::OutboundQueue,
    protocol::{self, Frame, opcode},
    session::Session,
    transport::{Connector, FrameStream, TransportError, TransportEvent},
};

/// Why the current transport stopped.
enum CloseEvent {
    /// The peer closed the connection or the stream ended.
    Remote { code: u16, reason: String },
    /// The client closed its own transport for a protocol-level cause.
    Local {
        code: u16,
        explanation: &'static str,
        retry: bool,
    },
    /// The transport failed to open or failed mid-stream.
    Failed(TransportError),
    /// An inbound frame was not valid protocol content.
    InvalidContent,
    /// `disconnect()` was requested.
    Shutdown,
}

/// What the worker does once a connection has ended.
enum NextStep {
    Retry(Duration),
    Stop,
}

pub(crate) struct Worker {
    config: Arc<ClientConfig>,
    hooks: Arc<Hooks>,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    /// Settles the spawning `connect()` future exactly once.
    settle: Option<oneshot::Sender<Result<(), ClientError>>>,
    session: Session,
    policy: Option<ReconnectPolicy>,
}

impl Worker {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        hooks: Arc<Hooks>,
        connector: Arc<dyn Connector>,
        shared: Arc<Shared>,
        shutdown: CancellationToken,
        settle: oneshot::Sender<Result<(), ClientError>>,
    ) -> Self {
        let session = Session::new(config.resume_session_id.clone());
        let policy = config.reconnect.as_ref().map(ReconnectPolicy::new);
        Self {
            config,
            hooks,
            connector,
            shared,
            shutdown,
            settle: Some(settle),
            session,
            policy,
        }
    }

    /// Drive connection attempts until a terminal outcome or shutdown.
    pub(crate) async fn run(mut self) {
        loop {
            let close = self.run_connection().await;
            match self.classify(close) {
                NextStep::Stop => break,
                NextStep::Retry(timeout) => {
                    debug!("reconnecting in {timeout:?}");
                    tokio::select! {
                        biased;
                        () = self.shutdown.cancelled() => break,
                        () = time::sleep(timeout) => {}
                    }
                }
            }
        }
    }

    /// Open one transport and drive it until it closes, then run cleanup
    /// exactly once.
    async fn run_connection(&mut self) -> CloseEvent {
        let shutdown = self.shutdown.clone();
        let connect = self.connector.connect(&self.config.url);
        let (sink, mut stream) = tokio::select! {
            biased;
            () = shutdown.cancelled() => return CloseEvent::Shutdown,
            result = connect => match result {
                Ok(halves) => halves,
                Err(e) => return CloseEvent::Failed(e),
            },
        };
        info!("gateway connection opened: url={}", self.config.url);

        let queue = OutboundQueue::start(sink);
        *self.shared.outbound.lock() = Some(queue.sender());
        let mut heartbeat = Heartbeat::new();

        let close = self.drive(stream.as_mut(), &queue, &mut heartbeat).await;

        self.notify_close(&close);
        self.cleanup(queue, &mut heartbeat, &close).await;
        close
    }

    async fn drive(
        &mut self,
        stream: &mut dyn FrameStream,
        queue: &OutboundQueue,
        heartbeat: &mut Heartbeat,
    ) -> CloseEvent {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => return CloseEvent::Shutdown,
                () = heartbeat.tick() => {
                    if let Some(close) = self.probe(queue, heartbeat) {
                        return close;
                    }
                }
                event = stream.next() => match event {
                    Some(Ok(TransportEvent::Frame(text))) => {
                        if let Some(close) = self.handle_frame(&text, queue, heartbeat) {
                            return close;
                        }
                    }
                    Some(Ok(TransportEvent::Closed { code, reason })) => {
                        return CloseEvent::Remote { code, reason };
                    }
                    Some(Err(e)) => return CloseEvent::Failed(e),
                    None => {
                        return CloseEvent::Remote {
                            code: protocol::CLOSE_ABNORMAL,
                            reason: String::new(),
                        };
                    }
                },
            }
        }
    }

    /// Interpret one inbound frame. Returns the close event it provoked, if
    /// any.
    fn handle_frame(
        &mut self,
        text: &str,
        queue: &OutboundQueue,
        heartbeat: &mut Heartbeat,
    ) -> Option<CloseEvent> {
        let Ok(frame) = Frame::decode(text) else {
            return Some(CloseEvent::InvalidContent);
        };

        // Sequence is captured before opcode handling so that a heartbeat
        // sent as a side effect of this same frame carries the new value.
        if let Some(sequence) = frame.s {
            self.session.observe_sequence(sequence);
        }

        match frame.op {
            opcode::HELLO => {
                let Some(interval) = frame.d.get("heartbeat_interval").and_then(Value::as_u64)
                else {
                    return Some(CloseEvent::InvalidContent);
                };
                heartbeat.arm(Duration::from_millis(interval));
                let negotiation = self.session.negotiate(&self.config);
                self.enqueue(queue, &negotiation);
            }
            opcode::HEARTBEAT => return self.probe(queue, heartbeat),
            opcode::HEARTBEAT_ACK => heartbeat.ack(),
            opcode::RECONNECT => {
                return Some(CloseEvent::Local {
                    code: protocol::CLOSE_UNKNOWN,
                    explanation: "reconnect requested by server",
                    retry: true,
                });
            }
            opcode::INVALID_SESSION => {
                if frame.d.as_bool() == Some(true) {
                    // Resumable: retry the negotiation on this transport.
                    let negotiation = self.session.negotiate(&self.config);
                    self.enqueue(queue, &negotiation);
                } else {
                    return Some(CloseEvent::Local {
                        code: protocol::CLOSE_UNKNOWN,
                        explanation: "session invalidated",
                        retry: false,
                    });
                }
            }
            opcode::DISPATCH => self.handle_dispatch(&frame),
            other => debug!("ignoring unknown opcode {other}"),
        }
        None
    }

    fn handle_dispatch(&mut self, frame: &Frame) {
        let Some(event) = frame.t.as_deref() else {
            return;
        };
        match event {
            protocol::READY => {
                if let Some(id) = frame.d.get("session_id").and_then(Value::as_str) {
                    self.session.establish(id.to_owned());
                    *self.shared.session_id.lock() = Some(id.to_owned());
                }
                self.settle_ok();
            }
            protocol::RESUMED => self.settle_ok(),
            _ => {}
        }
        // The application callback runs after internal bookkeeping.
        self.hooks.dispatch(event, &frame.d);
    }

    /// Send a liveness probe, or declare the connection dead when the
    /// previous probe went unacknowledged.
    fn probe(&mut self, queue: &OutboundQueue, heartbeat: &mut Heartbeat) -> Option<CloseEvent> {
        match heartbeat.begin_probe() {
            Liveness::Dead => Some(CloseEvent::Local {
                code: protocol::CLOSE_UNKNOWN,
                explanation: "heartbeat unacknowledged",
                retry: true,
            }),
            Liveness::Alive => {
                self.enqueue(queue, &Frame::heartbeat(self.session.sequence()));
                None
            }
        }
    }

    fn enqueue(&self, queue: &OutboundQueue, frame: &Frame) {
        match frame.encode() {
            Ok(text) => queue.enqueue(text),
            Err(e) => self.hooks.error(&ClientError::Serialize(e)),
        }
    }

    fn notify_close(&self, close: &CloseEvent) {
        let notice = match close {
            CloseEvent::Remote { code, reason } => Disconnect {
                code: *code,
                reason: reason.clone(),
                explanation: None,
            },
            CloseEvent::Local {
                code, explanation, ..
            } => Disconnect {
                code: *code,
                reason: String::new(),
                explanation: Some(*explanation),
            },
            CloseEvent::Shutdown => Disconnect {
                code: 1000,
                reason: String::new(),
                explanation: Some("disconnect requested"),
            },
            // Transport failures and invalid content surface as errors, not
            // as close notifications.
            CloseEvent::Failed(_) | CloseEvent::InvalidContent => return,
        };
        info!(
            "gateway connection closed: code={}, explanation={:?}",
            notice.code, notice.explanation
        );
        self.hooks.disconnect(&notice);
    }

    /// Reset all per-transport state. Runs exactly once per transport.
    async fn cleanup(&mut self, queue: OutboundQueue, heartbeat: &mut Heartbeat, close: &CloseEvent) {
        self.shared.outbound.lock().take();
        self.shared.session_id.lock().take();
        heartbeat.disarm();
        self.session.clear();

        let code = match close {
            CloseEvent::Remote { code, .. } | CloseEvent::Local { code, .. } => *code,
            CloseEvent::Failed(_) | CloseEvent::InvalidContent | CloseEvent::Shutdown => 1000,
        };
        if let Some(mut sink) = queue.shutdown().await {
            let _ = sink.close(code).await;
        }
    }

    fn classify(&mut self, close: CloseEvent) -> NextStep {
        match close {
            CloseEvent::Shutdown => NextStep::Stop,
            CloseEvent::Remote { code, reason } => {
                if !protocol::is_recoverable(code) {
                    let error = if code == protocol::CLOSE_INVALID_TOKEN {
                        ClientError::InvalidToken
                    } else {
                        ClientError::NonRecoverableClose { code, reason }
                    };
                    self.fail(error);
                    return NextStep::Stop;
                }
                if self.shutdown.is_cancelled() {
                    return NextStep::Stop;
                }
                self.retry_step(ClientError::Closed { code, reason })
            }
            CloseEvent::Local {
                code,
                explanation,
                retry,
            } => {
                if !retry || self.shutdown.is_cancelled() {
                    return NextStep::Stop;
                }
                self.retry_step(ClientError::Closed {
                    code,
                    reason: explanation.to_owned(),
                })
            }
            CloseEvent::Failed(e) => self.fail_then_retry(ClientError::Transport(e)),
            CloseEvent::InvalidContent => self.fail_then_retry(ClientError::InvalidContent),
        }
    }

    /// Report the failure immediately, then keep retrying when a policy is
    /// active: once `connect()` has been settled, later attempts surface
    /// only through the callbacks.
    fn fail_then_retry(&mut self, error: ClientError) -> NextStep {
        self.fail(error);
        if self.shutdown.is_cancelled() {
            return NextStep::Stop;
        }
        let Some(policy) = self.policy.as_mut() else {
            return NextStep::Stop;
        };
        match policy.next_timeout() {
            Some(timeout) => NextStep::Retry(timeout),
            None => {
                self.fail(ClientError::ReconnectExhausted);
                NextStep::Stop
            }
        }
    }

    /// Consult the backoff policy. `no_policy_error` is reported when
    /// reconnection is disabled; exhaustion is always terminal.
    fn retry_step(&mut self, no_policy_error: ClientError) -> NextStep {
        let Some(policy) = self.policy.as_mut() else {
            self.fail(no_policy_error);
            return NextStep::Stop;
        };
        match policy.next_timeout() {
            Some(timeout) => NextStep::Retry(timeout),
            None => {
                self.fail(ClientError::ReconnectExhausted);
                NextStep::Stop
            }
        }
    }

    fn settle_ok(&mut self) {
        if let Some(settle) = self.settle.take() {
            let _ = settle.send(Ok(()));
        }
    }

    /// Report a failure: through the pending `connect()` future when one
    /// exists, through the error callback otherwise.
    fn fail(&mut self, error: ClientError) {
        match self.settle.take() {
            Some(settle) => {
                if let Err(Err(error)) = settle.send(Err(error)) {
                    self.hooks.error(&error);
                }
            }
            None => self.hooks.error(&error),
        }
    }
}
