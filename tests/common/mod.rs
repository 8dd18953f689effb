//! Shared utilities for integration tests.
//!
//! Provides [`ScriptedGateway`], a channel-backed [`Connector`] that lets a
//! test play the server side of a connection without sockets: each
//! `connect()` call consumes the next scripted outcome, and an accepted
//! connection hands the test a [`ServerEnd`] for sending frames, reading
//! what the client wrote, and observing close codes.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use nebula::{
    Connector, FrameSink, FrameStream, GatewayClient, GatewayClientBuilder, TransportError,
    TransportEvent,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

type InboundTx = mpsc::UnboundedSender<Result<TransportEvent, TransportError>>;
type InboundRx = mpsc::UnboundedReceiver<Result<TransportEvent, TransportError>>;

enum Script {
    Refuse,
    Open { inbound: InboundRx, sink: FakeSink },
}

/// A connector whose connection attempts are scripted in advance.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<VecDeque<Script>>,
    attempts: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Script the next connection attempt to fail at the transport level.
    pub fn refuse(&self) { self.scripts.lock().push_back(Script::Refuse); }

    /// Script the next connection attempt to succeed, returning the server
    /// side of the connection.
    pub fn accept(&self) -> ServerEnd {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = mpsc::unbounded_channel();
        self.scripts.lock().push_back(Script::Open {
            inbound: inbound_rx,
            sink: FakeSink {
                outbound: outbound_tx,
                closes: close_tx,
            },
        });
        ServerEnd {
            inbound: inbound_tx,
            outbound: outbound_rx,
            closes: close_rx,
        }
    }

    /// How many connection attempts the client has made.
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }
}

#[async_trait]
impl Connector for ScriptedGateway {
    async fn connect(
        &self,
        _url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.scripts.lock().pop_front() {
            Some(Script::Open { inbound, sink }) => {
                Ok((Box::new(sink), Box::new(FakeStream { inbound })))
            }
            Some(Script::Refuse) | None => {
                Err(TransportError::Connect("connection refused (scripted)".into()))
            }
        }
    }
}

struct FakeSink {
    outbound: mpsc::UnboundedSender<String>,
    closes: mpsc::UnboundedSender<u16>,
}

#[async_trait]
impl FrameSink for FakeSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, code: u16) -> Result<(), TransportError> {
        let _ = self.closes.send(code);
        Ok(())
    }
}

struct FakeStream {
    inbound: InboundRx,
}

#[async_trait]
impl FrameStream for FakeStream {
    async fn next(&mut self) -> Option<Result<TransportEvent, TransportError>> {
        self.inbound.recv().await
    }
}

/// The test's handle on one accepted connection.
pub struct ServerEnd {
    inbound: InboundTx,
    /// Frames the client wrote, in transmission order.
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Close codes from the client's sink, in order.
    pub closes: mpsc::UnboundedReceiver<u16>,
}

impl ServerEnd {
    /// Deliver a raw text frame to the client.
    pub fn text(&self, raw: impl Into<String>) {
        let _ = self
            .inbound
            .send(Ok(TransportEvent::Frame(raw.into())));
    }

    /// Deliver a JSON frame to the client.
    pub fn frame(&self, value: &Value) { self.text(value.to_string()); }

    pub fn hello(&self, heartbeat_interval_ms: u64) {
        self.frame(&json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval_ms}}));
    }

    pub fn ready(&self, session_id: &str, sequence: u64) {
        self.frame(&json!({
            "op": 0,
            "s": sequence,
            "t": "READY",
            "d": {"session_id": session_id},
        }));
    }

    pub fn resumed(&self, sequence: u64) {
        self.frame(&json!({"op": 0, "s": sequence, "t": "RESUMED", "d": null}));
    }

    pub fn dispatch(&self, event: &str, sequence: u64, payload: Value) {
        self.frame(&json!({"op": 0, "s": sequence, "t": event, "d": payload}));
    }

    pub fn heartbeat_ack(&self) { self.frame(&json!({"op": 11})); }

    pub fn request_heartbeat(&self) { self.frame(&json!({"op": 1})); }

    pub fn reconnect_directive(&self) { self.frame(&json!({"op": 7})); }

    pub fn invalid_session(&self, resumable: bool) {
        self.frame(&json!({"op": 9, "d": resumable}));
    }

    /// Close the connection from the server side.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.inbound.send(Ok(TransportEvent::Closed {
            code,
            reason: reason.to_owned(),
        }));
    }

    /// Fail the connection with a transport error.
    pub fn fail(&self) {
        let _ = self
            .inbound
            .send(Err(TransportError::Io("connection reset (scripted)".into())));
    }

    /// The next frame the client wrote.
    pub async fn next_frame(&mut self) -> Value {
        let text = self
            .outbound
            .recv()
            .await
            .expect("client stopped writing frames");
        serde_json::from_str(&text).expect("client wrote invalid JSON")
    }

    /// The next frame the client wrote, asserting its opcode.
    pub async fn expect_op(&mut self, op: u8) -> Value {
        let frame = self.next_frame().await;
        assert_eq!(frame["op"], u64::from(op), "unexpected frame: {frame}");
        frame
    }
}

/// A builder preconfigured with a token and the scripted connector.
pub fn scripted_client(gateway: &Arc<ScriptedGateway>) -> GatewayClientBuilder {
    GatewayClient::builder("wss://gateway.test")
        .token("test-token")
        .connector(Arc::clone(gateway) as Arc<dyn Connector>)
}
