//! Gateway client handle.
//!
//! [`GatewayClient`] is the caller-facing side of the actor split: every
//! `connect()` spawns one lifecycle worker task that owns all mutable
//! connection state, and the handle communicates with it through message
//! passing only. `send()` enqueues onto the live connection's outbound
//! queue, `disconnect()` cancels the worker's shutdown token and awaits its
//! cleanup.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{
    builder::GatewayClientBuilder,
    config::{ClientConfig, ShardIdentity},
    error::ClientError,
    hooks::Hooks,
    worker::Worker,
};
use crate::{intents::Intents, transport::Connector};

/// State the lifecycle worker shares with the handle.
///
/// The worker installs the outbound sender when a transport opens and
/// revokes it during cleanup, so `send()` can fail synchronously without a
/// round trip; the session id mirrors the worker-owned session for the
/// public accessor.
#[derive(Default)]
pub(crate) struct Shared {
    pub outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pub session_id: Mutex<Option<String>>,
}

struct WorkerLink {
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// A persistent-connection client for a real-time gateway.
///
/// One instance maintains one logical session: it performs the hello
/// handshake, proves liveness on the server's cadence, negotiates identify
/// or resume, honours server-driven reconnect directives, and rate-limits
/// outbound frames. See [`GatewayClient::builder`] for configuration.
pub struct GatewayClient {
    config: Arc<ClientConfig>,
    hooks: Arc<Hooks>,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    worker: Mutex<Option<WorkerLink>>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient").finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Start building a client for the gateway at `url`.
    pub fn builder(url: impl Into<String>) -> GatewayClientBuilder {
        GatewayClientBuilder::new(url)
    }

    pub(crate) fn new(config: ClientConfig, hooks: Hooks, connector: Arc<dyn Connector>) -> Self {
        Self {
            config: Arc::new(config),
            hooks: Arc::new(hooks),
            connector,
            shared: Arc::new(Shared::default()),
            worker: Mutex::new(None),
        }
    }

    /// Open the connection and drive it to a first established session.
    ///
    /// Resolves once the gateway confirms the session (ready or resumed) and
    /// rejects on the first failed attempt or a terminal failure. When
    /// reconnection is enabled the client keeps retrying in the background
    /// either way; later outcomes surface through the disconnect and error
    /// callbacks, never through this future.
    ///
    /// # Errors
    ///
    /// Fails fast with [`ClientError::AlreadyConnected`] while a previous
    /// `connect()` is still connected or reconnecting. Otherwise returns the
    /// first attempt's failure or a terminal outcome: invalid token, a
    /// non-recoverable close, exhausted reconnection attempts, invalid frame
    /// content, or a transport failure.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (settle_tx, settle_rx) = oneshot::channel();
        {
            let mut worker = self.worker.lock();
            if let Some(link) = worker.as_ref()
                && !link.handle.is_finished()
            {
                return Err(ClientError::AlreadyConnected);
            }

            let shutdown = CancellationToken::new();
            let task = Worker::new(
                Arc::clone(&self.config),
                Arc::clone(&self.hooks),
                Arc::clone(&self.connector),
                Arc::clone(&self.shared),
                shutdown.clone(),
                settle_tx,
            );
            *worker = Some(WorkerLink {
                shutdown,
                handle: tokio::spawn(task.run()),
            });
        }

        match settle_rx.await {
            Ok(outcome) => outcome,
            // The worker was torn down by `disconnect()` before the session
            // was established.
            Err(_) => Err(ClientError::Disconnected),
        }
    }

    /// Permanently tear down the connection.
    ///
    /// Cancels any pending reconnection before its timer fires, closes the
    /// transport, and resolves once the worker has finished cleanup.
    /// Idempotent: calling it with no connection is a no-op.
    pub async fn disconnect(&self) {
        let link = self.worker.lock().take();
        if let Some(link) = link {
            link.shutdown.cancel();
            let _ = link.handle.await;
        }
    }

    /// Queue one frame for transmission.
    ///
    /// Frames are serialized immediately, delivered in FIFO order, and
    /// released under the gateway's rate-limit budget; a depleted budget
    /// defers frames, it never drops them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] when no transport is open and
    /// [`ClientError::Serialize`] when the frame cannot be serialized.
    pub fn send<T: Serialize>(&self, frame: &T) -> Result<(), ClientError> {
        let text = serde_json::to_string(frame).map_err(ClientError::Serialize)?;
        self.shared
            .outbound
            .lock()
            .as_ref()
            .ok_or(ClientError::NotConnected)?
            .send(text)
            .map_err(|_| ClientError::NotConnected)
    }

    /// The id of the currently established session, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<String> { self.shared.session_id.lock().clone() }

    /// The shard identity sent at identify time.
    #[must_use]
    pub fn shard(&self) -> ShardIdentity { self.config.shard }

    /// The intent mask sent at identify time, if one was configured.
    #[must_use]
    pub fn intents(&self) -> Option<Intents> { self.config.intents }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        // A dropped handle must not leak a reconnecting worker task.
        if let Some(link) = self.worker.get_mut().take() {
            link.shutdown.cancel();
        }
    }
}
