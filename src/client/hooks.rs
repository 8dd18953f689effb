//! Observer callback slots.
//!
//! One slot per event kind, configured on the builder with last-writer-wins
//! semantics. Every slot is optional: dispatch and disconnect default to
//! no-ops, the error slot defaults to a diagnostic log line. Callbacks run
//! on the lifecycle worker, so one frame's callbacks always complete before
//! the next frame or timer is processed.

use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use super::error::ClientError;

/// Observable close notification.
#[derive(Clone, Debug)]
pub struct Disconnect {
    /// The transport close code.
    pub code: u16,
    /// Human-readable reason supplied by the peer, possibly empty.
    pub reason: String,
    /// Why the client itself initiated the close, when it did.
    pub explanation: Option<&'static str>,
}

pub(crate) type DispatchFn = Arc<dyn Fn(&str, &Value) + Send + Sync>;
pub(crate) type DisconnectFn = Arc<dyn Fn(&Disconnect) + Send + Sync>;
pub(crate) type ErrorFn = Arc<dyn Fn(&ClientError) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub dispatch: Option<DispatchFn>,
    pub disconnect: Option<DisconnectFn>,
    pub error: Option<ErrorFn>,
}

impl Hooks {
    pub(crate) fn dispatch(&self, event: &str, payload: &Value) {
        if let Some(hook) = &self.dispatch {
            hook(event, payload);
        }
    }

    pub(crate) fn disconnect(&self, notice: &Disconnect) {
        if let Some(hook) = &self.disconnect {
            hook(notice);
        }
    }

    pub(crate) fn error(&self, err: &ClientError) {
        match &self.error {
            Some(hook) => hook(err),
            None => error!("gateway client error: {err}"),
        }
    }
}
