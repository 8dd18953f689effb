//! Wire-level protocol tables and the frame envelope.
//!
//! Every message exchanged with the gateway is one JSON object carrying an
//! operation code, an opcode-specific payload, and (for dispatches) a
//! server-assigned sequence number and event name. The tables in this module
//! are process-wide constants: loaded once at startup, never mutated.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway operation codes.
pub mod opcode {
    /// An application event pushed by the gateway.
    pub const DISPATCH: u8 = 0;
    /// Liveness probe, sent by the client on cadence or on server request.
    pub const HEARTBEAT: u8 = 1;
    /// Establishes a brand-new session.
    pub const IDENTIFY: u8 = 2;
    /// Requests continuation of a previously known session.
    pub const RESUME: u8 = 6;
    /// Server directive to drop the transport and reconnect.
    pub const RECONNECT: u8 = 7;
    /// The server no longer recognises the session.
    pub const INVALID_SESSION: u8 = 9;
    /// First frame after the transport opens; announces the heartbeat cadence.
    pub const HELLO: u8 = 10;
    /// Acknowledges a client heartbeat.
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Close codes after which the client must not retry.
pub const NON_RECOVERABLE_CLOSE_CODES: [u16; 5] = [4004, 4010, 4011, 4013, 4014];

/// Close code signalling rejected credentials.
pub const CLOSE_INVALID_TOKEN: u16 = 4004;

/// Close code used when the client tears down its own transport for a
/// recoverable cause (dead heartbeat, server reconnect directive).
pub const CLOSE_UNKNOWN: u16 = 4000;

/// Close code reported when the transport ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Dispatch event marking a freshly established session.
pub const READY: &str = "READY";
/// Dispatch event confirming a resumed session.
pub const RESUMED: &str = "RESUMED";

/// Outbound frames permitted per rate-limit window.
pub const RATE_LIMIT_TOTAL: usize = 120;
/// Length of the rate-limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Whether a close code permits a reconnection attempt.
#[must_use]
pub fn is_recoverable(code: u16) -> bool { !NON_RECOVERABLE_CLOSE_CODES.contains(&code) }

/// One JSON message unit exchanged over the transport.
///
/// `d` defaults to `null` when absent; `s` and `t` only appear on dispatch
/// frames and are omitted from serialized output when unset.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Frame {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl Frame {
    /// Create a frame with the given opcode and payload.
    #[must_use]
    pub fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// Build a heartbeat probe carrying the last observed sequence, or `null`
    /// if none was ever observed.
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(opcode::HEARTBEAT, sequence.map_or(Value::Null, Into::into))
    }

    /// Decode a frame from transport text.
    ///
    /// # Errors
    ///
    /// Returns the underlying decode error when the text is not a valid frame
    /// envelope; callers treat this as an "invalid content" protocol failure.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(text) }

    /// Encode the frame for the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be represented as JSON text.
    pub fn encode(&self) -> Result<String, serde_json::Error> { serde_json::to_string(self) }
}
