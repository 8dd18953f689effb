//! Error types for gateway client operations.

use crate::transport::TransportError;

/// Errors emitted by [`crate::GatewayClient`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// `connect()` was called while already connected or mid-reconnection.
    #[error("client is already connected or reconnecting")]
    AlreadyConnected,
    /// `send()` was called without a live transport.
    #[error("client is not connected")]
    NotConnected,
    /// The gateway rejected the supplied credentials.
    #[error("invalid token")]
    InvalidToken,
    /// The gateway closed with a code in the non-recoverable set.
    #[error("gateway closed the connection: {reason} (code {code})")]
    NonRecoverableClose { code: u16, reason: String },
    /// The connection closed and no reconnection policy was active.
    #[error("gateway connection closed: {reason} (code {code})")]
    Closed { code: u16, reason: String },
    /// An inbound frame failed to parse as a protocol envelope.
    #[error("invalid frame content")]
    InvalidContent,
    /// Every attempt granted by the reconnection policy has been used.
    #[error("maximum reconnection attempts reached")]
    ReconnectExhausted,
    /// The client was disconnected before the session was established.
    #[error("client disconnected before the session was established")]
    Disconnected,
    /// The transport failed to open or failed mid-stream.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// An outbound frame could not be serialized.
    #[error("failed to serialize outbound frame")]
    Serialize(#[source] serde_json::Error),
}

/// Errors raised while validating builder options.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No token was supplied.
    #[error("a gateway token is required")]
    MissingToken,
    /// The gateway URL was empty.
    #[error("a gateway url is required")]
    MissingUrl,
    /// The backoff increment exceeds its cap.
    #[error("reconnect delay {delay_ms} ms exceeds max delay {max_delay_ms} ms")]
    DelayExceedsMax { delay_ms: u128, max_delay_ms: u128 },
    /// The shard index does not fit the shard count.
    #[error("shard index {index} out of range for shard count {count}")]
    ShardOutOfRange { index: u32, count: u32 },
}
