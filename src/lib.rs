#![doc(html_root_url = "https://docs.rs/nebula/latest")]
//! Public API for the `nebula` library.
//!
//! `nebula` maintains one logical session against a real-time gateway that
//! speaks JSON envelopes over a message-oriented transport: it performs the
//! hello handshake, proves liveness on the server's heartbeat cadence,
//! negotiates identify or resume, honours server-driven reconnect
//! directives with a linear backoff, and releases outbound frames under the
//! gateway's rate-limit budget.
//!
//! # Examples
//!
//! ```no_run
//! use nebula::{GatewayClient, Intent};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), nebula::ClientError> {
//! let client = GatewayClient::builder("wss://gateway.example.net")
//!     .token("bot-token")
//!     .intents([Intent::Guilds, Intent::GuildMessages])
//!     .on_dispatch(|event, payload| println!("{event}: {payload}"))
//!     .build()
//!     .expect("valid configuration");
//!
//! client.connect().await?;
//! client.send(&serde_json::json!({"op": 3, "d": {"status": "online"}}))?;
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod intents;
pub mod protocol;
pub mod transport;

mod backoff;
mod heartbeat;
mod outbound;
mod session;

pub use client::{
    ClientError,
    ConfigError,
    Disconnect,
    GatewayClient,
    GatewayClientBuilder,
    ReconnectOptions,
    ShardIdentity,
};
pub use intents::{Intent, Intents};
pub use protocol::Frame;
pub use transport::{Connector, FrameSink, FrameStream, TransportError, TransportEvent, WsConnector};
