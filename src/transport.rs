//! Transport boundary: opening a connection, framing, and close events.
//!
//! The client core never touches a socket directly. It drives a pair of
//! boxed trait objects obtained from a [`Connector`]: a [`FrameSink`] the
//! outbound queue writes to, and a [`FrameStream`] the lifecycle worker
//! reads. [`WsConnector`] is the production WebSocket implementation; tests
//! substitute channel-backed fakes.

use async_trait::async_trait;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode},
};

/// Errors raised at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("failed to open gateway connection: {0}")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The transport failed mid-stream.
    #[error("transport error: {0}")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A write was attempted on a closed transport.
    #[error("transport closed")]
    Closed,
}

/// Inbound transport events delivered to the lifecycle worker.
#[derive(Debug)]
pub enum TransportEvent {
    /// One complete text frame.
    Frame(String),
    /// The peer closed the connection.
    Closed { code: u16, reason: String },
}

/// Write half of an open transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport is closed or the write fails.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Initiate a close with the given code.
    ///
    /// # Errors
    ///
    /// Returns an error when the close handshake cannot be started; callers
    /// tearing a connection down ignore it.
    async fn close(&mut self, code: u16) -> Result<(), TransportError>;
}

/// Read half of an open transport.
#[async_trait]
pub trait FrameStream: Send {
    /// The next event, or `None` once the stream has ended without a close
    /// frame.
    async fn next(&mut self) -> Option<Result<TransportEvent, TransportError>>;
}

/// Opens transports for the client. One implementation per transport kind;
/// the client holds it for the lifetime of every reconnection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `url` and split it into its two halves.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the connection cannot be
    /// established; the client treats this as a recoverable failure.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError>;
}

type WsStreamInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production WebSocket connector backed by `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(Box::new(e)))?;
        let (sink, stream) = stream.split();
        Ok((Box::new(WsSink(sink)), Box::new(WsStream(stream))))
    }
}

struct WsSink(SplitSink<WsStreamInner, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Io(Box::new(e)))
    }

    async fn close(&mut self, code: u16) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        self.0
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::Io(Box::new(e)))
    }
}

struct WsStream(SplitStream<WsStreamInner>);

#[async_trait]
impl FrameStream for WsStream {
    async fn next(&mut self) -> Option<Result<TransportEvent, TransportError>> {
        loop {
            return match self.0.next().await? {
                Ok(Message::Text(text)) => Some(Ok(TransportEvent::Frame(text))),
                // The envelope is JSON either way; binary frames must still
                // decode as UTF-8 text.
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => Some(Ok(TransportEvent::Frame(text))),
                    Err(e) => Some(Err(TransportError::Io(Box::new(e)))),
                },
                Ok(Message::Close(frame)) => {
                    let (code, reason) = frame.map_or((1005, String::new()), |f| {
                        (u16::from(f.code), f.reason.into_owned())
                    });
                    Some(Ok(TransportEvent::Closed { code, reason }))
                }
                // Control frames the websocket layer already answers.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => Some(Err(TransportError::Io(Box::new(e)))),
            };
        }
    }
}
