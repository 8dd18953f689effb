//! Builder for configuring a gateway client.
//!
//! All option validation and defaulting happens here, in one place, so the
//! connection core only ever works with an already-validated
//! [`ClientConfig`].

use std::sync::Arc;

use serde_json::Value;

use super::{
    config::{ClientConfig, ReconnectOptions, ShardIdentity},
    error::{ClientError, ConfigError},
    hooks::{Disconnect, Hooks},
    runtime::GatewayClient,
};
use crate::{
    intents::{Intent, Intents},
    transport::{Connector, WsConnector},
};

/// Builder for [`GatewayClient`].
///
/// # Examples
///
/// ```
/// use nebula::{GatewayClient, Intent};
///
/// let client = GatewayClient::builder("wss://gateway.example.net")
///     .token("bot-token")
///     .intents([Intent::Guilds, Intent::GuildMessages])
///     .build()
///     .expect("valid configuration");
/// let _ = client;
/// ```
#[must_use]
pub struct GatewayClientBuilder {
    url: String,
    token: Option<String>,
    session_id: Option<String>,
    shard: ShardIdentity,
    intents: Option<Intents>,
    reconnect: Option<ReconnectOptions>,
    hooks: Hooks,
    connector: Option<Arc<dyn Connector>>,
}

impl GatewayClientBuilder {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            session_id: None,
            shard: ShardIdentity::default(),
            intents: None,
            reconnect: Some(ReconnectOptions::default()),
            hooks: Hooks::default(),
            connector: None,
        }
    }

    /// Set the authentication token. Required.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Supply a prior session id to attempt a resume immediately.
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Declare this client as shard `index` of `count`. Defaults to `(0, 1)`.
    pub fn shard(mut self, index: u32, count: u32) -> Self {
        self.shard = ShardIdentity::new(index, count);
        self
    }

    /// OR the given named flags into the intent mask.
    pub fn intents<I>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = Intent>,
    {
        let mask = self.intents.unwrap_or_default() | Intents::from_flags(flags);
        self.intents = Some(mask);
        self
    }

    /// OR raw bit values into the intent mask.
    pub fn intent_bits(mut self, bits: u64) -> Self {
        let mask = self.intents.unwrap_or_default() | Intents::from_bits(bits);
        self.intents = Some(mask);
        self
    }

    /// Replace the reconnection policy options.
    pub fn reconnect(mut self, options: ReconnectOptions) -> Self {
        self.reconnect = Some(options);
        self
    }

    /// Disable reconnection: any close ends the session.
    pub fn no_reconnect(mut self) -> Self {
        self.reconnect = None;
        self
    }

    /// Observe application dispatch events. Last writer wins.
    pub fn on_dispatch<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.hooks.dispatch = Some(Arc::new(hook));
        self
    }

    /// Observe transport closes. Last writer wins.
    pub fn on_disconnect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Disconnect) + Send + Sync + 'static,
    {
        self.hooks.disconnect = Some(Arc::new(hook));
        self
    }

    /// Observe errors that have no pending `connect()` to surface through.
    /// Last writer wins; the default logs at error level.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.hooks.error = Some(Arc::new(hook));
        self
    }

    /// Replace the transport connector. Defaults to [`WsConnector`].
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Validate the options and build the client.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the token or URL is missing, the shard
    /// index does not fit the shard count, or the reconnect delay exceeds its
    /// cap.
    pub fn build(self) -> Result<GatewayClient, ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        let token = match self.token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ConfigError::MissingToken),
        };
        if self.shard.index() >= self.shard.count() {
            return Err(ConfigError::ShardOutOfRange {
                index: self.shard.index(),
                count: self.shard.count(),
            });
        }
        if let Some(options) = &self.reconnect
            && options.delay > options.max_delay
        {
            return Err(ConfigError::DelayExceedsMax {
                delay_ms: options.delay.as_millis(),
                max_delay_ms: options.max_delay.as_millis(),
            });
        }

        let config = ClientConfig {
            url: self.url,
            token,
            resume_session_id: self.session_id,
            shard: self.shard,
            intents: self.intents,
            reconnect: self.reconnect,
        };
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector));
        Ok(GatewayClient::new(config, self.hooks, connector))
    }
}
