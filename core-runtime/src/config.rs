//! # Connector Configuration
//!
//! Shared configuration for connections: the OAuth client identity and the
//! address of the local callback endpoint that the authorization redirect
//! points back to.
//!
//! The builder enforces fail-fast validation so a connector never starts with
//! credentials it cannot authenticate with.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::ConnectorConfig;
//!
//! let config = ConnectorConfig::builder()
//!     .client_id("my-client-id")
//!     .client_secret("my-client-secret")
//!     .host("localhost")
//!     .port(9040)
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert_eq!(config.port, 9040);
//! ```

use crate::error::{Error, Result};

/// Default callback host when none is configured.
const DEFAULT_HOST: &str = "localhost";

/// Default callback port when none is configured.
const DEFAULT_PORT: u16 = 9040;

/// Shared connector configuration.
///
/// One instance is built at startup and handed to every connection; the OAuth
/// client identity is immutable for the process lifetime.
#[derive(Clone)]
pub struct ConnectorConfig {
    /// OAuth client identifier
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Host of the local authorization-callback endpoint
    pub host: String,

    /// Port of the local authorization-callback endpoint
    pub port: u16,
}

impl std::fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ConnectorConfig {
    /// Creates a new builder for constructing a `ConnectorConfig`.
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::Config("Client id cannot be empty".to_string()));
        }

        if self.client_secret.is_empty() {
            return Err(Error::Config("Client secret cannot be empty".to_string()));
        }

        if self.host.is_empty() {
            return Err(Error::Config("Callback host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(Error::Config(
                "Callback port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ConnectorConfig`] instances.
#[derive(Default)]
pub struct ConnectorConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    host: Option<String>,
    port: Option<u16>,
}

impl ConnectorConfigBuilder {
    /// Sets the OAuth client identifier (required).
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the OAuth client secret (required).
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Sets the local callback host.
    ///
    /// Default: `localhost`
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the local callback port.
    ///
    /// Default: 9040
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builds the final `ConnectorConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns a configuration error with an actionable message when a
    /// required credential is missing or a value is invalid.
    pub fn build(self) -> Result<ConnectorConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config("Client id is required. Use .client_id() to set it.".to_string())
        })?;

        let client_secret = self.client_secret.ok_or_else(|| {
            Error::Config("Client secret is required. Use .client_secret() to set it.".to_string())
        })?;

        let config = ConnectorConfig {
            client_id,
            client_secret,
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
        };

        config.validate()?;

        Ok(config)
    }
}
