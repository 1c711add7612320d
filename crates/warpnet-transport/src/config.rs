//! Network configuration for bridge transports.

use std::time::Duration;

use crate::error::ConfigError;

/// Smallest accepted response bound.
pub const MIN_RESPONSE_BYTES: usize = 1024;

/// Network configuration for a bridge transport.
///
/// Use [`NetworkConfig::builder()`] to construct with validation, or
/// [`NetworkConfig::default()`] for the standard limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Maximum time for connection establishment.
    connect_timeout: Duration,

    /// Maximum time for one request/response exchange.
    request_timeout: Duration,

    /// Largest response body read from a stream.
    max_response_bytes: usize,

    /// Whether to use the public relay network for NAT traversal.
    use_public_relays: bool,
}

impl NetworkConfig {
    /// Create a new configuration builder.
    pub fn builder() -> NetworkConfigBuilder {
        NetworkConfigBuilder::new()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    pub fn use_public_relays(&self) -> bool {
        self.use_public_relays
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            max_response_bytes: 4 * 1024 * 1024,
            use_public_relays: true,
        }
    }
}

/// Builder for [`NetworkConfig`] with validation.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use warpnet_transport::NetworkConfig;
///
/// let config = NetworkConfig::builder()
///     .request_timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(config.request_timeout(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: NetworkConfig::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn max_response_bytes(mut self, max: usize) -> Self {
        self.config.max_response_bytes = max;
        self
    }

    /// Disable the public relay network (direct addresses only).
    pub fn use_public_relays(mut self, enabled: bool) -> Self {
        self.config.use_public_relays = enabled;
        self
    }

    /// Build the configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - either timeout is zero
    /// - `max_response_bytes` is below [`MIN_RESPONSE_BYTES`]
    pub fn build(self) -> Result<NetworkConfig, ConfigError> {
        if self.config.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("connect_timeout"));
        }
        if self.config.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request_timeout"));
        }
        if self.config.max_response_bytes < MIN_RESPONSE_BYTES {
            return Err(ConfigError::BelowMinimum {
                field: "max_response_bytes",
                minimum: MIN_RESPONSE_BYTES,
                provided: self.config.max_response_bytes,
            });
        }
        Ok(self.config)
    }
}

impl Default for NetworkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
