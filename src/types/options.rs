//! Client options and configuration
//!
//! This module contains the configuration options for [`AppServerClient`](crate::AppServerClient),
//! including a builder pattern for easy configuration.

use std::time::Duration;

use super::params::ClientInfo;

/// Default TCP connect timeout per candidate host
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(6);

/// Default bound on the HTTP Upgrade exchange
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default app-server port
pub const DEFAULT_PORT: u16 = 8390;

/// Default number of threads requested by `thread/list`
pub const DEFAULT_THREAD_LIST_LIMIT: u32 = 50;

// ============================================================================
// Client Options
// ============================================================================

/// Main options for the app-server client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Identity reported in the `initialize` request
    pub client_info: ClientInfo,
    /// TCP connect timeout applied to each candidate host
    pub connect_timeout: Duration,
    /// Bound on the Upgrade request/response exchange (`None` waits forever)
    pub handshake_timeout: Option<Duration>,
    /// Largest inbound frame payload accepted (`None` means platform maximum)
    pub max_frame_size: Option<usize>,
    /// Approval policy sent with `thread/start` and `thread/resume`
    pub approval_policy: String,
    /// Sandbox mode sent with `thread/start` and `thread/resume`
    pub sandbox: String,
    /// Page size for `thread/list`
    pub thread_list_limit: Option<u32>,
    /// Sort key for `thread/list`
    pub thread_list_sort_key: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_info: ClientInfo::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            max_frame_size: None,
            approval_policy: "never".to_string(),
            sandbox: "workspace-write".to_string(),
            thread_list_limit: Some(DEFAULT_THREAD_LIST_LIMIT),
            thread_list_sort_key: "updated_at".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create a new builder for `ClientOptions`
    #[must_use]
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }
}

// ============================================================================
// Builder for ClientOptions
// ============================================================================

/// Builder for `ClientOptions`
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set the client name and version reported by `initialize`
    #[must_use]
    pub fn client(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.options.client_info.name = name.into();
        self.options.client_info.version = version.into();
        self
    }

    /// Set the human readable client title
    #[must_use]
    pub fn client_title(mut self, title: impl Into<String>) -> Self {
        self.options.client_info.title = Some(title.into());
        self
    }

    /// Set the per-candidate connect timeout
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set the handshake timeout (`None` disables it)
    #[must_use]
    pub const fn handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.handshake_timeout = timeout;
        self
    }

    /// Cap the size of inbound frame payloads
    #[must_use]
    pub const fn max_frame_size(mut self, bytes: usize) -> Self {
        self.options.max_frame_size = Some(bytes);
        self
    }

    /// Set the approval policy for new and resumed threads
    #[must_use]
    pub fn approval_policy(mut self, policy: impl Into<String>) -> Self {
        self.options.approval_policy = policy.into();
        self
    }

    /// Set the sandbox mode for new and resumed threads
    #[must_use]
    pub fn sandbox(mut self, sandbox: impl Into<String>) -> Self {
        self.options.sandbox = sandbox.into();
        self
    }

    /// Set the `thread/list` page size (`None` lets the server decide)
    #[must_use]
    pub const fn thread_list_limit(mut self, limit: Option<u32>) -> Self {
        self.options.thread_list_limit = limit;
        self
    }

    /// Build the options
    ///
    /// # Errors
    /// Returns `ClientError::InvalidConfig` if a timeout is zero or the client name is empty
    pub fn build(self) -> crate::Result<ClientOptions> {
        if self.options.connect_timeout.is_zero() {
            return Err(crate::ClientError::invalid_config(
                "connect_timeout must be greater than zero",
            ));
        }
        if self.options.handshake_timeout.is_some_and(|t| t.is_zero()) {
            return Err(crate::ClientError::invalid_config(
                "handshake_timeout must be greater than zero",
            ));
        }
        if self.options.client_info.name.trim().is_empty() {
            return Err(crate::ClientError::invalid_config(
                "client name must not be empty",
            ));
        }
        Ok(self.options)
    }
}
