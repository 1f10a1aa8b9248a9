//! Builder pattern for host configuration.
//!
//! Provides a fluent API for configuring and creating [`CaptureHost`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use adsnap::CaptureHost;
//!
//! # async fn example() -> adsnap::Result<()> {
//! let host = CaptureHost::builder()
//!     .port(9744)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::AgentPool;

use super::core::CaptureHost;

// ============================================================================
// CaptureHostBuilder
// ============================================================================

/// Builder for configuring a [`CaptureHost`] instance.
///
/// Use [`CaptureHost::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct CaptureHostBuilder {
    /// Port to bind the WebSocket endpoint to.
    port: Option<u16>,
    /// Address to bind to.
    bind_ip: Option<IpAddr>,
    /// How long [`CaptureHost::wait_for_page()`] waits for an agent.
    connect_timeout: Option<Duration>,
}

// ============================================================================
// CaptureHostBuilder Implementation
// ============================================================================

impl CaptureHostBuilder {
    /// Creates a new host builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the port the WebSocket endpoint binds to.
    ///
    /// Without this the host binds to a random available port; read it
    /// back with [`CaptureHost::port()`].
    ///
    /// # Arguments
    ///
    /// * `port` - Port number (0 for random)
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the address the WebSocket endpoint binds to.
    ///
    /// Defaults to localhost. Binding wider than localhost exposes the
    /// capture protocol to the network.
    ///
    /// # Arguments
    ///
    /// * `ip` - IP address to bind to
    #[inline]
    #[must_use]
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = Some(ip);
        self
    }

    /// Sets how long [`CaptureHost::wait_for_page()`] waits for an
    /// agent before giving up.
    ///
    /// Defaults to the transport's 30 second connect timeout.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum wait per call
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Builds the host, binding the WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the requested port is privileged
    /// - [`Error::Io`] if binding fails
    pub async fn build(self) -> Result<CaptureHost> {
        let port = self.validate_port()?;

        let pool = match self.bind_ip {
            Some(ip) => AgentPool::with_ip_port(ip, port).await?,
            None => AgentPool::with_port(port).await?,
        };

        Ok(CaptureHost::new(pool, self.connect_timeout))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl CaptureHostBuilder {
    /// Validates the port configuration.
    fn validate_port(&self) -> Result<u16> {
        let port = self.port.unwrap_or(0);

        if port != 0 && port < 1024 {
            return Err(Error::config(format!(
                "Port {} is in the privileged range and usually cannot be bound.\n\
                 Use .port(0) for a random available port, or pick one above 1023.",
                port
            )));
        }

        Ok(port)
    }
}

// ============================================================================
// Tests
// ============================================================================
