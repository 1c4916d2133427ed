//! Error types for vmdns
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for vmdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vmdns
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials or settings missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The DNS provider has no zone for the configured domain
    #[error("No DNS zone found for domain '{0}'")]
    ZoneResolution(String),

    /// No discovery strategy produced an address within the attempt budget
    #[error("Could not discover an IPv4 address for VM '{vm}' after {attempts} attempt(s)")]
    DiscoveryTimeout {
        /// VM identifier
        vm: String,
        /// Number of empty probes performed
        attempts: u32,
    },

    /// Hypervisor control-plane failure (start, clone, query)
    #[error("Hypervisor error: {0}")]
    Hypervisor(String),

    /// Post-resolution hostname change on the guest failed
    #[error("Guest configuration failed for {host}: {message}")]
    GuestConfiguration {
        /// Address or hostname of the guest
        host: String,
        /// Failure detail
        message: String,
    },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
        /// Whether repeating the same request may succeed
        transient: bool,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local I/O errors (process spawn, file read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a zone resolution error
    pub fn zone_resolution(domain: impl Into<String>) -> Self {
        Self::ZoneResolution(domain.into())
    }

    /// Create a hypervisor error
    pub fn hypervisor(msg: impl Into<String>) -> Self {
        Self::Hypervisor(msg.into())
    }

    /// Create a guest configuration error
    pub fn guest(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GuestConfiguration {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a permanent provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Create a provider-specific error that may succeed on retry
    pub fn provider_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Whether the failed operation may be repeated unchanged
    ///
    /// Only rate limiting, transient provider failures (5xx) and transport
    /// errors qualify. Authentication, validation and not-found errors are
    /// fatal: repeating them cannot change the outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited(_) | Error::Http(_) => true,
            Error::Provider { transient, .. } => *transient,
            _ => false,
        }
    }
}
