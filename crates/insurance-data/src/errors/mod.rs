//! Error types and retry classification for provider quote operations.
//!
//! This module provides:
//! - [`QuoteError`]: The main error enum for all provider quote operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching plans from a provider.
///
/// Each variant carries the provider it is scoped to and maps onto an
/// HTTP-style status via [`status_code`](Self::status_code). The
/// [`retry_class`](Self::retry_class) method classifies the error as
/// transient or terminal, which drives the client's retry loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// The provider's auth scheme requires a credential and none is
    /// configured. This is a configuration error - retrying won't help.
    #[error("No API key configured for provider: {provider}")]
    MissingCredential {
        /// The provider that has no usable credential
        provider: String,
    },

    /// The local rate-limit window for this provider is exhausted, or the
    /// provider itself answered 429. In the local case no request was made.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider whose request budget is exhausted
        provider: String,
    },

    /// The request exceeded the provider's configured timeout and the
    /// in-flight call was cancelled.
    #[error("Timeout after {timeout_ms}ms: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
        /// The timeout that was exceeded
        timeout_ms: u64,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("Provider {provider} returned HTTP {status}: {message}")]
    Status {
        /// The provider that returned the error
        provider: String,
        /// The HTTP status code
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// The provider answered 2xx but the body was not a plans payload.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the unparseable body
        provider: String,
        /// Description of the parse failure
        message: String,
    },

    /// The request failed below the HTTP layer (DNS, connect, TLS).
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider that could not be reached
        provider: String,
        /// Transport error description
        message: String,
    },

    /// The provider name is not present in the registry.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl QuoteError {
    /// HTTP-style status classification for this error.
    ///
    /// Failures that never reached the wire map onto the closest status:
    /// missing credentials are 401, local rate-limit rejections 429,
    /// timeouts 408, malformed bodies 502, transport faults 503.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential { .. } => 401,
            Self::RateLimited { .. } => 429,
            Self::Timeout { .. } => 408,
            Self::Status { status, .. } => *status,
            Self::InvalidResponse { .. } => 502,
            Self::Network { .. } => 503,
            Self::UnknownProvider(_) => 404,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// An error is transient iff its status classification is 5xx, 429,
    /// or a timeout. Everything else is terminal for the attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use tripsure_insurance_data::errors::{QuoteError, RetryClass};
    ///
    /// let error = QuoteError::RateLimited { provider: "TRAVEL_GUARD".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = QuoteError::MissingCredential { provider: "TRAVEL_GUARD".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self.status_code() {
            429 | 408 => RetryClass::WithBackoff,
            status if status >= 500 => RetryClass::WithBackoff,
            _ => RetryClass::Never,
        }
    }

    /// The provider this error is scoped to.
    pub fn provider(&self) -> &str {
        match self {
            Self::MissingCredential { provider }
            | Self::RateLimited { provider }
            | Self::Timeout { provider, .. }
            | Self::Status { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::Network { provider, .. } => provider,
            Self::UnknownProvider(provider) => provider,
        }
    }
}
