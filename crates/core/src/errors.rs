//! Core error types for the Tripsure service layer.

use thiserror::Error;

use tripsure_insurance_data::{QuoteError, RegistryError};

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the service layer.
#[derive(Error, Debug)]
pub enum Error {
    /// A provider quote operation failed.
    #[error("Quote operation failed: {0}")]
    Quote(#[from] QuoteError),

    /// The provider catalog is misconfigured.
    #[error("Provider registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Anything that doesn't fit the categories above.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
