use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, RetryClass};

/// Snapshot of one provider's failure from an aggregation run.
///
/// This is the caller-facing shape carried in error maps and the cache's
/// error key space: the status classification, whether a retry could
/// help, and when the failure was observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    /// The provider the failure is scoped to
    pub provider: String,

    /// HTTP-style status classification
    pub status_code: u16,

    /// Human-readable failure description
    pub message: String,

    /// Whether the failure is transient (5xx, 429, timeout)
    pub retryable: bool,

    /// When the failure was observed
    pub occurred_at: DateTime<Utc>,
}

impl ProviderFailure {
    /// Record a failure observed now.
    pub fn from_error(provider: &str, error: &QuoteError) -> Self {
        Self {
            provider: provider.to_string(),
            status_code: error.status_code(),
            message: error.to_string(),
            retryable: error.retry_class() == RetryClass::WithBackoff,
            occurred_at: Utc::now(),
        }
    }
}
