/// Classification for retry policy.
///
/// Used to determine how the client's retry loop and the aggregator
/// respond to a provider failure.
///
/// # Behavior Summary
///
/// | Class | Retry Same Provider? |
/// |-------|---------------------|
/// | `Never` | No |
/// | `WithBackoff` | Yes, with exponential backoff |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - configuration error, client error, or terminal
    /// failure. The request is fundamentally invalid and retrying won't
    /// help.
    Never,

    /// Retry the same provider with exponential backoff.
    ///
    /// Used for transient failures: rate limiting (429), server errors
    /// (5xx), timeouts, and transport-level faults.
    WithBackoff,
}
