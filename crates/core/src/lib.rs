//! Tripsure Core - Domain services for the insurance marketplace.
//!
//! This crate sits between the UI shells (web, mobile) and the provider
//! fetch layer in `tripsure-insurance-data`. It owns result caching with
//! stale-while-revalidate semantics and the query facade UI code calls:
//! quote runs, cached trip lookups, per-plan lookups, error reporting,
//! credential management, and cache invalidation.

pub mod errors;
pub mod quotes;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

// Re-export the public quote surface
pub use quotes::{CacheRead, PlanFetcher, QuoteService, ResultCache};
