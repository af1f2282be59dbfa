//! Quote services - result caching and the UI-facing facade.

mod cache;
mod service;

#[cfg(test)]
mod service_tests;

pub use cache::{CacheRead, ResultCache};
pub use service::{PlanFetcher, QuoteService};
