//! Tripsure Insurance Data Crate
//!
//! This crate provides provider-agnostic insurance quote fetching for the
//! Tripsure marketplace.
//!
//! # Overview
//!
//! The insurance data crate supports:
//! - A static catalog of insurer API configurations: auth scheme, field
//!   mapping, request budget, timeout
//! - In-memory credential storage with lazy expiry
//! - Per-provider fixed-window rate limiting
//! - An authenticated HTTP client with bounded exponential-backoff retry
//!   and timeout-as-cancellation
//! - A settle-all aggregator that normalizes and validates every
//!   provider's answer independently
//!
//! # Architecture
//!
//! ```text
//! +----------------+      +-------------------+
//! |  TripDetails   | ---> |  PlanAggregator   |  (fan-out, settle all)
//! +----------------+      +-------------------+
//!                                  |
//!                                  v
//!                         +----------------+
//!                         | ProviderClient |  (auth, timeout, retry)
//!                         +----------------+
//!                            |           |
//!                            v           v
//!                   +-------------+  +-----------------+
//!                   | RateLimiter |  | CredentialStore |
//!                   +-------------+  +-----------------+
//!                                  |
//!                                  v
//!                         +----------------+
//!                         | NormalizedPlan |  (mapped fields)
//!                         +----------------+
//!                                  |
//!                                  v
//!                         +----------------+
//!                         | InsurancePlan  |  (validated canonical plan)
//!                         +----------------+
//! ```
//!
//! # Core Types
//!
//! - [`ProviderConfig`] - Static connection metadata for one insurer
//! - [`TripDetails`] - Trip parameters sent to every quote endpoint
//! - [`InsurancePlan`] - The canonical, validated plan shape
//! - [`QuoteBatch`] - Plans plus per-provider failures from one fan-out
//! - [`QuoteError`] - Typed provider failures with retry classification

pub mod aggregator;
pub mod client;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod registry;

// Re-export aggregator types
pub use aggregator::{PlanAggregator, QuoteBatch};

// Re-export client types
pub use client::{lookup_path, normalize_plan, PlanSource, ProviderClient, RetryPolicy};

// Re-export credential types
pub use credentials::{CredentialStore, Readiness};

// Re-export error types
pub use errors::{QuoteError, RetryClass};

// Re-export all public types from models
pub use models::{
    InsurancePlan, NormalizedPlan, PlanValidationError, ProviderFailure, ProviderName, TripDetails,
};

// Re-export registry types
pub use registry::{
    AuthScheme, FieldMapping, ProviderConfig, ProviderRegistry, RateLimiter, RegistryError,
};
