//! Provider catalog and request gating.
//!
//! - `provider_registry` - static connection metadata per insurer
//! - `rate_limiter` - per-provider fixed-window request budgets

mod provider_registry;
mod rate_limiter;

pub use provider_registry::{
    AuthScheme, FieldMapping, ProviderConfig, ProviderRegistry, RegistryError,
};
pub use rate_limiter::RateLimiter;
