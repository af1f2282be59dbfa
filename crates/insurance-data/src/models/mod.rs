//! Insurance quote models
//!
//! This module contains the core data types for quote operations:
//! - `types` - Type aliases and canonical plan field names
//! - `trip` - Trip parameters sent to provider quote endpoints (TripDetails)
//! - `plan` - Plan shapes: NormalizedPlan (mapped) and InsurancePlan (validated)
//! - `failure` - Caller-facing provider failure records (ProviderFailure)

mod failure;
mod plan;
mod trip;
mod types;

pub use failure::ProviderFailure;
pub use plan::{InsurancePlan, NormalizedPlan, PlanValidationError};
pub use trip::TripDetails;
pub use types::{
    ProviderName, FIELD_BASE_PRICE, FIELD_EMERGENCY_EVACUATION, FIELD_ID, FIELD_MEDICAL_COVERAGE,
    FIELD_NAME, FIELD_PROVIDER,
};
