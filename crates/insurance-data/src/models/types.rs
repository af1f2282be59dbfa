/// Provider identifier as used in registry lookups and error maps.
pub type ProviderName = String;

/// Canonical plan field: unique plan identifier.
pub const FIELD_ID: &str = "id";

/// Canonical plan field: human-readable plan name.
pub const FIELD_NAME: &str = "name";

/// Canonical plan field: the provider that issued the plan.
pub const FIELD_PROVIDER: &str = "provider";

/// Canonical plan field: total premium for the trip.
pub const FIELD_BASE_PRICE: &str = "basePrice";

/// Canonical plan field: emergency medical coverage limit.
pub const FIELD_MEDICAL_COVERAGE: &str = "medicalCoverage";

/// Canonical plan field: emergency evacuation coverage limit.
pub const FIELD_EMERGENCY_EVACUATION: &str = "emergencyEvacuation";
