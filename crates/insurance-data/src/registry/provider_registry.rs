//! Static catalog of provider connection metadata.
//!
//! Each insurer the marketplace quotes against is described by a
//! [`ProviderConfig`]: where its API lives, how calls authenticate, how
//! its response fields map onto the canonical plan shape, and the request
//! budget and timeout it tolerates. The [`ProviderRegistry`] is a
//! read-only lookup table over those configs.
//!
//! Credentials are never part of the catalog; they are resolved from the
//! credential store at call time.

use std::collections::HashSet;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{FIELD_BASE_PRICE, FIELD_ID, FIELD_NAME};

/// Default request budget per provider per minute.
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;

/// Default per-request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Authentication scheme for a provider API.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AuthScheme {
    /// `X-API-Key: <key>` header
    #[serde(rename = "apiKey")]
    ApiKey,
    /// `Authorization: Bearer <key>` header
    #[serde(rename = "bearer")]
    Bearer,
    /// `Authorization: OAuth <key>` header. Static key only; there is no
    /// token refresh flow.
    #[serde(rename = "oauth")]
    OAuth,
    /// No authentication
    #[serde(rename = "none")]
    None,
}

impl AuthScheme {
    /// Whether calls with this scheme need a stored credential.
    pub fn requires_credential(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One canonical plan field and the provider-native path it is read from.
///
/// Paths may be dotted to reach nested objects (`"coverage.medical"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Canonical plan field name (e.g. `basePrice`)
    pub canonical: String,
    /// Provider-native source path
    pub path: String,
}

impl FieldMapping {
    pub fn new(canonical: &str, path: &str) -> Self {
        Self {
            canonical: canonical.to_string(),
            path: path.to_string(),
        }
    }
}

/// Static connection metadata for one insurer API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Unique provider identifier (e.g. "TRAVEL_GUARD")
    pub name: String,

    /// API base URL; the quote endpoint is `{base_url}/plans`
    pub base_url: String,

    /// How calls to this provider authenticate
    pub auth: AuthScheme,

    /// Ordered canonical-field -> provider-path mapping
    pub mapping: Vec<FieldMapping>,

    /// Requests allowed per 60-second window
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// Hard timeout for one request, after which it is cancelled
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_rate_limit_per_minute() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Errors raised while building a registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Two configs share a name.
    #[error("Duplicate provider name: {0}")]
    DuplicateProvider(String),

    /// A mapping cannot produce a valid plan.
    #[error("Provider {provider} mapping is missing required field: {field}")]
    IncompleteMapping {
        /// The misconfigured provider
        provider: String,
        /// The canonical field the mapping never supplies
        field: String,
    },
}

/// Read-only lookup table of provider configurations.
///
/// Constructed once at startup and never mutated. Construction verifies
/// that names are unique and that every mapping can supply the fields a
/// plan needs to validate (`id`, `name`, `basePrice`).
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Build a registry from the given configs.
    pub fn new(providers: Vec<ProviderConfig>) -> Result<Self, RegistryError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for config in &providers {
            if !seen.insert(config.name.as_str()) {
                return Err(RegistryError::DuplicateProvider(config.name.clone()));
            }
            for required in [FIELD_ID, FIELD_NAME, FIELD_BASE_PRICE] {
                if !config.mapping.iter().any(|m| m.canonical == required) {
                    return Err(RegistryError::IncompleteMapping {
                        provider: config.name.clone(),
                        field: required.to_string(),
                    });
                }
            }
        }
        Ok(Self { providers })
    }

    /// Registry over the built-in marketplace catalog.
    pub fn builtin() -> Self {
        Self {
            providers: BUILTIN_PROVIDERS.clone(),
        }
    }

    /// All registered provider configurations, in catalog order.
    pub fn list(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Look up one provider by name.
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Names of every registered provider, in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn mapping(pairs: &[(&str, &str)]) -> Vec<FieldMapping> {
    pairs
        .iter()
        .map(|(canonical, path)| FieldMapping::new(canonical, path))
        .collect()
}

lazy_static! {
    /// Built-in catalog of marketplace insurers.
    ///
    /// Field paths and limits mirror each insurer's published quote API.
    static ref BUILTIN_PROVIDERS: Vec<ProviderConfig> = vec![
        ProviderConfig {
            name: "ALLIANZ_TRAVEL".to_string(),
            base_url: "https://api.allianztravelinsurance.com/v2".to_string(),
            auth: AuthScheme::ApiKey,
            mapping: mapping(&[
                ("id", "product_id"),
                ("name", "product_name"),
                ("basePrice", "premium.total"),
                ("medicalCoverage", "benefits.emergency_medical"),
                ("emergencyEvacuation", "benefits.evacuation"),
                ("tripCancellation", "benefits.trip_cancellation"),
            ]),
            rate_limit_per_minute: 120,
            timeout_ms: 10_000,
        },
        ProviderConfig {
            name: "AXA_PARTNERS".to_string(),
            base_url: "https://api.axa-assistance.com/travel".to_string(),
            auth: AuthScheme::Bearer,
            mapping: mapping(&[
                ("id", "planId"),
                ("name", "planLabel"),
                ("basePrice", "pricing.gross"),
                ("medicalCoverage", "coverages.medical"),
                ("emergencyEvacuation", "coverages.evacuation"),
                ("baggageProtection", "coverages.baggage"),
            ]),
            rate_limit_per_minute: 100,
            timeout_ms: 10_000,
        },
        ProviderConfig {
            name: "TRAVEL_GUARD".to_string(),
            base_url: "https://api.travelguard.com/v2".to_string(),
            auth: AuthScheme::ApiKey,
            mapping: mapping(&[
                ("id", "PlanCode"),
                ("name", "PlanName"),
                ("basePrice", "Premium"),
                ("medicalCoverage", "MedicalLimit"),
                ("emergencyEvacuation", "EvacuationLimit"),
                ("tripCancellation", "CancellationLimit"),
            ]),
            rate_limit_per_minute: 60,
            timeout_ms: 15_000,
        },
        ProviderConfig {
            name: "WORLD_NOMADS".to_string(),
            base_url: "https://api.worldnomads.com".to_string(),
            auth: AuthScheme::OAuth,
            mapping: mapping(&[
                ("id", "policy.ref"),
                ("name", "policy.display_name"),
                ("basePrice", "policy.price.amount"),
                ("medicalCoverage", "policy.benefits.medical"),
                ("emergencyEvacuation", "policy.benefits.evacuation"),
            ]),
            rate_limit_per_minute: 100,
            timeout_ms: 10_000,
        },
        ProviderConfig {
            name: "SAFETY_WING".to_string(),
            base_url: "https://api.safetywing.com/v1".to_string(),
            auth: AuthScheme::None,
            mapping: mapping(&[
                ("id", "id"),
                ("name", "name"),
                ("basePrice", "price"),
                ("medicalCoverage", "coverage.medical"),
                ("emergencyEvacuation", "coverage.evacuation"),
            ]),
            rate_limit_per_minute: 200,
            timeout_ms: 8_000,
        },
        ProviderConfig {
            name: "SEVEN_CORNERS".to_string(),
            base_url: "https://api.sevencorners.com".to_string(),
            auth: AuthScheme::ApiKey,
            mapping: mapping(&[
                ("id", "quoteId"),
                ("name", "planTitle"),
                ("basePrice", "totalPremium"),
                ("medicalCoverage", "medicalMaximum"),
                ("emergencyEvacuation", "evacuationMaximum"),
            ]),
            rate_limit_per_minute: 90,
            timeout_ms: 10_000,
        },
        ProviderConfig {
            name: "IMG_GLOBAL".to_string(),
            base_url: "https://api.imglobal.com/quotes".to_string(),
            auth: AuthScheme::Bearer,
            mapping: mapping(&[
                ("id", "plan.id"),
                ("name", "plan.title"),
                ("basePrice", "plan.cost"),
                ("medicalCoverage", "plan.limits.medical"),
                ("emergencyEvacuation", "plan.limits.medevac"),
            ]),
            rate_limit_per_minute: 60,
            timeout_ms: 10_000,
        },
        ProviderConfig {
            name: "GENERALI_GLOBAL".to_string(),
            base_url: "https://api.generalitravelinsurance.com".to_string(),
            auth: AuthScheme::ApiKey,
            mapping: mapping(&[
                ("id", "offer_id"),
                ("name", "offer_name"),
                ("basePrice", "price.amount"),
                ("medicalCoverage", "coverage_medical"),
                ("emergencyEvacuation", "coverage_evacuation"),
                ("tripCancellation", "coverage_cancellation"),
            ]),
            rate_limit_per_minute: 100,
            timeout_ms: 12_000,
        },
    ];
}
