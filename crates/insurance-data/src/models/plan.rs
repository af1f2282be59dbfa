use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::types::{
    FIELD_BASE_PRICE, FIELD_EMERGENCY_EVACUATION, FIELD_ID, FIELD_MEDICAL_COVERAGE, FIELD_NAME,
    FIELD_PROVIDER,
};

/// A provider response mapped into canonical field names, not yet
/// validated.
///
/// Source paths that did not resolve are simply absent from `fields`;
/// absence is distinct from a present-but-null or wrong-typed value, and
/// validation treats them differently.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedPlan {
    /// The provider that produced this plan
    pub provider: String,
    /// Canonical field name -> raw mapped value
    pub fields: BTreeMap<String, Value>,
}

/// Why a normalized plan could not become an [`InsurancePlan`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanValidationError {
    /// A required field is absent or null.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A monetary field is present but not a JSON number.
    #[error("Field is not numeric: {0}")]
    NotNumeric(String),

    /// An identifier field is present but not a scalar value.
    #[error("Field is not a scalar value: {0}")]
    NotScalar(String),
}

/// A validated, canonical insurance plan.
///
/// All provider responses are normalized into this shape. Instances are
/// immutable once constructed and are only built through
/// [`from_normalized`](Self::from_normalized), which enforces
/// completeness and numeric typing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePlan {
    /// Provider-assigned plan identifier
    pub id: String,

    /// Human-readable plan name
    pub name: String,

    /// Name of the provider that issued the plan
    pub provider: String,

    /// Total premium for the trip
    pub base_price: Decimal,

    /// Emergency medical coverage limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_coverage: Option<Decimal>,

    /// Emergency evacuation coverage limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_evacuation: Option<Decimal>,

    /// All other mapped fields (tripCancellation, baggageProtection, ...)
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl InsurancePlan {
    /// Validate a normalized plan into the canonical shape.
    ///
    /// Requires `id`, `name`, and `basePrice` to be present and non-null,
    /// and the known monetary fields to be JSON numbers when present.
    /// Plans that fail here are dropped by the aggregator rather than
    /// surfaced as provider errors.
    pub fn from_normalized(plan: NormalizedPlan) -> Result<Self, PlanValidationError> {
        let NormalizedPlan {
            provider,
            mut fields,
        } = plan;

        if provider.is_empty() {
            return Err(PlanValidationError::MissingField(FIELD_PROVIDER.to_string()));
        }

        let id = take_scalar(&mut fields, FIELD_ID)?;
        let name = take_scalar(&mut fields, FIELD_NAME)?;
        let base_price = take_decimal(&mut fields, FIELD_BASE_PRICE)?
            .ok_or_else(|| PlanValidationError::MissingField(FIELD_BASE_PRICE.to_string()))?;
        let medical_coverage = take_decimal(&mut fields, FIELD_MEDICAL_COVERAGE)?;
        let emergency_evacuation = take_decimal(&mut fields, FIELD_EMERGENCY_EVACUATION)?;

        // The provider tag always comes from the config, never the payload.
        fields.remove(FIELD_PROVIDER);

        Ok(Self {
            id,
            name,
            provider,
            base_price,
            medical_coverage,
            emergency_evacuation,
            extras: fields,
        })
    }
}

/// Remove a required scalar field, rendering it as a string.
fn take_scalar(
    fields: &mut BTreeMap<String, Value>,
    field: &str,
) -> Result<String, PlanValidationError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Err(PlanValidationError::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(PlanValidationError::NotScalar(field.to_string())),
    }
}

/// Remove an optional monetary field, requiring a JSON number when present.
fn take_decimal(
    fields: &mut BTreeMap<String, Value>,
    field: &str,
) -> Result<Option<Decimal>, PlanValidationError> {
    match fields.remove(field) {
        None => Ok(None),
        Some(value) => decimal_from_value(&value)
            .map(Some)
            .ok_or_else(|| PlanValidationError::NotNumeric(field.to_string())),
    }
}

/// Convert a JSON number to a `Decimal` without a binary-float round trip.
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
