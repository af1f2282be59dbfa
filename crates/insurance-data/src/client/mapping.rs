//! Response payload normalization.
//!
//! Providers answer in their own field names; each config carries a
//! canonical-field -> source-path mapping. Paths may be dotted to reach
//! nested objects. A path that does not resolve leaves the canonical
//! field absent, so downstream validation can tell "field absent" from
//! "field present but wrong type".

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::NormalizedPlan;
use crate::registry::ProviderConfig;

/// Resolve a dotted path against a JSON value.
///
/// Returns `None` when any segment is missing or the walk reaches a
/// non-object before the path is consumed.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Map one raw provider plan into canonical field names.
///
/// Unresolvable paths are omitted from the output - not an error, not a
/// null, not a zero.
pub fn normalize_plan(raw: &Value, config: &ProviderConfig) -> NormalizedPlan {
    let mut fields = BTreeMap::new();
    for mapping in &config.mapping {
        if let Some(value) = lookup_path(raw, &mapping.path) {
            fields.insert(mapping.canonical.clone(), value.clone());
        }
    }
    NormalizedPlan {
        provider: config.name.clone(),
        fields,
    }
}

/// Extract the raw plan objects from a provider response body.
///
/// Accepts either `{"plans": [...]}` or a single bare plan object.
pub(crate) fn extract_raw_plans(body: &Value) -> Vec<Value> {
    match body.get("plans").and_then(Value::as_array) {
        Some(plans) => plans.clone(),
        None if body.is_object() => vec![body.clone()],
        None => Vec::new(),
    }
}
