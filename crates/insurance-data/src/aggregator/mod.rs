//! Concurrent quote fan-out across every registered provider.
//!
//! The aggregator issues one request per provider, all at once, and
//! collects both outcomes independently: validated plans on one side,
//! per-provider failures on the other. One provider failing, stalling,
//! or timing out never aborts or delays its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::client::PlanSource;
use crate::models::{InsurancePlan, NormalizedPlan, ProviderFailure, ProviderName, TripDetails};
use crate::registry::ProviderRegistry;

/// Result of one aggregation run.
///
/// `plans` holds every plan that fetched and validated, across all
/// providers; `errors` records each failed provider. Both sides can be
/// non-empty at once - partial failure is the normal case, and it is the
/// caller's decision how to present it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBatch {
    /// Validated canonical plans from every provider that answered
    pub plans: Vec<InsurancePlan>,

    /// Failures keyed by provider name
    pub errors: HashMap<ProviderName, ProviderFailure>,
}

/// Fans quote requests out to every provider in the registry.
pub struct PlanAggregator {
    registry: Arc<ProviderRegistry>,
    source: Arc<dyn PlanSource>,
}

impl PlanAggregator {
    pub fn new(registry: Arc<ProviderRegistry>, source: Arc<dyn PlanSource>) -> Self {
        Self { registry, source }
    }

    /// Request plans from every provider concurrently and collect both
    /// outcomes.
    ///
    /// All provider calls are issued without waiting for any to complete
    /// and settle in whatever order they finish; there is no ordering
    /// guarantee among providers. Plans that fail validation are dropped
    /// with a warning and do not appear in the error map.
    pub async fn fetch_all(&self, trip: &TripDetails) -> QuoteBatch {
        let calls = self.registry.list().iter().map(|config| {
            let source = Arc::clone(&self.source);
            async move {
                let outcome = source.fetch_plans(config, trip).await;
                (config.name.as_str(), outcome)
            }
        });

        debug!(
            "Fanning out quote request to {} providers",
            self.registry.len()
        );

        let settled = join_all(calls).await;

        let mut batch = QuoteBatch::default();
        for (provider, outcome) in settled {
            match outcome {
                Ok(normalized) => collect_valid(provider, normalized, &mut batch.plans),
                Err(error) => {
                    warn!("Provider '{}' failed: {}", provider, error);
                    batch.errors.insert(
                        provider.to_string(),
                        ProviderFailure::from_error(provider, &error),
                    );
                }
            }
        }

        info!(
            "Aggregated {} plans from {} providers ({} failed)",
            batch.plans.len(),
            self.registry.len(),
            batch.errors.len()
        );

        batch
    }

    /// The registry this aggregator fans out over.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

/// Validate normalized plans, keeping the good ones.
fn collect_valid(provider: &str, normalized: Vec<NormalizedPlan>, plans: &mut Vec<InsurancePlan>) {
    for plan in normalized {
        match InsurancePlan::from_normalized(plan) {
            Ok(plan) => plans.push(plan),
            Err(error) => {
                warn!("Dropping invalid plan from '{}': {}", provider, error);
            }
        }
    }
}
