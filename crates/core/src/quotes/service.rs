//! Quote Service - the UI-facing facade over aggregation and caching.
//!
//! This module wires the provider fetch layer to the result cache and
//! exposes the query surface UI code calls:
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                        QuoteService                           |
//! |                                                               |
//! |  TripDetails --> ResultCache --(miss/stale)--> PlanFetcher    |
//! |                       |                            |          |
//! |                       +<------ store batch --------+          |
//! |                                                               |
//! |  set/revoke API key, readiness  -->  CredentialStore          |
//! +---------------------------------------------------------------+
//! ```
//!
//! Stale entries are served immediately while a deduplicated background
//! task refreshes them (stale-while-revalidate).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, warn};

use tripsure_insurance_data::{
    CredentialStore, InsurancePlan, PlanAggregator, ProviderClient, ProviderConfig,
    ProviderFailure, ProviderName, ProviderRegistry, QuoteBatch, RateLimiter, Readiness,
    TripDetails,
};

use super::cache::{CacheRead, ResultCache};
use crate::errors::Result;

/// Seam over the aggregation fan-out.
///
/// The production implementation is [`PlanAggregator`]; tests script
/// outcomes instead of hitting providers.
#[async_trait]
pub trait PlanFetcher: Send + Sync {
    /// Run one full fan-out for the trip.
    async fn fetch_all(&self, trip: &TripDetails) -> QuoteBatch;
}

#[async_trait]
impl PlanFetcher for PlanAggregator {
    async fn fetch_all(&self, trip: &TripDetails) -> QuoteBatch {
        PlanAggregator::fetch_all(self, trip).await
    }
}

/// Facade over the aggregation pipeline plus the result cache.
///
/// Holds explicitly injected collaborators rather than ambient state, so
/// isolated instances can be built per test or per embedding.
pub struct QuoteService {
    registry: Arc<ProviderRegistry>,
    fetcher: Arc<dyn PlanFetcher>,
    credentials: Arc<CredentialStore>,
    cache: Arc<ResultCache>,
    /// Trip fingerprints with a background refresh in flight.
    refreshing: Arc<Mutex<HashSet<String>>>,
}

impl QuoteService {
    /// Create a service over pre-built collaborators.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        fetcher: Arc<dyn PlanFetcher>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self::with_config(registry, fetcher, credentials, Arc::new(ResultCache::new()))
    }

    /// Create a service with a custom cache (e.g. a non-default freshness
    /// policy, or one shared with another consumer).
    pub fn with_config(
        registry: Arc<ProviderRegistry>,
        fetcher: Arc<dyn PlanFetcher>,
        credentials: Arc<CredentialStore>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            credentials,
            cache,
            refreshing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Wire the full pipeline for the given provider catalog.
    pub fn from_configs(configs: Vec<ProviderConfig>) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::new(configs)?);
        Ok(Self::wire(registry))
    }

    /// Service over the built-in marketplace catalog.
    pub fn with_builtin_providers() -> Self {
        Self::wire(Arc::new(ProviderRegistry::builtin()))
    }

    fn wire(registry: Arc<ProviderRegistry>) -> Self {
        let credentials = Arc::new(CredentialStore::new());
        let rate_limiter = Arc::new(RateLimiter::new());
        let client = Arc::new(ProviderClient::new(
            Arc::clone(&credentials),
            rate_limiter,
        ));
        let aggregator = Arc::new(PlanAggregator::new(Arc::clone(&registry), client));
        Self::new(registry, aggregator, credentials)
    }

    /// Run the fan-out unconditionally and cache the result.
    ///
    /// This is the entry point for an explicit quote run; the batch
    /// carries both plans and per-provider failures.
    pub async fn fetch_all_provider_plans(&self, trip: &TripDetails) -> QuoteBatch {
        let readiness = self.credentials.check_readiness(&self.registry);
        if !readiness.ready {
            debug!(
                "Fetching with {} provider(s) missing credentials: {:?}",
                readiness.missing_providers.len(),
                readiness.missing_providers
            );
        }

        let batch = self.fetcher.fetch_all(trip).await;
        self.cache.store_batch(&trip.fingerprint(), &batch);
        batch
    }

    /// Plans for a trip, served from cache when possible.
    ///
    /// Fresh entries are returned directly. Stale entries are returned
    /// immediately while one background refresh runs. Misses fetch
    /// inline.
    pub async fn plans_for_trip(&self, trip: &TripDetails) -> Vec<InsurancePlan> {
        let trip_key = trip.fingerprint();
        match self.cache.read_trip(&trip_key) {
            CacheRead::Fresh(plans) => plans,
            CacheRead::Stale(plans) => {
                debug!(
                    "Serving stale plans for trip {}, refreshing in background",
                    trip_key
                );
                self.spawn_refresh(trip.clone(), trip_key);
                plans
            }
            CacheRead::Miss => self.fetch_all_provider_plans(trip).await.plans,
        }
    }

    /// One plan by id.
    ///
    /// A cached plan (fresh or stale) is served directly; a miss falls
    /// back to a full quote run for the trip before looking the id up
    /// again.
    pub async fn plan_by_id(&self, plan_id: &str, trip: &TripDetails) -> Option<InsurancePlan> {
        match self.cache.read_plan(plan_id) {
            CacheRead::Fresh(plan) | CacheRead::Stale(plan) => Some(plan),
            CacheRead::Miss => {
                debug!("Plan {} not cached, fetching trip quotes", plan_id);
                let batch = self.fetch_all_provider_plans(trip).await;
                batch.plans.into_iter().find(|plan| plan.id == plan_id)
            }
        }
    }

    /// Cached plans for one provider.
    pub fn plans_by_provider(&self, provider: &str) -> Vec<InsurancePlan> {
        self.cache.read_provider(provider).value().unwrap_or_default()
    }

    /// Per-provider failures from the most recent cached run.
    pub fn provider_errors(&self) -> HashMap<ProviderName, ProviderFailure> {
        self.cache.read_errors().value().unwrap_or_default()
    }

    /// Drop the cache entries for one trip.
    pub fn invalidate_trip(&self, trip: &TripDetails) {
        self.cache.invalidate_trip(&trip.fingerprint());
    }

    /// Drop every cache entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Store an API key for a provider, with optional expiry in minutes.
    pub fn set_provider_api_key(&self, provider: &str, key: &str, ttl_minutes: Option<u64>) {
        self.credentials.set_key(provider, key, ttl_minutes);
    }

    /// Remove a provider's API key.
    pub fn revoke_provider_api_key(&self, provider: &str) {
        self.credentials.revoke(provider);
    }

    /// Whether every provider that needs an API key has a live one.
    pub fn check_required_api_keys(&self) -> Readiness {
        self.credentials.check_readiness(&self.registry)
    }

    /// The provider catalog this service quotes against.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn lock_refreshing(&self) -> MutexGuard<'_, HashSet<String>> {
        self.refreshing.lock().unwrap_or_else(|poisoned| {
            warn!("Refresh tracking mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Kick off one background refresh for a trip, unless one is already
    /// in flight.
    fn spawn_refresh(&self, trip: TripDetails, trip_key: String) {
        {
            let mut refreshing = self.lock_refreshing();
            if !refreshing.insert(trip_key.clone()) {
                debug!("Refresh already in flight for trip {}", trip_key);
                return;
            }
        }

        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let refreshing = Arc::clone(&self.refreshing);
        tokio::spawn(async move {
            let batch = fetcher.fetch_all(&trip).await;
            cache.store_batch(&trip_key, &batch);
            debug!("Background refresh completed for trip {}", trip_key);

            let mut refreshing = refreshing.lock().unwrap_or_else(|poisoned| {
                warn!("Refresh tracking mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            refreshing.remove(&trip_key);
        });
    }
}
