//! Integration tests for the quote service and result cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

use tripsure_insurance_data::{
    AuthScheme, CredentialStore, FieldMapping, InsurancePlan, ProviderConfig, ProviderFailure,
    ProviderRegistry, QuoteBatch, QuoteError, TripDetails,
};

use super::cache::{CacheRead, ResultCache};
use super::service::{PlanFetcher, QuoteService};
use crate::errors::Error;

/// Fetcher returning a scripted batch, counting calls.
struct ScriptedFetcher {
    batch: Mutex<QuoteBatch>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(batch: QuoteBatch) -> Self {
        Self {
            batch: Mutex::new(batch),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(batch: QuoteBatch, delay: Duration) -> Self {
        Self {
            batch: Mutex::new(batch),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    fn set_batch(&self, batch: QuoteBatch) {
        *self.batch.lock().unwrap() = batch;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanFetcher for ScriptedFetcher {
    async fn fetch_all(&self, _trip: &TripDetails) -> QuoteBatch {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let batch = self.batch.lock().unwrap().clone();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        batch
    }
}

fn provider_config(name: &str, auth: AuthScheme) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        base_url: "https://api.example.com".to_string(),
        auth,
        mapping: vec![
            FieldMapping::new("id", "id"),
            FieldMapping::new("name", "name"),
            FieldMapping::new("basePrice", "price"),
        ],
        rate_limit_per_minute: 100,
        timeout_ms: 10_000,
    }
}

fn registry() -> Arc<ProviderRegistry> {
    Arc::new(
        ProviderRegistry::new(vec![
            provider_config("PROVIDER_A", AuthScheme::ApiKey),
            provider_config("PROVIDER_B", AuthScheme::None),
        ])
        .unwrap(),
    )
}

fn plan(id: &str, provider: &str) -> InsurancePlan {
    InsurancePlan {
        id: id.to_string(),
        name: format!("{} plan", id),
        provider: provider.to_string(),
        base_price: dec!(120),
        medical_coverage: Some(dec!(50000)),
        emergency_evacuation: None,
        extras: BTreeMap::new(),
    }
}

fn batch(plans: Vec<InsurancePlan>) -> QuoteBatch {
    QuoteBatch {
        plans,
        errors: HashMap::new(),
    }
}

fn trip() -> TripDetails {
    TripDetails {
        destination: "JP".to_string(),
        origin: "US".to_string(),
        departure_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        return_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
        travelers: 2,
        trip_cost: dec!(4800),
    }
}

/// Service with the default (minutes-scale) freshness policy.
fn service_with(fetcher: Arc<ScriptedFetcher>) -> QuoteService {
    QuoteService::new(registry(), fetcher, Arc::new(CredentialStore::new()))
}

/// Service over a short freshness policy so staleness is reachable in a
/// test run.
fn service_with_policy(
    fetcher: Arc<ScriptedFetcher>,
    stale_after: Duration,
    evict_after: Duration,
) -> QuoteService {
    QuoteService::with_config(
        registry(),
        fetcher,
        Arc::new(CredentialStore::new()),
        Arc::new(ResultCache::with_policy(stale_after, evict_after)),
    )
}

async fn wait_for_calls(fetcher: &ScriptedFetcher, expected: usize) {
    for _ in 0..100 {
        if fetcher.calls() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "fetcher never reached {} calls (saw {})",
        expected,
        fetcher.calls()
    );
}

// =========================================================================
// Cache behavior through the service
// =========================================================================

#[tokio::test]
async fn test_miss_fetches_and_caches() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("A1", "PROVIDER_A")])));
    let service = service_with(Arc::clone(&fetcher));

    let plans = service.plans_for_trip(&trip()).await;
    assert_eq!(plans.len(), 1);
    assert_eq!(fetcher.calls(), 1);

    // Second read within the freshness window is served from cache.
    let plans = service.plans_for_trip(&trip()).await;
    assert_eq!(plans.len(), 1);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_stale_serves_old_value_and_refreshes_in_background() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("OLD", "PROVIDER_A")])));
    let service = service_with_policy(
        Arc::clone(&fetcher),
        Duration::from_millis(200),
        Duration::from_secs(60),
    );

    service.fetch_all_provider_plans(&trip()).await;
    assert_eq!(fetcher.calls(), 1);

    // Let the entry age past the staleness window but not eviction.
    tokio::time::sleep(Duration::from_millis(250)).await;
    fetcher.set_batch(batch(vec![plan("NEW", "PROVIDER_A")]));

    // The stale value is returned synchronously.
    let plans = service.plans_for_trip(&trip()).await;
    assert_eq!(plans[0].id, "OLD");

    // ...while a background refresh replaces it.
    wait_for_calls(&fetcher, 2).await;
    for _ in 0..100 {
        if service.plans_for_trip(&trip()).await[0].id == "NEW" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let plans = service.plans_for_trip(&trip()).await;
    assert_eq!(plans[0].id, "NEW");
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_fresh_entry_triggers_no_refresh() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("A1", "PROVIDER_A")])));
    let service = service_with_policy(
        Arc::clone(&fetcher),
        Duration::from_millis(300),
        Duration::from_secs(60),
    );

    service.fetch_all_provider_plans(&trip()).await;

    // Aged, but still inside the freshness window: no refetch.
    tokio::time::sleep(Duration::from_millis(100)).await;
    service.plans_for_trip(&trip()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_evicted_entry_is_a_miss() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("A1", "PROVIDER_A")])));
    let service = service_with_policy(
        Arc::clone(&fetcher),
        Duration::from_millis(10),
        Duration::from_millis(50),
    );

    service.fetch_all_provider_plans(&trip()).await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    // Past eviction: the read is a miss and fetches inline.
    let plans = service.plans_for_trip(&trip()).await;
    assert_eq!(plans.len(), 1);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_stale_reads_refresh_once() {
    let fetcher = Arc::new(ScriptedFetcher::with_delay(
        batch(vec![plan("A1", "PROVIDER_A")]),
        Duration::from_millis(100),
    ));
    let service = service_with_policy(
        Arc::clone(&fetcher),
        Duration::from_millis(150),
        Duration::from_secs(60),
    );

    service.fetch_all_provider_plans(&trip()).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Two stale reads before the refresh lands: only one refresh task.
    service.plans_for_trip(&trip()).await;
    service.plans_for_trip(&trip()).await;

    wait_for_calls(&fetcher, 2).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(fetcher.calls(), 2);
}

// =========================================================================
// Plan lookup
// =========================================================================

#[tokio::test]
async fn test_plan_by_id_served_from_cache() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![
        plan("A1", "PROVIDER_A"),
        plan("B1", "PROVIDER_B"),
    ])));
    let service = service_with(Arc::clone(&fetcher));

    service.fetch_all_provider_plans(&trip()).await;
    let found = service.plan_by_id("B1", &trip()).await.unwrap();
    assert_eq!(found.provider, "PROVIDER_B");
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_plan_by_id_falls_back_to_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("A1", "PROVIDER_A")])));
    let service = service_with(Arc::clone(&fetcher));

    let found = service.plan_by_id("A1", &trip()).await.unwrap();
    assert_eq!(found.id, "A1");
    assert_eq!(fetcher.calls(), 1);

    assert!(service.plan_by_id("MISSING", &trip()).await.is_none());
}

#[tokio::test]
async fn test_plans_by_provider_groups_cached_plans() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![
        plan("A1", "PROVIDER_A"),
        plan("A2", "PROVIDER_A"),
        plan("B1", "PROVIDER_B"),
    ])));
    let service = service_with(Arc::clone(&fetcher));

    service.fetch_all_provider_plans(&trip()).await;

    assert_eq!(service.plans_by_provider("PROVIDER_A").len(), 2);
    assert_eq!(service.plans_by_provider("PROVIDER_B").len(), 1);
    assert!(service.plans_by_provider("PROVIDER_C").is_empty());
}

// =========================================================================
// Errors and invalidation
// =========================================================================

#[tokio::test]
async fn test_provider_errors_surface_last_run() {
    let mut failed = batch(vec![plan("A1", "PROVIDER_A")]);
    failed.errors.insert(
        "PROVIDER_B".to_string(),
        ProviderFailure::from_error(
            "PROVIDER_B",
            &QuoteError::Timeout {
                provider: "PROVIDER_B".to_string(),
                timeout_ms: 10_000,
            },
        ),
    );

    let fetcher = Arc::new(ScriptedFetcher::new(failed));
    let service = service_with(Arc::clone(&fetcher));

    assert!(service.provider_errors().is_empty());

    service.fetch_all_provider_plans(&trip()).await;
    let errors = service.provider_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["PROVIDER_B"].status_code, 408);
}

#[tokio::test]
async fn test_invalidate_trip_forces_refetch() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("A1", "PROVIDER_A")])));
    let service = service_with(Arc::clone(&fetcher));

    service.plans_for_trip(&trip()).await;
    service.invalidate_trip(&trip());

    service.plans_for_trip(&trip()).await;
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_invalidate_all_clears_every_space() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(vec![plan("A1", "PROVIDER_A")])));
    let cache = Arc::new(ResultCache::new());
    let service = QuoteService::with_config(
        registry(),
        Arc::clone(&fetcher) as Arc<dyn PlanFetcher>,
        Arc::new(CredentialStore::new()),
        Arc::clone(&cache),
    );

    service.fetch_all_provider_plans(&trip()).await;
    service.invalidate_all();

    assert!(service.plans_by_provider("PROVIDER_A").is_empty());
    assert!(service.provider_errors().is_empty());
    assert!(cache.read_plan("A1").is_miss());
    assert!(cache.read_all_plans().is_miss());
}

// =========================================================================
// Credential surface
// =========================================================================

#[tokio::test]
async fn test_readiness_via_service_surface() {
    let fetcher = Arc::new(ScriptedFetcher::new(batch(Vec::new())));
    let service = service_with(fetcher);

    let readiness = service.check_required_api_keys();
    assert!(!readiness.ready);
    assert_eq!(readiness.missing_providers, vec!["PROVIDER_A".to_string()]);

    service.set_provider_api_key("PROVIDER_A", "secret", None);
    assert!(service.check_required_api_keys().ready);

    service.revoke_provider_api_key("PROVIDER_A");
    assert!(!service.check_required_api_keys().ready);
}

// =========================================================================
// Wiring
// =========================================================================

#[tokio::test]
async fn test_from_configs_rejects_duplicate_providers() {
    let result = QuoteService::from_configs(vec![
        provider_config("DUPE", AuthScheme::None),
        provider_config("DUPE", AuthScheme::None),
    ]);
    assert!(matches!(result, Err(Error::Registry(_))));
}

#[tokio::test]
async fn test_builtin_wiring_exposes_catalog() {
    let service = QuoteService::with_builtin_providers();
    assert!(!service.registry().is_empty());
    // Every credential-gated builtin provider is reported until keys land.
    assert!(!service.check_required_api_keys().ready);
}

// =========================================================================
// Cache unit coverage
// =========================================================================

#[test]
fn test_cache_read_accessors() {
    assert_eq!(CacheRead::Fresh(1).value(), Some(1));
    assert_eq!(CacheRead::Stale(2).value(), Some(2));
    assert_eq!(CacheRead::<i32>::Miss.value(), None);
    assert!(CacheRead::Stale(()).is_stale());
    assert!(CacheRead::<()>::Miss.is_miss());
}

#[test]
fn test_cache_store_populates_every_space() {
    let cache = ResultCache::new();
    let mut run = batch(vec![plan("A1", "PROVIDER_A"), plan("B1", "PROVIDER_B")]);
    run.errors.insert(
        "PROVIDER_C".to_string(),
        ProviderFailure::from_error(
            "PROVIDER_C",
            &QuoteError::Network {
                provider: "PROVIDER_C".to_string(),
                message: "unreachable".to_string(),
            },
        ),
    );

    cache.store_batch("trip-1", &run);

    assert_eq!(cache.read_all_plans().value().unwrap().len(), 2);
    assert_eq!(cache.read_trip("trip-1").value().unwrap().len(), 2);
    assert_eq!(cache.read_provider("PROVIDER_A").value().unwrap().len(), 1);
    assert_eq!(cache.read_plan("B1").value().unwrap().provider, "PROVIDER_B");
    assert_eq!(cache.read_errors().value().unwrap().len(), 1);
}

#[test]
fn test_cache_invalidate_trip_clears_matching_globals() {
    let cache = ResultCache::new();
    cache.store_batch("trip-1", &batch(vec![plan("A1", "PROVIDER_A")]));
    cache.invalidate_trip("trip-1");

    assert!(cache.read_trip("trip-1").is_miss());
    assert!(cache.read_all_plans().is_miss());
    assert!(cache.read_errors().is_miss());
}

#[test]
fn test_cache_invalidate_other_trip_keeps_globals() {
    let cache = ResultCache::new();
    cache.store_batch("trip-1", &batch(vec![plan("A1", "PROVIDER_A")]));
    cache.invalidate_trip("trip-2");

    assert!(!cache.read_trip("trip-1").is_miss());
    assert!(!cache.read_all_plans().is_miss());
}

#[test]
fn test_cache_staleness_transitions() {
    let cache = ResultCache::with_policy(Duration::from_millis(50), Duration::from_millis(150));
    cache.store_batch("trip-1", &batch(vec![plan("A1", "PROVIDER_A")]));

    // Inside the freshness window.
    assert!(matches!(cache.read_trip("trip-1"), CacheRead::Fresh(_)));

    // Past freshness, before eviction.
    std::thread::sleep(Duration::from_millis(70));
    assert!(cache.read_trip("trip-1").is_stale());

    // Past eviction: miss, and the entry is removed lazily on that read.
    std::thread::sleep(Duration::from_millis(100));
    assert!(cache.read_trip("trip-1").is_miss());
    assert!(cache.read_trip("trip-1").is_miss());
}
