//! Result cache for aggregated quote runs.
//!
//! Five key spaces are written together from each aggregation run: the
//! full plan list, plans per trip, plans per provider, individual plans
//! by id, and the per-provider error map. Entries serve fresh for five
//! minutes, then stale (eligible for background refresh) for up to an
//! hour, then disappear. Eviction is lazy: an over-age entry is removed
//! when a read encounters it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{debug, warn};

use tripsure_insurance_data::{InsurancePlan, ProviderFailure, ProviderName, QuoteBatch};

/// Default age past which an entry is served stale and refreshed in the
/// background.
const STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Default age past which an entry is dropped entirely.
const EVICT_AFTER: Duration = Duration::from_secs(60 * 60);

/// Outcome of a cache read.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheRead<T> {
    /// Entry is inside the freshness window.
    Fresh(T),
    /// Entry is past freshness but not yet evicted. Callers should serve
    /// it and refresh in the background.
    Stale(T),
    /// No live entry.
    Miss,
}

impl<T> CacheRead<T> {
    /// The cached value regardless of freshness, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Miss => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// One cached value with its write time.
#[derive(Clone, Debug)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T: Clone> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    fn read(&self, stale_after: Duration, evict_after: Duration) -> CacheRead<T> {
        let age = self.stored_at.elapsed();
        if age >= evict_after {
            CacheRead::Miss
        } else if age >= stale_after {
            CacheRead::Stale(self.value.clone())
        } else {
            CacheRead::Fresh(self.value.clone())
        }
    }
}

/// In-memory cache over aggregation results.
///
/// Explicitly constructed and injected; there is no ambient global cache,
/// so each test and each embedding gets an isolated instance.
pub struct ResultCache {
    stale_after: Duration,
    evict_after: Duration,
    all_plans: Mutex<Option<Entry<Vec<InsurancePlan>>>>,
    by_trip: DashMap<String, Entry<Vec<InsurancePlan>>>,
    by_provider: DashMap<ProviderName, Entry<Vec<InsurancePlan>>>,
    by_id: DashMap<String, Entry<InsurancePlan>>,
    errors: Mutex<Option<Entry<HashMap<ProviderName, ProviderFailure>>>>,
    /// Trip fingerprint that produced the current global entries.
    last_trip: Mutex<Option<String>>,
}

impl ResultCache {
    /// Cache with the standard freshness policy (5 minutes fresh, one
    /// hour until eviction).
    pub fn new() -> Self {
        Self::with_policy(STALE_AFTER, EVICT_AFTER)
    }

    /// Cache with a custom freshness policy.
    pub fn with_policy(stale_after: Duration, evict_after: Duration) -> Self {
        Self {
            stale_after,
            evict_after,
            all_plans: Mutex::new(None),
            by_trip: DashMap::new(),
            by_provider: DashMap::new(),
            by_id: DashMap::new(),
            errors: Mutex::new(None),
            last_trip: Mutex::new(None),
        }
    }

    fn lock_slot<'a, T>(&self, slot: &'a Mutex<T>) -> MutexGuard<'a, T> {
        slot.lock().unwrap_or_else(|poisoned| {
            warn!("Result cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Store one aggregation run under every derived key space.
    ///
    /// After this returns, the full list, the per-trip entry, the
    /// per-provider groups, the per-plan entries, and the error map all
    /// reflect the same fetch.
    pub fn store_batch(&self, trip_key: &str, batch: &QuoteBatch) {
        *self.lock_slot(&self.all_plans) = Some(Entry::new(batch.plans.clone()));
        *self.lock_slot(&self.errors) = Some(Entry::new(batch.errors.clone()));
        *self.lock_slot(&self.last_trip) = Some(trip_key.to_string());

        self.by_trip
            .insert(trip_key.to_string(), Entry::new(batch.plans.clone()));

        let mut grouped: HashMap<ProviderName, Vec<InsurancePlan>> = HashMap::new();
        for plan in &batch.plans {
            grouped
                .entry(plan.provider.clone())
                .or_default()
                .push(plan.clone());
            self.by_id.insert(plan.id.clone(), Entry::new(plan.clone()));
        }
        for (provider, plans) in grouped {
            self.by_provider.insert(provider, Entry::new(plans));
        }

        debug!(
            "Cached {} plans and {} errors for trip {}",
            batch.plans.len(),
            batch.errors.len(),
            trip_key
        );
    }

    /// Plans from the most recent fetch, across all providers.
    pub fn read_all_plans(&self) -> CacheRead<Vec<InsurancePlan>> {
        self.read_slot(&self.all_plans)
    }

    /// Plans cached for one trip.
    pub fn read_trip(&self, trip_key: &str) -> CacheRead<Vec<InsurancePlan>> {
        self.read_map(&self.by_trip, trip_key)
    }

    /// Plans cached for one provider.
    pub fn read_provider(&self, provider: &str) -> CacheRead<Vec<InsurancePlan>> {
        self.read_map(&self.by_provider, provider)
    }

    /// One plan by id.
    pub fn read_plan(&self, plan_id: &str) -> CacheRead<InsurancePlan> {
        self.read_map(&self.by_id, plan_id)
    }

    /// The per-provider error map from the most recent fetch.
    pub fn read_errors(&self) -> CacheRead<HashMap<ProviderName, ProviderFailure>> {
        self.read_slot(&self.errors)
    }

    /// Drop one trip's entry. The global spaces are cleared too when they
    /// were produced by that trip's fetch; other trips' entries and the
    /// per-plan and per-provider spaces age out on their own.
    pub fn invalidate_trip(&self, trip_key: &str) {
        self.by_trip.remove(trip_key);

        let mut last_trip = self.lock_slot(&self.last_trip);
        if last_trip.as_deref() == Some(trip_key) {
            *self.lock_slot(&self.all_plans) = None;
            *self.lock_slot(&self.errors) = None;
            *last_trip = None;
        }
        debug!("Invalidated cache for trip {}", trip_key);
    }

    /// Drop everything.
    pub fn invalidate_all(&self) {
        *self.lock_slot(&self.all_plans) = None;
        *self.lock_slot(&self.errors) = None;
        *self.lock_slot(&self.last_trip) = None;
        self.by_trip.clear();
        self.by_provider.clear();
        self.by_id.clear();
        debug!("Invalidated entire quote cache");
    }

    /// Read a singleton slot, evicting an over-age entry in place.
    fn read_slot<T: Clone>(&self, slot: &Mutex<Option<Entry<T>>>) -> CacheRead<T> {
        let mut guard = self.lock_slot(slot);
        let result = match guard.as_ref() {
            Some(entry) => entry.read(self.stale_after, self.evict_after),
            None => CacheRead::Miss,
        };
        if result.is_miss() {
            *guard = None;
        }
        result
    }

    /// Read a keyed space, evicting an over-age entry on the way out.
    fn read_map<T: Clone>(&self, map: &DashMap<String, Entry<T>>, key: &str) -> CacheRead<T> {
        let result = map
            .get(key)
            .map(|entry| entry.read(self.stale_after, self.evict_after))
            .unwrap_or(CacheRead::Miss);
        if result.is_miss() {
            map.remove(key);
        }
        result
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
