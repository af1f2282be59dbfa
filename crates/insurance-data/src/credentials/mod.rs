//! In-memory credential store for provider API keys.
//!
//! Keys live for the process lifetime only and may carry an expiry.
//! Expiry is enforced lazily on read - there is no background sweep,
//! because every call path reads the key before using it. This is
//! session-scoped secret handling, not durable secret storage.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::registry::ProviderRegistry;

/// One stored credential.
#[derive(Clone, Debug)]
struct CredentialEntry {
    key: String,
    /// Absent means the key never expires.
    expires_at: Option<DateTime<Utc>>,
}

impl CredentialEntry {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }
}

/// Result of checking whether every provider that needs a key has one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    /// True iff no provider is missing a credential
    pub ready: bool,
    /// Providers whose auth scheme needs a key that is absent or expired
    pub missing_providers: Vec<String>,
}

/// Per-provider API key storage.
///
/// Explicitly constructed and injected rather than ambient, so each test
/// and each embedding gets an isolated instance.
pub struct CredentialStore {
    entries: Mutex<HashMap<String, CredentialEntry>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the entries mutex, recovering from poison if necessary.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CredentialEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Credential store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Store a key for a provider, replacing any existing one.
    ///
    /// With `ttl_minutes` the key expires that many minutes from now;
    /// without it the key lives until revoked.
    pub fn set_key(&self, provider: &str, key: &str, ttl_minutes: Option<u64>) {
        let expires_at = ttl_minutes.map(|minutes| Utc::now() + Duration::minutes(minutes as i64));
        let mut entries = self.lock_entries();
        entries.insert(
            provider.to_string(),
            CredentialEntry {
                key: key.to_string(),
                expires_at,
            },
        );
        debug!(
            "Stored API key for '{}'{}",
            provider,
            match ttl_minutes {
                Some(minutes) => format!(" (expires in {}m)", minutes),
                None => String::new(),
            }
        );
    }

    /// Current key for a provider.
    ///
    /// An expired entry is removed as a side effect and reported as
    /// absent.
    pub fn get_key(&self, provider: &str) -> Option<String> {
        let mut entries = self.lock_entries();
        let expired = entries
            .get(provider)
            .is_some_and(|entry| entry.expired(Utc::now()));
        if expired {
            debug!("API key for '{}' has expired, removing", provider);
            entries.remove(provider);
            return None;
        }
        entries.get(provider).map(|entry| entry.key.clone())
    }

    /// Remove a provider's key unconditionally.
    pub fn revoke(&self, provider: &str) {
        let mut entries = self.lock_entries();
        if entries.remove(provider).is_some() {
            debug!("Revoked API key for '{}'", provider);
        }
    }

    /// Check that every provider whose auth scheme needs a credential has
    /// a live one.
    pub fn check_readiness(&self, registry: &ProviderRegistry) -> Readiness {
        let missing_providers: Vec<String> = registry
            .list()
            .iter()
            .filter(|config| config.auth.requires_credential())
            .filter(|config| self.get_key(&config.name).is_none())
            .map(|config| config.name.clone())
            .collect();

        Readiness {
            ready: missing_providers.is_empty(),
            missing_providers,
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
