//! Fixed-window rate limiter for provider quote requests.
//!
//! Each provider gets a 60-second window with a configurable request
//! budget. Acquisition checks the budget and increments the counter in a
//! single step while holding the lock, so concurrent callers cannot slip
//! past the budget between a check and an increment.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Length of one rate-limit window.
const WINDOW_LENGTH: Duration = Duration::from_secs(60);

/// Request counter for a single provider's current window.
#[derive(Debug)]
struct Window {
    /// Requests admitted in this window.
    count: u32,
    /// When the window rolls over and the budget resets.
    resets_at: Instant,
}

impl Window {
    fn new() -> Self {
        Self {
            count: 0,
            resets_at: Instant::now() + WINDOW_LENGTH,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.resets_at
    }
}

/// Per-provider fixed-window request counters.
///
/// Windows are created on demand and roll over lazily: the first
/// acquisition after a window elapses opens a fresh one.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the windows mutex, recovering from poison if necessary.
    ///
    /// The worst case of recovering is a slightly inaccurate counter,
    /// which is preferable to panicking on the quote path.
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter windows mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Try to consume one request from the provider's current window.
    ///
    /// Opens a fresh window when none exists or the current one has
    /// elapsed. Returns false when the window's budget is exhausted; the
    /// counter is only incremented on success.
    pub fn try_acquire(&self, provider: &str, limit_per_minute: u32) -> bool {
        let mut windows = self.lock_windows();
        let window = windows
            .entry(provider.to_string())
            .or_insert_with(Window::new);

        if window.expired() {
            *window = Window::new();
        }

        if window.count >= limit_per_minute {
            debug!("Rate limiter: budget exhausted for '{}'", provider);
            return false;
        }

        window.count += 1;
        true
    }

    /// Requests left in the provider's current window.
    pub fn remaining(&self, provider: &str, limit_per_minute: u32) -> u32 {
        let windows = self.lock_windows();
        match windows.get(provider) {
            Some(window) if !window.expired() => limit_per_minute.saturating_sub(window.count),
            _ => limit_per_minute,
        }
    }

    /// Drop the provider's window, restoring the full budget.
    pub fn reset(&self, provider: &str) {
        let mut windows = self.lock_windows();
        windows.remove(provider);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
