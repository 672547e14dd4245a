use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Consecutive failures that trigger a lock.
pub const MAX_FAILED_ATTEMPTS: u32 = 3;
pub const LOCKOUT_MINUTES: i64 = 15;

/// Map size above which stale identifiers are swept.
const SWEEP_THRESHOLD: usize = 1000;

#[derive(Debug)]
struct AttemptState {
    failures: u32,
    last_failure: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

impl AttemptState {
    /// Still locked, or failed recently enough to count toward a lock.
    fn is_live(&self, now: DateTime<Utc>, lock_for: Duration) -> bool {
        match self.locked_until {
            Some(until) => until > now,
            None => now - self.last_failure < lock_for,
        }
    }
}

/// Per-identifier login lockout. Keyed by the submitted identifier whether
/// or not an account exists for it. Failures older than the lock duration
/// are forgotten.
pub struct AuthLockout {
    attempts: Mutex<HashMap<String, AttemptState>>,
    max_failures: u32,
    lock_for: Duration,
}

impl AuthLockout {
    pub fn new() -> Self {
        Self::with_policy(MAX_FAILED_ATTEMPTS, Duration::minutes(LOCKOUT_MINUTES))
    }

    pub fn with_policy(max_failures: u32, lock_for: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_failures,
            lock_for,
        }
    }

    /// `Err(seconds)` while the identifier is locked.
    pub fn check(&self, identifier: &str, now: DateTime<Utc>) -> Result<(), u64> {
        let mut attempts = self.attempts.lock().map_err(|_| 1u64)?;
        let Some(state) = attempts.get_mut(identifier) else {
            return Ok(());
        };
        match state.locked_until {
            Some(until) if until > now => Err((until - now).num_seconds().max(1) as u64),
            Some(_) => {
                // Lock elapsed: start counting afresh.
                attempts.remove(identifier);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Count a failed attempt. Returns the lock expiry if this failure
    /// tripped the lock.
    pub fn record_failure(&self, identifier: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut attempts = self.attempts.lock().ok()?;
        if attempts.len() > SWEEP_THRESHOLD {
            let lock_for = self.lock_for;
            attempts.retain(|_, state| state.is_live(now, lock_for));
        }

        let state = attempts
            .entry(identifier.to_string())
            .or_insert(AttemptState {
                failures: 0,
                last_failure: now,
                locked_until: None,
            });
        if !state.is_live(now, self.lock_for) {
            state.failures = 0;
            state.locked_until = None;
        }
        state.failures += 1;
        state.last_failure = now;
        if state.failures >= self.max_failures {
            let until = now + self.lock_for;
            state.locked_until = Some(until);
            Some(until)
        } else {
            None
        }
    }

    pub fn record_success(&self, identifier: &str) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.remove(identifier);
        }
    }
}

impl Default for AuthLockout {
    fn default() -> Self {
        Self::new()
    }
}
