//! Poison-tolerant lock acquisition for gateway state.
//!
//! A panic inside one request's critical section must not take routing down for
//! every other client. Poisoned locks are logged at ERROR level and the guard is
//! recovered. The data behind these locks (windows, counters, block list) stays
//! structurally valid even if an update was interrupted halfway.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::error;

/// Lock a Mutex, recovering the guard if a previous holder panicked.
///
/// `context` names the protected state in the log line.
pub fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        error!(
            "SECURITY: Mutex poisoned for '{}' - continuing with recovered state",
            context
        );
        poisoned.into_inner()
    })
}

/// Read-lock a RwLock, recovering from poisoning.
pub fn read_lock_or_recover<'a, T>(rwlock: &'a RwLock<T>, context: &str) -> RwLockReadGuard<'a, T> {
    rwlock.read().unwrap_or_else(|poisoned| {
        error!(
            "SECURITY: RwLock (read) poisoned for '{}' - continuing with recovered state",
            context
        );
        poisoned.into_inner()
    })
}

/// Write-lock a RwLock, recovering from poisoning.
pub fn write_lock_or_recover<'a, T>(
    rwlock: &'a RwLock<T>,
    context: &str,
) -> RwLockWriteGuard<'a, T> {
    rwlock.write().unwrap_or_else(|poisoned| {
        error!(
            "SECURITY: RwLock (write) poisoned for '{}' - continuing with recovered state",
            context
        );
        poisoned.into_inner()
    })
}
