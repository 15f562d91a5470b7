//! Lock acquisition helpers.
//!
//! Every shared structure in the crate sits behind its own `RwLock` or
//! `Mutex`. A poisoned lock is recovered and logged rather than allowed to
//! propagate a panic from one cache operation into unrelated ones.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn log_recovery(module: &'static str, op: &'static str, kind: &'static str) {
    warn!(
        module,
        op,
        lock_kind = kind,
        result = "poisoned_recovered",
        "Recovered from poisoned cache lock"
    );
}

pub(crate) fn read_guard<'a, T>(
    lock: &'a RwLock<T>,
    module: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        log_recovery(module, op, "rwlock.read");
        poisoned.into_inner()
    })
}

pub(crate) fn write_guard<'a, T>(
    lock: &'a RwLock<T>,
    module: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log_recovery(module, op, "rwlock.write");
        poisoned.into_inner()
    })
}

pub(crate) fn lock_guard<'a, T>(
    lock: &'a Mutex<T>,
    module: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        log_recovery(module, op, "mutex.lock");
        poisoned.into_inner()
    })
}
