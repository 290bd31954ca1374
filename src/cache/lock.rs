//! Poison-tolerant guards for the response store. A poisoned lock is
//! recovered and logged, never propagated.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), source, op, "read")
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    source: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), source, op, "write")
}

fn recover<G>(result: LockResult<G>, source: &'static str, op: &'static str, mode: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "postboard::cache",
            source, op, mode, "response store lock was poisoned; continuing with recovered guard"
        );
        poisoned.into_inner()
    })
}
