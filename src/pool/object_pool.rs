//! Generic thread-safe object pool.
//!
//! # Responsibilities
//! - Hand out reusable items to concurrent requests
//! - Reset every item before it is handed out again
//! - Return items through a guard so release happens exactly once
//! - Track checkout/checkin counters for leak detection

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::observability::metrics;

/// Items that can be cleared of per-request state.
pub trait Reset {
    /// Drop all state left behind by a previous user.
    fn reset(&mut self);
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct PoolInner<T> {
    name: &'static str,
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    factory: Factory<T>,
    created: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
}

/// A bounded pool of reusable items.
///
/// Cloning a `Pool` is cheap and yields a handle to the same idle list, so
/// the pipeline and a test (or the admin side of a binary) can observe the
/// same counters.
pub struct Pool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.inner.name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: Reset + Send + 'static> Pool<T> {
    /// Create a pool that builds new items with `factory` when the idle list
    /// is empty and keeps at most `max_idle` returned items.
    pub fn new<F>(name: &'static str, max_idle: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(PoolInner {
                name,
                idle: Mutex::new(Vec::with_capacity(max_idle.min(64))),
                max_idle,
                factory: Box::new(factory),
                created: AtomicU64::new(0),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
            }),
        }
    }

    /// Check an item out of the pool. The item is reset before it is returned.
    pub fn acquire(&self) -> Pooled<T> {
        let recycled = self.inner.idle.lock().pop();
        let mut item = match recycled {
            Some(item) => item,
            None => {
                self.inner.created.fetch_add(1, Ordering::Relaxed);
                metrics::record_pool_created(self.inner.name);
                (self.inner.factory)()
            }
        };
        item.reset();
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        metrics::record_pool_outstanding(self.inner.name, self.stats().outstanding);

        Pooled {
            item: Some(item),
            pool: Arc::clone(&self.inner),
        }
    }
}

impl<T> Pool<T> {
    /// Pool name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let acquired = self.inner.acquired.load(Ordering::SeqCst);
        let released = self.inner.released.load(Ordering::SeqCst);
        PoolStats {
            created: self.inner.created.load(Ordering::Relaxed),
            acquired,
            released,
            discarded: self.inner.discarded.load(Ordering::Relaxed),
            idle: self.inner.idle.lock().len(),
            outstanding: acquired.saturating_sub(released),
        }
    }
}

impl<T> PoolInner<T> {
    fn release(&self, item: T) {
        {
            let mut idle = self.idle.lock();
            if idle.len() < self.max_idle {
                idle.push(item);
            } else {
                self.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
        let released = self.released.fetch_add(1, Ordering::SeqCst) + 1;
        let acquired = self.acquired.load(Ordering::SeqCst);
        metrics::record_pool_outstanding(self.name, acquired.saturating_sub(released));
    }
}

/// Pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Items built by the factory (lifetime).
    pub created: u64,
    /// Checkouts (lifetime).
    pub acquired: u64,
    /// Checkins (lifetime).
    pub released: u64,
    /// Checkins dropped because the idle list was full.
    pub discarded: u64,
    /// Items currently waiting on the idle list.
    pub idle: usize,
    /// Items currently checked out.
    pub outstanding: u64,
}

/// RAII checkout of a pooled item. Dropping the guard returns the item.
pub struct Pooled<T> {
    item: Option<T>,
    pool: Arc<PoolInner<T>>,
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` takes the item out.
        match self.item.as_ref() {
            Some(item) => item,
            None => unreachable!("pooled item accessed after release"),
        }
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.item.as_mut() {
            Some(item) => item,
            None => unreachable!("pooled item accessed after release"),
        }
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.pool.name)
            .field("item", &self.item)
            .finish()
    }
}
