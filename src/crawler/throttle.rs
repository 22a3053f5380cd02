//! Per-origin concurrency limiting
//!
//! One counting semaphore per origin (scheme, host and port), created the
//! first time the origin is seen and kept for the lifetime of the throttle.
//! Memory is bounded by the number of distinct origins, not by request volume.

use crate::url::origin_key;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Registry of per-origin semaphores
#[derive(Debug)]
pub struct HostThrottle {
    /// Permits per origin
    limit: usize,

    /// Lazily created limiters keyed by origin
    limiters: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostThrottle {
    /// Creates an empty throttle allowing `limit` concurrent requests per origin
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Configured permits per origin
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the semaphore for the URL's origin, creating it on first use
    pub fn limiter(&self, url: &Url) -> Arc<Semaphore> {
        let key = origin_key(url);
        let mut limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        limiters
            .entry(key)
            .or_insert_with(|| {
                tracing::trace!("Creating host limiter for {} ({} permits)", url, self.limit);
                Arc::new(Semaphore::new(self.limit))
            })
            .clone()
    }

    /// Waits for a permit on the URL's origin
    ///
    /// The permit is released when dropped.
    pub async fn acquire(&self, url: &Url) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.limiter(url).acquire_owned().await
    }

    /// Number of distinct origins seen so far
    pub fn known_origins(&self) -> usize {
        self.limiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
