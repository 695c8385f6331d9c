use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Per-destination-domain admission limiter.
///
/// Pools are created on first use and never removed. A limit of zero
/// disables admission control entirely.
#[derive(Debug, Default)]
pub struct DomainSlots {
    limit: usize,
    pools: DashMap<String, Arc<Semaphore>>,
}

/// Held while a session against the domain is in flight. Dropping it returns
/// the slot.
#[derive(Debug)]
pub struct SlotGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

impl DomainSlots {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            pools: DashMap::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for a slot for `domain`. `None` means the wait was cancelled.
    pub async fn acquire(&self, domain: &str, cancel: &CancellationToken) -> Option<SlotGuard> {
        if self.limit == 0 {
            return Some(SlotGuard { _permit: None });
        }
        let pool = self.pool(domain);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = pool.acquire_owned() => {
                // The semaphore is never closed.
                let permit = permit.ok()?;
                trace!(domain, "domain slot acquired");
                Some(SlotGuard { _permit: Some(permit) })
            }
        }
    }

    /// Slots currently free for `domain`, or `None` when unlimited or unseen.
    pub fn available(&self, domain: &str) -> Option<usize> {
        if self.limit == 0 {
            return None;
        }
        self.pools.get(domain).map(|pool| pool.available_permits())
    }

    fn pool(&self, domain: &str) -> Arc<Semaphore> {
        if let Some(pool) = self.pools.get(domain) {
            return Arc::clone(&pool);
        }
        let pool = self
            .pools
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.limit)));
        Arc::clone(&pool)
    }
}
