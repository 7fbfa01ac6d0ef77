//! Worker slot pools
//!
//! Every running task holds two permits: one from the global pool, which caps
//! concurrency across all categories, and one from either its category's
//! dedicated pool or the shared general pool. A task takes a dedicated slot
//! when one is free and spills to the general pool otherwise.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use super::config::SchedulerConfig;
use crate::app::models::Category;

/// Which sub-pool a slot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Dedicated,
    General,
}

/// A held worker slot; dropping it releases both permits
#[derive(Debug)]
pub struct Slot {
    lane: Lane,
    _pool: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl Slot {
    pub fn lane(&self) -> Lane {
        self.lane
    }
}

/// Semaphore-backed slot pools shared by every scheduler of one run
#[derive(Debug)]
pub struct SlotPools {
    global: Arc<Semaphore>,
    general: Arc<Semaphore>,
    dedicated: HashMap<Category, Arc<Semaphore>>,
    max_concurrency: usize,
}

impl SlotPools {
    pub fn new(config: &SchedulerConfig) -> Self {
        let dedicated = config
            .dedicated_pools
            .iter()
            .map(|(category, size)| (*category, Arc::new(Semaphore::new(*size))))
            .collect();
        Self {
            global: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            general: Arc::new(Semaphore::new(config.general_pool())),
            dedicated,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Slots currently held across all categories
    pub fn in_use(&self) -> usize {
        self.max_concurrency - self.global.available_permits()
    }

    /// Wait for a slot for a task of `category`
    ///
    /// Cancel-safe: dropping the future before it resolves holds nothing.
    pub async fn acquire(&self, category: Category) -> Slot {
        let global = acquire_owned(&self.global).await;

        let Some(dedicated) = self.dedicated.get(&category) else {
            let pool = acquire_owned(&self.general).await;
            return self.slot(Lane::General, pool, global, category);
        };

        if let Ok(pool) = dedicated.clone().try_acquire_owned() {
            return self.slot(Lane::Dedicated, pool, global, category);
        }
        if let Ok(pool) = self.general.clone().try_acquire_owned() {
            return self.slot(Lane::General, pool, global, category);
        }

        tokio::select! {
            pool = acquire_owned(dedicated) => self.slot(Lane::Dedicated, pool, global, category),
            pool = acquire_owned(&self.general) => self.slot(Lane::General, pool, global, category),
        }
    }

    fn slot(
        &self,
        lane: Lane,
        pool: OwnedSemaphorePermit,
        global: OwnedSemaphorePermit,
        category: Category,
    ) -> Slot {
        trace!("{} task took a {:?} slot", category, lane);
        Slot {
            lane,
            _pool: pool,
            _global: global,
        }
    }
}

/// The semaphores are never closed, so acquisition only ends with a permit
async fn acquire_owned(semaphore: &Arc<Semaphore>) -> OwnedSemaphorePermit {
    loop {
        if let Ok(permit) = semaphore.clone().acquire_owned().await {
            return permit;
        }
        tokio::task::yield_now().await;
    }
}
