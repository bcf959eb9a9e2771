//! In-memory config cache (no persistence)
//!
//! Backs both cache traits with a single mutex-guarded map, mirroring the
//! layout of a real shared config cache: one scheduling queue per worker
//! group plus per-(host, transport) availability records. Useful for:
//! - Testing without a real configuration store
//! - Single-process deployments where the cache and the pollers live in
//!   the same address space
//!
//! ## Scheduling rules
//!
//! - Items are handed out in nextcheck order, at most `max_items` per pull
//! - A host transport with `disable_until` in the future releases no items;
//!   normal/IPMI items of such a host migrate to the serial unreachable
//!   group instead
//! - When `disable_until` has elapsed, the unreachable (or JMX) worker gets
//!   exactly one probe item per window - `disable_until` is bumped by the
//!   check timeout at hand-out time so parallel workers do not pile onto
//!   the same dead host
//! - Not-supported items reschedule on the refresh-unsupported interval;
//!   an interval of 0 parks them entirely

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::trace;

use crate::availability::{AvailabilityDelta, HostAvailability};
use crate::config::PollerConfig;
use crate::item::{HostId, Item, ItemId, ItemStatus, PollerGroup, Transport};

use super::backend::{AvailabilityStore, ItemQueue};
use super::error::{CacheError, CacheResult};

/// Sentinel nextcheck for items removed from scheduling
const NEVER: i64 = i64::MAX;

/// Where a pulled item currently lives. Items leave the queue only through
/// [`ItemQueue::due_items`] and return through one of the requeue calls;
/// an item at a poller is never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Queued,
    Poller,
}

#[derive(Debug, Clone)]
struct QueuedItem {
    item: Item,
    group: PollerGroup,
    location: Location,
}

#[derive(Debug, Default)]
struct CacheInner {
    items: HashMap<ItemId, QueuedItem>,
    availability: HashMap<(HostId, Transport), HostAvailability>,
}

/// Mutex-guarded in-memory implementation of [`ItemQueue`] and
/// [`AvailabilityStore`].
pub struct MemoryCache {
    inner: Mutex<CacheInner>,
    timeout: i64,
    refresh_unsupported: i64,
    availability_writes: AtomicU64,
}

impl MemoryCache {
    pub fn new(config: &PollerConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            timeout: config.timeout as i64,
            refresh_unsupported: config.refresh_unsupported,
            availability_writes: AtomicU64::new(0),
        }
    }

    /// Register an item under its natural worker group.
    pub fn add_item(&self, item: Item) {
        let group = item.check_type.poller_group();
        self.inner
            .lock()
            .expect("config cache lock poisoned")
            .items
            .insert(
                item.id,
                QueuedItem {
                    item,
                    group,
                    location: Location::Queued,
                },
            );
    }

    /// Current scheduling state of an item, for inspection in tests and
    /// operator tooling.
    pub fn item_snapshot(&self, item_id: ItemId) -> Option<(Item, PollerGroup)> {
        self.inner
            .lock()
            .expect("config cache lock poisoned")
            .items
            .get(&item_id)
            .map(|queued| (queued.item.clone(), queued.group))
    }

    /// Number of availability store writes so far; lets tests assert the
    /// no-op contract of the tracker.
    pub fn availability_writes(&self) -> u64 {
        self.availability_writes.load(Ordering::Relaxed)
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, CacheInner>> {
        self.inner.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl CacheInner {
    fn disable_until(&self, item: &Item) -> i64 {
        let Some(transport) = item.check_type.transport() else {
            return 0;
        };
        match self.availability.get(&(item.host.id, transport)) {
            Some(record) if record.errors_from != 0 => record.disable_until,
            _ => 0,
        }
    }

    fn bump_disable_until(&mut self, item: &Item, now: i64, timeout: i64) {
        let Some(transport) = item.check_type.transport() else {
            return;
        };
        if let Some(record) = self.availability.get_mut(&(item.host.id, transport)) {
            if record.errors_from != 0 {
                record.disable_until = now + timeout;
            }
        }
    }
}

#[async_trait]
impl ItemQueue for MemoryCache {
    async fn due_items(
        &self,
        group: PollerGroup,
        max_items: usize,
        now: i64,
    ) -> CacheResult<Vec<Item>> {
        let mut inner = self.lock()?;

        let mut due: Vec<ItemId> = inner
            .items
            .values()
            .filter(|queued| {
                queued.group == group
                    && queued.location == Location::Queued
                    && queued.item.nextcheck <= now
            })
            .map(|queued| queued.item.id)
            .collect();
        due.sort_unstable_by_key(|id| {
            let queued = &inner.items[id];
            (queued.item.nextcheck, queued.item.id)
        });

        let mut batch = Vec::new();

        for id in due {
            if batch.len() == max_items {
                break;
            }

            let queued = inner.items[&id].clone();
            let disable_until = inner.disable_until(&queued.item);

            if disable_until == 0 {
                if group == PollerGroup::Unreachable {
                    // host recovered elsewhere - hand the item back to its
                    // natural group
                    let natural = queued.item.check_type.poller_group();
                    let entry = inner.items.get_mut(&id).expect("item just seen");
                    entry.group = natural;
                    entry.item.nextcheck = now;
                    continue;
                }
            } else if matches!(group, PollerGroup::Normal | PollerGroup::Ipmi) {
                // mid-failure hosts are probed by the serial worker only
                let entry = inner.items.get_mut(&id).expect("item just seen");
                entry.group = PollerGroup::Unreachable;
                if disable_until > now {
                    entry.item.nextcheck = disable_until;
                }
                continue;
            } else if disable_until > now {
                let entry = inner.items.get_mut(&id).expect("item just seen");
                entry.item.nextcheck = disable_until;
                continue;
            } else {
                // probe window open: release this one item and push the
                // window forward so no other worker probes concurrently
                inner.bump_disable_until(&queued.item, now, self.timeout);
            }

            inner.items.get_mut(&id).expect("item just seen").location = Location::Poller;
            batch.push(queued.item);
        }

        trace!("handing out {} due items for {:?}", batch.len(), group);

        Ok(batch)
    }

    async fn requeue_reachable(
        &self,
        item_id: ItemId,
        status: ItemStatus,
        now: i64,
    ) -> CacheResult<()> {
        let refresh_unsupported = self.refresh_unsupported;
        let mut inner = self.lock()?;
        let queued = inner
            .items
            .get_mut(&item_id)
            .ok_or(CacheError::ItemNotFound(item_id))?;

        queued.item.status = status;
        queued.group = queued.item.check_type.poller_group();
        queued.location = Location::Queued;
        queued.item.nextcheck = match status {
            ItemStatus::Active => now + queued.item.delay.max(1),
            ItemStatus::NotSupported if refresh_unsupported > 0 => now + refresh_unsupported,
            ItemStatus::NotSupported => NEVER,
        };

        Ok(())
    }

    async fn requeue_unreachable(&self, item_id: ItemId) -> CacheResult<()> {
        let mut inner = self.lock()?;

        let queued = inner
            .items
            .get(&item_id)
            .ok_or(CacheError::ItemNotFound(item_id))?
            .clone();
        let disable_until = inner.disable_until(&queued.item);

        let entry = inner.items.get_mut(&item_id).expect("item just seen");
        if matches!(entry.group, PollerGroup::Normal | PollerGroup::Ipmi) {
            entry.group = PollerGroup::Unreachable;
        }
        entry.location = Location::Queued;
        entry.item.nextcheck = if disable_until != 0 {
            disable_until
        } else {
            entry.item.nextcheck + entry.item.delay.max(1)
        };

        Ok(())
    }

    async fn next_due(&self, group: PollerGroup) -> CacheResult<Option<i64>> {
        let inner = self.lock()?;
        Ok(inner
            .items
            .values()
            .filter(|queued| {
                queued.group == group
                    && queued.location == Location::Queued
                    && queued.item.nextcheck != NEVER
            })
            .map(|queued| queued.item.nextcheck)
            .min())
    }
}

#[async_trait]
impl AvailabilityStore for MemoryCache {
    async fn availability(
        &self,
        host_id: HostId,
        transport: Transport,
    ) -> CacheResult<HostAvailability> {
        let inner = self.lock()?;
        Ok(inner
            .availability
            .get(&(host_id, transport))
            .cloned()
            .unwrap_or_default())
    }

    async fn update_availability(
        &self,
        host_id: HostId,
        transport: Transport,
        delta: &AvailabilityDelta,
    ) -> CacheResult<bool> {
        self.availability_writes.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.lock()?;
        let record = inner
            .availability
            .entry((host_id, transport))
            .or_default();

        let before = record.clone();
        delta.apply_to(record);

        Ok(*record != before)
    }
}
