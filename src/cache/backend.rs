//! Config cache trait definitions

use async_trait::async_trait;

use crate::availability::{AvailabilityDelta, HostAvailability};
use crate::item::{HostId, Item, ItemId, ItemStatus, PollerGroup, Transport};

use super::error::CacheResult;

/// The shared item scheduling queue.
///
/// Items leave the queue only through [`ItemQueue::due_items`] and every
/// pulled item must be returned with exactly one of the requeue calls once
/// its result is classified. Implementations serialize conflicting writes
/// at per-item granularity.
#[async_trait]
pub trait ItemQueue: Send + Sync {
    /// Pull up to `max_items` items of `group` that are due at `now`,
    /// ordered by nextcheck.
    ///
    /// Implementations must honor the host-transport `disable_until`
    /// gate: while it lies in the future the host's items are not handed
    /// out, and when it has elapsed only a single probe item is released
    /// per delay window.
    async fn due_items(
        &self,
        group: PollerGroup,
        max_items: usize,
        now: i64,
    ) -> CacheResult<Vec<Item>>;

    /// Return an item after a pass that reached its host (or never
    /// involved the network). Reschedules on the item's own delay - or the
    /// refresh-unsupported interval when `status` is
    /// [`ItemStatus::NotSupported`] - and migrates the item back to its
    /// natural worker group.
    async fn requeue_reachable(
        &self,
        item_id: ItemId,
        status: ItemStatus,
        now: i64,
    ) -> CacheResult<()>;

    /// Return an item whose host failed with a network error. Migrates the
    /// item to the serial unreachable group and reschedules it for when the
    /// host's `disable_until` elapses.
    async fn requeue_unreachable(&self, item_id: ItemId) -> CacheResult<()>;

    /// Earliest nextcheck among this group's schedulable items, if any.
    async fn next_due(&self, group: PollerGroup) -> CacheResult<Option<i64>>;
}

/// Per-(host, transport) availability records.
///
/// Reads return the record by value; writes go through
/// [`AvailabilityDelta`] so concurrent pollers updating different
/// transports of the same host never clobber each other's fields.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Current availability of one transport on one host. Hosts that were
    /// never contacted yield the default (unknown) record.
    async fn availability(
        &self,
        host_id: HostId,
        transport: Transport,
    ) -> CacheResult<HostAvailability>;

    /// Apply a changed-fields-only delta. Returns whether any field
    /// actually changed, so callers can skip redundant downstream writes.
    async fn update_availability(
        &self,
        host_id: HostId,
        transport: Transport,
        delta: &AvailabilityDelta,
    ) -> CacheResult<bool>;
}
