//! Host availability state machine
//!
//! Each (host, transport) pair carries an independent reachability record
//! with hysteresis:
//!
//! ```text
//!                 network error                    grace exceeded
//!   AVAILABLE ───────────────────► GRACE WINDOW ─────────────────► UNAVAILABLE
//!   (unknown)                      (errors_from set,               (available = false,
//!       ▲                          available unchanged)            dependent alerts
//!       │                                │                         suppressed)
//!       └────────────────────────────────┴──────────── any success
//!                                                      (immediate recovery)
//! ```
//!
//! Recovery is immediate and unconditional on first success; decline is
//! gradual: the first failure opens a grace window of `unreachable_period`
//! seconds and only a failure *beyond* that window flips the host
//! unavailable. Repeated failures inside the window merely push
//! `disable_until` forward so the host is probed every `unreachable_delay`
//! seconds instead of on every due item.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{AvailabilityStore, CacheResult};
use crate::config::PollerConfig;
use crate::item::{Host, Transport};
use crate::suppressor::AlertSuppressor;

/// Tri-state reachability of one transport on one host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Never successfully contacted since the record was created
    #[default]
    Unknown,
    Available,
    Unavailable,
}

/// Availability record for one (host, transport) pair
///
/// Invariants:
/// - `errors_from == 0` means no ongoing failure streak
/// - `disable_until` is only meaningful while `errors_from != 0`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostAvailability {
    pub available: Availability,
    /// Epoch of the first failure of the current streak, 0 = none
    pub errors_from: i64,
    /// Epoch before which polling of this transport is suppressed
    pub disable_until: i64,
    /// Last failure message
    pub error: String,
}

/// Changed-fields-only update to a [`HostAvailability`] record.
///
/// Two pollers updating different transports of the same host, or one
/// poller refreshing only `disable_until`, must not overwrite fields they
/// did not touch - so every persisted transition is expressed as a delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityDelta {
    pub available: Option<Availability>,
    pub errors_from: Option<i64>,
    pub disable_until: Option<i64>,
    pub error: Option<String>,
}

impl AvailabilityDelta {
    /// Compute the delta that turns `old` into `new`.
    pub fn between(old: &HostAvailability, new: &HostAvailability) -> Self {
        Self {
            available: (old.available != new.available).then_some(new.available),
            errors_from: (old.errors_from != new.errors_from).then_some(new.errors_from),
            disable_until: (old.disable_until != new.disable_until).then_some(new.disable_until),
            error: (old.error != new.error).then(|| new.error.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_none()
            && self.errors_from.is_none()
            && self.disable_until.is_none()
            && self.error.is_none()
    }

    /// Apply this delta to a record, leaving untouched fields alone.
    pub fn apply_to(&self, record: &mut HostAvailability) {
        if let Some(available) = self.available {
            record.available = available;
        }
        if let Some(errors_from) = self.errors_from {
            record.errors_from = errors_from;
        }
        if let Some(disable_until) = self.disable_until {
            record.disable_until = disable_until;
        }
        if let Some(error) = &self.error {
            record.error = error.clone();
        }
    }
}

/// Emitted when a host transport crosses a reachability boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameReachable,
    BecameUnreachable,
}

/// Drives the per-(host, transport) state machine against the shared
/// availability store and invokes the dependent-alert suppressor on the
/// unavailable flip.
///
/// The tracker itself is stateless between calls; `now` is always passed
/// in so the hysteresis math is testable without a clock.
#[derive(Clone)]
pub struct AvailabilityTracker {
    store: Arc<dyn AvailabilityStore>,
    suppressor: Arc<dyn AlertSuppressor>,
    unreachable_delay: i64,
    unavailable_delay: i64,
    unreachable_period: i64,
}

impl AvailabilityTracker {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        suppressor: Arc<dyn AlertSuppressor>,
        config: &PollerConfig,
    ) -> Self {
        Self {
            store,
            suppressor,
            unreachable_delay: config.unreachable_delay,
            unavailable_delay: config.unavailable_delay,
            unreachable_period: config.unreachable_period,
        }
    }

    /// The host answered - even a not-supported reply proves reachability.
    ///
    /// A host that is already `{available, errors_from == 0}` produces no
    /// write and no log event, so steady-state polling of healthy hosts
    /// causes zero cache churn.
    pub async fn activate(
        &self,
        host: &Host,
        transport: Transport,
    ) -> CacheResult<Option<Transition>> {
        let current = self.store.availability(host.id, transport).await?;

        if current.errors_from == 0 && current.available == Availability::Available {
            return Ok(None);
        }

        let next = HostAvailability {
            available: Availability::Available,
            errors_from: 0,
            disable_until: 0,
            error: String::new(),
        };

        let delta = AvailabilityDelta::between(&current, &next);
        self.store
            .update_availability(host.id, transport, &delta)
            .await?;

        match current.available {
            Availability::Unavailable => {
                info!(
                    "resuming {} checks on host \"{}\": host became available",
                    transport, host.name
                );
                Ok(Some(Transition::BecameReachable))
            }
            Availability::Unknown => {
                info!("enabling {} checks on host \"{}\"", transport, host.name);
                Ok(Some(Transition::BecameReachable))
            }
            // was in the grace window - streak reset, no boundary crossed
            Availability::Available => Ok(None),
        }
    }

    /// The host failed with a network or gateway error at `now`.
    pub async fn deactivate(
        &self,
        host: &Host,
        transport: Transport,
        now: i64,
        error: &str,
    ) -> CacheResult<Option<Transition>> {
        let current = self.store.availability(host.id, transport).await?;
        let mut next = current.clone();
        let mut transition = None;

        if current.errors_from == 0 {
            next.errors_from = now;
            next.disable_until = now + self.unreachable_delay;
            warn!(
                "{} checks on host \"{}\" failed: first network error, wait for {} seconds",
                transport, host.name, self.unreachable_delay
            );
        } else if now - current.errors_from <= self.unreachable_period {
            // still inside the grace window (boundary equality included)
            next.disable_until = now + self.unreachable_delay;
            warn!(
                "{} checks on host \"{}\" failed: another network error, wait for {} seconds",
                transport, host.name, self.unreachable_delay
            );
        } else {
            next.disable_until = now + self.unavailable_delay;
            if current.available != Availability::Unavailable {
                next.available = Availability::Unavailable;
                warn!(
                    "temporarily disabling {} checks on host \"{}\": host unavailable",
                    transport, host.name
                );
                transition = Some(Transition::BecameUnreachable);
            }
        }
        next.error = error.to_string();

        // errors_from == 0 implies no suppression window
        debug_assert!(next.errors_from != 0 || next.disable_until == 0);

        let delta = AvailabilityDelta::between(&current, &next);
        if !delta.is_empty() {
            self.store
                .update_availability(host.id, transport, &delta)
                .await?;
        }

        if transition == Some(Transition::BecameUnreachable) {
            let suppressed = self
                .suppressor
                .suppress_dependents(host.id, transport, now, error)
                .await;
            debug!(
                "suppressed {} dependent alert rules for host \"{}\" ({})",
                suppressed.len(),
                host.name,
                transport
            );
        }

        Ok(transition)
    }
}
