//! Shared collaborators for poller workers
//!
//! All dependencies a worker needs are bundled in one explicit
//! [`PollerContext`] passed into every worker - there is no process-wide
//! mutable state. Many workers share one context; everything inside is
//! behind `Arc` and safe for concurrent use.

use std::sync::Arc;

use crate::availability::AvailabilityTracker;
use crate::cache::{AvailabilityStore, ItemQueue};
use crate::checks::CheckDispatcher;
use crate::config::PollerConfig;
use crate::recorder::ResultRecorder;
use crate::resolve::MacroResolver;
use crate::suppressor::AlertSuppressor;

pub struct PollerContext {
    pub config: PollerConfig,
    pub queue: Arc<dyn ItemQueue>,
    pub dispatcher: CheckDispatcher,
    pub resolver: Arc<dyn MacroResolver>,
    pub recorder: Arc<dyn ResultRecorder>,
    pub tracker: AvailabilityTracker,
}

impl PollerContext {
    pub fn new(
        config: PollerConfig,
        queue: Arc<dyn ItemQueue>,
        availability: Arc<dyn AvailabilityStore>,
        suppressor: Arc<dyn AlertSuppressor>,
        dispatcher: CheckDispatcher,
        resolver: Arc<dyn MacroResolver>,
        recorder: Arc<dyn ResultRecorder>,
    ) -> Self {
        let tracker = AvailabilityTracker::new(availability, suppressor, &config);
        Self {
            config,
            queue,
            dispatcher,
            resolver,
            recorder,
            tracker,
        }
    }
}
