//! Message types for worker communication
//!
//! Commands go to a specific worker via its mpsc channel; availability
//! transitions fan out to all interested subscribers via a broadcast
//! channel. The broadcast may lag or drop for slow subscribers - that is
//! acceptable, the persisted availability record is the source of truth.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::availability::Transition;
use crate::item::{HostId, Transport};

/// Commands that can be sent to a poller worker
#[derive(Debug)]
pub enum PollerCommand {
    /// Run one batch pass immediately (bypassing the sleep timer)
    ///
    /// Used for testing and manual refresh operations. Responds with the
    /// number of items processed.
    PollNow {
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Gracefully shut down the worker
    Shutdown,
}

/// Event published when a host transport crosses a reachability boundary
#[derive(Debug, Clone)]
pub struct AvailabilityEvent {
    pub host_id: HostId,

    /// Host name for logging/alerts
    pub host_name: String,

    pub transport: Transport,

    pub transition: Transition,

    /// Failure message for unreachable transitions
    pub error: Option<String>,

    pub at: DateTime<Utc>,
}
