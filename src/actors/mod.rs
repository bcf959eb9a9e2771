//! Actor-based poller workers
//!
//! Each worker runs as an independent async task pulling from its group's
//! share of the item queue. Workers communicate through Tokio channels:
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │  Daemon (main)  │
//!                  └────────┬────────┘
//!                           │ spawns
//!          ┌────────────────┼────────────────┐
//!          │                │                │
//!  ┌───────▼───────┐ ┌──────▼───────┐ ┌──────▼────────┐
//!  │ Poller-Normal │ │ Poller-JMX   │ │ Poller-       │
//!  │               │ │              │ │ Unreachable   │
//!  └───────┬───────┘ └──────┬───────┘ └──────┬────────┘
//!          │                │                │
//!          └────────────────┼────────────────┘
//!                           │
//!                 ┌─────────▼──────────┐
//!                 │ Broadcast Channel  │ (availability events)
//!                 └────────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each worker has an mpsc command channel (PollNow, Shutdown)
//! 2. **Events**: Availability transitions fan out on a broadcast channel
//! 3. **Shared state**: All workers poll against one [`crate::context::PollerContext`];
//!    conflicting writes are serialized inside the cache, never by the workers

pub mod messages;
pub mod poller;
