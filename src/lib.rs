//! Poller core for a host monitoring daemon
//!
//! Workers pull due items from a shared config cache, dispatch each to a
//! transport-specific checker, and feed the classified outcome into the
//! per-(host, transport) availability state machine. Hosts that stop
//! answering get a grace window before being flipped unavailable; once
//! flipped, their dependent alert rules are switched to unknown and their
//! items move to a serial probe worker until the host recovers.
//!
//! The wire clients for the individual transports, the persistent history
//! store and trigger evaluation live outside this crate and are plugged
//! in through the traits in [`checks`], [`cache`], [`recorder`] and
//! [`suppressor`].

pub mod actors;
pub mod availability;
pub mod cache;
pub mod checks;
pub mod config;
pub mod context;
pub mod item;
pub mod quarantine;
pub mod recorder;
pub mod resolve;
pub mod suppressor;
pub mod util;

pub use availability::{Availability, AvailabilityTracker, HostAvailability, Transition};
pub use checks::{CheckDispatcher, CheckOutcome, Checker};
pub use config::PollerConfig;
pub use context::PollerContext;
pub use item::{CheckType, Host, Item, ItemStatus, PollerGroup, Transport, ValueType};
pub use quarantine::QuarantineSet;
