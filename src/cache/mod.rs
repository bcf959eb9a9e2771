//! Shared configuration cache interfaces
//!
//! Pollers never own item or availability state; they borrow it from a
//! shared cache through two traits:
//!
//! - [`ItemQueue`]: hand out due items per worker group and take them back
//!   after the result is classified
//! - [`AvailabilityStore`]: per-(host, transport) reachability records,
//!   updated through changed-fields-only deltas
//!
//! ## Design
//!
//! - **Trait-based**: embedders back these with their real config cache;
//!   [`memory::MemoryCache`] implements both for tests and small setups
//! - **Async**: all operations are async for compatibility with the worker
//!   actors
//! - **Per-key atomicity**: conflicting writes are serialized at per-item
//!   and per-host granularity inside the implementation; callers hold no
//!   lock across a network call

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::{AvailabilityStore, ItemQueue};
pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
