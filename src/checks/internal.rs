//! Internal self-monitoring checks
//!
//! Answered locally without touching the network, so they are never
//! wrapped by the watchdog and never influence host availability.

use std::time::Instant;

use async_trait::async_trait;

use crate::item::Item;
use crate::util::parse_item_key;

use super::{CheckOutcome, Checker};

/// Serves `vigil[...]` keys about the poller process itself.
pub struct InternalChecker {
    started: Instant,
}

impl InternalChecker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for InternalChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Checker for InternalChecker {
    async fn check(&self, item: &Item) -> CheckOutcome {
        let Some((name, args)) = parse_item_key(&item.key) else {
            return CheckOutcome::NotSupported(format!("invalid item key \"{}\"", item.key));
        };

        if name != "vigil" {
            return CheckOutcome::NotSupported(format!(
                "internal check \"{}\" is not supported",
                item.key
            ));
        }

        match args.as_slice() {
            ["uptime"] => CheckOutcome::Success(self.started.elapsed().as_secs().to_string()),
            ["version"] => CheckOutcome::Success(env!("CARGO_PKG_VERSION").to_string()),
            _ => CheckOutcome::NotSupported(format!(
                "internal check \"{}\" is not supported",
                item.key
            )),
        }
    }
}
