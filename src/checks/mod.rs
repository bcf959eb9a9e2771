//! Check dispatch
//!
//! The dispatcher routes one resolved item to the transport-specific
//! [`Checker`] registered for its check type and enforces the watchdog
//! timeout for transports that do not bound themselves. It is a pure
//! routing layer: host availability is the caller's business.
//!
//! ```text
//! Item ──► registry lookup ──► Checker::check ──► trim ──► coerce ──► CheckOutcome
//!                │                    │
//!                │ none registered    │ watchdog timeout
//!                ▼                    ▼
//!           ConfigError          NetworkError
//! ```
//!
//! Wire clients for agent/SNMP/IPMI/SSH/JMX live outside this crate and
//! are plugged in through the registry; an unregistered check type yields
//! a config-error, the moral equivalent of "support not compiled in".

pub mod descriptor;
pub mod internal;
pub mod simple;

pub use descriptor::resolve_item;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::item::{CheckType, Item, ValueType};
use crate::util::rtrim_value;

/// Classified outcome of one fetch attempt
///
/// Only the network/gateway variants drive the availability state machine
/// and the batch quarantine; not-supported and agent errors prove the host
/// was reachable, config errors are local problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Value retrieved (trimmed of trailing whitespace)
    Success(String),
    /// Target was reached but does not understand the item/key
    NotSupported(String),
    /// Non-critical remote error; the target itself answered
    AgentError(String),
    /// Could not reach or talk to the target
    NetworkError(String),
    /// An intermediary (e.g. the JMX gateway) failed
    GatewayError(String),
    /// Local misconfiguration: bad macro, bad port, missing support
    ConfigError(String),
}

impl CheckOutcome {
    /// Did this attempt prove the host reachable?
    pub fn host_reachable(&self) -> bool {
        matches!(
            self,
            CheckOutcome::Success(_) | CheckOutcome::NotSupported(_) | CheckOutcome::AgentError(_)
        )
    }

    /// Did this attempt prove the host (or its gateway) unreachable?
    pub fn host_unreachable(&self) -> bool {
        matches!(
            self,
            CheckOutcome::NetworkError(_) | CheckOutcome::GatewayError(_)
        )
    }

    /// Diagnostic message for all non-success outcomes.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            CheckOutcome::Success(_) => None,
            CheckOutcome::NotSupported(msg)
            | CheckOutcome::AgentError(msg)
            | CheckOutcome::NetworkError(msg)
            | CheckOutcome::GatewayError(msg)
            | CheckOutcome::ConfigError(msg) => Some(msg),
        }
    }
}

/// A transport-specific getter.
///
/// Implementations receive items with macros already substituted and must
/// not mutate any shared state - classification side effects belong to the
/// poll loop.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, item: &Item) -> CheckOutcome;
}

/// Routes items to registered checkers with per-type timeout discipline.
pub struct CheckDispatcher {
    checkers: HashMap<CheckType, Arc<dyn Checker>>,
    timeout: Duration,
}

impl CheckDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            checkers: HashMap::new(),
            timeout,
        }
    }

    /// Register the checker serving a check type, replacing any previous
    /// registration.
    pub fn register(&mut self, check_type: CheckType, checker: Arc<dyn Checker>) {
        self.checkers.insert(check_type, checker);
    }

    /// Builder-style [`CheckDispatcher::register`].
    pub fn with_checker(mut self, check_type: CheckType, checker: Arc<dyn Checker>) -> Self {
        self.register(check_type, checker);
        self
    }

    pub fn supports(&self, check_type: CheckType) -> bool {
        self.checkers.contains_key(&check_type)
    }

    /// Fetch one value. Never panics, never touches availability state.
    pub async fn dispatch(&self, item: &Item) -> CheckOutcome {
        let Some(checker) = self.checkers.get(&item.check_type) else {
            debug!(
                "item {} needs {} support which is not compiled in",
                item.key, item.check_type
            );
            return CheckOutcome::ConfigError(format!(
                "support for {} checks was not compiled in",
                item.check_type
            ));
        };

        trace!("dispatching {} check for key \"{}\"", item.check_type, item.key);

        let mut outcome = if item.check_type.manages_own_timeout() {
            checker.check(item).await
        } else {
            match tokio::time::timeout(self.timeout, checker.check(item)).await {
                Ok(outcome) => outcome,
                Err(_) => CheckOutcome::NetworkError(format!(
                    "check timed out after {} seconds",
                    self.timeout.as_secs()
                )),
            }
        };

        if let CheckOutcome::Success(value) = &mut outcome {
            rtrim_value(value);
        }

        outcome
    }
}

/// Degrade a successful fetch whose value cannot be coerced to the item's
/// declared value type. Runs after trimming, so formatting artifacts do
/// not defeat the numeric checks.
pub fn apply_value_type(outcome: CheckOutcome, value_type: ValueType) -> CheckOutcome {
    match outcome {
        CheckOutcome::Success(value) => match value_type.validate(&value) {
            Ok(()) => CheckOutcome::Success(value),
            Err(msg) => CheckOutcome::NotSupported(msg),
        },
        other => other,
    }
}
