//! Dependent-alert suppression
//!
//! When a host transport flips unavailable, alert rules that depend on it
//! can no longer be proven or disproven - evaluating them against stale
//! values would fire false alarms. The suppressor marks such rules
//! "unknown" with the failure reason.
//!
//! This is a bulk, best-effort operation: a rule the suppressor cannot
//! classify is skipped with a warning and the rest proceed; suppression
//! must never fail the deactivation that triggered it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::availability::Availability;
use crate::cache::AvailabilityStore;
use crate::item::{HostId, RuleId, Transport};

/// One check an alert rule depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    pub host_id: HostId,
    /// `None` for checks that never participate in availability tracking
    /// (simple, internal, ...); such a reference counts as reachable.
    pub transport: Option<Transport>,
    /// Disabled references cannot decide the rule either way
    pub active: bool,
}

/// Evaluation state of an alert rule
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleState {
    #[default]
    Normal,
    /// Rule cannot currently be decided; carries the reason
    Unknown(String),
}

/// An alert rule with the checks it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRule {
    pub id: RuleId,
    pub enabled: bool,
    pub refs: Vec<RuleRef>,
    pub state: RuleState,
}

/// Audit record for one suppressed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressedRule {
    pub rule_id: RuleId,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Marks alert rules unknown when their supporting checks go unreachable.
///
/// Invariant: a rule is flipped only if every reference that could still
/// decide it is itself unreachable or inactive.
#[async_trait]
pub trait AlertSuppressor: Send + Sync {
    async fn suppress_dependents(
        &self,
        host_id: HostId,
        transport: Transport,
        now: i64,
        reason: &str,
    ) -> Vec<SuppressedRule>;
}

/// Suppressor that never flips anything, for embedders that run trigger
/// evaluation elsewhere.
#[derive(Debug, Default)]
pub struct NoopSuppressor;

#[async_trait]
impl AlertSuppressor for NoopSuppressor {
    async fn suppress_dependents(
        &self,
        _host_id: HostId,
        _transport: Transport,
        _now: i64,
        _reason: &str,
    ) -> Vec<SuppressedRule> {
        Vec::new()
    }
}

/// In-memory rule store implementing the suppression invariant against a
/// shared availability store.
pub struct MemoryAlertSuppressor {
    rules: Mutex<HashMap<RuleId, AlertRule>>,
    availability: Arc<dyn AvailabilityStore>,
}

impl MemoryAlertSuppressor {
    pub fn new(availability: Arc<dyn AvailabilityStore>) -> Self {
        Self {
            rules: Mutex::new(HashMap::new()),
            availability,
        }
    }

    pub fn add_rule(&self, rule: AlertRule) {
        self.rules
            .lock()
            .expect("rule store lock poisoned")
            .insert(rule.id, rule);
    }

    pub fn rule_state(&self, rule_id: RuleId) -> Option<RuleState> {
        self.rules
            .lock()
            .expect("rule store lock poisoned")
            .get(&rule_id)
            .map(|rule| rule.state.clone())
    }

    /// Whether a reference can still decide its rule: it must be active
    /// and its transport (if tracked) not unavailable. The transport that
    /// just failed is treated as unavailable even though the record may
    /// not have flipped yet mid-deactivation.
    async fn ref_still_decisive(
        &self,
        rule_ref: &RuleRef,
        failed_host: HostId,
        failed_transport: Transport,
    ) -> Result<bool, crate::cache::CacheError> {
        if !rule_ref.active {
            return Ok(false);
        }
        let Some(transport) = rule_ref.transport else {
            // untracked check types are assumed reachable
            return Ok(true);
        };
        if rule_ref.host_id == failed_host && transport == failed_transport {
            return Ok(false);
        }
        let record = self
            .availability
            .availability(rule_ref.host_id, transport)
            .await?;
        Ok(record.available != Availability::Unavailable)
    }
}

#[async_trait]
impl AlertSuppressor for MemoryAlertSuppressor {
    async fn suppress_dependents(
        &self,
        host_id: HostId,
        transport: Transport,
        _now: i64,
        reason: &str,
    ) -> Vec<SuppressedRule> {
        let candidates: Vec<AlertRule> = {
            let rules = self.rules.lock().expect("rule store lock poisoned");
            rules
                .values()
                .filter(|rule| rule.enabled)
                .filter(|rule| !matches!(rule.state, RuleState::Unknown(_)))
                .filter(|rule| {
                    rule.refs.iter().any(|r| {
                        r.host_id == host_id && r.transport == Some(transport) && r.active
                    })
                })
                .cloned()
                .collect()
        };

        let mut suppressed = Vec::new();

        'rules: for rule in candidates {
            for rule_ref in &rule.refs {
                match self.ref_still_decisive(rule_ref, host_id, transport).await {
                    Ok(true) => continue 'rules,
                    Ok(false) => {}
                    Err(e) => {
                        // best effort: an unclassifiable rule is skipped
                        warn!("skipping alert rule {}: {}", rule.id, e);
                        continue 'rules;
                    }
                }
            }

            let event = SuppressedRule {
                rule_id: rule.id,
                at: Utc::now(),
                reason: reason.to_string(),
            };
            {
                let mut rules = self.rules.lock().expect("rule store lock poisoned");
                if let Some(stored) = rules.get_mut(&rule.id) {
                    stored.state = RuleState::Unknown(reason.to_string());
                }
            }
            info!(
                "alert rule {} switched to unknown: host {} {} unreachable",
                rule.id, host_id, transport
            );
            suppressed.push(event);
        }

        suppressed
    }
}
