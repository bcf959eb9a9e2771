//! Item and host data model
//!
//! An [`Item`] is one monitored metric: a key plus the credentials needed to
//! fetch it from its host via a specific check type. The authoritative item
//! records live in the shared config cache; pollers receive cloned working
//! copies for the duration of one batch and discard them afterwards.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique item identifier
pub type ItemId = u64;

/// Unique host identifier
pub type HostId = u64;

/// Unique alert rule identifier
pub type RuleId = u64;

/// How a metric is fetched from its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// Native monitoring agent
    Agent,
    SnmpV1,
    SnmpV2c,
    SnmpV3,
    Ipmi,
    /// Simple network probes (TCP connect, HTTP) performed by the poller itself
    Simple,
    /// Self-monitoring checks answered locally, no network involved
    Internal,
    /// Database query via a driver connection
    DbMonitor,
    /// Aggregation over other items' history
    Aggregate,
    /// External script execution
    External,
    Ssh,
    Telnet,
    /// JMX attribute fetched through the Java gateway
    Jmx,
    /// Formula evaluated over other items' values
    Calculated,
}

impl CheckType {
    /// The transport family whose reachability this check type shares,
    /// if it participates in host availability tracking at all.
    ///
    /// Simple, internal, external etc. checks never mark a host
    /// unreachable - a failure there says nothing about the host.
    pub fn transport(self) -> Option<Transport> {
        match self {
            CheckType::Agent => Some(Transport::Agent),
            CheckType::SnmpV1 | CheckType::SnmpV2c | CheckType::SnmpV3 => Some(Transport::Snmp),
            CheckType::Ipmi => Some(Transport::Ipmi),
            CheckType::Jmx => Some(Transport::Jmx),
            _ => None,
        }
    }

    /// Whether the underlying getter enforces its own deadline.
    ///
    /// These types must not be wrapped by the dispatcher's watchdog timeout:
    /// SSH negotiates its own connect/exec timeouts, external scripts and
    /// simple/internal checks bound themselves.
    pub fn manages_own_timeout(self) -> bool {
        matches!(
            self,
            CheckType::Ssh | CheckType::External | CheckType::Simple | CheckType::Internal
        )
    }

    /// The worker group that natively serves this check type.
    pub fn poller_group(self) -> PollerGroup {
        match self {
            CheckType::Ipmi => PollerGroup::Ipmi,
            CheckType::Jmx => PollerGroup::Jmx,
            _ => PollerGroup::Normal,
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckType::Agent => "agent",
            CheckType::SnmpV1 => "SNMPv1",
            CheckType::SnmpV2c => "SNMPv2c",
            CheckType::SnmpV3 => "SNMPv3",
            CheckType::Ipmi => "IPMI",
            CheckType::Simple => "simple",
            CheckType::Internal => "internal",
            CheckType::DbMonitor => "database monitor",
            CheckType::Aggregate => "aggregate",
            CheckType::External => "external",
            CheckType::Ssh => "SSH",
            CheckType::Telnet => "telnet",
            CheckType::Jmx => "JMX",
            CheckType::Calculated => "calculated",
        };
        write!(f, "{label}")
    }
}

/// Transport family with independent per-host reachability state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Agent,
    Snmp,
    Ipmi,
    Jmx,
}

impl Transport {
    pub const ALL: [Transport; 4] = [
        Transport::Agent,
        Transport::Snmp,
        Transport::Ipmi,
        Transport::Jmx,
    ];
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Transport::Agent => "agent",
            Transport::Snmp => "SNMP",
            Transport::Ipmi => "IPMI",
            Transport::Jmx => "JMX",
        };
        write!(f, "{label}")
    }
}

/// Which shared queue a worker pulls from
///
/// Items of a host mid-failure migrate into the [`PollerGroup::Unreachable`]
/// group so a single serial worker probes dead hosts instead of stalling the
/// batchable workers on connection timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollerGroup {
    Normal,
    Ipmi,
    Jmx,
    Unreachable,
}

impl PollerGroup {
    /// Upper bound on items pulled per pass.
    ///
    /// One item for the unreachable group keeps a timeout cascade from
    /// stalling the worker; a larger bound for batchable groups amortizes
    /// the queue lock.
    pub fn batch_limit(self) -> usize {
        match self {
            PollerGroup::Normal | PollerGroup::Ipmi => 64,
            PollerGroup::Jmx => 32,
            PollerGroup::Unreachable => 1,
        }
    }
}

/// Declared type of a collected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Float,
    Unsigned,
    Character,
    Text,
    Log,
}

impl ValueType {
    /// Check that a (already right-trimmed) raw value can be coerced to
    /// this type. The diagnostic message is surfaced to operators via the
    /// item's not-supported error.
    pub fn validate(self, raw: &str) -> Result<(), String> {
        match self {
            ValueType::Unsigned => raw.parse::<u64>().map(|_| ()).map_err(|_| {
                format!("received value [{raw}] is not suitable for value type [unsigned]")
            }),
            ValueType::Float => raw.parse::<f64>().map(|_| ()).map_err(|_| {
                format!("received value [{raw}] is not suitable for value type [float]")
            }),
            ValueType::Character | ValueType::Text | ValueType::Log => Ok(()),
        }
    }
}

/// Item lifecycle status as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    /// The target was reachable but rejected the check; rescheduled on the
    /// (slower) refresh-unsupported interval.
    NotSupported,
}

/// A monitored host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    /// Technical host name, used in log messages
    pub name: String,
    /// Connection address (IP or DNS name)
    pub addr: String,
    pub port: u16,
    /// User macros ({$NAME} -> value) defined on this host
    #[serde(default)]
    pub macros: HashMap<String, String>,
}

/// One monitored metric
///
/// Credential fields are raw (may contain macros); the poller substitutes
/// them into a cloned working copy before dispatch. Which fields apply
/// depends on the check type - see [`crate::checks::resolve_item`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub host: Host,
    pub check_type: CheckType,
    /// Check key, e.g. `system.cpu.load[avg1]`; may contain macros
    pub key: String,
    pub value_type: ValueType,
    pub status: ItemStatus,
    /// Seconds between checks
    pub delay: i64,
    /// Epoch seconds of the next scheduled check
    pub nextcheck: i64,
    #[serde(default)]
    pub snmp_community: Option<String>,
    #[serde(default)]
    pub snmp_oid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Free-form parameters: DB query, script body, calculated formula
    #[serde(default)]
    pub params: Option<String>,
    #[serde(default)]
    pub ipmi_sensor: Option<String>,
    #[serde(default)]
    pub jmx_endpoint: Option<String>,
}
