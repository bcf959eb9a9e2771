//! Per-type field resolution
//!
//! Each check type needs a different subset of credential fields
//! substituted before dispatch. The subset is a static table keyed by
//! check type, so macro substitution and dispatch share one source of
//! truth instead of sprawling per-type switches.

use crate::item::{CheckType, Item};
use crate::resolve::{MacroResolver, MacroResult};

/// Credential fields subject to macro substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    SnmpCommunity,
    SnmpOid,
    Username,
    Password,
    Params,
    IpmiSensor,
    JmxEndpoint,
}

/// Which credential fields a check type carries. The key is substituted
/// for every type and is not listed here.
fn credential_fields(check_type: CheckType) -> &'static [Field] {
    match check_type {
        CheckType::SnmpV1 | CheckType::SnmpV2c => &[Field::SnmpCommunity, Field::SnmpOid],
        CheckType::SnmpV3 => &[
            Field::SnmpCommunity,
            Field::SnmpOid,
            Field::Username,
            Field::Password,
        ],
        CheckType::Ipmi => &[Field::IpmiSensor, Field::Username, Field::Password],
        CheckType::Ssh | CheckType::Telnet => &[Field::Username, Field::Password, Field::Params],
        CheckType::DbMonitor => &[Field::Username, Field::Password, Field::Params],
        CheckType::Jmx => &[Field::Username, Field::Password, Field::JmxEndpoint],
        CheckType::Simple => &[Field::Username, Field::Password],
        CheckType::Agent
        | CheckType::Internal
        | CheckType::Aggregate
        | CheckType::External
        | CheckType::Calculated => &[],
    }
}

/// Produce the working copy of an item for one poll iteration: a clone
/// with the key and the type's credential fields macro-substituted.
///
/// The authoritative record in the config cache keeps its raw fields; the
/// returned copy is owned by the current iteration and discarded with it.
pub fn resolve_item(item: &Item, resolver: &dyn MacroResolver) -> MacroResult<Item> {
    let mut resolved = item.clone();

    resolved.key = resolver.substitute(&item.host, &item.key)?;

    for field in credential_fields(item.check_type) {
        let slot = match field {
            Field::SnmpCommunity => &mut resolved.snmp_community,
            Field::SnmpOid => &mut resolved.snmp_oid,
            Field::Username => &mut resolved.username,
            Field::Password => &mut resolved.password,
            Field::Params => &mut resolved.params,
            Field::IpmiSensor => &mut resolved.ipmi_sensor,
            Field::JmxEndpoint => &mut resolved.jmx_endpoint,
        };
        if let Some(raw) = slot.take() {
            *slot = Some(resolver.substitute(&item.host, &raw)?);
        }
    }

    Ok(resolved)
}
