//! Batch pass behavior: quarantine containment, classification side
//! effects and requeue discipline

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use vigil_poller::availability::Availability;
use vigil_poller::cache::AvailabilityStore;
use vigil_poller::checks::{CheckDispatcher, CheckOutcome};
use vigil_poller::recorder::SampleValue;
use vigil_poller::{CheckType, ItemStatus, PollerGroup, ValueType};

use crate::helpers::*;

fn dispatcher_with(checker: Arc<HostKeyedChecker>) -> CheckDispatcher {
    CheckDispatcher::new(Duration::from_secs(3)).with_checker(CheckType::Agent, checker)
}

#[tokio::test]
async fn empty_queue_is_a_quiet_pass() {
    let rig = build_rig(dispatcher_with(Arc::new(HostKeyedChecker::new(
        CheckOutcome::Success("1".into()),
    ))));
    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);

    assert_eq!(worker.poll_now().await.unwrap(), 0);
    assert!(rig.recorder.is_empty());

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn quarantine_skips_remaining_items_of_a_failed_host() {
    // scenario: 5 items for host 7 where the first fails with a network
    // error, plus 2 items for host 8 that succeed
    let checker = Arc::new(
        HostKeyedChecker::new(CheckOutcome::Success("ok".into()))
            .with_outcome(7, CheckOutcome::NetworkError("connection refused".into())),
    );
    let rig = build_rig(dispatcher_with(checker.clone()));

    for id in 1..=5 {
        rig.cache.add_item(agent_item(id, 7, "agent.ping"));
    }
    rig.cache.add_item(agent_item(6, 8, "agent.ping"));
    rig.cache.add_item(agent_item(7, 8, "agent.ping"));

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    let processed = worker.poll_now().await.unwrap();
    assert_eq!(processed, 7);

    // host 7 was contacted exactly once; host 8 for both of its items
    assert_eq!(checker.calls_for(7), 1);
    assert_eq!(checker.calls_for(8), 2);

    // skipped items were requeued to the unreachable group without dispatch
    for id in 1..=5 {
        let (_, group) = rig.cache.item_snapshot(id).unwrap();
        assert_eq!(group, PollerGroup::Unreachable, "item {id}");
    }
    for id in 6..=7 {
        let (_, group) = rig.cache.item_snapshot(id).unwrap();
        assert_eq!(group, PollerGroup::Normal, "item {id}");
    }

    // only the dispatched failure was recorded for host 7
    let failures: Vec<_> = rig
        .recorder
        .samples()
        .into_iter()
        .filter(|s| matches!(s.value, SampleValue::Failure(_)))
        .collect();
    assert_eq!(failures.len(), 1);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn quarantine_is_per_batch() {
    let checker = Arc::new(
        HostKeyedChecker::new(CheckOutcome::Success("ok".into()))
            .with_outcome(7, CheckOutcome::NetworkError("down".into())),
    );
    let mut config = vigil_poller::PollerConfig::default();
    config.unreachable_delay = 0;
    let rig = build_rig_with_config(config, dispatcher_with(checker.clone()));

    rig.cache.add_item(agent_item(1, 7, "agent.ping"));

    let (normal, unreachable, _events) = spawn_worker_pair(&rig);
    normal.poll_now().await.unwrap();
    assert_eq!(checker.calls_for(7), 1);

    // a fresh batch holds a fresh quarantine set - the host is probed again
    unreachable.poll_now().await.unwrap();
    assert_eq!(checker.calls_for(7), 2);

    normal.shutdown().await.unwrap();
    unreachable.shutdown().await.unwrap();
}

#[tokio::test]
async fn quarantine_is_per_transport() {
    // SNMP dies on host 7 while its agent keeps answering; both item
    // types share the normal worker group
    let agent_checker = Arc::new(HostKeyedChecker::new(CheckOutcome::Success("ok".into())));
    let snmp_checker = Arc::new(HostKeyedChecker::new(CheckOutcome::NetworkError(
        "no SNMP response".into(),
    )));
    let dispatcher = CheckDispatcher::new(Duration::from_secs(3))
        .with_checker(CheckType::Agent, agent_checker.clone())
        .with_checker(CheckType::SnmpV2c, snmp_checker.clone());
    let rig = build_rig(dispatcher);

    let mut snmp_item = agent_item(1, 7, "ifInOctets");
    snmp_item.check_type = CheckType::SnmpV2c;
    snmp_item.snmp_community = Some("public".into());
    snmp_item.snmp_oid = Some("IF-MIB::ifInOctets.1".into());
    rig.cache.add_item(snmp_item);
    rig.cache.add_item(agent_item(2, 7, "agent.ping"));

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    // the SNMP failure must not keep the agent item from being polled
    assert_eq!(snmp_checker.calls_for(7), 1);
    assert_eq!(agent_checker.calls_for(7), 1);

    let snmp = rig
        .cache
        .availability(7, vigil_poller::Transport::Snmp)
        .await
        .unwrap();
    let agent = rig
        .cache
        .availability(7, vigil_poller::Transport::Agent)
        .await
        .unwrap();
    assert!(snmp.errors_from > 0);
    assert_eq!(agent.errors_from, 0);
    assert_eq!(agent.available, Availability::Available);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn network_error_opens_grace_and_requeues_unreachable() {
    let checker = Arc::new(
        HostKeyedChecker::new(CheckOutcome::NetworkError("connection refused".into())),
    );
    let rig = build_rig(dispatcher_with(checker));
    rig.cache.add_item(agent_item(1, 7, "agent.ping"));

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    let record = rig
        .cache
        .availability(7, vigil_poller::Transport::Agent)
        .await
        .unwrap();
    assert!(record.errors_from > 0);
    assert_eq!(record.available, Availability::Unknown);
    assert_eq!(record.error, "connection refused");

    let (item, group) = rig.cache.item_snapshot(1).unwrap();
    assert_eq!(group, PollerGroup::Unreachable);
    assert_eq!(item.nextcheck, record.disable_until);
    assert_eq!(item.status, ItemStatus::Active);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn not_supported_marks_item_but_host_stays_reachable() {
    let checker = Arc::new(HostKeyedChecker::new(CheckOutcome::NotSupported(
        "unknown key".into(),
    )));
    let rig = build_rig(dispatcher_with(checker));
    rig.cache.add_item(agent_item(1, 7, "agent.bogus"));

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    // the reply proves reachability
    let record = rig
        .cache
        .availability(7, vigil_poller::Transport::Agent)
        .await
        .unwrap();
    assert_eq!(record.available, Availability::Available);
    assert_eq!(record.errors_from, 0);

    let (item, group) = rig.cache.item_snapshot(1).unwrap();
    assert_eq!(item.status, ItemStatus::NotSupported);
    assert_eq!(group, PollerGroup::Normal);

    let samples = rig.recorder.samples_for(1);
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].status, ItemStatus::NotSupported);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn macro_failure_is_a_config_error_without_dispatch() {
    let checker = Arc::new(HostKeyedChecker::new(CheckOutcome::Success("1".into())));
    let rig = build_rig(dispatcher_with(checker.clone()));
    rig.cache.add_item(agent_item(1, 7, "agent.ping[{$NO_SUCH}]"));

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    assert_eq!(checker.calls_for(7), 0, "dispatch must be bypassed");

    // config errors touch neither availability nor quarantine
    let record = rig
        .cache
        .availability(7, vigil_poller::Transport::Agent)
        .await
        .unwrap();
    assert_eq!(record.errors_from, 0);
    assert_eq!(rig.cache.availability_writes(), 0);

    let (item, _) = rig.cache.item_snapshot(1).unwrap();
    assert_eq!(item.status, ItemStatus::NotSupported);

    let samples = rig.recorder.samples_for(1);
    assert_eq!(samples.len(), 1);
    assert!(matches!(&samples[0].value, SampleValue::Failure(msg) if msg.contains("resolve")));

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_checker_is_a_config_error() {
    // dispatcher without SNMP support registered
    let rig = build_rig(CheckDispatcher::new(Duration::from_secs(3)));
    let mut item = agent_item(1, 7, "ifInOctets");
    item.check_type = CheckType::SnmpV2c;
    item.snmp_community = Some("public".into());
    item.snmp_oid = Some("IF-MIB::ifInOctets.1".into());
    rig.cache.add_item(item);

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    let samples = rig.recorder.samples_for(1);
    assert_eq!(samples.len(), 1);
    assert!(
        matches!(&samples[0].value, SampleValue::Failure(msg) if msg.contains("not compiled in"))
    );

    // not a remote problem: availability untouched
    let record = rig
        .cache
        .availability(7, vigil_poller::Transport::Snmp)
        .await
        .unwrap();
    assert_eq!(record.errors_from, 0);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn unparsable_numeric_value_degrades_to_not_supported() {
    let checker = Arc::new(HostKeyedChecker::new(CheckOutcome::Success(
        "not-a-number".into(),
    )));
    let rig = build_rig(dispatcher_with(checker));
    let mut item = agent_item(1, 7, "agent.ping");
    item.value_type = ValueType::Unsigned;
    rig.cache.add_item(item);

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    let (item, _) = rig.cache.item_snapshot(1).unwrap();
    assert_eq!(item.status, ItemStatus::NotSupported);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn untracked_check_types_never_quarantine() {
    let checker = Arc::new(HostKeyedChecker::new(CheckOutcome::NetworkError(
        "unreachable".into(),
    )));
    let dispatcher =
        CheckDispatcher::new(Duration::from_secs(3)).with_checker(CheckType::Simple, checker.clone());
    let rig = build_rig(dispatcher);

    rig.cache.add_item(simple_item(1, 7, "net.tcp.port[80]"));
    rig.cache.add_item(simple_item(2, 7, "net.tcp.port[443]"));

    let (worker, _events) = spawn_worker(&rig, PollerGroup::Normal);
    worker.poll_now().await.unwrap();

    // both items dispatched - no transport family, no quarantine
    assert_eq!(checker.calls_for(7), 2);

    // availability untouched, items stay in the normal group
    assert_eq!(rig.cache.availability_writes(), 0);
    for id in 1..=2 {
        let (item, group) = rig.cache.item_snapshot(id).unwrap();
        assert_eq!(group, PollerGroup::Normal);
        assert_eq!(item.status, ItemStatus::Active);
    }

    worker.shutdown().await.unwrap();
}
