//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use vigil_poller::actors::messages::AvailabilityEvent;
use vigil_poller::actors::poller::PollerHandle;
use vigil_poller::cache::MemoryCache;
use vigil_poller::checks::{CheckDispatcher, CheckOutcome, Checker};
use vigil_poller::recorder::MemoryRecorder;
use vigil_poller::resolve::StaticResolver;
use vigil_poller::suppressor::MemoryAlertSuppressor;
use vigil_poller::{
    CheckType, Host, Item, ItemStatus, PollerConfig, PollerContext, PollerGroup, ValueType,
};

/// Everything a test needs to poke at a running worker
pub struct TestRig {
    pub cache: Arc<MemoryCache>,
    pub recorder: Arc<MemoryRecorder>,
    pub suppressor: Arc<MemoryAlertSuppressor>,
    pub ctx: Arc<PollerContext>,
}

pub fn build_rig(dispatcher: CheckDispatcher) -> TestRig {
    build_rig_with_config(PollerConfig::default(), dispatcher)
}

pub fn build_rig_with_config(config: PollerConfig, dispatcher: CheckDispatcher) -> TestRig {
    let cache = Arc::new(MemoryCache::new(&config));
    let suppressor = Arc::new(MemoryAlertSuppressor::new(cache.clone()));
    let recorder = Arc::new(MemoryRecorder::new());

    let ctx = Arc::new(PollerContext::new(
        config,
        cache.clone(),
        cache.clone(),
        suppressor.clone(),
        dispatcher,
        Arc::new(StaticResolver::new()),
        recorder.clone(),
    ));

    TestRig {
        cache,
        recorder,
        suppressor,
        ctx,
    }
}

pub fn spawn_worker(
    rig: &TestRig,
    group: PollerGroup,
) -> (PollerHandle, broadcast::Receiver<AvailabilityEvent>) {
    let (event_tx, event_rx) = broadcast::channel(256);
    (
        PollerHandle::spawn(group, rig.ctx.clone(), event_tx),
        event_rx,
    )
}

/// Spawn two workers sharing one event channel (normal + unreachable).
pub fn spawn_worker_pair(
    rig: &TestRig,
) -> (
    PollerHandle,
    PollerHandle,
    broadcast::Receiver<AvailabilityEvent>,
) {
    let (event_tx, event_rx) = broadcast::channel(256);
    (
        PollerHandle::spawn(PollerGroup::Normal, rig.ctx.clone(), event_tx.clone()),
        PollerHandle::spawn(PollerGroup::Unreachable, rig.ctx.clone(), event_tx),
        event_rx,
    )
}

pub fn test_host(id: u64) -> Host {
    Host {
        id,
        name: format!("host-{id}"),
        addr: "192.0.2.1".into(),
        port: 10050,
        macros: HashMap::new(),
    }
}

/// An agent item that is immediately due.
pub fn agent_item(id: u64, host_id: u64, key: &str) -> Item {
    Item {
        id,
        host: test_host(host_id),
        check_type: CheckType::Agent,
        key: key.into(),
        value_type: ValueType::Text,
        status: ItemStatus::Active,
        delay: 30,
        nextcheck: 0,
        snmp_community: None,
        snmp_oid: None,
        username: None,
        password: None,
        params: None,
        ipmi_sensor: None,
        jmx_endpoint: None,
    }
}

pub fn simple_item(id: u64, host_id: u64, key: &str) -> Item {
    let mut item = agent_item(id, host_id, key);
    item.check_type = CheckType::Simple;
    item
}

/// Checker returning a fixed outcome per host, counting dispatches per host.
pub struct HostKeyedChecker {
    outcomes: HashMap<u64, CheckOutcome>,
    fallback: CheckOutcome,
    calls: Mutex<HashMap<u64, usize>>,
}

impl HostKeyedChecker {
    pub fn new(fallback: CheckOutcome) -> Self {
        Self {
            outcomes: HashMap::new(),
            fallback,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_outcome(mut self, host_id: u64, outcome: CheckOutcome) -> Self {
        self.outcomes.insert(host_id, outcome);
        self
    }

    /// Number of dispatch calls seen for one host.
    pub fn calls_for(&self, host_id: u64) -> usize {
        *self.calls.lock().unwrap().get(&host_id).unwrap_or(&0)
    }
}

#[async_trait]
impl Checker for HostKeyedChecker {
    async fn check(&self, item: &Item) -> CheckOutcome {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(item.host.id)
            .or_insert(0) += 1;
        self.outcomes
            .get(&item.host.id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Checker replaying a scripted sequence of outcomes (shared across calls).
pub struct SequenceChecker {
    outcomes: Mutex<Vec<CheckOutcome>>,
    calls: AtomicUsize,
}

impl SequenceChecker {
    pub fn new(outcomes: Vec<CheckOutcome>) -> Self {
        let mut reversed = outcomes;
        reversed.reverse();
        Self {
            outcomes: Mutex::new(reversed),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checker for SequenceChecker {
    async fn check(&self, _item: &Item) -> CheckOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(CheckOutcome::AgentError("script exhausted".into()))
    }
}
