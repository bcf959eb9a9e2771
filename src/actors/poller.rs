//! PollerActor - pulls due items and drives check dispatch
//!
//! One actor per worker group. Each pass is strictly sequential: pull a
//! bounded batch, resolve macros, dispatch, classify, update availability,
//! record, requeue - then sleep until the earliest pending nextcheck
//! (capped by the poll-delay ceiling). Parallelism comes from running
//! many workers against the same shared cache, never from inside a pass.
//!
//! ## Message Flow
//!
//! ```text
//! sleep until due → pull batch → per item: resolve → quarantine? → dispatch
//!     ↑                                    → classify → tracker/recorder → requeue
//!     └─── Commands (PollNow, Shutdown)        └─ transitions → broadcast
//! ```
//!
//! A single item's failure never aborts the batch; infrastructure errors
//! are logged and the loop proceeds with the next item.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use crate::availability::Transition;
use crate::checks::{CheckOutcome, apply_value_type, resolve_item};
use crate::context::PollerContext;
use crate::item::{Host, Item, ItemStatus, PollerGroup, Transport};
use crate::quarantine::QuarantineSet;
use crate::recorder::{Sample, SampleValue};
use crate::util::epoch_now;

use super::messages::{AvailabilityEvent, PollerCommand};

/// Actor serving one worker group's share of the item queue
pub struct PollerActor {
    /// Which queue this worker pulls from
    group: PollerGroup,

    /// Shared collaborators (queue, dispatcher, tracker, recorder, ...)
    ctx: Arc<PollerContext>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<PollerCommand>,

    /// Broadcast sender for availability transitions
    event_tx: broadcast::Sender<AvailabilityEvent>,
}

impl PollerActor {
    pub fn new(
        group: PollerGroup,
        ctx: Arc<PollerContext>,
        command_rx: mpsc::Receiver<PollerCommand>,
        event_tx: broadcast::Sender<AvailabilityEvent>,
    ) -> Self {
        Self {
            group,
            ctx,
            command_rx,
            event_tx,
        }
    }

    /// Run the actor's main loop
    ///
    /// This is the entry point for the actor. It runs until:
    /// - A Shutdown command is received
    /// - The command channel is closed
    #[instrument(skip(self), fields(group = ?self.group))]
    pub async fn run(mut self) {
        debug!("starting poller actor");

        loop {
            let sleep_for = self.next_sleep().await;

            tokio::select! {
                // due time reached - run one batch pass
                _ = tokio::time::sleep(sleep_for) => {
                    if let Err(e) = self.poll_batch().await {
                        error!("batch pass failed: {:#}", e);
                    }
                }

                // Handle commands
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        PollerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let result = self.poll_batch().await;
                            let _ = respond_to.send(result);
                        }

                        PollerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                // Command channel closed - exit
                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("poller actor stopped");
    }

    /// Time until the next pending check, clamped to [0, poll_delay].
    async fn next_sleep(&self) -> Duration {
        let ceiling = self.ctx.config.poll_delay;
        let now = epoch_now();

        match self.ctx.queue.next_due(self.group).await {
            Ok(Some(nextcheck)) => {
                let wait = nextcheck.saturating_sub(now).clamp(0, ceiling as i64);
                Duration::from_secs(wait as u64)
            }
            Ok(None) => Duration::from_secs(ceiling),
            Err(e) => {
                error!("cannot query next due time: {}", e);
                Duration::from_secs(ceiling)
            }
        }
    }

    /// Run one batch pass. Returns the number of items processed.
    #[instrument(skip(self), fields(group = ?self.group))]
    async fn poll_batch(&self) -> Result<usize> {
        let now = epoch_now();
        let limit = self.group.batch_limit();

        let items = self
            .ctx
            .queue
            .due_items(self.group, limit, now)
            .await
            .context("failed to pull due items")?;

        if items.is_empty() {
            trace!("no items due");
            return Ok(0);
        }

        debug!("processing batch of {} items", items.len());

        // batch-local memo of hosts already seen failing this pass
        let mut quarantine = QuarantineSet::new();

        for item in &items {
            if let Err(e) = self.process_item(item, &mut quarantine).await {
                error!("processing of item {} failed: {:#}", item.id, e);
            }
        }

        Ok(items.len())
    }

    /// Resolve, dispatch and classify a single item.
    async fn process_item(&self, item: &Item, quarantine: &mut QuarantineSet) -> Result<()> {
        let now = epoch_now();

        // resolution failure bypasses dispatch entirely
        let resolved = match resolve_item(item, self.ctx.resolver.as_ref()) {
            Ok(resolved) => resolved,
            Err(e) => {
                let outcome = CheckOutcome::ConfigError(format!(
                    "cannot resolve macros in item \"{}\": {}",
                    item.key, e
                ));
                return self.apply_outcome(item, outcome, quarantine, now).await;
            }
        };

        // a host already seen failing this pass is not contacted again
        if let Some(transport) = item.check_type.transport() {
            if quarantine.contains(item.host.id, transport) {
                debug!(
                    "host \"{}\" unreachable, skipped {} check \"{}\"",
                    item.host.name, transport, item.key
                );
                self.ctx.queue.requeue_unreachable(item.id).await?;
                return Ok(());
            }
        }

        let outcome = self.ctx.dispatcher.dispatch(&resolved).await;
        let outcome = apply_value_type(outcome, item.value_type);

        self.apply_outcome(item, outcome, quarantine, now).await
    }

    /// Feed one classified outcome into tracker, recorder and queue.
    async fn apply_outcome(
        &self,
        item: &Item,
        outcome: CheckOutcome,
        quarantine: &mut QuarantineSet,
        now: i64,
    ) -> Result<()> {
        let transport = item.check_type.transport();

        match &outcome {
            CheckOutcome::Success(value) => {
                if let Some(transport) = transport {
                    self.activate_host(&item.host, transport).await?;
                }
                self.record(item, SampleValue::Value(value.clone()), ItemStatus::Active, now)
                    .await;
                self.ctx
                    .queue
                    .requeue_reachable(item.id, ItemStatus::Active, now)
                    .await?;
            }

            // the host answered, even though the check itself failed
            CheckOutcome::NotSupported(msg) | CheckOutcome::AgentError(msg) => {
                if let Some(transport) = transport {
                    self.activate_host(&item.host, transport).await?;
                }
                debug!(
                    "item \"{}\" on host \"{}\" is not supported: {}",
                    item.key, item.host.name, msg
                );
                self.record(
                    item,
                    SampleValue::Failure(msg.clone()),
                    ItemStatus::NotSupported,
                    now,
                )
                .await;
                self.ctx
                    .queue
                    .requeue_reachable(item.id, ItemStatus::NotSupported, now)
                    .await?;
            }

            CheckOutcome::NetworkError(msg) | CheckOutcome::GatewayError(msg) => {
                if let Some(transport) = transport {
                    quarantine.mark(item.host.id, transport);

                    let transition = self
                        .ctx
                        .tracker
                        .deactivate(&item.host, transport, now, msg)
                        .await?;
                    if let Some(transition) = transition {
                        self.publish(&item.host, transport, transition, Some(msg.clone()), now);
                    }

                    self.record(item, SampleValue::Failure(msg.clone()), ItemStatus::Active, now)
                        .await;
                    self.ctx.queue.requeue_unreachable(item.id).await?;
                } else {
                    // no reachability state to update for this check type
                    self.record(item, SampleValue::Failure(msg.clone()), ItemStatus::Active, now)
                        .await;
                    self.ctx
                        .queue
                        .requeue_reachable(item.id, ItemStatus::Active, now)
                        .await?;
                }
            }

            // local problem: neither availability nor quarantine is touched
            CheckOutcome::ConfigError(msg) => {
                warn!(
                    "item \"{}\" on host \"{}\" is misconfigured: {}",
                    item.key, item.host.name, msg
                );
                self.record(
                    item,
                    SampleValue::Failure(msg.clone()),
                    ItemStatus::NotSupported,
                    now,
                )
                .await;
                self.ctx
                    .queue
                    .requeue_reachable(item.id, ItemStatus::NotSupported, now)
                    .await?;
            }
        }

        Ok(())
    }

    async fn activate_host(&self, host: &Host, transport: Transport) -> Result<()> {
        if let Some(transition) = self.ctx.tracker.activate(host, transport).await? {
            self.publish(host, transport, transition, None, epoch_now());
        }
        Ok(())
    }

    /// Recorder failures are contained: the sample is lost but the item is
    /// still requeued.
    async fn record(&self, item: &Item, value: SampleValue, status: ItemStatus, now: i64) {
        let sample = Sample {
            item_id: item.id,
            value_type: item.value_type,
            value,
            taken_at: epoch_to_utc(now),
            status,
        };

        if let Err(e) = self.ctx.recorder.record(sample).await {
            error!("failed to record sample for item {}: {:#}", item.id, e);
        }
    }

    fn publish(
        &self,
        host: &Host,
        transport: Transport,
        transition: Transition,
        error: Option<String>,
        now: i64,
    ) {
        let event = AvailabilityEvent {
            host_id: host.id,
            host_name: host.name.clone(),
            transport,
            transition,
            error,
            at: epoch_to_utc(now),
        };

        // It's OK if there are no subscribers; the persisted record is
        // the source of truth.
        match self.event_tx.send(event) {
            Ok(num_receivers) => {
                trace!("published availability event to {num_receivers} receivers");
            }
            Err(_) => {
                trace!("no receivers for availability event (this is OK)");
            }
        }
    }
}

fn epoch_to_utc(epoch: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(epoch, 0).unwrap_or_default()
}

/// Handle for controlling a PollerActor
///
/// This handle provides a typed API for sending commands to the actor.
/// It can be cloned and shared across tasks.
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,

    /// Worker group for identification
    pub group: PollerGroup,
}

impl PollerHandle {
    /// Spawn a new poller actor for one worker group.
    pub fn spawn(
        group: PollerGroup,
        ctx: Arc<PollerContext>,
        event_tx: broadcast::Sender<AvailabilityEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = PollerActor::new(group, ctx, cmd_rx, event_tx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            group,
        }
    }

    /// Run one batch pass immediately, returning the number of items
    /// processed.
    pub async fn poll_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Gracefully shut down the worker.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PollerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
