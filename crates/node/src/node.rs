//! # Tidal Node Runtime
//!
//! [`Node`] owns the [`StateMachine`] and feeds it from a bounded mailbox.
//! Around it run a few independent tasks, each of which only ever posts
//! events into the mailbox:
//!
//! - a liveness ticker (`Task::Ping`) used to detect sync stalls
//! - a peer discovery ticker (`Task::AskPeers`)
//! - the reference [`Miner`]
//! - background persistence, started when the state machine enters `Persist`
//!
//! The loop ends once the state machine halts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tidal_config::Config;
use tidal_core::{Ledger, LedgerError, PeerNetwork, PosCalculator, SystemTimeSource, TimeSource};
use tidal_mining::MiningScheduler;

use crate::error::ErrorKind;
use crate::event::{Command, Event, Task};
use crate::fsm::{StateKind, StateMachine};
use crate::miner::Miner;

/// Sends events to a running node and observes its state.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    events: mpsc::Sender<Event>,
    status: watch::Receiver<StateKind>,
}

impl NodeHandle {
    /// Queue an event, waiting for mailbox space. Returns `false` if the node
    /// has stopped.
    pub async fn send(&self, event: Event) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Queue an event without waiting. Returns `false` if the mailbox is full
    /// or the node has stopped.
    pub fn try_send(&self, event: Event) -> bool {
        self.events.try_send(event).is_ok()
    }

    /// Current state.
    pub fn state(&self) -> StateKind {
        *self.status.borrow()
    }

    /// Wait until the node reaches `kind`. Returns `false` if the node
    /// stopped first.
    pub async fn wait_for(&mut self, kind: StateKind) -> bool {
        loop {
            if *self.status.borrow_and_update() == kind {
                return true;
            }
            if self.status.changed().await.is_err() {
                return *self.status.borrow() == kind;
            }
        }
    }

    /// Ask the node to shut down.
    pub async fn halt(&self) -> bool {
        self.send(Event::Halt).await
    }
}

/// Background task handles
#[derive(Default)]
struct TaskHandles {
    ping: Option<JoinHandle<()>>,
    ask_peers: Option<JoinHandle<()>>,
    miner: Option<JoinHandle<()>>,
}

/// A running node core.
pub struct Node {
    config: Config,
    ledger: Arc<dyn Ledger>,
    scheduler: Arc<MiningScheduler>,
    fsm: StateMachine,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    status_tx: watch::Sender<StateKind>,
    shutdown_tx: broadcast::Sender<()>,
    handles: TaskHandles,
}

impl Node {
    /// Create a node mining with the keys in `config` on the system clock.
    pub fn new(
        config: Config,
        ledger: Arc<dyn Ledger>,
        network: Arc<dyn PeerNetwork>,
        calculator: Arc<dyn PosCalculator>,
    ) -> Result<Self> {
        config.validate()?;
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let scheduler = MiningScheduler::new(
            &config.mining,
            ledger.clone(),
            network.clone(),
            calculator,
            time.clone(),
        )?;
        Ok(Self::with_parts(
            config,
            ledger,
            network,
            Arc::new(scheduler),
            time,
        ))
    }

    /// Create a node from prepared parts.
    pub fn with_parts(
        config: Config,
        ledger: Arc<dyn Ledger>,
        network: Arc<dyn PeerNetwork>,
        scheduler: Arc<MiningScheduler>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.node.mailbox_capacity.max(1));
        let (status_tx, _) = watch::channel(StateKind::Idle);
        let (shutdown_tx, _) = broadcast::channel(1);
        let fsm = StateMachine::new(
            config.clone(),
            ledger.clone(),
            network,
            scheduler.clone(),
            time,
        );
        Self {
            config,
            ledger,
            scheduler,
            fsm,
            events_tx,
            events_rx,
            status_tx,
            shutdown_tx,
            handles: TaskHandles::default(),
        }
    }

    /// A handle for feeding events to the node.
    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            events: self.events_tx.clone(),
            status: self.status_tx.subscribe(),
        }
    }

    /// Process events until the node halts.
    ///
    /// Returns an error if shutdown failed.
    pub async fn run(mut self) -> Result<()> {
        info!(
            light = self.config.node.light_mode,
            mining_keys = self.scheduler.key_count(),
            "Starting node"
        );
        self.start_tasks();

        while let Some(event) = self.events_rx.recv().await {
            let err = self.fsm.handle(event);
            self.status_tx.send_replace(self.fsm.state());

            for command in self.fsm.take_commands() {
                self.execute(command);
            }

            if self.fsm.state() == StateKind::Halt {
                self.stop_tasks();
                if let Some(e) = err.filter(|e| e.kind() == ErrorKind::Fatal) {
                    return Err(e.into());
                }
                info!("Node stopped");
                return Ok(());
            }
        }
        self.stop_tasks();
        Ok(())
    }

    fn start_tasks(&mut self) {
        self.handles.ping = Some(self.spawn_ticker(self.config.sync.ping_interval(), || {
            Event::Task(Task::Ping)
        }));
        self.handles.ask_peers = Some(self.spawn_ticker(
            self.config.network.ask_peers_interval(),
            || Event::Task(Task::AskPeers),
        ));

        let miner = Miner::new(
            self.ledger.clone(),
            self.scheduler.slot(),
            self.events_tx.clone(),
        );
        self.handles.miner = Some(tokio::spawn(miner.run(self.shutdown_tx.subscribe())));
    }

    /// Post `make()` every `period`. Ticks are dropped while the mailbox is
    /// full.
    fn spawn_ticker(
        &self,
        period: Duration,
        make: impl Fn() -> Event + Send + 'static,
    ) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let event = make();
                        if tx.try_send(event).is_err() {
                            debug!("Mailbox full, tick dropped");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }

    fn execute(&self, command: Command) {
        match command {
            Command::Persist => {
                let ledger = self.ledger.clone();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let result =
                        tokio::task::spawn_blocking(move || ledger.persist_address_transactions())
                            .await
                            .unwrap_or_else(|e| Err(LedgerError::Other(e.to_string())));
                    let _ = tx.send(Event::Task(Task::PersistComplete(result))).await;
                });
            }
        }
    }

    fn stop_tasks(&mut self) {
        let _ = self.shutdown_tx.send(());
        for handle in [
            self.handles.ping.take(),
            self.handles.ask_peers.take(),
            self.handles.miner.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
        self.scheduler.cancel_all();
    }
}
