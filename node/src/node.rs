//! The antibot node: poll loop, transition processor and their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use antibot_platform::{ChatPlatform, TelegramClient, UpdatePoller};
use antibot_store::{JsonFileStore, RegistryStore};
use antibot_types::{Clock, SystemClock};
use antibot_verification::{
    transition_channel, Gatekeeper, TokioScheduler, Transition, TransitionProcessor,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::tracing_spans::{dispatch_span, poll_span};
use crate::{GateMetrics, NodeConfig, NodeError, ShutdownController};

/// Time each task gets to wind down during [`AntibotNode::stop`].
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed `getUpdates` before polling again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// A running (or ready to run) antibot instance.
pub struct AntibotNode {
    config: NodeConfig,
    metrics: Arc<GateMetrics>,
    shutdown: Arc<ShutdownController>,
    /// Producer side of the transition queue.
    transitions: mpsc::Sender<Transition>,
    /// Stops the processor once the poll loop is gone.
    processor_stop: broadcast::Sender<()>,
    processor: Option<TransitionProcessor>,
    poller: Option<UpdatePoller>,
    processor_handle: Option<JoinHandle<Gatekeeper>>,
    poll_handle: Option<JoinHandle<UpdatePoller>>,
}

impl AntibotNode {
    /// Connect to Telegram, load the registry from `config.state_file` and
    /// restore pending challenges. Call [`AntibotNode::start`] to begin
    /// polling.
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let client = TelegramClient::connect(&config.telegram_config()).await?;
        info!(bot_id = %client.bot_id(), "connected to Telegram");

        let store = Arc::new(JsonFileStore::new(config.state_file.clone()));
        let platform = Arc::new(client.clone());
        let mut node = Self::assemble(config, store, platform, Arc::new(SystemClock))?;
        node.poller = Some(UpdatePoller::new(client));
        Ok(node)
    }

    /// Build a node around the given collaborators, without an update
    /// poller. Events are fed through [`AntibotNode::transitions`].
    pub fn assemble(
        config: NodeConfig,
        store: Arc<dyn RegistryStore>,
        platform: Arc<dyn ChatPlatform>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let (transitions, rx) = transition_channel();
        let scheduler = Arc::new(TokioScheduler::new(transitions.clone()));
        let mut gate = Gatekeeper::open(config.gate_config(), store, platform, scheduler, clock)?;

        let metrics = Arc::new(GateMetrics::new());
        metrics.attach(&mut gate);
        gate.restore();

        let (processor_stop, _) = broadcast::channel(1);
        Ok(Self {
            config,
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            transitions,
            processor_stop,
            processor: Some(TransitionProcessor::new(gate, rx)),
            poller: None,
            processor_handle: None,
            poll_handle: None,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Sender for injecting transitions directly.
    pub fn transitions(&self) -> mpsc::Sender<Transition> {
        self.transitions.clone()
    }

    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the transition processor and, when there is a poller, the poll
    /// loop. Returns immediately.
    pub fn spawn(&mut self) -> Result<(), NodeError> {
        let processor = self.processor.take().ok_or(NodeError::AlreadyStarted)?;
        let stop_rx = self.processor_stop.subscribe();
        self.processor_handle = Some(tokio::spawn(processor.run(stop_rx)));

        if let Some(poller) = self.poller.take() {
            let tx = self.transitions.clone();
            let metrics = Arc::clone(&self.metrics);
            let shutdown_rx = self.shutdown.subscribe();
            self.poll_handle = Some(tokio::spawn(poll_loop(poller, tx, metrics, shutdown_rx)));
        }
        Ok(())
    }

    /// Spawn everything and wait for SIGINT/SIGTERM (or a programmatic
    /// shutdown). Call [`AntibotNode::stop`] afterwards.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        self.spawn()?;
        info!(
            state_file = %self.config.state_file.display(),
            window_secs = self.config.expiry_window_secs,
            removal = self.config.removal_mode.verb(),
            "antibot node started"
        );
        self.shutdown.wait_for_signal().await;
        Ok(())
    }

    /// Stop the node gracefully.
    ///
    /// 1. Stops the poll loop.
    /// 2. Stops the transition processor after it has drained its queue.
    /// 3. Acknowledges the last update offset so a restart starts after it.
    /// 4. Cancels timers and flushes the registry.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        info!("antibot node stopping");
        self.shutdown.shutdown();

        let poller = match self.poll_handle.take() {
            Some(handle) => match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(poller)) => Some(poller),
                Ok(Err(e)) => {
                    warn!(error = %e, "poll task failed");
                    None
                }
                Err(_) => {
                    warn!("poll loop did not stop within {:?}", SHUTDOWN_TIMEOUT);
                    None
                }
            },
            None => None,
        };

        let handle = self.processor_handle.take().ok_or(NodeError::NotStarted)?;
        let _ = self.processor_stop.send(());
        let mut gate = match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(gate)) => gate,
            Ok(Err(e)) => return Err(NodeError::Task(e.to_string())),
            Err(_) => {
                return Err(NodeError::Task(
                    "transition processor did not stop in time".into(),
                ))
            }
        };

        if let Some(poller) = poller {
            match poller.acknowledge().await {
                Ok(()) => info!(offset = poller.offset(), "update offset acknowledged"),
                Err(e) => warn!(error = %e, "failed to acknowledge update offset"),
            }
        }

        gate.close().await?;

        match self.metrics.render() {
            Ok(text) => debug!(metrics = %text, "final metrics"),
            Err(e) => warn!(error = %e, "failed to render metrics"),
        }
        info!("antibot node stopped");
        Ok(())
    }
}

/// Long-poll Telegram and forward events until shutdown. Returns the poller
/// so its offset can be acknowledged.
async fn poll_loop(
    mut poller: UpdatePoller,
    tx: mpsc::Sender<Transition>,
    metrics: Arc<GateMetrics>,
    mut shutdown: broadcast::Receiver<()>,
) -> UpdatePoller {
    loop {
        let span = poll_span(poller.offset());
        let batch = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            batch = poller.poll().instrument(span) => batch,
        };

        match batch {
            Ok(events) => {
                let span = dispatch_span(events.len());
                let forwarded = async {
                    for event in events {
                        metrics.updates_received.inc();
                        if tx.send(Transition::from(event)).await.is_err() {
                            return false;
                        }
                    }
                    true
                }
                .instrument(span)
                .await;
                if !forwarded {
                    warn!("transition queue closed, stopping poll loop");
                    return poller;
                }
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying in {:?}", POLL_RETRY_DELAY);
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }
    debug!(offset = poller.offset(), "poll loop stopped");
    poller
}
