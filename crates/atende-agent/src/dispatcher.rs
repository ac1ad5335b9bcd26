// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes transport events to one sequential worker per device.
//!
//! The receive loop spawns a worker task the first time a device shows up
//! and forwards every event of that device into the worker's queue, so one
//! device's events are handled in delivery order while devices run
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use atende_core::types::InboundMessage;
use atende_core::{AtendeError, ChannelAdapter};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::{ConversationEngine, EngineContext};
use crate::shutdown;

/// Events buffered per device before the receive loop waits.
const DEVICE_QUEUE_DEPTH: usize = 256;

/// How long workers get to drain their queues on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Dispatcher {
    channel: Arc<dyn ChannelAdapter>,
    ctx: Arc<EngineContext>,
    workers: HashMap<String, mpsc::Sender<InboundMessage>>,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn ChannelAdapter>, ctx: Arc<EngineContext>) -> Self {
        Self {
            channel,
            ctx,
            workers: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Number of devices with a running worker.
    pub fn devices(&self) -> usize {
        self.workers.len()
    }

    /// Receives events until `cancel` fires or the transport closes, then
    /// drains every device queue.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), AtendeError> {
        info!("dispatcher running");

        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => self.dispatch(inbound).await,
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping dispatcher");
                    break;
                }
            }
        }

        // Closing the queues lets each worker finish what it already has.
        self.workers.clear();
        shutdown::drain_workers(self.tasks, DRAIN_TIMEOUT).await;
        info!("dispatcher stopped");
        Ok(())
    }

    async fn dispatch(&mut self, msg: InboundMessage) {
        let device_id = msg.device_id.clone();
        let queue = match self.workers.get(&device_id) {
            Some(queue) => queue.clone(),
            None => {
                let (tx, rx) = mpsc::channel(DEVICE_QUEUE_DEPTH);
                let engine = ConversationEngine::new(&device_id, Arc::clone(&self.ctx));
                self.tasks.spawn(device_worker(engine, rx));
                self.workers.insert(device_id.clone(), tx.clone());
                info!(device_id = %device_id, "device worker started");
                tx
            }
        };
        if queue.send(msg).await.is_err() {
            warn!(device_id = %device_id, "device worker gone, event dropped");
            self.workers.remove(&device_id);
        }
    }
}

async fn device_worker(mut engine: ConversationEngine, mut queue: mpsc::Receiver<InboundMessage>) {
    while let Some(msg) = queue.recv().await {
        if let Err(e) = engine.handle(msg).await {
            error!(device_id = engine.device_id(), error = %e, "failed to handle event");
        }
    }
    debug!(device_id = engine.device_id(), "device worker drained");
}
