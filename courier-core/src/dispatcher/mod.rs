//! Dual-pipeline dispatcher
//!
//! Owns the outbound and inbound queues and one worker per queue. Producers
//! enqueue from any thread; the send worker hands outbound messages to a
//! [`Sender`], the execute worker hands inbound messages to an [`Executor`].
//! A failing message is reported to the [`FailureObserver`] and the worker
//! moves on to the next one.

pub mod traits;
pub mod worker;

pub use traits::{Executor, FailureObserver, Sender, TracingObserver};
pub use worker::WorkerState;

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::{InboundMessage, MessageQueue, OutboundMessage, Pipeline};
use crate::config::validate::validate_dispatcher;
use crate::config::DispatcherConfig;
use worker::{Handler, Worker};

/// Facade over both pipelines
///
/// Dropping the dispatcher signals shutdown but does not wait for the workers.
pub struct Dispatcher {
    outbound: MessageQueue<OutboundMessage>,
    inbound: MessageQueue<InboundMessage>,
    cancel: CancellationToken,
    workers: Mutex<Vec<(Pipeline, JoinHandle<()>)>>,
    outbound_state: watch::Receiver<WorkerState>,
    inbound_state: watch::Receiver<WorkerState>,
    shutdown_timeout: Duration,
}

impl Dispatcher {
    /// Start both workers on the current tokio runtime, logging failures via `tracing`
    pub fn start(
        config: &DispatcherConfig,
        sender: Arc<dyn Sender>,
        executor: Arc<dyn Executor>,
    ) -> crate::Result<Self> {
        Self::start_with_observer(config, sender, executor, Arc::new(TracingObserver))
    }

    /// Start both workers with a custom failure observer
    pub fn start_with_observer(
        config: &DispatcherConfig,
        sender: Arc<dyn Sender>,
        executor: Arc<dyn Executor>,
        observer: Arc<dyn FailureObserver>,
    ) -> crate::Result<Self> {
        validate_dispatcher(config)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| crate::Error::Internal(format!("Dispatcher needs a tokio runtime: {}", e)))?;

        let outbound = MessageQueue::new(Pipeline::Outbound);
        let inbound = MessageQueue::new(Pipeline::Inbound);
        let cancel = CancellationToken::new();

        let send: Handler<OutboundMessage> = Box::new(move |message| {
            let sender = Arc::clone(&sender);
            async move { sender.send(message).await }.boxed()
        });
        let execute: Handler<InboundMessage> = Box::new(move |message| {
            let executor = Arc::clone(&executor);
            async move { executor.execute(message).await }.boxed()
        });

        let (outbound_tx, outbound_state) = watch::channel(WorkerState::Running);
        let (inbound_tx, inbound_state) = watch::channel(WorkerState::Running);

        let outbound_rx = outbound
            .take_receiver()
            .ok_or_else(|| crate::Error::Internal("Outbound receiver already taken".into()))?;
        let inbound_rx = inbound
            .take_receiver()
            .ok_or_else(|| crate::Error::Internal("Inbound receiver already taken".into()))?;

        let send_worker = Worker::new(
            outbound.pipeline(),
            cancel.clone(),
            config.pipeline(outbound.pipeline()),
            send,
            Arc::clone(&observer),
        );
        let execute_worker = Worker::new(
            inbound.pipeline(),
            cancel.clone(),
            config.pipeline(inbound.pipeline()),
            execute,
            observer,
        );

        let workers = vec![
            (outbound.pipeline(), runtime.spawn(send_worker.run(outbound_rx, outbound_tx))),
            (inbound.pipeline(), runtime.spawn(execute_worker.run(inbound_rx, inbound_tx))),
        ];
        info!("Dispatcher started");

        Ok(Self {
            outbound,
            inbound,
            cancel,
            workers: Mutex::new(workers),
            outbound_state,
            inbound_state,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Queue a message for the send worker
    pub fn enqueue_to_publish(&self, message: OutboundMessage) -> crate::Result<()> {
        self.outbound.push(message)
    }

    /// Queue a message for the execute worker
    pub fn enqueue_to_execute(&self, message: InboundMessage) -> crate::Result<()> {
        self.inbound.push(message)
    }

    /// Close both queues and signal both workers, without waiting
    ///
    /// Safe to call any number of times.
    pub fn shutdown(&self) {
        let outbound_closed = self.outbound.close();
        let inbound_closed = self.inbound.close();
        if outbound_closed || inbound_closed {
            info!("Dispatcher shutdown requested");
        }
        self.cancel.cancel();
    }

    /// Shut down and wait for both workers, up to the configured timeout
    ///
    /// Workers still running at the deadline are aborted and
    /// `Error::ShutdownTimeout` is returned. Concurrent and later calls wait
    /// for both workers to report `Stopped` under the same deadline.
    pub async fn shutdown_and_wait(&self) -> crate::Result<()> {
        self.shutdown();

        let mut workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            // Handles belong to another caller; follow the published states
            return tokio::time::timeout(self.shutdown_timeout, async {
                self.wait_stopped(Pipeline::Outbound).await;
                self.wait_stopped(Pipeline::Inbound).await;
            })
            .await
            .map_err(|_| crate::Error::ShutdownTimeout(self.shutdown_timeout));
        }

        let joined = tokio::time::timeout(
            self.shutdown_timeout,
            futures::future::join_all(workers.iter_mut().map(|(_, handle)| handle)),
        )
        .await;

        match joined {
            Ok(results) => {
                for ((pipeline, _), result) in workers.iter().zip(results) {
                    if let Err(e) = result {
                        warn!(pipeline = %pipeline, error = %e, "Worker ended abnormally");
                    }
                }
                info!("Dispatcher stopped");
                Ok(())
            }
            Err(_) => {
                for (pipeline, handle) in &workers {
                    if !handle.is_finished() {
                        warn!(pipeline = %pipeline, timeout = ?self.shutdown_timeout, "Worker missed shutdown deadline, aborting");
                        handle.abort();
                    }
                }
                Err(crate::Error::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }

    /// Current state of one pipeline's worker
    pub fn state(&self, pipeline: Pipeline) -> WorkerState {
        *self.state_receiver(pipeline).borrow()
    }

    /// Wait until a worker reports `Stopped`
    pub async fn wait_stopped(&self, pipeline: Pipeline) {
        let mut rx = self.state_receiver(pipeline).clone();
        // The sender is only dropped after publishing `Stopped`
        let _ = rx.wait_for(|state| *state == WorkerState::Stopped).await;
    }

    /// Whether shutdown has not been requested yet
    pub fn is_running(&self) -> bool {
        !self.outbound.is_closed() && !self.inbound.is_closed()
    }

    fn state_receiver(&self, pipeline: Pipeline) -> &watch::Receiver<WorkerState> {
        match pipeline {
            Pipeline::Outbound => &self.outbound_state,
            Pipeline::Inbound => &self.inbound_state,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
