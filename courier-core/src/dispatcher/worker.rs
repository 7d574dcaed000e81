//! Single-consumer worker loop shared by both pipelines

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::traits::FailureObserver;
use crate::bus::{Envelope, Pipeline};
use crate::config::{PipelineConfig, ShutdownPolicy};

/// Lifecycle of one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Waiting for or processing messages
    Running,
    /// Shutdown signalled, consuming what is left in the closed queue
    Draining,
    /// Loop has exited
    Stopped,
}

/// Hands one message to the collaborator
pub(crate) type Handler<M> = Box<dyn Fn(M) -> BoxFuture<'static, crate::Result<()>> + Send + Sync>;

enum Next<M> {
    Message(M),
    Cancelled,
    Closed,
    Idle,
}

/// Publishes `Stopped` however the loop ends, including task abort
struct StoppedOnDrop(watch::Sender<WorkerState>);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.send_replace(WorkerState::Stopped);
    }
}

pub(crate) struct Worker<M> {
    pipeline: Pipeline,
    cancel: CancellationToken,
    policy: ShutdownPolicy,
    poll_interval: Duration,
    handler: Handler<M>,
    observer: Arc<dyn FailureObserver>,
}

impl<M: Envelope> Worker<M> {
    pub(crate) fn new(
        pipeline: Pipeline,
        cancel: CancellationToken,
        config: &PipelineConfig,
        handler: Handler<M>,
        observer: Arc<dyn FailureObserver>,
    ) -> Self {
        Self {
            pipeline,
            cancel,
            policy: config.shutdown,
            poll_interval: config.poll_interval(),
            handler,
            observer,
        }
    }

    /// Consume messages until shutdown; never returns early on message failure
    pub(crate) async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<M>,
        state: watch::Sender<WorkerState>,
    ) {
        let state = StoppedOnDrop(state);
        let mut draining = false;
        info!(pipeline = %self.pipeline, policy = ?self.policy, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled(), if !draining => Next::Cancelled,
                received = tokio::time::timeout(self.poll_interval, rx.recv()) => match received {
                    Ok(Some(message)) => Next::Message(message),
                    Ok(None) => Next::Closed,
                    Err(_) => Next::Idle,
                },
            };

            match next {
                Next::Message(message) => self.dispatch(message).await,
                Next::Cancelled => match self.policy {
                    ShutdownPolicy::Abort => {
                        debug!(pipeline = %self.pipeline, "Cancellation observed, not draining");
                        break;
                    }
                    ShutdownPolicy::Drain => {
                        debug!(pipeline = %self.pipeline, "Cancellation observed, draining queue");
                        draining = true;
                        state.0.send_replace(WorkerState::Draining);
                    }
                },
                Next::Closed => break,
                Next::Idle => trace!(pipeline = %self.pipeline, "Queue idle"),
            }
        }

        info!(pipeline = %self.pipeline, "Worker stopped");
    }

    async fn dispatch(&self, message: M) {
        let name = message.name().to_string();
        debug!(pipeline = %self.pipeline, message_id = %message.id(), message_name = %name, "Dispatching message");

        let call = AssertUnwindSafe((self.handler)(message)).catch_unwind();
        let outcome = match self.policy {
            ShutdownPolicy::Abort => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(pipeline = %self.pipeline, message_name = %name, "In-flight message abandoned on cancellation");
                    return;
                }
                outcome = call => outcome,
            },
            ShutdownPolicy::Drain => call.await,
        };

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic) => crate::Error::Panicked(panic_message(panic.as_ref())),
        };

        let observed = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.observer.record_failure(self.pipeline, &name, &error)
        }));
        if observed.is_err() {
            warn!(pipeline = %self.pipeline, message_name = %name, "Failure observer panicked");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
