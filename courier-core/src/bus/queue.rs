//! Closable message queue backing one pipeline

use super::events::Pipeline;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Multi-producer, single-consumer queue that can be closed once
///
/// Producers push through a shared reference from any thread. The single
/// receiver is taken by the worker; closing drops the only sender, so the
/// receiver yields the remaining items and then `None`.
pub struct MessageQueue<M> {
    pipeline: Pipeline,
    tx: RwLock<Option<mpsc::UnboundedSender<M>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<M>>>,
}

impl<M> MessageQueue<M> {
    /// Create an open queue for the given pipeline
    pub fn new(pipeline: Pipeline) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            pipeline,
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Take the receiver (can only be called once)
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<M>> {
        self.rx.lock().take()
    }

    /// Push a message without blocking
    ///
    /// Fails with `PipelineClosed` once the queue is closed or its consumer
    /// is gone; the rejected message is dropped.
    pub fn push(&self, msg: M) -> crate::Result<()> {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return Err(crate::Error::PipelineClosed(self.pipeline));
        };
        tx.send(msg)
            .map_err(|_| crate::Error::PipelineClosed(self.pipeline))
    }

    /// Stop accepting new messages. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        let closed = self.tx.write().take().is_some();
        if closed {
            debug!(pipeline = %self.pipeline, "queue closed");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.tx.read().as_ref().map_or(true, |tx| tx.is_closed())
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }
}
