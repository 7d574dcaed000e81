//! Log-only collaborators used by `courier run`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Error, Executor, InboundMessage, OutboundMessage, Sender};
use tracing::info;

/// Attempt counters shared by the demo sender and executor
#[derive(Debug, Default)]
pub struct DemoStats {
    pub sent: AtomicUsize,
    pub executed: AtomicUsize,
    pub failed: AtomicUsize,
}

impl DemoStats {
    pub fn attempted(&self) -> usize {
        self.sent.load(Ordering::SeqCst) + self.executed.load(Ordering::SeqCst)
    }

    /// Poll until `expected` messages have been attempted
    pub async fn wait_for(&self, expected: usize) {
        while self.attempted() < expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Fails every `fail_every`-th attempt (1-based); `0` never fails
fn should_fail(attempt: usize, fail_every: usize) -> bool {
    fail_every > 0 && attempt % fail_every == 0
}

pub struct LogSender {
    fail_every: usize,
    stats: Arc<DemoStats>,
}

impl LogSender {
    pub fn new(fail_every: usize, stats: Arc<DemoStats>) -> Self {
        Self { fail_every, stats }
    }
}

#[async_trait]
impl Sender for LogSender {
    async fn send(&self, message: OutboundMessage) -> courier_core::Result<()> {
        let attempt = self.stats.sent.fetch_add(1, Ordering::SeqCst) + 1;
        if should_fail(attempt, self.fail_every) {
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Send(format!("simulated transport failure #{}", attempt)));
        }
        info!(message_id = %message.id, message_name = %message.name, "Sent message");
        Ok(())
    }
}

pub struct LogExecutor {
    fail_every: usize,
    stats: Arc<DemoStats>,
}

impl LogExecutor {
    pub fn new(fail_every: usize, stats: Arc<DemoStats>) -> Self {
        Self { fail_every, stats }
    }
}

#[async_trait]
impl Executor for LogExecutor {
    async fn execute(&self, message: InboundMessage) -> courier_core::Result<()> {
        let attempt = self.stats.executed.fetch_add(1, Ordering::SeqCst) + 1;
        if should_fail(attempt, self.fail_every) {
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Execute(format!("simulated handler failure #{}", attempt)));
        }
        info!(message_id = %message.id, message_name = %message.name, "Executed message");
        Ok(())
    }
}
