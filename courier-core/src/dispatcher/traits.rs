//! Collaborator traits consumed by the dispatcher

use async_trait::async_trait;
use tracing::error;

use crate::bus::{InboundMessage, OutboundMessage, Pipeline};
use crate::utils::truncate;

/// Longest error text written to the log for a single failure
const MAX_LOGGED_ERROR_LEN: usize = 2048;

/// Initiates delivery of outbound messages to a transport
///
/// The dispatcher awaits only the returned future. Implementations that
/// confirm delivery asynchronously should spawn that work themselves.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> crate::Result<()>;
}

/// Runs local handler logic for inbound messages
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, message: InboundMessage) -> crate::Result<()>;
}

/// Receives one call per failed message attempt
///
/// Must not panic; the workers guard against it, but a panicking observer
/// loses the failure record.
pub trait FailureObserver: Send + Sync {
    fn record_failure(&self, pipeline: Pipeline, message_name: &str, error: &crate::Error);
}

/// Default observer: structured `error!` event per failure
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FailureObserver for TracingObserver {
    fn record_failure(&self, pipeline: Pipeline, message_name: &str, error: &crate::Error) {
        let error = truncate(&error.to_string(), MAX_LOGGED_ERROR_LEN);
        error!(
            pipeline = %pipeline,
            message_name,
            error = %error,
            "Exception occurred while processing message"
        );
    }
}
