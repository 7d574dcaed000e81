//! Message envelopes and queues
//!
//! Two independent queues, one per pipeline: outbound messages waiting to be
//! sent and inbound messages waiting to be executed.

pub mod events;
pub mod queue;

pub use events::{Envelope, InboundMessage, OutboundMessage, Pipeline};
pub use queue::MessageQueue;
