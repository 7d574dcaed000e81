//! Core of courier, a dual-pipeline message dispatcher
//!
//! Outbound messages are queued for a [`dispatcher::Sender`], inbound
//! messages for a [`dispatcher::Executor`]. Each pipeline has its own queue
//! and a single worker, and a failing message never stops its pipeline.

pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod utils;

pub use bus::{Envelope, InboundMessage, OutboundMessage, Pipeline};
pub use dispatcher::{Dispatcher, Executor, FailureObserver, Sender, TracingObserver, WorkerState};
pub use error::{Error, Result};
