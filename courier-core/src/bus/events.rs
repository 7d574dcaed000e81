//! Message envelopes carried by the dispatcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// The two pipelines owned by a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    /// Produced messages waiting to be sent
    Outbound,
    /// Received messages waiting to be executed
    Inbound,
}

impl Pipeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Outbound => "outbound",
            Pipeline::Inbound => "inbound",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over the envelopes; the dispatcher only looks at these fields
pub trait Envelope: Send + 'static {
    /// Stable identity of the message
    fn id(&self) -> Uuid;

    /// Logical name/topic, used for diagnostics
    fn name(&self) -> &str;
}

/// Message scheduled for delivery to an external transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message identity
    pub id: Uuid,
    /// Logical name or topic
    pub name: String,
    /// Message payload
    pub payload: serde_json::Value,
    /// Delivery metadata, owned upstream
    pub metadata: HashMap<String, serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Create a new outbound message with a fresh identity
    pub fn new(name: impl Into<String>, payload: impl Into<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            payload: payload.into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Use an identity assigned upstream (e.g. by the outbox store)
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Envelope for OutboundMessage {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Message received from a transport, waiting for local handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message identity
    pub id: Uuid,
    /// Logical name or topic
    pub name: String,
    /// Message payload
    pub payload: serde_json::Value,
    /// Transport metadata
    pub metadata: HashMap<String, serde_json::Value>,
    /// Reception timestamp
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a new inbound message with a fresh identity
    pub fn new(name: impl Into<String>, payload: impl Into<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            payload: payload.into(),
            metadata: HashMap::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Envelope for InboundMessage {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
