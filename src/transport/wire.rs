//! Wire frames for the realtime channel
//!
//! Frames are JSON text messages tagged by `event` with the payload in
//! `data`. Event names are the wire contract shared with the backend.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::{ActivityStatus, Message, SessionId};

/// Client-to-server frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// User-submitted chat text scoped to a session
    Message {
        /// The submitted text
        message: String,
        /// Active session the message belongs to
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
}

impl ClientFrame {
    /// Serialize to a JSON text frame
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server-to-client frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// Server-assigned session identifier (authoritative once connected)
    Session {
        /// The assigned identifier
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    /// Chat message; `isComplete` decides whether it is a delta or a final
    Message(Message),
    /// Cumulative streaming snapshot of the in-progress message
    MessageStream(Message),
    /// Backend activity status
    Status(ActivityStatus),
    /// Application-level error from the backend
    Error(ChannelErrorPayload),
}

/// Payload of a server `error` frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelErrorPayload {
    /// Human-readable reason, if the backend supplied one
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerFrame {
    /// Parse a JSON text frame
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON or unknown events
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
