//! Shared data types for sessions, messages, and activity status
//!
//! Serde representations match the backend wire contract: camelCase field
//! names, lowercase role and activity tags, and `isComplete` as the message
//! completion flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque session identifier, client- or server-minted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh client-side identifier
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A named conversation session as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier
    pub id: SessionId,

    /// Preview of the most recent message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,

    /// Timestamp of the last activity in this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message submitted by the local user
    User,
    /// Message generated by the backend
    Assistant,
}

/// A chat message
///
/// A message with `is_complete == false` never enters the canonical
/// transcript; it exists only as the single in-progress placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Author role
    pub role: Role,

    /// Textual content
    pub content: String,

    /// When the message was produced
    pub timestamp: DateTime<Utc>,

    /// Completion flag (`isComplete` on the wire)
    #[serde(default)]
    pub is_complete: bool,
}

impl Message {
    /// Create a completed user message stamped with the current time
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_complete: true,
        }
    }

    /// Create an assistant message with the given completion flag
    #[must_use]
    pub fn assistant(content: impl Into<String>, is_complete: bool) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            is_complete,
        }
    }
}

/// Activity kind reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Nothing in flight
    #[default]
    Idle,
    /// Backend is composing a response
    Typing,
    /// Backend is processing a request
    Processing,
}

/// Current backend activity, superseded (never merged) by each status event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityStatus {
    /// Activity kind (`type` on the wire)
    #[serde(rename = "type")]
    pub kind: ActivityKind,

    /// Optional human-readable annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActivityStatus {
    /// Idle status with no annotation
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Processing status with no annotation
    #[must_use]
    pub fn processing() -> Self {
        Self {
            kind: ActivityKind::Processing,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_uses_camel_case_completion_flag() {
        let msg = Message::assistant("hi", true);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["isComplete"], true);
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn message_completion_flag_defaults_to_false() {
        let json = r#"{"role":"assistant","content":"partial","timestamp":"2026-01-01T00:00:00Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(!msg.is_complete);
    }

    #[test]
    fn activity_status_tags_kind_as_type() {
        let json = r#"{"type":"typing","message":"thinking"}"#;
        let status: ActivityStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.kind, ActivityKind::Typing);
        assert_eq!(status.message.as_deref(), Some("thinking"));
    }

    #[test]
    fn activity_status_annotation_is_optional() {
        let status: ActivityStatus = serde_json::from_str(r#"{"type":"idle"}"#).unwrap();
        assert_eq!(status.kind, ActivityKind::Idle);
        assert!(status.message.is_none());
    }

    #[test]
    fn session_parses_camel_case_fields() {
        let json = r#"{"id":"s-1","lastMessage":"hello","lastActivity":"2026-02-03T10:00:00Z"}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.id.as_str(), "s-1");
        assert_eq!(session.last_message.as_deref(), Some("hello"));
        assert!(session.last_activity.is_some());
    }

    #[test]
    fn session_preview_fields_are_optional() {
        let session: Session = serde_json::from_str(r#"{"id":"s-2"}"#).unwrap();
        assert!(session.last_message.is_none());
        assert!(session.last_activity.is_none());
    }

    #[test]
    fn minted_ids_are_unique() {
        assert_ne!(SessionId::mint(), SessionId::mint());
    }

    #[test]
    fn session_id_serializes_transparently() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
    }
}
