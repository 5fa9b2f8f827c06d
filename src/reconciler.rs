//! Message reconciliation state machine
//!
//! Merges streamed deltas and finalized messages into a consistent ordered
//! transcript and tracks the backend's activity status. The transcript
//! holds completed messages only and is append-only; at most one
//! in-progress message exists at any time. Resets happen only on explicit
//! session switch, clear, or new-session.

use crate::model::{ActivityStatus, Message};
use crate::{Error, Result};

/// State machine merging streamed and finalized message events
#[derive(Debug, Default)]
pub struct Reconciler {
    transcript: Vec<Message>,
    in_progress: Option<Message>,
    status: ActivityStatus,
}

impl Reconciler {
    /// Create an empty reconciler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed messages in arrival order
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// The single current in-progress placeholder, if any
    #[must_use]
    pub fn in_progress(&self) -> Option<&Message> {
        self.in_progress.as_ref()
    }

    /// Current activity status
    #[must_use]
    pub fn status(&self) -> &ActivityStatus {
        &self.status
    }

    /// Apply a streaming delta.
    ///
    /// Each delta is a cumulative snapshot and wholesale-replaces the
    /// previous one; deltas are never diffed or accumulated. If the backend
    /// ever switches to true incremental diffs, this becomes an
    /// accumulation rule.
    pub fn apply_delta(&mut self, message: Message) {
        self.in_progress = Some(message);
    }

    /// Finalize the current exchange.
    ///
    /// Clears the in-progress placeholder, appends the message to the
    /// transcript, and resets the activity status to idle. After a
    /// successful final the caller should refresh the session list, since a
    /// completed exchange may change a session's preview.
    ///
    /// # Errors
    ///
    /// Rejects a message whose completion flag is unset; no state is
    /// mutated in that case.
    pub fn apply_final(&mut self, message: Message) -> Result<()> {
        if !message.is_complete {
            return Err(Error::Channel(
                "refusing to finalize an incomplete message".to_string(),
            ));
        }
        self.in_progress = None;
        self.transcript.push(message);
        self.status = ActivityStatus::idle();
        Ok(())
    }

    /// Replace the activity status (superseded, never merged)
    pub fn set_status(&mut self, status: ActivityStatus) {
        self.status = status;
    }

    /// Optimistically append a user message before backend acknowledgment
    /// and mark the exchange busy until the next finalized message.
    pub fn push_user_message(&mut self, content: &str) {
        self.transcript.push(Message::user(content));
        self.status = ActivityStatus::processing();
    }

    /// Wholesale transcript replacement from a fresh history fetch.
    ///
    /// Incomplete messages never enter the transcript, so any the backend
    /// returns are dropped here.
    pub fn replace_transcript(&mut self, messages: Vec<Message>) {
        self.transcript = messages.into_iter().filter(|m| m.is_complete).collect();
        self.in_progress = None;
    }

    /// Reset to an empty transcript with no in-progress message
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.in_progress = None;
        self.status = ActivityStatus::idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityKind, Role};

    #[test]
    fn delta_replaces_previous_delta_without_touching_transcript() {
        let mut reconciler = Reconciler::new();
        reconciler.apply_final(Message::assistant("first", true)).unwrap();

        reconciler.apply_delta(Message::assistant("par", false));
        reconciler.apply_delta(Message::assistant("parti", false));
        reconciler.apply_delta(Message::assistant("partial", false));

        assert_eq!(reconciler.in_progress().unwrap().content, "partial");
        assert_eq!(reconciler.transcript().len(), 1);
    }

    #[test]
    fn final_clears_in_progress_and_appends() {
        let mut reconciler = Reconciler::new();
        reconciler.apply_delta(Message::assistant("par", false));

        reconciler.apply_final(Message::assistant("done", true)).unwrap();

        assert!(reconciler.in_progress().is_none());
        assert_eq!(reconciler.transcript().len(), 1);
        assert_eq!(reconciler.transcript()[0].content, "done");
    }

    #[test]
    fn final_resets_status_to_idle() {
        let mut reconciler = Reconciler::new();
        reconciler.push_user_message("question");
        assert_eq!(reconciler.status().kind, ActivityKind::Processing);

        reconciler.apply_final(Message::assistant("answer", true)).unwrap();
        assert_eq!(reconciler.status().kind, ActivityKind::Idle);
    }

    #[test]
    fn incomplete_final_is_rejected_without_mutation() {
        let mut reconciler = Reconciler::new();
        reconciler.apply_delta(Message::assistant("par", false));

        let result = reconciler.apply_final(Message::assistant("not done", false));

        assert!(result.is_err());
        assert!(reconciler.transcript().is_empty());
        assert_eq!(reconciler.in_progress().unwrap().content, "par");
    }

    #[test]
    fn status_is_superseded_not_merged() {
        let mut reconciler = Reconciler::new();
        reconciler.set_status(ActivityStatus {
            kind: ActivityKind::Typing,
            message: Some("composing".to_string()),
        });
        reconciler.set_status(ActivityStatus {
            kind: ActivityKind::Processing,
            message: None,
        });

        assert_eq!(reconciler.status().kind, ActivityKind::Processing);
        assert!(reconciler.status().message.is_none());
    }

    #[test]
    fn user_message_is_appended_optimistically() {
        let mut reconciler = Reconciler::new();
        reconciler.push_user_message("hello");

        assert_eq!(reconciler.transcript().len(), 1);
        assert_eq!(reconciler.transcript()[0].role, Role::User);
        assert!(reconciler.transcript()[0].is_complete);
        assert_eq!(reconciler.status().kind, ActivityKind::Processing);
    }

    #[test]
    fn replace_transcript_drops_incomplete_messages() {
        let mut reconciler = Reconciler::new();
        reconciler.apply_delta(Message::assistant("live", false));

        reconciler.replace_transcript(vec![
            Message::user("q"),
            Message::assistant("a", true),
            Message::assistant("torn", false),
        ]);

        assert_eq!(reconciler.transcript().len(), 2);
        assert!(reconciler.in_progress().is_none());
    }

    #[test]
    fn appends_are_monotonic_across_exchanges() {
        let mut reconciler = Reconciler::new();
        reconciler.push_user_message("q1");
        reconciler.apply_final(Message::assistant("a1", true)).unwrap();
        reconciler.push_user_message("q2");
        reconciler.apply_final(Message::assistant("a2", true)).unwrap();

        let contents: Vec<&str> = reconciler
            .transcript()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut reconciler = Reconciler::new();
        reconciler.push_user_message("q");
        reconciler.apply_delta(Message::assistant("par", false));

        reconciler.reset();

        assert!(reconciler.transcript().is_empty());
        assert!(reconciler.in_progress().is_none());
        assert_eq!(reconciler.status().kind, ActivityKind::Idle);
    }
}
