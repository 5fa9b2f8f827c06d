//! Session orchestrator
//!
//! Top-level coordinator owning the identity store, the realtime transport,
//! the history loader, and the message reconciler. All transport events
//! flow through [`SessionOrchestrator::handle_event`] one at a time in
//! arrival order, so the reconciler's transitions are race-free by
//! construction. Collaborator failures never propagate past this boundary:
//! they surface as a single current user-visible error message (latest
//! wins), cleared by the next successful operation.

use tokio::sync::mpsc;

use crate::history::HistoryLoader;
use crate::identity::IdentityStore;
use crate::model::{ActivityStatus, Message, Session, SessionId};
use crate::reconciler::Reconciler;
use crate::transport::wire::ClientFrame;
use crate::transport::{ConnectionState, ScopedEvent, Transport, TransportEvent};
use crate::Result;

/// Coordinator for one active chat session
pub struct SessionOrchestrator<T: Transport> {
    identity: IdentityStore,
    transport: T,
    history: HistoryLoader,
    reconciler: Reconciler,
    active_session: SessionId,
    // Identifier the current transport channel was opened with; diverges
    // from `active_session` only after a server-side assignment.
    transport_scope: SessionId,
    sessions: Vec<Session>,
    last_error: Option<String>,
}

impl<T: Transport> SessionOrchestrator<T> {
    /// Create an orchestrator, resolving the session identity eagerly
    /// (persisted identifier if present, else a freshly minted one)
    #[must_use]
    pub fn new(mut identity: IdentityStore, transport: T, history: HistoryLoader) -> Self {
        let active_session = identity.resolve();
        Self {
            identity,
            transport,
            history,
            reconciler: Reconciler::new(),
            transport_scope: active_session.clone(),
            active_session,
            sessions: Vec::new(),
            last_error: None,
        }
    }

    /// Open the transport scoped to the resolved identity and load the
    /// prior transcript and session list concurrently.
    ///
    /// Each fetch failure degrades to an empty result plus an error
    /// annotation; initialization itself never fails.
    pub async fn initialize(&mut self) {
        let id = self.active_session.clone();
        tracing::info!(session_id = %id, "initializing chat session");

        if let Err(e) = self.transport.open(&id).await {
            self.surface_error(&format!("failed to open connection: {e}"));
        }

        let (transcript, sessions) = tokio::join!(
            self.history.fetch_transcript(&id),
            self.history.fetch_session_list(),
        );
        self.adopt_transcript(&id, transcript);
        self.adopt_sessions(sessions);
    }

    /// Take the transport's event subscription for the dispatch loop.
    /// Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ScopedEvent>> {
        self.transport.events()
    }

    /// Whether an event belongs to the currently open channel.
    ///
    /// Events queued by a superseded channel (one torn down by a session
    /// switch or new-session) fail this check and must not be applied.
    #[must_use]
    pub fn event_in_scope(&self, scoped: &ScopedEvent) -> bool {
        scoped.scope == self.transport_scope
    }

    /// Process one transport event; callers must feed events strictly in
    /// arrival order.
    ///
    /// Events scoped to a superseded channel are discarded, the queued
    /// analogue of a stale transcript fetch.
    pub async fn handle_event(&mut self, scoped: ScopedEvent) {
        if !self.event_in_scope(&scoped) {
            tracing::debug!(
                scope = %scoped.scope,
                current = %self.transport_scope,
                "discarding event from superseded channel"
            );
            return;
        }

        match scoped.event {
            TransportEvent::Connected => {
                tracing::info!("transport connected");
                self.last_error = None;
            }
            TransportEvent::ConnectionError(reason) => {
                self.surface_error(&format!("connection error: {reason}"));
            }
            TransportEvent::ConnectionTimeout => {
                self.surface_error("connection timed out");
            }
            TransportEvent::ReconnectAttempt(attempt) => {
                tracing::info!(attempt, "reconnecting");
            }
            TransportEvent::ReconnectExhausted => {
                self.surface_error("connection lost; retry to reconnect");
            }
            TransportEvent::SessionAssigned(id) => {
                // The server is authoritative once connected
                if id != self.active_session {
                    tracing::info!(session_id = %id, "adopting server-assigned session");
                    self.identity.persist(&id);
                    self.active_session = id;
                }
            }
            TransportEvent::MessageDelta(message) => {
                self.reconciler.apply_delta(message);
            }
            TransportEvent::MessageFinal(message) => {
                match self.reconciler.apply_final(message) {
                    Ok(()) => self.refresh_sessions().await,
                    Err(e) => {
                        tracing::warn!(error = %e, "rejected final message");
                    }
                }
            }
            TransportEvent::Activity(status) => {
                self.reconciler.set_status(status);
            }
            TransportEvent::ChannelError(reason) => {
                self.surface_error(&reason);
            }
        }
    }

    /// Submit user text.
    ///
    /// Blank or whitespace-only input is a no-op: nothing is appended and
    /// nothing is emitted. Otherwise the message is appended optimistically
    /// before any backend acknowledgment and emitted on the transport
    /// scoped to the current session.
    pub fn send_message(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        self.reconciler.push_user_message(trimmed);
        self.transport.send(ClientFrame::Message {
            message: trimmed.to_string(),
            session_id: self.active_session.clone(),
        });
    }

    /// Delete the active session's transcript.
    ///
    /// On success the transcript, in-progress placeholder, and error
    /// surface are reset and the session list is refreshed. On failure the
    /// transcript is left unchanged and the failure is surfaced.
    pub async fn clear_chat(&mut self) {
        match self.history.delete_transcript(&self.active_session).await {
            Ok(()) => {
                self.reconciler.reset();
                self.last_error = None;
                self.refresh_sessions().await;
            }
            Err(e) => {
                self.surface_error(&format!("failed to clear chat: {e}"));
            }
        }
    }

    /// Abandon the current identity and start a fresh session
    pub async fn new_session(&mut self) {
        self.identity.clear();
        let id = self.identity.resolve();
        tracing::info!(session_id = %id, "starting new session");

        self.active_session = id.clone();
        self.reconciler.reset();
        self.reopen_transport(&id).await;
        self.refresh_sessions().await;
    }

    /// Switch to an existing session, replacing the transcript wholesale
    /// from a fresh fetch (never from cached state)
    pub async fn switch_session(&mut self, id: SessionId) {
        tracing::info!(session_id = %id, "switching session");
        self.identity.persist(&id);
        self.active_session = id.clone();
        self.reconciler.reset();
        self.reopen_transport(&id).await;

        let transcript = self.history.fetch_transcript(&id).await;
        self.adopt_transcript(&id, transcript);
    }

    /// Explicitly resume a failed connection and re-fetch the transcript
    pub async fn retry_connection(&mut self) {
        if let Err(e) = self.transport.reconnect().await {
            self.surface_error(&format!("failed to reconnect: {e}"));
            return;
        }

        let id = self.active_session.clone();
        let transcript = self.history.fetch_transcript(&id).await;
        self.adopt_transcript(&id, transcript);
    }

    /// Adopt a fetched transcript if `requested` is still the active
    /// session.
    ///
    /// Switching session does not cancel an in-flight fetch, so results for
    /// a superseded session are discarded here instead of overwriting the
    /// newly active session's transcript.
    pub fn adopt_transcript(&mut self, requested: &SessionId, result: Result<Vec<Message>>) {
        if *requested != self.active_session {
            tracing::debug!(
                requested = %requested,
                active = %self.active_session,
                "discarding stale transcript fetch"
            );
            return;
        }

        match result {
            Ok(messages) => {
                self.reconciler.replace_transcript(messages);
                self.last_error = None;
            }
            Err(e) => {
                self.reconciler.replace_transcript(Vec::new());
                self.surface_error(&format!("failed to load transcript: {e}"));
            }
        }
    }

    /// Completed messages of the active session, in order
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        self.reconciler.transcript()
    }

    /// The current in-progress message, if any
    #[must_use]
    pub fn in_progress(&self) -> Option<&Message> {
        self.reconciler.in_progress()
    }

    /// Current backend activity status
    #[must_use]
    pub fn status(&self) -> &ActivityStatus {
        self.reconciler.status()
    }

    /// Known sessions from the last refresh
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// The active session identifier
    #[must_use]
    pub fn active_session(&self) -> &SessionId {
        &self.active_session
    }

    /// The current user-visible error, if any
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current transport connection state
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    async fn refresh_sessions(&mut self) {
        match self.history.fetch_session_list().await {
            Ok(sessions) => self.sessions = sessions,
            Err(e) => self.surface_error(&format!("failed to load sessions: {e}")),
        }
    }

    fn adopt_sessions(&mut self, result: Result<Vec<Session>>) {
        match result {
            Ok(sessions) => self.sessions = sessions,
            Err(e) => {
                self.sessions = Vec::new();
                self.surface_error(&format!("failed to load sessions: {e}"));
            }
        }
    }

    async fn reopen_transport(&mut self, id: &SessionId) {
        // The old channel is always torn down before its replacement opens;
        // anything it already queued is out of scope from here on.
        self.transport.close().await;
        self.transport_scope = id.clone();
        if let Err(e) = self.transport.open(id).await {
            self.surface_error(&format!("failed to open connection: {e}"));
        }
    }

    fn surface_error(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.last_error = Some(message.to_string());
    }
}
