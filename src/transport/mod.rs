//! Realtime transport connection
//!
//! Owns one logical WebSocket channel to the backend at a time, scoped by a
//! session identifier supplied at open time. The identifier travels as a
//! `sessionId` query parameter on the connection URL, never in message
//! payloads. Subscribers receive [`ScopedEvent`]s through an unbounded
//! channel consumed by a single dispatch loop, preserving strict in-order
//! delivery. Every event carries the identifier its channel was opened
//! for, so a subscriber can discard events queued by a superseded channel
//! after a session switch.

mod retry;
pub mod wire;

pub use retry::{RetryPolicy, delay_for_attempt};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::model::{ActivityStatus, Message, SessionId};
use crate::{Error, Result};
use wire::{ClientFrame, ServerFrame};

/// Deadline for a single WebSocket open attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel open
    #[default]
    Disconnected,
    /// Open attempt in flight
    Connecting,
    /// Channel established and acknowledged
    Connected,
    /// Automatic retry in progress after a drop
    Reconnecting,
    /// Retries exhausted; explicit `reconnect` required
    Failed,
}

/// Event emitted by the transport to its subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Channel established
    Connected,
    /// Transport-level failure while opening or holding the channel
    ConnectionError(String),
    /// Open attempt exceeded its deadline
    ConnectionTimeout,
    /// Automatic reconnect attempt in progress (1-based)
    ReconnectAttempt(u32),
    /// Automatic retries exhausted
    ReconnectExhausted,
    /// Server-assigned session identifier
    SessionAssigned(SessionId),
    /// Completed message ready for the transcript
    MessageFinal(Message),
    /// Cumulative snapshot of the in-progress message
    MessageDelta(Message),
    /// Backend activity status
    Activity(ActivityStatus),
    /// Application-level error event from the backend
    ChannelError(String),
}

/// Transport event tagged with the session its channel was opened for
///
/// The scope is the identifier supplied to the `open` (or `reconnect`)
/// that produced the event, not any identifier carried in the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedEvent {
    /// Identifier the originating channel was opened with
    pub scope: SessionId,
    /// The event itself
    pub event: TransportEvent,
}

/// Realtime channel seam between the orchestrator and the wire
#[async_trait]
pub trait Transport: Send {
    /// Open the channel scoped to `id`, tearing down any prior channel first
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be constructed
    async fn open(&mut self, id: &SessionId) -> Result<()>;

    /// Terminate the current channel; safe to call when none is open
    async fn close(&mut self);

    /// Fire-and-forget emission; silently dropped when no channel is open
    fn send(&self, frame: ClientFrame);

    /// Resume a closed/broken channel using the last-supplied identifier
    ///
    /// # Errors
    ///
    /// Returns an error if no session identifier was ever supplied
    async fn reconnect(&mut self) -> Result<()>;

    /// Take the event subscription; events arrive in emission order.
    /// Returns `None` after the first call.
    fn events(&mut self) -> Option<mpsc::UnboundedReceiver<ScopedEvent>>;

    /// Current connection state
    fn state(&self) -> ConnectionState;
}

/// WebSocket-backed transport
///
/// One background task owns the socket: it connects, pumps inbound frames
/// into the event channel, drains outbound frames, and retries a dropped
/// connection per the configured [`RetryPolicy`] before giving up.
pub struct WsTransport {
    ws_url: String,
    retry: RetryPolicy,
    session_id: Option<SessionId>,
    state: Arc<Mutex<ConnectionState>>,
    events_tx: mpsc::UnboundedSender<ScopedEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ScopedEvent>>,
    outbound_tx: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl WsTransport {
    /// Create a transport for the given WebSocket endpoint
    #[must_use]
    pub fn new(ws_url: impl Into<String>, retry: RetryPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            ws_url: ws_url.into(),
            retry,
            session_id: None,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            events_tx,
            events_rx: Some(events_rx),
            outbound_tx: None,
            task: None,
        }
    }

    /// Build the connection URL with the session scoping parameter
    fn endpoint(&self, id: &SessionId) -> Result<Url> {
        let mut url = Url::parse(&self.ws_url)
            .map_err(|e| Error::Config(format!("invalid websocket url {}: {e}", self.ws_url)))?;
        url.query_pairs_mut().append_pair("sessionId", id.as_str());
        Ok(url)
    }

    fn spawn_connection(&mut self, url: Url, scope: SessionId) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.outbound_tx = Some(out_tx);
        set_state(&self.state, ConnectionState::Connecting);

        let task = tokio::spawn(connection_loop(
            url,
            scope,
            self.retry.clone(),
            Arc::clone(&self.state),
            self.events_tx.clone(),
            out_rx,
        ));
        self.task = Some(task);
    }

    async fn teardown(&mut self) {
        // Dropping the outbound sender lets an idle pump loop exit cleanly;
        // abort covers a task parked in a backoff sleep.
        self.outbound_tx = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        set_state(&self.state, ConnectionState::Disconnected);
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&mut self, id: &SessionId) -> Result<()> {
        self.teardown().await;
        self.session_id = Some(id.clone());
        let url = self.endpoint(id)?;
        tracing::debug!(session_id = %id, "opening transport");
        self.spawn_connection(url, id.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.teardown().await;
    }

    fn send(&self, frame: ClientFrame) {
        let Some(tx) = &self.outbound_tx else {
            tracing::debug!("send with no open channel; frame dropped");
            return;
        };
        match frame.to_json() {
            Ok(text) => {
                if tx.send(text).is_err() {
                    tracing::debug!("connection task gone; frame dropped");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode outbound frame"),
        }
    }

    async fn reconnect(&mut self) -> Result<()> {
        let id = self
            .session_id
            .clone()
            .ok_or_else(|| Error::Connection("reconnect before first open".to_string()))?;
        self.teardown().await;
        let url = self.endpoint(&id)?;
        tracing::info!(session_id = %id, "reconnecting transport");
        self.spawn_connection(url, id);
        Ok(())
    }

    fn events(&mut self) -> Option<mpsc::UnboundedReceiver<ScopedEvent>> {
        self.events_rx.take()
    }

    fn state(&self) -> ConnectionState {
        *self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn set_state(state: &Arc<Mutex<ConnectionState>>, value: ConnectionState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

/// Map a parsed server frame to its transport event
///
/// A `message` frame is routed by its completion flag; `message-stream`
/// frames are always deltas regardless of the flag.
fn event_for_frame(frame: ServerFrame) -> TransportEvent {
    match frame {
        ServerFrame::Session { session_id } => TransportEvent::SessionAssigned(session_id),
        ServerFrame::Message(m) if m.is_complete => TransportEvent::MessageFinal(m),
        ServerFrame::Message(m) => TransportEvent::MessageDelta(m),
        ServerFrame::MessageStream(mut m) => {
            m.is_complete = false;
            TransportEvent::MessageDelta(m)
        }
        ServerFrame::Status(s) => TransportEvent::Activity(s),
        ServerFrame::Error(e) => TransportEvent::ChannelError(
            e.message
                .unwrap_or_else(|| "unknown channel error".to_string()),
        ),
    }
}

fn emit(
    events_tx: &mpsc::UnboundedSender<ScopedEvent>,
    scope: &SessionId,
    event: TransportEvent,
) {
    let _ = events_tx.send(ScopedEvent {
        scope: scope.clone(),
        event,
    });
}

fn dispatch_frame(
    text: &str,
    scope: &SessionId,
    events_tx: &mpsc::UnboundedSender<ScopedEvent>,
) {
    match ServerFrame::parse(text) {
        Ok(frame) => emit(events_tx, scope, event_for_frame(frame)),
        Err(e) => tracing::debug!(error = %e, "ignoring unparseable frame"),
    }
}

/// Connection task: connect, pump, and retry with backoff until exhausted
/// or torn down. Every emitted event is scoped to `scope`.
async fn connection_loop(
    url: Url,
    scope: SessionId,
    retry: RetryPolicy,
    state: Arc<Mutex<ConnectionState>>,
    events_tx: mpsc::UnboundedSender<ScopedEvent>,
    mut out_rx: mpsc::UnboundedReceiver<String>,
) {
    let mut attempt: u32 = 0;

    loop {
        match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
            Ok(Ok((ws, _response))) => {
                attempt = 0;
                set_state(&state, ConnectionState::Connected);
                emit(&events_tx, &scope, TransportEvent::Connected);

                let (mut sink, mut stream) = ws.split();
                loop {
                    tokio::select! {
                        outbound = out_rx.recv() => match outbound {
                            Some(text) => {
                                if sink.send(WsMessage::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            // Transport torn down; close and exit for good
                            None => {
                                let _ = sink.close().await;
                                set_state(&state, ConnectionState::Disconnected);
                                return;
                            }
                        },
                        inbound = stream.next() => match inbound {
                            Some(Ok(WsMessage::Text(text))) => {
                                dispatch_frame(text.as_str(), &scope, &events_tx);
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                emit(
                                    &events_tx,
                                    &scope,
                                    TransportEvent::ConnectionError(e.to_string()),
                                );
                                break;
                            }
                        },
                    }
                }
                // Socket dropped: fall through to the retry path
            }
            Ok(Err(e)) => {
                emit(
                    &events_tx,
                    &scope,
                    TransportEvent::ConnectionError(e.to_string()),
                );
            }
            Err(_) => {
                emit(&events_tx, &scope, TransportEvent::ConnectionTimeout);
            }
        }

        if attempt >= retry.max_attempts {
            set_state(&state, ConnectionState::Failed);
            emit(&events_tx, &scope, TransportEvent::ReconnectExhausted);
            return;
        }

        attempt += 1;
        set_state(&state, ConnectionState::Reconnecting);
        emit(&events_tx, &scope, TransportEvent::ReconnectAttempt(attempt));
        tokio::time::sleep(delay_for_attempt(&retry, attempt - 1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityKind, Message};

    #[test]
    fn endpoint_carries_session_id_query() {
        let transport = WsTransport::new("ws://localhost:3001", RetryPolicy::default());
        let url = transport.endpoint(&SessionId::from("s 1")).unwrap();
        assert_eq!(url.query(), Some("sessionId=s+1"));
    }

    #[test]
    fn endpoint_rejects_invalid_url() {
        let transport = WsTransport::new("not a url", RetryPolicy::default());
        assert!(transport.endpoint(&SessionId::from("x")).is_err());
    }

    #[test]
    fn complete_message_frame_routes_to_final() {
        let event = event_for_frame(ServerFrame::Message(Message::assistant("done", true)));
        assert!(matches!(event, TransportEvent::MessageFinal(_)));
    }

    #[test]
    fn incomplete_message_frame_routes_to_delta() {
        let event = event_for_frame(ServerFrame::Message(Message::assistant("par", false)));
        assert!(matches!(event, TransportEvent::MessageDelta(_)));
    }

    #[test]
    fn message_stream_frame_is_always_a_delta() {
        let event =
            event_for_frame(ServerFrame::MessageStream(Message::assistant("snap", true)));
        let TransportEvent::MessageDelta(msg) = event else {
            panic!("expected delta");
        };
        assert!(!msg.is_complete);
    }

    #[test]
    fn status_frame_routes_to_activity() {
        let event = event_for_frame(ServerFrame::Status(ActivityStatus {
            kind: ActivityKind::Typing,
            message: None,
        }));
        assert!(matches!(event, TransportEvent::Activity(_)));
    }

    #[test]
    fn error_frame_without_message_gets_fallback_reason() {
        let event = event_for_frame(ServerFrame::Error(wire::ChannelErrorPayload {
            message: None,
        }));
        assert_eq!(
            event,
            TransportEvent::ChannelError("unknown channel error".to_string())
        );
    }

    #[tokio::test]
    async fn send_before_open_is_a_noop() {
        let transport = WsTransport::new("ws://localhost:3001", RetryPolicy::default());
        transport.send(ClientFrame::Message {
            message: "dropped".to_string(),
            session_id: SessionId::from("s-1"),
        });
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn events_subscription_is_take_once() {
        let mut transport = WsTransport::new("ws://localhost:3001", RetryPolicy::default());
        assert!(transport.events().is_some());
        assert!(transport.events().is_none());
    }

    #[tokio::test]
    async fn reconnect_before_open_fails() {
        let mut transport = WsTransport::new("ws://localhost:3001", RetryPolicy::default());
        assert!(transport.reconnect().await.is_err());
    }
}
