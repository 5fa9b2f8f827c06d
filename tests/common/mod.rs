#![allow(dead_code)]

//! Shared test fixtures

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use wavelink::Result;
use wavelink::model::SessionId;
use wavelink::transport::wire::ClientFrame;
use wavelink::transport::{ConnectionState, ScopedEvent, Transport};

/// In-memory transport that records interactions and lets tests inject
/// server events.
pub struct MockTransport {
    pub opened: Arc<Mutex<Vec<SessionId>>>,
    pub sent: Arc<Mutex<Vec<ClientFrame>>>,
    pub closes: Arc<Mutex<u32>>,
    pub reconnects: Arc<Mutex<u32>>,
    events_tx: mpsc::UnboundedSender<ScopedEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ScopedEvent>>,
    state: ConnectionState,
}

/// Recorder handles that stay usable after the transport moves into the
/// orchestrator.
#[derive(Clone)]
pub struct TransportProbe {
    pub opened: Arc<Mutex<Vec<SessionId>>>,
    pub sent: Arc<Mutex<Vec<ClientFrame>>>,
    pub closes: Arc<Mutex<u32>>,
    pub reconnects: Arc<Mutex<u32>>,
    pub events: mpsc::UnboundedSender<ScopedEvent>,
}

impl MockTransport {
    pub fn new() -> (Self, TransportProbe) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = Self {
            opened: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(0)),
            reconnects: Arc::new(Mutex::new(0)),
            events_tx,
            events_rx: Some(events_rx),
            state: ConnectionState::Disconnected,
        };
        let probe = TransportProbe {
            opened: Arc::clone(&transport.opened),
            sent: Arc::clone(&transport.sent),
            closes: Arc::clone(&transport.closes),
            reconnects: Arc::clone(&transport.reconnects),
            events: transport.events_tx.clone(),
        };
        (transport, probe)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self, id: &SessionId) -> Result<()> {
        self.opened.lock().unwrap().push(id.clone());
        self.state = ConnectionState::Connected;
        Ok(())
    }

    async fn close(&mut self) {
        *self.closes.lock().unwrap() += 1;
        self.state = ConnectionState::Disconnected;
    }

    fn send(&self, frame: ClientFrame) {
        self.sent.lock().unwrap().push(frame);
    }

    async fn reconnect(&mut self) -> Result<()> {
        *self.reconnects.lock().unwrap() += 1;
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn events(&mut self) -> Option<mpsc::UnboundedReceiver<ScopedEvent>> {
        self.events_rx.take()
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl TransportProbe {
    pub fn sent_frames(&self) -> Vec<ClientFrame> {
        self.sent.lock().unwrap().clone()
    }

    pub fn opened_sessions(&self) -> Vec<SessionId> {
        self.opened.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> u32 {
        *self.closes.lock().unwrap()
    }

    pub fn reconnect_count(&self) -> u32 {
        *self.reconnects.lock().unwrap()
    }
}
