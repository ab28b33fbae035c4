//! In-memory transport that records every call
//!
//! Used by the executor tests and, through the `testing` feature, by the hub
//! tests. Timestamps come from `tokio::time` so paused-clock tests see the
//! executor's sleeps.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    IsConnected,
    Write { characteristic: Uuid, payload: Vec<u8> },
    Disconnect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectBehavior {
    #[default]
    Connected,
    /// connect succeeds but the link reports it is not connected
    NotConnected,
    Fail,
    /// never resolves
    Hang,
    /// opens the link, then never resolves; dropping the connect releases it
    ConnectedThenHang,
}

#[derive(Default)]
struct State {
    connect: ConnectBehavior,
    connect_latency: Duration,
    fail_write_at: Option<usize>,
    fail_disconnect: bool,
    events: Vec<(Event, Instant)>,
    write_attempts: usize,
    open_links: usize,
    max_open_links: usize,
}

pub struct MockLink {
    connected: bool,
}

/// Link opened inside a connect that has not returned yet
struct HalfOpen {
    transport: MockTransport,
}

impl Drop for HalfOpen {
    fn drop(&mut self) {
        self.transport.record(Event::Disconnect);
        let mut state = self.transport.lock();
        state.open_links = state.open_links.saturating_sub(1);
    }
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_behavior(self, behavior: ConnectBehavior) -> Self {
        self.lock().connect = behavior;
        self
    }

    /// Time `connect` takes before resolving
    pub fn connect_latency(self, latency: Duration) -> Self {
        self.lock().connect_latency = latency;
        self
    }

    /// Fail the write with this zero-based index
    pub fn fail_write_at(self, index: usize) -> Self {
        self.lock().fail_write_at = Some(index);
        self
    }

    pub fn fail_disconnect(self) -> Self {
        self.lock().fail_disconnect = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: Event) {
        self.lock().events.push((event, Instant::now()));
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.iter().map(|(e, _)| e.clone()).collect()
    }

    /// Total number of transport calls of any kind
    pub fn call_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Payloads that were written successfully, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|(e, _)| match e {
                Event::Write { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn write_times(&self) -> Vec<Instant> {
        self.lock()
            .events
            .iter()
            .filter(|(e, _)| matches!(e, Event::Write { .. }))
            .map(|(_, at)| *at)
            .collect()
    }

    /// Writes tried, including the failing one
    pub fn write_attempts(&self) -> usize {
        self.lock().write_attempts
    }

    pub fn connect_count(&self) -> usize {
        self.count(|e| matches!(e, Event::Connect(_)))
    }

    pub fn disconnect_count(&self) -> usize {
        self.count(|e| matches!(e, Event::Disconnect))
    }

    /// Links currently open, half-open connects included
    pub fn open_links(&self) -> usize {
        self.lock().open_links
    }

    /// Highest number of links that were open at the same time
    pub fn max_open_links(&self) -> usize {
        self.lock().max_open_links
    }

    fn open_link(&self) {
        let mut state = self.lock();
        state.open_links += 1;
        state.max_open_links = state.max_open_links.max(state.open_links);
    }

    fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.lock().events.iter().filter(|(e, _)| f(e)).count()
    }
}

impl Transport for MockTransport {
    type Link = MockLink;

    async fn connect(
        &self,
        address: &str,
        _timeout: Duration,
    ) -> Result<MockLink, TransportError> {
        self.record(Event::Connect(address.to_string()));
        let (behavior, latency) = {
            let state = self.lock();
            (state.connect, state.connect_latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let connected = match behavior {
            ConnectBehavior::Connected => true,
            ConnectBehavior::NotConnected => false,
            ConnectBehavior::Fail => {
                return Err(TransportError::PeripheralNotFound(address.to_string()));
            }
            ConnectBehavior::Hang => std::future::pending().await,
            ConnectBehavior::ConnectedThenHang => {
                self.open_link();
                let _half_open = HalfOpen {
                    transport: self.clone(),
                };
                std::future::pending().await
            }
        };

        self.open_link();
        Ok(MockLink { connected })
    }

    async fn is_connected(&self, link: &MockLink) -> Result<bool, TransportError> {
        self.record(Event::IsConnected);
        Ok(link.connected)
    }

    async fn write(
        &self,
        link: &MockLink,
        characteristic: Uuid,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let index = {
            let mut state = self.lock();
            state.write_attempts += 1;
            state.write_attempts - 1
        };

        if !link.connected {
            return Err(TransportError::Other("write on a closed link".to_string()));
        }
        if self.lock().fail_write_at == Some(index) {
            return Err(TransportError::Other(format!("write {index} rejected")));
        }

        self.record(Event::Write {
            characteristic,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn disconnect(&self, _link: MockLink) -> Result<(), TransportError> {
        self.record(Event::Disconnect);
        let mut state = self.lock();
        state.open_links = state.open_links.saturating_sub(1);
        if state.fail_disconnect {
            return Err(TransportError::Other("disconnect failed".to_string()));
        }
        Ok(())
    }
}
