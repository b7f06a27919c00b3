//! # Mock Transport
//!
//! An in-memory [`Transport`] that records every request and can play the
//! peer's side of the handshake automatically.
//!
//! The transport is moved into the session, so all state lives behind an
//! `Arc<Mutex<_>>`; keep a [`MockTransport::clone`] around to inspect calls and
//! to inject events.
//!
//! ```
//! use miniprint::transport::{self, MockTransport, Transport, WriteMode};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), miniprint::MiniPrintError> {
//! let (tx, _rx) = transport::event_channel();
//! let mock = MockTransport::new(tx);
//! let mut t = mock.clone();
//!
//! t.write_value(&[1, 2, 3], WriteMode::WithoutResponse).await?;
//! assert_eq!(mock.written_bytes(), vec![1, 2, 3]);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Advertisement, DeviceId, EventSender, Transport, TransportEvent, WriteMode};
use crate::error::MiniPrintError;

/// Default ATT payload for a 23-byte MTU
pub const DEFAULT_MAX_WRITE_LEN: usize = 20;

/// A request the session made.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Disconnect(DeviceId),
    DiscoverService(Uuid),
    DiscoverCharacteristic(Uuid, Uuid),
    Subscribe(Uuid),
    Write(Vec<u8>, WriteMode),
}

#[derive(Debug)]
struct MockState {
    powered_on: bool,
    auto_handshake: bool,
    auto_ack: bool,
    max_write_len: usize,
    fail_write_at: Option<usize>,
    fail_scan_at: Option<usize>,
    fail_connect: bool,
    writes: usize,
    scans: usize,
    calls: Vec<MockCall>,
}

/// Recording transport. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    events: EventSender,
}

impl MockTransport {
    /// Powered on, auto handshake and auto acknowledgement enabled.
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                powered_on: true,
                auto_handshake: true,
                auto_ack: true,
                max_write_len: DEFAULT_MAX_WRITE_LEN,
                fail_write_at: None,
                fail_scan_at: None,
                fail_connect: false,
                writes: 0,
                scans: 0,
                calls: Vec::new(),
            })),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread is the only way to poison this
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_powered_on(&self, on: bool) {
        self.lock().powered_on = on;
    }

    /// Answer connect/discover/subscribe requests with the matching events.
    pub fn set_auto_handshake(&self, enabled: bool) {
        self.lock().auto_handshake = enabled;
    }

    /// Answer every acknowledged write with `WriteComplete(Ok)`.
    pub fn set_auto_ack(&self, enabled: bool) {
        self.lock().auto_ack = enabled;
    }

    pub fn set_max_write_len(&self, len: usize) {
        self.lock().max_write_len = len;
    }

    /// Make the `n`th write (0-based) return an error.
    pub fn fail_write_at(&self, n: usize) {
        self.lock().fail_write_at = Some(n);
    }

    /// Make the `n`th scan request (0-based) return an error.
    pub fn fail_scan_at(&self, n: usize) {
        self.lock().fail_scan_at = Some(n);
    }

    /// Reject every connect request.
    pub fn set_fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Push an event as if the stack had produced it.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Shorthand for a discovered advertisement.
    pub fn advertise(&self, id: &str, name: Option<&str>, rssi: i16) {
        self.emit(TransportEvent::Discovered(Advertisement {
            id: id.to_string(),
            name: name.map(str::to_string),
            rssi,
        }));
    }

    /// Shorthand for an inbound notification.
    pub fn notify(&self, frame: &[u8]) {
        self.emit(TransportEvent::ValueUpdate(frame.to_vec()));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Every chunk written, in order.
    pub fn writes(&self) -> Vec<(Vec<u8>, WriteMode)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Write(data, mode) => Some((data.clone(), *mode)),
                _ => None,
            })
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// All written chunks concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().into_iter().flat_map(|(data, _)| data).collect()
    }

    fn record(&self, call: MockCall) -> bool {
        let mut state = self.lock();
        state.calls.push(call);
        state.auto_handshake
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_powered_on(&self) -> bool {
        self.lock().powered_on
    }

    async fn start_scan(&mut self) -> Result<(), MiniPrintError> {
        let (index, fail) = {
            let mut state = self.lock();
            state.calls.push(MockCall::StartScan);
            let index = state.scans;
            state.scans += 1;
            (index, state.fail_scan_at == Some(index))
        };
        if fail {
            return Err(MiniPrintError::Transport(format!("scan {} rejected", index)));
        }
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), MiniPrintError> {
        self.record(MockCall::StopScan);
        Ok(())
    }

    async fn connect(&mut self, id: &DeviceId) -> Result<(), MiniPrintError> {
        if self.lock().fail_connect {
            self.record(MockCall::Connect(id.clone()));
            return Err(MiniPrintError::Transport(format!("{} unreachable", id)));
        }
        if self.record(MockCall::Connect(id.clone())) {
            self.emit(TransportEvent::Connected(id.clone()));
        }
        Ok(())
    }

    async fn disconnect(&mut self, id: &DeviceId) -> Result<(), MiniPrintError> {
        self.record(MockCall::Disconnect(id.clone()));
        Ok(())
    }

    async fn discover_service(&mut self, service: Uuid) -> Result<(), MiniPrintError> {
        if self.record(MockCall::DiscoverService(service)) {
            self.emit(TransportEvent::ServiceFound(service));
        }
        Ok(())
    }

    async fn discover_characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<(), MiniPrintError> {
        if self.record(MockCall::DiscoverCharacteristic(service, characteristic)) {
            self.emit(TransportEvent::CharacteristicFound(characteristic));
        }
        Ok(())
    }

    async fn subscribe(&mut self, characteristic: Uuid) -> Result<(), MiniPrintError> {
        self.record(MockCall::Subscribe(characteristic));
        Ok(())
    }

    async fn write_value(&mut self, data: &[u8], mode: WriteMode) -> Result<(), MiniPrintError> {
        let auto_ack = {
            let mut state = self.lock();
            let index = state.writes;
            if state.fail_write_at == Some(index) {
                return Err(MiniPrintError::Transport(format!("write {} rejected", index)));
            }
            if data.len() > state.max_write_len {
                return Err(MiniPrintError::Transport(format!(
                    "write of {} bytes exceeds {}",
                    data.len(),
                    state.max_write_len
                )));
            }
            state.writes += 1;
            state.calls.push(MockCall::Write(data.to_vec(), mode));
            state.auto_ack
        };

        if auto_ack && mode == WriteMode::WithResponse {
            self.emit(TransportEvent::WriteComplete(Ok(())));
        }
        Ok(())
    }

    fn max_write_len(&self, _mode: WriteMode) -> usize {
        self.lock().max_write_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::event_channel;

    #[tokio::test]
    async fn test_handshake_events() {
        let (tx, mut rx) = event_channel();
        let mut mock = MockTransport::new(tx);
        let service = Uuid::from_u128(1);

        mock.connect(&"dev".to_string()).await.unwrap();
        mock.discover_service(service).await.unwrap();

        assert_eq!(rx.recv().await, Some(TransportEvent::Connected("dev".into())));
        assert_eq!(rx.recv().await, Some(TransportEvent::ServiceFound(service)));
    }

    #[tokio::test]
    async fn test_ack_only_with_response() {
        let (tx, mut rx) = event_channel();
        let mut mock = MockTransport::new(tx);

        mock.write_value(&[1], WriteMode::WithoutResponse).await.unwrap();
        mock.write_value(&[2], WriteMode::WithResponse).await.unwrap();

        assert_eq!(rx.recv().await, Some(TransportEvent::WriteComplete(Ok(()))));
        assert!(rx.try_recv().is_err());
        assert_eq!(mock.write_count(), 2);
    }

    #[tokio::test]
    async fn test_oversized_write_rejected() {
        let (tx, _rx) = event_channel();
        let mut mock = MockTransport::new(tx);
        mock.set_max_write_len(4);

        assert!(mock.write_value(&[0; 5], WriteMode::WithoutResponse).await.is_err());
        assert_eq!(mock.write_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_write_failure() {
        let (tx, _rx) = event_channel();
        let mut mock = MockTransport::new(tx);
        mock.fail_write_at(1);

        assert!(mock.write_value(&[0], WriteMode::WithoutResponse).await.is_ok());
        assert!(mock.write_value(&[0], WriteMode::WithoutResponse).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_scan_failure() {
        let (tx, _rx) = event_channel();
        let mut mock = MockTransport::new(tx);
        mock.fail_scan_at(1);

        assert!(mock.start_scan().await.is_ok());
        assert!(mock.start_scan().await.is_err());
        assert!(mock.start_scan().await.is_ok());
        assert_eq!(mock.calls(), vec![MockCall::StartScan; 3]);
    }
}
