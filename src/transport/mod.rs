//! # Printer Transport Layer
//!
//! This module defines the seam between the session and whatever BLE stack
//! actually talks to the radio.
//!
//! A transport has two halves:
//!
//! - **Requests** go through the [`Transport`] trait (scan, connect, discover,
//!   subscribe, write). They return once the request has been handed to the
//!   stack, not once the peer has answered.
//! - **Answers** arrive later as [`TransportEvent`]s on an unbounded channel
//!   created with [`event_channel`]. The session owns the receiving end.
//!
//! ## Available Transports
//!
//! - [`mock`]: Scriptable in-memory transport for tests and demos
//!
//! Real BLE backends live outside this crate and implement [`Transport`].

pub mod mock;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::MiniPrintError;

pub use mock::{MockCall, MockTransport};

/// Opaque peripheral identity as reported by the BLE stack.
pub type DeviceId = String;

/// Sending half of the transport event channel.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half of the transport event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Create the channel a transport reports its events on.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// GATT write semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The peer acknowledges each write; a [`TransportEvent::WriteComplete`]
    /// follows every call, even one cut short by a disconnect.
    WithResponse,
    /// Fire and forget. No completion event.
    WithoutResponse,
}

/// One advertisement seen while scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    pub id: DeviceId,
    pub name: Option<String>,
    /// Signal strength in dBm. 0 means the stack had no reading.
    pub rssi: i16,
}

/// Asynchronous notifications from the BLE stack.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Discovered(Advertisement),
    Connected(DeviceId),
    Disconnected {
        id: DeviceId,
        reason: Option<String>,
    },
    ServiceFound(Uuid),
    ServiceDiscoveryFailed(String),
    CharacteristicFound(Uuid),
    /// Inbound notification payload from the subscribed characteristic
    ValueUpdate(Vec<u8>),
    /// Acknowledgement of a [`WriteMode::WithResponse`] write
    WriteComplete(Result<(), String>),
}

/// Request half of a BLE stack.
#[async_trait]
pub trait Transport: Send {
    /// Is the radio powered and usable right now?
    fn is_powered_on(&self) -> bool;

    async fn start_scan(&mut self) -> Result<(), MiniPrintError>;

    async fn stop_scan(&mut self) -> Result<(), MiniPrintError>;

    async fn connect(&mut self, id: &DeviceId) -> Result<(), MiniPrintError>;

    async fn disconnect(&mut self, id: &DeviceId) -> Result<(), MiniPrintError>;

    /// Look for `service` on the connected peer. Answered by
    /// [`TransportEvent::ServiceFound`] or [`TransportEvent::ServiceDiscoveryFailed`].
    async fn discover_service(&mut self, service: Uuid) -> Result<(), MiniPrintError>;

    /// Look for `characteristic` under `service`. Answered by
    /// [`TransportEvent::CharacteristicFound`] or [`TransportEvent::ServiceDiscoveryFailed`].
    async fn discover_characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<(), MiniPrintError>;

    /// Enable notifications. Payloads arrive as [`TransportEvent::ValueUpdate`].
    async fn subscribe(&mut self, characteristic: Uuid) -> Result<(), MiniPrintError>;

    /// Write one chunk. `data.len()` never exceeds [`Transport::max_write_len`].
    async fn write_value(&mut self, data: &[u8], mode: WriteMode) -> Result<(), MiniPrintError>;

    /// Largest single write the link accepts in `mode`.
    fn max_write_len(&self, mode: WriteMode) -> usize;
}
