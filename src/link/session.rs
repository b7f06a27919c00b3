//! # Link Session
//!
//! One task owns everything about a printer link: the transport, the state
//! machine, both timers, the scan results, the latest status and the active
//! transfer. Every change goes through its `select!` loop, so inbound frames,
//! write acks, countdown ticks and watchdog expiry are handled one at a time
//! in the order they happen.
//!
//! Callers talk to it through a cloneable [`SessionHandle`]:
//!
//! - requests (`start_scan`, `connect`, `print`, ...) go in over an mpsc
//!   channel and get answered over a oneshot;
//! - state is read from `watch` snapshots, never shared mutably;
//! - notices and transfer progress are broadcast as [`SessionEvent`]s.
//!
//! ## Example
//!
//! ```
//! use miniprint::{SessionConfig, link::{LinkState, Session}, transport::{self, MockTransport}};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), miniprint::MiniPrintError> {
//! let (tx, rx) = transport::event_channel();
//! let mock = MockTransport::new(tx);
//! let session = Session::spawn(mock.clone(), rx, SessionConfig::default())?;
//!
//! session.start_scan().await?;
//! assert_eq!(session.state(), LinkState::Scanning);
//! # Ok(())
//! # }
//! ```

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;

use super::discovery::{DeviceList, DiscoveredDevice};
use super::state::LinkState;
use super::timer::{self, Countdown, Watchdog};
use crate::config::SessionConfig;
use crate::error::{MiniPrintError, Severity};
use crate::job::PrintJob;
use crate::protocol::status::PrinterStatus;
use crate::transfer::{self, ActiveTransfer, Step, TransferMode, TransferPlan, TransferReport};
use crate::transport::{DeviceId, EventReceiver, Transport, TransportEvent};

const COMMAND_QUEUE: usize = 16;
const EVENT_QUEUE: usize = 64;

/// Scan progress and results, as observers see them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSnapshot {
    pub searching: bool,
    pub remaining_secs: u8,
    /// Ranked, deduplicated
    pub devices: Vec<DiscoveredDevice>,
}

/// Broadcast notifications for UI collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(LinkState),
    /// Something the user should be told about
    Notice {
        severity: Severity,
        message: String,
    },
    TransferProgress {
        sent: usize,
        total: usize,
    },
    TransferCompleted(TransferReport),
    TransferFailed(String),
}

type Reply<T> = oneshot::Sender<Result<T, MiniPrintError>>;

enum Command {
    StartScan(Reply<()>),
    Connect(DeviceId, Reply<()>),
    Disconnect(Reply<()>),
    Print {
        payloads: Vec<Vec<u8>>,
        mode: TransferMode,
        reply: Reply<TransferReport>,
    },
    Shutdown,
}

/// Cheap, cloneable access to a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<LinkState>,
    scan: watch::Receiver<ScanSnapshot>,
    status: watch::Receiver<PrinterStatus>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, MiniPrintError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| MiniPrintError::Transport("session has shut down".to_string()))?;
        rx.await
            .map_err(|_| MiniPrintError::Transport("session dropped the request".to_string()))?
    }

    /// Search for printers for one scan window.
    ///
    /// Clears previous results. Calling again mid-scan does not restart the
    /// countdown.
    pub async fn start_scan(&self) -> Result<(), MiniPrintError> {
        self.request(Command::StartScan).await
    }

    /// Begin connecting. Returns once the attempt has started; watch
    /// [`SessionHandle::subscribe_state`] for the outcome.
    pub async fn connect(&self, id: impl Into<DeviceId>) -> Result<(), MiniPrintError> {
        let id = id.into();
        self.request(|reply| Command::Connect(id, reply)).await
    }

    /// Drop the current link and return to Idle.
    pub async fn disconnect(&self) -> Result<(), MiniPrintError> {
        self.request(Command::Disconnect).await
    }

    /// Render `job` and stream it to the printer.
    ///
    /// Resolves exactly once: after the last chunk is acknowledged (or
    /// flushed, in paced mode), or with the reason the job failed.
    pub async fn print(&self, job: PrintJob) -> Result<TransferReport, MiniPrintError> {
        let mode = job.transfer_mode();
        let payloads = tokio::task::spawn_blocking(move || job.payloads())
            .await
            .map_err(|e| MiniPrintError::Image(format!("render task failed: {}", e)))??;
        self.print_payloads(payloads, mode).await
    }

    /// Stream pre-framed payloads.
    pub async fn print_payloads(
        &self,
        payloads: Vec<Vec<u8>>,
        mode: TransferMode,
    ) -> Result<TransferReport, MiniPrintError> {
        self.request(|reply| Command::Print {
            payloads,
            mode,
            reply,
        })
        .await
    }

    /// Stop the session task. Any transfer in flight fails.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn scan(&self) -> ScanSnapshot {
        self.scan.borrow().clone()
    }

    pub fn status(&self) -> PrinterStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    pub fn subscribe_scan(&self) -> watch::Receiver<ScanSnapshot> {
        self.scan.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PrinterStatus> {
        self.status.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// The session task. Build with [`Session::new`] and drive with
/// [`Session::run`], or use [`Session::spawn`].
pub struct Session<T: Transport> {
    config: SessionConfig,
    transport: T,
    transport_events: EventReceiver,
    transport_closed: bool,
    commands: mpsc::Receiver<Command>,

    state: LinkState,
    peer: Option<DeviceId>,
    characteristic_ready: bool,
    devices: DeviceList,
    countdown: Countdown,
    watchdog: Watchdog,
    status: PrinterStatus,
    transfer: Option<ActiveTransfer>,
    /// Acks still owed for writes of transfers that already ended
    stale_acks: usize,

    state_tx: watch::Sender<LinkState>,
    scan_tx: watch::Sender<ScanSnapshot>,
    status_tx: watch::Sender<PrinterStatus>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl<T: Transport + 'static> Session<T> {
    pub fn new(
        transport: T,
        transport_events: EventReceiver,
        config: SessionConfig,
    ) -> Result<(Self, SessionHandle), MiniPrintError> {
        config.validate()?;

        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (state_tx, state_rx) = watch::channel(LinkState::Idle);
        let (scan_tx, scan_rx) = watch::channel(ScanSnapshot::default());
        let (status_tx, status_rx) = watch::channel(PrinterStatus::disconnected());
        let (events_tx, _) = broadcast::channel(EVENT_QUEUE);

        let handle = SessionHandle {
            commands: commands_tx,
            state: state_rx,
            scan: scan_rx,
            status: status_rx,
            events: events_tx.clone(),
        };

        let session = Self {
            devices: DeviceList::new(config.device_name.clone()),
            watchdog: Watchdog::new(config.watchdog_window()),
            config,
            transport,
            transport_events,
            transport_closed: false,
            commands,
            state: LinkState::Idle,
            peer: None,
            characteristic_ready: false,
            countdown: Countdown::new(),
            status: PrinterStatus::disconnected(),
            transfer: None,
            stale_acks: 0,
            state_tx,
            scan_tx,
            status_tx,
            events_tx,
        };
        Ok((session, handle))
    }

    /// Start the session on the current tokio runtime.
    pub fn spawn(
        transport: T,
        transport_events: EventReceiver,
        config: SessionConfig,
    ) -> Result<SessionHandle, MiniPrintError> {
        let (session, handle) = Self::new(transport, transport_events, config)?;
        tokio::spawn(session.run());
        Ok(handle)
    }

    /// Process commands, transport events and timers until shut down or
    /// every handle is dropped.
    pub async fn run(mut self) {
        info!("session started");
        loop {
            let pacing = self.transfer.as_ref().and_then(ActiveTransfer::pacing_deadline);
            tokio::select! {
                biased;

                event = self.transport_events.recv(), if !self.transport_closed => match event {
                    Some(event) => self.on_transport_event(event).await,
                    None => {
                        warn!("transport event channel closed");
                        self.transport_closed = true;
                        if self.state.is_active() {
                            self.fail_link(
                                LinkState::Failed,
                                &MiniPrintError::Transport("transport went away".to_string()),
                            );
                        }
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command).await,
                },
                _ = self.watchdog.expired() => self.on_watchdog().await,
                _ = self.countdown.tick() => self.on_countdown_tick().await,
                _ = timer::sleep_until(pacing) => self.pump_transfer().await,
            }
        }
        self.teardown().await;
        info!("session stopped");
    }

    // ------------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------------

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn notice(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Warning => warn!("{}", message),
            Severity::Error => warn!("error: {}", message),
        }
        self.emit(SessionEvent::Notice { severity, message });
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state == state {
            return;
        }
        info!("link {} -> {}", self.state, state);
        self.state = state;
        self.state_tx.send_replace(state);
        self.emit(SessionEvent::StateChanged(state));
    }

    fn publish_scan(&self) {
        self.scan_tx.send_replace(ScanSnapshot {
            searching: self.countdown.is_running(),
            remaining_secs: self.countdown.remaining(),
            devices: self.devices.to_vec(),
        });
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status.clone());
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::StartScan(reply) => {
                let result = self.start_scan().await;
                let _ = reply.send(result);
            }
            Command::Connect(id, reply) => {
                let result = self.connect(id).await;
                let _ = reply.send(result);
            }
            Command::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(Ok(()));
            }
            Command::Print {
                payloads,
                mode,
                reply,
            } => self.start_transfer(payloads, mode, reply).await,
            Command::Shutdown => {}
        }
    }

    async fn start_scan(&mut self) -> Result<(), MiniPrintError> {
        if !self.transport.is_powered_on() {
            let err = MiniPrintError::RadioOff;
            self.notice(err.severity(), err.to_string());
            return Err(err);
        }
        if self.state.is_active() {
            return Err(MiniPrintError::Busy(format!("link is {}", self.state)));
        }

        self.devices.clear();
        let opened = self.countdown.start(self.config.scan_window_secs);
        if opened {
            debug!("scan window opened ({}s)", self.config.scan_window_secs);
        }
        if let Err(e) = self.transport.start_scan().await {
            // A window that was already open keeps running and closes itself
            if opened {
                self.countdown.stop();
            }
            if !self.countdown.is_running() && self.state == LinkState::Scanning {
                self.set_state(LinkState::Idle);
            }
            self.publish_scan();
            self.notice(e.severity(), e.to_string());
            return Err(e);
        }
        self.set_state(LinkState::Scanning);
        self.publish_scan();
        Ok(())
    }

    async fn stop_scan(&mut self) {
        self.countdown.stop();
        if let Err(e) = self.transport.stop_scan().await {
            warn!("stop scan failed: {}", e);
        }
        self.publish_scan();
    }

    async fn connect(&mut self, id: DeviceId) -> Result<(), MiniPrintError> {
        if !self.transport.is_powered_on() {
            let err = MiniPrintError::RadioOff;
            self.set_state(LinkState::Failed);
            self.notice(err.severity(), err.to_string());
            return Err(err);
        }

        if self.countdown.is_running() {
            self.stop_scan().await;
        }
        // A new attempt replaces whatever link existed
        if let Some(old) = self.peer.take() {
            self.abort_transfer("connection replaced");
            if let Err(e) = self.transport.disconnect(&old).await {
                warn!("disconnect {} failed: {}", old, e);
            }
        }

        info!("connecting to {}", id);
        self.characteristic_ready = false;
        self.peer = Some(id.clone());
        self.watchdog.arm();
        self.set_state(LinkState::Connecting);

        if let Err(e) = self.transport.connect(&id).await {
            self.drop_peer().await;
            self.fail_link(LinkState::Failed, &e);
            return Err(e);
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(peer) = self.peer.take() {
            info!("disconnecting {}", peer);
            if let Err(e) = self.transport.disconnect(&peer).await {
                warn!("disconnect {} failed: {}", peer, e);
            }
        }
        self.abort_transfer("disconnected");
        self.watchdog.disarm();
        self.characteristic_ready = false;
        self.status = PrinterStatus::disconnected();
        self.publish_status();
        let idle = if self.countdown.is_running() {
            LinkState::Scanning
        } else {
            LinkState::Idle
        };
        self.set_state(idle);
    }

    // ------------------------------------------------------------------------
    // Transport events
    // ------------------------------------------------------------------------

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Discovered(adv) => {
                if !self.countdown.is_running() {
                    return;
                }
                // Unnamed peripherals are never printers
                if adv.name.is_none() {
                    return;
                }
                if self.devices.insert(DiscoveredDevice::from_advertisement(adv)) {
                    self.publish_scan();
                }
            }
            TransportEvent::Connected(id) => {
                if self.state != LinkState::Connecting || self.peer.as_ref() != Some(&id) {
                    debug!("ignoring stale connect from {}", id);
                    return;
                }
                self.set_state(LinkState::ServiceDiscovery);
                let service = self.config.service_uuid;
                if let Err(e) = self.transport.discover_service(service).await {
                    self.fail_discovery(e.to_string()).await;
                }
            }
            TransportEvent::ServiceFound(uuid) => {
                if self.state != LinkState::ServiceDiscovery || uuid != self.config.service_uuid {
                    return;
                }
                let characteristic = self.config.characteristic_uuid;
                if let Err(e) = self
                    .transport
                    .discover_characteristic(uuid, characteristic)
                    .await
                {
                    self.fail_discovery(e.to_string()).await;
                }
            }
            TransportEvent::CharacteristicFound(uuid) => {
                if self.state != LinkState::ServiceDiscovery
                    || uuid != self.config.characteristic_uuid
                {
                    return;
                }
                self.characteristic_ready = true;
                if let Err(e) = self.transport.subscribe(uuid).await {
                    self.fail_discovery(e.to_string()).await;
                }
            }
            TransportEvent::ServiceDiscoveryFailed(reason) => {
                if self.state.is_active() {
                    self.fail_discovery(reason).await;
                }
            }
            TransportEvent::ValueUpdate(frame) => self.on_frame(&frame),
            TransportEvent::Disconnected { id, reason } => {
                if self.peer.as_ref() != Some(&id) {
                    return;
                }
                let reason = reason.unwrap_or_else(|| "peer disconnected".to_string());
                self.peer = None;
                if self.state.is_active() {
                    self.fail_link(LinkState::Failed, &MiniPrintError::Transport(reason));
                }
            }
            TransportEvent::WriteComplete(result) => {
                if self.stale_acks > 0 {
                    self.stale_acks -= 1;
                    debug!("dropping ack for an aborted transfer");
                    return;
                }
                let Some(active) = self.transfer.as_mut() else {
                    return;
                };
                if !active.on_ack() {
                    debug!("unexpected write ack");
                    return;
                }
                match result {
                    Ok(()) => self.pump_transfer().await,
                    Err(reason) => self.finish_transfer(Err(MiniPrintError::TransferInterrupted(reason))),
                }
            }
        }
    }

    fn on_frame(&mut self, frame: &[u8]) {
        let ready_for_data = match self.state {
            LinkState::Ready => true,
            LinkState::ServiceDiscovery => self.characteristic_ready,
            _ => false,
        };
        if !ready_for_data {
            debug!("dropping {}-byte frame in state {}", frame.len(), self.state);
            return;
        }

        match PrinterStatus::decode(frame) {
            Ok(status) => {
                self.watchdog.arm();
                self.status = status;
                self.publish_status();
                self.set_state(LinkState::Ready);
            }
            Err(e) => debug!("dropping status frame {:02X?}: {}", frame, e),
        }
    }

    // ------------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------------

    async fn on_countdown_tick(&mut self) {
        let remaining = self.countdown.on_tick();
        if remaining == 0 {
            debug!("scan window closed with {} devices", self.devices.len());
            if let Err(e) = self.transport.stop_scan().await {
                warn!("stop scan failed: {}", e);
            }
            if self.state == LinkState::Scanning {
                self.set_state(LinkState::Idle);
            }
        }
        self.publish_scan();
    }

    async fn on_watchdog(&mut self) {
        self.watchdog.disarm();
        let err = match self.state {
            LinkState::Ready => MiniPrintError::LivenessTimeout,
            LinkState::Connecting | LinkState::ServiceDiscovery => MiniPrintError::ConnectTimeout,
            _ => return,
        };
        let next = if self.state == LinkState::Ready {
            LinkState::TimedOut
        } else {
            LinkState::Failed
        };

        self.drop_peer().await;
        self.fail_link(next, &err);
    }

    async fn fail_discovery(&mut self, reason: String) {
        self.drop_peer().await;
        self.fail_link(LinkState::Failed, &MiniPrintError::ServiceDiscovery(reason));
    }

    /// Release the peripheral at the BLE level.
    async fn drop_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            if let Err(e) = self.transport.disconnect(&peer).await {
                warn!("disconnect {} failed: {}", peer, e);
            }
        }
    }

    /// Move to a terminal state and tear down link-scoped state.
    fn fail_link(&mut self, next: LinkState, err: &MiniPrintError) {
        self.watchdog.disarm();
        self.characteristic_ready = false;
        self.abort_transfer(&err.to_string());
        self.status = PrinterStatus::disconnected();
        self.publish_status();
        self.set_state(next);
        let message = match next.notice() {
            Some((_, headline)) => format!("{}: {}", headline, err),
            None => err.to_string(),
        };
        self.notice(err.severity(), message);
    }

    // ------------------------------------------------------------------------
    // Transfers
    // ------------------------------------------------------------------------

    async fn start_transfer(
        &mut self,
        payloads: Vec<Vec<u8>>,
        mode: TransferMode,
        reply: transfer::ReplySender,
    ) {
        if self.transfer.is_some() {
            let err = MiniPrintError::Busy("a print job is already running".to_string());
            self.notice(err.severity(), err.to_string());
            let _ = reply.send(Err(err));
            return;
        }
        if let Err(err) = transfer::check_preconditions(self.state, &self.status) {
            self.notice(err.severity(), err.to_string());
            let _ = reply.send(Err(err));
            return;
        }

        let max_len = self
            .transport
            .max_write_len(mode.write_mode())
            .min(self.config.profile.max_chunk_len());
        let plan = match TransferPlan::new(payloads, max_len) {
            Ok(plan) => plan,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        info!(
            "transfer started: {} bytes in {} chunks ({})",
            plan.total_bytes(),
            plan.total_chunks(),
            mode
        );
        self.transfer = Some(ActiveTransfer::new(
            plan,
            mode,
            self.config.pacing_delay(),
            reply,
        ));
        self.emit(SessionEvent::TransferProgress {
            sent: 0,
            total: self.transfer.as_ref().map_or(0, ActiveTransfer::total_chunks),
        });
        self.pump_transfer().await;
    }

    /// Write as many chunks as the current mode allows right now.
    async fn pump_transfer(&mut self) {
        loop {
            let Some(active) = self.transfer.as_mut() else {
                return;
            };
            let mode = active.mode();
            let chunk = match active.next_step(Instant::now()) {
                Step::Wait => return,
                Step::Done => {
                    self.finish_transfer(Ok(()));
                    return;
                }
                Step::Write(chunk) => chunk,
            };

            if let Err(e) = self.transport.write_value(&chunk, mode.write_mode()).await {
                self.finish_transfer(Err(MiniPrintError::TransferInterrupted(e.to_string())));
                return;
            }

            let Some(active) = self.transfer.as_mut() else {
                return;
            };
            active.on_written(chunk.len(), Instant::now());
            let (sent, total) = (active.sent_chunks(), active.total_chunks());
            self.emit(SessionEvent::TransferProgress { sent, total });
        }
    }

    fn finish_transfer(&mut self, result: Result<(), MiniPrintError>) {
        let Some(active) = self.transfer.take() else {
            return;
        };
        match result {
            Ok(()) => {
                if let Some(report) = active.finish(Ok(())) {
                    info!(
                        "transfer complete: {} bytes in {:?}",
                        report.bytes, report.elapsed
                    );
                    self.emit(SessionEvent::TransferCompleted(report));
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!("transfer failed after {} chunks: {}", active.sent_chunks(), message);
                if active.is_awaiting_ack() {
                    self.stale_acks += 1;
                }
                active.finish(Err(err));
                self.emit(SessionEvent::TransferFailed(message));
            }
        }
    }

    fn abort_transfer(&mut self, reason: &str) {
        if self.transfer.is_some() {
            self.finish_transfer(Err(MiniPrintError::TransferInterrupted(reason.to_string())));
        }
    }

    async fn teardown(&mut self) {
        self.countdown.stop();
        self.watchdog.disarm();
        self.abort_transfer("session shut down");
        self.drop_peer().await;
        self.status = PrinterStatus::disconnected();
        self.publish_status();
        self.publish_scan();
        self.set_state(LinkState::Idle);
    }
}
