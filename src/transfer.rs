//! # Transfer Scheduling
//!
//! Streams a job's payloads to the printer in chunks the link can carry.
//!
//! ## Chunking
//!
//! Payloads are split into chunks no longer than the link's write limit.
//! Chunks never straddle two payloads; the printer's decoder is
//! stream-oriented so this only keeps the plan easy to reason about. Global
//! byte order is always preserved.
//!
//! ```text
//! payloads:  [A5 A5 A5 A5 02] [48-byte row] [48-byte row] ... [A6 A6 A6 A6 01]
//! max = 20:  [5] [20][20][8] [20][20][8] ... [5]
//! ```
//!
//! ## Delivery Modes
//!
//! | Mode | Write | Next chunk after | Done after |
//! |------|-------|------------------|------------|
//! | Acknowledged | with response | the peer's ack | last ack |
//! | Paced | without response | a fixed gap (10ms) | last write returns |
//!
//! Pacing is a crude substitute for backpressure: the controller's receive
//! buffer is small and unacknowledged writes overrun it if sent back-to-back.
//!
//! ## Failure
//!
//! There is no per-chunk retry. If the link drops mid-job the whole job fails
//! with [`MiniPrintError::TransferInterrupted`] and must be resubmitted.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::MiniPrintError;
use crate::link::LinkState;
use crate::protocol::status::PrinterStatus;
use crate::transport::WriteMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Wait for the peer to confirm each write
    Acknowledged,
    /// Write back-to-back with a minimum gap
    #[default]
    Paced,
}

impl TransferMode {
    /// The one-time-print (compatibility) flag asks for confirmed writes.
    pub fn from_one_time_print(one_time_print: bool) -> Self {
        if one_time_print {
            TransferMode::Acknowledged
        } else {
            TransferMode::Paced
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        match self {
            TransferMode::Acknowledged => WriteMode::WithResponse,
            TransferMode::Paced => WriteMode::WithoutResponse,
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Acknowledged => write!(f, "acknowledged"),
            TransferMode::Paced => write!(f, "paced"),
        }
    }
}

/// Ordered chunk queue for one job.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    chunks: VecDeque<Vec<u8>>,
    total_chunks: usize,
    total_bytes: usize,
}

impl TransferPlan {
    /// Split `payloads` into chunks of at most `max_chunk_len` bytes.
    ///
    /// Empty payloads are skipped.
    ///
    /// ## Example
    ///
    /// ```
    /// use miniprint::transfer::TransferPlan;
    ///
    /// let plan = TransferPlan::new(vec![vec![0; 48], vec![1; 5]], 20)?;
    /// assert_eq!(plan.total_chunks(), 4);
    /// assert_eq!(plan.total_bytes(), 53);
    /// # Ok::<(), miniprint::MiniPrintError>(())
    /// ```
    pub fn new(payloads: Vec<Vec<u8>>, max_chunk_len: usize) -> Result<Self, MiniPrintError> {
        if max_chunk_len == 0 {
            return Err(MiniPrintError::InvalidCommand(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }

        let mut chunks = VecDeque::new();
        let mut total_bytes = 0;
        for payload in payloads {
            total_bytes += payload.len();
            if payload.len() <= max_chunk_len {
                if !payload.is_empty() {
                    chunks.push_back(payload);
                }
            } else {
                chunks.extend(payload.chunks(max_chunk_len).map(<[u8]>::to_vec));
            }
        }

        Ok(Self {
            total_chunks: chunks.len(),
            chunks,
            total_bytes,
        })
    }

    #[inline]
    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Chunks not yet handed out.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(Vec::as_slice)
    }

    fn pop(&mut self) -> Option<Vec<u8>> {
        self.chunks.pop_front()
    }
}

/// Refuse to start a transfer the printer can't take.
///
/// Checked before any byte is written; a refusal changes no state.
pub fn check_preconditions(state: LinkState, status: &PrinterStatus) -> Result<(), MiniPrintError> {
    if state != LinkState::Ready {
        return Err(MiniPrintError::NotConnected);
    }
    if !status.paper_ok() {
        return Err(MiniPrintError::NoPaper);
    }
    Ok(())
}

/// Summary of a finished transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub chunks: usize,
    pub bytes: usize,
    pub mode: TransferMode,
    pub elapsed: Duration,
}

/// Where a transfer's outcome is delivered.
pub(crate) type ReplySender = oneshot::Sender<Result<TransferReport, MiniPrintError>>;

/// What the session should do next for the active transfer.
#[derive(Debug, PartialEq)]
pub(crate) enum Step {
    /// Write this chunk now
    Write(Vec<u8>),
    /// Nothing to do until an ack arrives or the pacing gap passes
    Wait,
    /// Every chunk is delivered
    Done,
}

/// A transfer in flight, owned and driven by the session actor.
pub(crate) struct ActiveTransfer {
    plan: TransferPlan,
    mode: TransferMode,
    pacing: Duration,
    sent_chunks: usize,
    sent_bytes: usize,
    awaiting_ack: bool,
    next_write_at: Option<Instant>,
    started: Instant,
    reply: ReplySender,
}

impl ActiveTransfer {
    pub(crate) fn new(
        plan: TransferPlan,
        mode: TransferMode,
        pacing: Duration,
        reply: ReplySender,
    ) -> Self {
        Self {
            plan,
            mode,
            pacing,
            sent_chunks: 0,
            sent_bytes: 0,
            awaiting_ack: false,
            next_write_at: None,
            started: Instant::now(),
            reply,
        }
    }

    pub(crate) fn mode(&self) -> TransferMode {
        self.mode
    }

    pub(crate) fn total_chunks(&self) -> usize {
        self.plan.total_chunks()
    }

    pub(crate) fn sent_chunks(&self) -> usize {
        self.sent_chunks
    }

    /// True between an acknowledged write and its ack.
    pub(crate) fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// When the paced scheduler may write again, if it is waiting on the clock.
    pub(crate) fn pacing_deadline(&self) -> Option<Instant> {
        match self.mode {
            TransferMode::Paced if self.plan.remaining() > 0 => self.next_write_at,
            _ => None,
        }
    }

    pub(crate) fn next_step(&mut self, now: Instant) -> Step {
        if self.awaiting_ack {
            return Step::Wait;
        }
        if self.plan.remaining() == 0 {
            return Step::Done;
        }
        if self.next_write_at.is_some_and(|at| now < at) {
            return Step::Wait;
        }
        match self.plan.pop() {
            Some(chunk) => Step::Write(chunk),
            None => Step::Done,
        }
    }

    /// Record a chunk the transport accepted.
    pub(crate) fn on_written(&mut self, len: usize, now: Instant) {
        self.sent_chunks += 1;
        self.sent_bytes += len;
        match self.mode {
            TransferMode::Acknowledged => self.awaiting_ack = true,
            TransferMode::Paced => self.next_write_at = Some(now + self.pacing),
        }
    }

    /// Returns false if no ack was expected.
    pub(crate) fn on_ack(&mut self) -> bool {
        std::mem::replace(&mut self.awaiting_ack, false)
    }

    /// Report the outcome. Consumes the transfer, so it happens exactly once.
    pub(crate) fn finish(self, result: Result<(), MiniPrintError>) -> Option<TransferReport> {
        let outcome = result.map(|()| TransferReport {
            chunks: self.sent_chunks,
            bytes: self.sent_bytes,
            mode: self.mode,
            elapsed: self.started.elapsed(),
        });
        let report = outcome.as_ref().ok().cloned();
        // The caller may have stopped waiting
        let _ = self.reply.send(outcome);
        report
    }
}

// ============================================================================
// TESTS
// ============================================================================
