//! # Status Telemetry
//!
//! The printer pushes a status frame over the notify characteristic whenever
//! anything changes, and periodically while idle.
//!
//! ## Frame Layout
//!
//! ```text
//! offset  0        1            2           3          4..
//!       ┌────────┬────────────┬───────────┬──────────┬─────────┐
//!       │battery │temperature │paper flag │work flag │ ignored │
//!       │ 0..100 │ raw byte   │ 0 = empty │ raw byte │         │
//!       └────────┴────────────┴───────────┴──────────┴─────────┘
//! ```
//!
//! A frame that decodes is also proof the link is alive, so a fresh status
//! always reports the connection as good and the working indicator as
//! blinking (the printer just talked to us).
//!
//! Decoding is side-effect free. Callers keep the last good [`PrinterStatus`]
//! and simply drop frames that fail.

use thiserror::Error;

/// Minimum frame length
pub const STATUS_FRAME_LEN: usize = 4;

/// Why a status frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("status frame too short")]
    InsufficientData,

    #[error("status frame out of range")]
    InvalidData,
}

/// Four-valued indicator shown next to each status item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Good,
    Warning,
    Error,
    /// Good, but something just happened
    Blinking,
}

/// Latest known printer health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterStatus {
    pub connection: Indicator,
    pub working: Indicator,
    pub paper: Indicator,
    /// Battery charge, percent
    pub battery: u8,
    /// Head temperature, raw device units
    pub temperature: u8,
    /// Raw work flag byte
    pub work_flag: u8,
}

impl PrinterStatus {
    /// Decode a status frame.
    ///
    /// ## Example
    ///
    /// ```
    /// use miniprint::protocol::status::{PrinterStatus, StatusError};
    ///
    /// let status = PrinterStatus::decode(&[50, 30, 1, 0]).unwrap();
    /// assert_eq!(status.battery, 50);
    /// assert!(status.paper_ok());
    ///
    /// assert_eq!(PrinterStatus::decode(&[1, 2]), Err(StatusError::InsufficientData));
    /// ```
    pub fn decode(frame: &[u8]) -> Result<Self, StatusError> {
        if frame.len() < STATUS_FRAME_LEN {
            return Err(StatusError::InsufficientData);
        }
        let battery = frame[0];
        if battery > 100 {
            return Err(StatusError::InvalidData);
        }

        Ok(Self {
            connection: Indicator::Good,
            working: Indicator::Blinking,
            paper: if frame[2] != 0 {
                Indicator::Good
            } else {
                Indicator::Error
            },
            battery,
            temperature: frame[1],
            work_flag: frame[3],
        })
    }

    /// Status to show while no printer is connected.
    pub fn disconnected() -> Self {
        Self {
            connection: Indicator::Error,
            working: Indicator::Warning,
            paper: Indicator::Warning,
            battery: 0,
            temperature: 0,
            work_flag: 0,
        }
    }

    #[inline]
    pub fn paper_ok(&self) -> bool {
        self.paper == Indicator::Good
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection != Indicator::Error
    }

    /// Printer reports it is busy with a job.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.work_flag != 0
    }
}

impl Default for PrinterStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}
