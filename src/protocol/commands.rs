//! # Printer Control Commands
//!
//! The printer controller recognises two control frames in its input stream.
//! Both are a 4-byte preamble followed by a single opcode:
//!
//! | Frame | Bytes | Meaning |
//! |-------|-------|---------|
//! | Density | `A5 A5 A5 A5 n` | Heat level, n = 1 (low), 2 (medium), 3 (high) |
//! | Start print | `A6 A6 A6 A6 01` | Everything received so far is printed |
//!
//! Anything that isn't a control frame is raster data: 48 bytes per dot row.
//! The controller is stream-oriented, so control frames can sit anywhere
//! between rows regardless of how the stream was chunked on the way.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::MiniPrintError;

/// Preamble of the density frame
pub const DENSITY_PREAMBLE: [u8; 4] = [0xA5; 4];

/// Preamble of the start-print frame
pub const START_PRINT_PREAMBLE: [u8; 4] = [0xA6; 4];

/// Opcode following [`START_PRINT_PREAMBLE`]
pub const START_PRINT_OPCODE: u8 = 0x01;

/// Print head heat level.
///
/// Higher density burns darker dots but prints slower and drains the battery
/// faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Low,
    #[default]
    Medium,
    High,
}

impl Density {
    pub fn opcode(&self) -> u8 {
        match self {
            Density::Low => 0x01,
            Density::Medium => 0x02,
            Density::High => 0x03,
        }
    }

    /// Inverse of [`Density::opcode`]. Unrecognized values fall back to Low.
    pub fn from_opcode(op: u8) -> Self {
        match op {
            0x02 => Density::Medium,
            0x03 => Density::High,
            _ => Density::Low,
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Density::Low => write!(f, "low"),
            Density::Medium => write!(f, "medium"),
            Density::High => write!(f, "high"),
        }
    }
}

impl FromStr for Density {
    type Err = MiniPrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Density::Low),
            "medium" => Ok(Density::Medium),
            "high" => Ok(Density::High),
            other => Err(MiniPrintError::InvalidCommand(format!(
                "unknown density '{}'",
                other
            ))),
        }
    }
}

/// # Set Density (A5 A5 A5 A5 n)
///
/// ## Example
///
/// ```
/// use miniprint::protocol::commands::{self, Density};
///
/// assert_eq!(commands::density(Density::High), vec![0xA5, 0xA5, 0xA5, 0xA5, 0x03]);
/// ```
pub fn density(level: Density) -> Vec<u8> {
    let mut frame = DENSITY_PREAMBLE.to_vec();
    frame.push(level.opcode());
    frame
}

/// # Start Print (A6 A6 A6 A6 01)
///
/// Sent after the last raster row of a job.
#[inline]
pub fn start_print() -> Vec<u8> {
    let mut frame = START_PRINT_PREAMBLE.to_vec();
    frame.push(START_PRINT_OPCODE);
    frame
}

// ============================================================================
// TESTS
// ============================================================================
