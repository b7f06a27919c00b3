//! # Error Types
//!
//! This module defines error types used throughout the miniprint library.
//!
//! Image and codec failures come back as plain `Result`s. Link failures are
//! also reported as state changes on the session (see [`crate::link`]), and
//! every fatal condition maps to exactly one [`Severity`] so a UI can pick
//! between a warning and an error message.

use thiserror::Error;

/// How a UI collaborator should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Main error type for miniprint operations
#[derive(Debug, Error)]
pub enum MiniPrintError {
    /// The Bluetooth radio is powered down
    #[error("Bluetooth is turned off")]
    RadioOff,

    /// A print was requested while the link is not Ready
    #[error("Printer is not connected")]
    NotConnected,

    /// The printer reported that it is out of paper
    #[error("Printer is out of paper")]
    NoPaper,

    /// Another scan or transfer is already in progress
    #[error("Session busy: {0}")]
    Busy(String),

    /// The link did not become usable within the watchdog window
    #[error("Connection timed out")]
    ConnectTimeout,

    /// Service or characteristic negotiation failed
    #[error("Service discovery failed: {0}")]
    ServiceDiscovery(String),

    /// No data frame arrived within the liveness window
    #[error("Printer stopped responding")]
    LivenessTimeout,

    /// The link dropped in the middle of a transfer
    #[error("Transfer interrupted: {0}")]
    TransferInterrupted(String),

    /// Transport-level errors (connection, writes)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Invalid command or parameter
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MiniPrintError {
    /// Notification category for this error.
    ///
    /// Preconditions the user can fix on the spot (load paper, connect first,
    /// wait for the current job) are warnings; everything else is an error.
    pub fn severity(&self) -> Severity {
        match self {
            MiniPrintError::NotConnected | MiniPrintError::NoPaper | MiniPrintError::Busy(_) => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl From<image::ImageError> for MiniPrintError {
    fn from(e: image::ImageError) -> Self {
        MiniPrintError::Image(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors_are_warnings() {
        assert_eq!(MiniPrintError::NoPaper.severity(), Severity::Warning);
        assert_eq!(MiniPrintError::NotConnected.severity(), Severity::Warning);
        assert_eq!(
            MiniPrintError::Busy("transfer".into()).severity(),
            Severity::Warning
        );
    }

    #[test]
    fn test_link_errors_are_errors() {
        assert_eq!(MiniPrintError::RadioOff.severity(), Severity::Error);
        assert_eq!(MiniPrintError::LivenessTimeout.severity(), Severity::Error);
        assert_eq!(MiniPrintError::ConnectTimeout.severity(), Severity::Error);
        assert_eq!(
            MiniPrintError::TransferInterrupted("gone".into()).severity(),
            Severity::Error
        );
    }
}
