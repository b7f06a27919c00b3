//! # Session Configuration
//!
//! Everything a session needs to know that isn't hardware-fixed. All fields
//! have defaults, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "device_name": "Mini-Printer",
//!   "profile": "stm32",
//!   "transfer_mode": "paced",
//!   "algorithm": "stucki",
//!   "threshold": 110
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::MiniPrintError;
use crate::job::PrintJob;
use crate::printer::{
    DeviceProfile, PRINTER_CHARACTERISTIC_UUID, PRINTER_DEVICE_NAME, PRINTER_SERVICE_UUID,
};
use crate::render::dither::{Bitmap, DEFAULT_THRESHOLD, DitherAlgorithm};
use crate::transfer::TransferMode;

/// Length of one discovery window, seconds
pub const DEFAULT_SCAN_WINDOW_SECS: u8 = 5;

/// Silence allowed before a link is declared dead, seconds
pub const DEFAULT_WATCHDOG_SECS: u64 = 15;

/// Gap between unacknowledged writes, milliseconds
pub const DEFAULT_PACING_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// GATT service to negotiate
    pub service_uuid: Uuid,
    /// Characteristic for writes and status notifications
    pub characteristic_uuid: Uuid,
    /// Scan results with exactly this name are pinned to the top
    pub device_name: String,
    pub scan_window_secs: u8,
    pub watchdog_secs: u64,
    pub pacing_ms: u64,
    pub profile: DeviceProfile,
    /// Used when a job doesn't ask for acknowledged writes
    pub transfer_mode: TransferMode,
    pub algorithm: DitherAlgorithm,
    pub threshold: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_uuid: PRINTER_SERVICE_UUID,
            characteristic_uuid: PRINTER_CHARACTERISTIC_UUID,
            device_name: PRINTER_DEVICE_NAME.to_string(),
            scan_window_secs: DEFAULT_SCAN_WINDOW_SECS,
            watchdog_secs: DEFAULT_WATCHDOG_SECS,
            pacing_ms: DEFAULT_PACING_MS,
            profile: DeviceProfile::default(),
            transfer_mode: TransferMode::default(),
            algorithm: DitherAlgorithm::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, MiniPrintError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MiniPrintError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), MiniPrintError> {
        if self.scan_window_secs == 0 {
            return Err(MiniPrintError::Config(
                "scan_window_secs must be at least 1".to_string(),
            ));
        }
        if self.watchdog_secs == 0 {
            return Err(MiniPrintError::Config(
                "watchdog_secs must be at least 1".to_string(),
            ));
        }
        if self.pacing_ms == 0 {
            return Err(MiniPrintError::Config(
                "pacing_ms must be at least 1".to_string(),
            ));
        }
        if self.service_uuid == self.characteristic_uuid {
            return Err(MiniPrintError::Config(
                "service and characteristic UUIDs must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn watchdog_window(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// A print job carrying this config's dithering and transfer defaults.
    pub fn job(&self, bitmap: Bitmap) -> PrintJob {
        PrintJob::new(bitmap)
            .algorithm(self.algorithm)
            .threshold(self.threshold)
            .one_time_print(self.transfer_mode == TransferMode::Acknowledged)
    }
}
