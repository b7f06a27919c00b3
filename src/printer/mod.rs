//! # Printer Module
//!
//! This module provides printer-specific configurations and identifiers.
//!
//! ## Modules
//!
//! - [`config`]: Printer hardware specifications, BLE identifiers, board profiles

pub mod config;

pub use config::{
    DeviceProfile, PRINTER_CHARACTERISTIC_UUID, PRINTER_DEVICE_NAME, PRINTER_SERVICE_UUID,
    PrinterConfig,
};
