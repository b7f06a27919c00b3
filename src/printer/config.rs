//! # Printer Configuration
//!
//! This module defines hardware specifications for the supported mini thermal
//! printers and the BLE identifiers their controller boards expose.
//!
//! ## Supported Printers
//!
//! | Model | Width (dots) | Resolution | Controller |
//! |-------|--------------|------------|------------|
//! | Mini 58mm | 384 | 203 DPI | ESP32 or STM32 + BLE module |
//!
//! ## Usage
//!
//! ```
//! use miniprint::printer::PrinterConfig;
//!
//! let config = PrinterConfig::MINI_384;
//! println!("Print width: {} dots ({} bytes)",
//!          config.width_dots,
//!          config.width_bytes);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::MiniPrintError;

/// GATT service exposed by the printer controller.
pub const PRINTER_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000ffe0_0000_1000_8000_00805f9b34fb);

/// Characteristic used both for image writes and status notifications.
pub const PRINTER_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000ffe1_0000_1000_8000_00805f9b34fb);

/// Advertised name of the printer. Used only for ranking scan results.
pub const PRINTER_DEVICE_NAME: &str = "Mini-Printer";

/// # Printer Configuration
///
/// Defines the hardware characteristics of a thermal printer.
///
/// ## Calculations
///
/// ```text
/// dots_per_mm = dpi / 25.4
/// width_mm = width_dots / dots_per_mm
///
/// For the 384-dot head:
///   dots_per_mm = 203 / 25.4 ≈ 8
///   width_mm = 384 / 8 = 48mm
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Print head width in dots (pixels)
    pub width_dots: u16,

    /// Print width in bytes (width_dots / 8)
    pub width_bytes: u16,

    /// Resolution in dots per inch
    pub dpi: u16,
}

impl PrinterConfig {
    /// # 58mm mini printer, 384-dot head
    ///
    /// ```text
    /// ├── 5mm ──┼──── 48mm printable ────┼── 5mm ──┤
    /// │ margin  │       384 dots         │ margin  │
    /// ```
    pub const MINI_384: Self = Self {
        name: "Mini 58mm",
        width_dots: 384,
        width_bytes: 48,
        dpi: 203,
    };

    /// Calculate dots per millimeter
    ///
    /// ## Example
    ///
    /// ```
    /// use miniprint::printer::PrinterConfig;
    ///
    /// let config = PrinterConfig::MINI_384;
    /// assert!((config.dots_per_mm() - 8.0).abs() < 0.1);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Calculate print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width_dots as f32 / self.dots_per_mm()
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::MINI_384
    }
}

/// Controller board inside the printer.
///
/// Both boards speak the same byte protocol. They differ in how much data a
/// single BLE write may carry before the module starts dropping bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    /// STM32 with an HM-10 style serial module (20-byte ATT payload)
    Stm32,
    /// ESP32 with native BLE (negotiated MTU)
    #[default]
    Esp32,
}

impl DeviceProfile {
    /// Upper bound on one write, applied on top of what the transport reports.
    pub fn max_chunk_len(&self) -> usize {
        match self {
            DeviceProfile::Stm32 => 20,
            DeviceProfile::Esp32 => 512,
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Stm32 => write!(f, "STM32"),
            DeviceProfile::Esp32 => write!(f, "ESP32"),
        }
    }
}

impl FromStr for DeviceProfile {
    type Err = MiniPrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stm32" => Ok(DeviceProfile::Stm32),
            "esp32" => Ok(DeviceProfile::Esp32),
            other => Err(MiniPrintError::Config(format!(
                "unknown device profile '{}'",
                other
            ))),
        }
    }
}
