//! # miniprint - Photo Printing for BLE Mini Thermal Printers
//!
//! miniprint turns photos into the byte stream a 384-dot BLE thermal printer
//! understands, and manages the Bluetooth link that carries it. It provides:
//!
//! - **Rendering**: error-diffusion dithering (Floyd-Steinberg, Stucki) with
//!   an edge-preserving text mode
//! - **Protocol**: MSB-first row packing, density/start-print frames and the
//!   4-byte status frame decoder
//! - **Transfer**: chunked streaming with acknowledged or paced writes
//! - **Link**: scan, connect, service discovery and liveness watchdog, driven
//!   by a single session task
//!
//! ## Quick Start
//!
//! ```no_run
//! use miniprint::{
//!     PrintJob, SessionConfig,
//!     link::{LinkState, Session},
//!     protocol::commands::Density,
//!     render::photo,
//!     transport::{self, MockTransport},
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), miniprint::MiniPrintError> {
//! // Any BLE stack implementing `Transport` works here
//! let (tx, rx) = transport::event_channel();
//! let session = Session::spawn(MockTransport::new(tx), rx, SessionConfig::default())?;
//!
//! session.start_scan().await?;
//! // ... pick a device from session.scan().devices
//! session.connect("printer-id").await?;
//!
//! let mut state = session.subscribe_state();
//! state.wait_for(|s| *s == LinkState::Ready).await.ok();
//!
//! let bitmap = photo::load_fitted("photo.jpg".as_ref(), 384)?;
//! let report = session
//!     .print(PrintJob::new(bitmap).density(Density::High))
//!     .await?;
//! println!("sent {} bytes", report.bytes);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`render`] | Photo fitting and dithering |
//! | [`protocol`] | Wire format: rows, commands, status frames |
//! | [`job`] | Print jobs and payload framing |
//! | [`transfer`] | Chunking and write scheduling |
//! | [`link`] | Link state machine and session task |
//! | [`transport`] | BLE stack seam and mock transport |
//! | [`printer`] | Printer hardware constants |
//! | [`config`] | Session configuration |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Generic "Mini-Printer" BLE thermal printers with a 384-dot (48 mm, 203 DPI)
//! head, service `FFE0` and characteristic `FFE1`, on either the STM32 or the
//! ESP32 controller board.

pub mod config;
pub mod error;
pub mod job;
pub mod link;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod transfer;
pub mod transport;

// Re-exports for convenience
pub use config::SessionConfig;
pub use error::MiniPrintError;
pub use job::PrintJob;
pub use printer::PrinterConfig;
