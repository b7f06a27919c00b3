//! # Mini Printer Protocol
//!
//! This module provides the byte-level encoding the printer controller
//! understands.
//!
//! ## Module Structure
//!
//! - [`commands`]: Density and start-print control frames
//! - [`raster`]: 1-bit row packing of dithered bitmaps
//! - [`status`]: Decoding of the status frames the printer pushes back
//!
//! ## Usage Example
//!
//! ```
//! use miniprint::protocol::{commands::{self, Density}, raster};
//! use miniprint::render::dither::Bitmap;
//!
//! # fn main() -> Result<(), miniprint::MiniPrintError> {
//! let mono = Bitmap::filled(384, 2, 255)?;
//!
//! let mut data = Vec::new();
//! data.extend(commands::density(Density::Medium));
//! for row in raster::to_rows(&mono) {
//!     data.extend(row.as_bytes());
//! }
//! data.extend(commands::start_print());
//!
//! assert_eq!(data.len(), 5 + 2 * 48 + 5);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod raster;
pub mod status;
