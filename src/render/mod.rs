//! # Rendering Module
//!
//! This module turns photos into black/white bitmaps for the print head.
//!
//! ## Modules
//!
//! - [`photo`]: Fit a photo to the head width, produce previews
//! - [`dither`]: Floyd-Steinberg and Stucki error diffusion, text mode
//!
//! ## Usage Example
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use miniprint::render::{dither::{self, DitherAlgorithm}, photo};
//!
//! let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(768, 200, Luma([90])));
//! let gray = photo::fit_to_width(&img, 384)?;
//! let mono = dither::dither(&gray, 127, DitherAlgorithm::FloydSteinberg, false);
//!
//! assert_eq!(mono.width(), 384);
//! assert!(mono.is_bilevel());
//! # Ok::<(), miniprint::MiniPrintError>(())
//! ```

pub mod dither;
pub mod photo;
