//! # Print Jobs
//!
//! A [`PrintJob`] is a finished gray bitmap plus the knobs a user picks before
//! pressing print. Rendering a job runs the whole image pipeline:
//!
//! ```text
//! Bitmap → dither() → to_rows() → [density, row, row, ..., start_print]
//! ```
//!
//! The result is an ordered list of payloads for the transfer scheduler. The
//! density frame leads so it applies to the whole job.

use crate::error::MiniPrintError;
use crate::printer::PrinterConfig;
use crate::protocol::commands::{self, Density};
use crate::protocol::raster::{self, MonoRow};
use crate::render::dither::{self, Bitmap, DEFAULT_THRESHOLD, DitherAlgorithm};
use crate::transfer::TransferMode;

#[derive(Debug, Clone)]
pub struct PrintJob {
    /// Gray source, already fitted to the head width
    pub bitmap: Bitmap,
    pub density: Density,
    /// Use acknowledged writes for this job (compatibility mode)
    pub one_time_print: bool,
    /// Keep stroke edges sharp while dithering
    pub text_mode: bool,
    pub threshold: u8,
    pub algorithm: DitherAlgorithm,
    pub printer: PrinterConfig,
}

/// Output of [`PrintJob::render`].
#[derive(Debug, Clone)]
pub struct RenderedJob {
    /// Dithered bitmap, useful for previews
    pub mono: Bitmap,
    pub rows: Vec<MonoRow>,
}

impl PrintJob {
    pub fn new(bitmap: Bitmap) -> Self {
        Self {
            bitmap,
            density: Density::default(),
            one_time_print: false,
            text_mode: false,
            threshold: DEFAULT_THRESHOLD,
            algorithm: DitherAlgorithm::default(),
            printer: PrinterConfig::default(),
        }
    }

    pub fn density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    pub fn one_time_print(mut self, enabled: bool) -> Self {
        self.one_time_print = enabled;
        self
    }

    pub fn text_mode(mut self, enabled: bool) -> Self {
        self.text_mode = enabled;
        self
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn algorithm(mut self, algorithm: DitherAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn printer(mut self, printer: PrinterConfig) -> Self {
        self.printer = printer;
        self
    }

    pub fn transfer_mode(&self) -> TransferMode {
        TransferMode::from_one_time_print(self.one_time_print)
    }

    /// Dither and pack the bitmap.
    ///
    /// ## Errors
    ///
    /// Returns [`MiniPrintError::Image`] if the bitmap is empty or not exactly
    /// as wide as the print head.
    pub fn render(&self) -> Result<RenderedJob, MiniPrintError> {
        let head = self.printer.width_dots as usize;
        if self.bitmap.width() != head {
            return Err(MiniPrintError::Image(format!(
                "bitmap is {} dots wide, {} needs exactly {}",
                self.bitmap.width(),
                self.printer.name,
                head
            )));
        }
        if self.bitmap.height() == 0 {
            return Err(MiniPrintError::Image("bitmap has no rows".to_string()));
        }

        let mono = dither::dither(&self.bitmap, self.threshold, self.algorithm, self.text_mode);
        let rows = raster::to_rows(&mono);
        log::debug!(
            "rendered {}x{} job ({}, threshold {}, text {})",
            mono.width(),
            mono.height(),
            self.algorithm,
            self.threshold,
            self.text_mode
        );
        Ok(RenderedJob { mono, rows })
    }

    /// Render and frame the job into transfer payloads.
    pub fn payloads(&self) -> Result<Vec<Vec<u8>>, MiniPrintError> {
        let rendered = self.render()?;
        Ok(frame_payloads(self.density, rendered.rows))
    }
}

/// `[density, rows..., start_print]`
pub fn frame_payloads(density: Density, rows: Vec<MonoRow>) -> Vec<Vec<u8>> {
    let mut payloads = Vec::with_capacity(rows.len() + 2);
    payloads.push(commands::density(density));
    payloads.extend(rows.into_iter().map(MonoRow::into_bytes));
    payloads.push(commands::start_print());
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_framing() {
        let job = PrintJob::new(Bitmap::filled(384, 3, 0).unwrap()).density(Density::High);
        let payloads = job.payloads().unwrap();

        assert_eq!(payloads.len(), 5);
        assert_eq!(payloads[0], vec![0xA5, 0xA5, 0xA5, 0xA5, 0x03]);
        for row in &payloads[1..4] {
            assert_eq!(row.len(), 48);
            assert!(row.iter().all(|&b| b == 0xFF));
        }
        assert_eq!(payloads[4], vec![0xA6, 0xA6, 0xA6, 0xA6, 0x01]);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let job = PrintJob::new(Bitmap::filled(200, 3, 0).unwrap());
        assert!(matches!(job.payloads(), Err(MiniPrintError::Image(_))));
    }

    #[test]
    fn test_empty_bitmap_rejected() {
        let job = PrintJob::new(Bitmap::filled(384, 0, 0).unwrap());
        assert!(job.render().is_err());
    }

    #[test]
    fn test_render_is_bilevel() {
        let pixels = (0..384 * 4).map(|i| (i % 256) as u8).collect();
        let job = PrintJob::new(Bitmap::new(384, 4, pixels).unwrap())
            .algorithm(DitherAlgorithm::Stucki)
            .text_mode(true);
        let rendered = job.render().unwrap();
        assert!(rendered.mono.is_bilevel());
        assert_eq!(rendered.rows.len(), 4);
    }

    #[test]
    fn test_one_time_print_selects_acknowledged() {
        let job = PrintJob::new(Bitmap::filled(384, 1, 255).unwrap());
        assert_eq!(job.transfer_mode(), TransferMode::Paced);
        assert_eq!(job.one_time_print(true).transfer_mode(), TransferMode::Acknowledged);
    }
}
