//! # Raster Row Packing
//!
//! Packs a dithered bitmap into the 1-bit rows the print head consumes.
//!
//! ## Bit Packing
//!
//! - Bit 7 (MSB) = leftmost pixel
//! - Bit 0 (LSB) = rightmost pixel
//! - 1 = black (burn a dot), 0 = white
//!
//! A sample counts as black only when it is exactly 0, so the input should be
//! the bilevel output of [`crate::render::dither::dither`].
//!
//! ## Padding
//!
//! If the width is not a multiple of 8, the last byte is padded with zeros
//! (white) on the right.
//!
//! ## Example
//!
//! ```
//! use miniprint::protocol::raster;
//! use miniprint::render::dither::Bitmap;
//!
//! let bmp = Bitmap::new(8, 1, vec![0, 0, 0, 0, 255, 255, 255, 255])?;
//! let rows = raster::to_rows(&bmp);
//! assert_eq!(rows[0].as_bytes(), &[0xF0]);
//! # Ok::<(), miniprint::MiniPrintError>(())
//! ```

use crate::render::dither::Bitmap;

/// One packed dot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoRow(Vec<u8>);

impl MonoRow {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if column `x` burns a dot.
    pub fn is_black(&self, x: usize) -> bool {
        self.0
            .get(x / 8)
            .is_some_and(|b| b & (0x80 >> (x % 8)) != 0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for MonoRow {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Pack a row of gray samples. 0 becomes a set bit.
pub fn pack_row(samples: &[u8]) -> MonoRow {
    let mut bytes = vec![0u8; samples.len().div_ceil(8)];

    for (i, &sample) in samples.iter().enumerate() {
        if sample == 0 {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }

    MonoRow(bytes)
}

/// Pack a whole bitmap, one [`MonoRow`] per pixel row.
pub fn to_rows(bitmap: &Bitmap) -> Vec<MonoRow> {
    (0..bitmap.height()).map(|y| pack_row(bitmap.row(y))).collect()
}

/// Total bytes across all rows.
pub fn payload_len(rows: &[MonoRow]) -> usize {
    rows.iter().map(MonoRow::len).sum()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_row_8_pixels() {
        assert_eq!(pack_row(&[0; 8]).as_bytes(), &[0xFF]);
        assert_eq!(pack_row(&[255; 8]).as_bytes(), &[0x00]);
        assert_eq!(
            pack_row(&[0, 255, 0, 255, 0, 255, 0, 255]).as_bytes(),
            &[0xAA]
        );
    }

    #[test]
    fn test_only_zero_is_black() {
        // Anything non-zero is treated as white
        assert_eq!(pack_row(&[1, 128, 254, 0, 0, 0, 0, 0]).as_bytes(), &[0x1F]);
    }

    #[test]
    fn test_pack_row_padding() {
        let row = pack_row(&[0; 12]);
        assert_eq!(row.as_bytes(), &[0xFF, 0xF0]);

        let row = pack_row(&[0; 9]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.as_bytes()[1], 0x80);
    }

    #[test]
    fn test_pack_row_empty() {
        assert!(pack_row(&[]).is_empty());
    }

    #[test]
    fn test_rows_dimensions() {
        let bmp = Bitmap::filled(384, 37, 0).unwrap();
        let rows = to_rows(&bmp);
        assert_eq!(rows.len(), 37);
        assert!(rows.iter().all(|r| r.len() == 48));
        assert_eq!(payload_len(&rows), 48 * 37);
    }

    #[test]
    fn test_is_black() {
        let row = pack_row(&[255, 0, 255, 255, 255, 255, 255, 255, 0]);
        assert!(row.is_black(1));
        assert!(row.is_black(8));
        assert!(!row.is_black(0));
        assert!(!row.is_black(100));
    }

    #[test]
    fn test_row_order_preserved() {
        let mut pixels = vec![255u8; 8 * 3];
        pixels[8] = 0; // row 1, column 0
        let bmp = Bitmap::new(8, 3, pixels).unwrap();
        let rows = to_rows(&bmp);
        assert_eq!(rows[0].as_bytes(), &[0x00]);
        assert_eq!(rows[1].as_bytes(), &[0x80]);
        assert_eq!(rows[2].as_bytes(), &[0x00]);
    }
}
