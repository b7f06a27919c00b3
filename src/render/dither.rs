//! # Error-Diffusion Dithering
//!
//! This module converts continuous-tone (grayscale) bitmaps to binary
//! (black/white) output suitable for a thermal print head.
//!
//! ## What is Dithering?
//!
//! Dithering simulates grayscale on a device that can only print black or white.
//! By varying the density of black dots, we create the illusion of different
//! gray levels.
//!
//! ```text
//! Grayscale:    White    Light    Medium    Dark    Black
//!               ░░░░░░   ░░▒░░░   ░▒░▒░▒   ▒▓▒▓▒▓   ██████
//! ```
//!
//! ## Error Diffusion
//!
//! Pixels are visited in raster order. Each one is snapped to 0 or 255 and the
//! difference (the quantization error) is pushed onto neighbours that have not
//! been visited yet:
//!
//! ```text
//! Floyd-Steinberg (/16)          Stucki (/42)
//!
//!        *   7                          *   8   4
//!    3   5   1                  2   4   8   4   2
//!                               1   2   4   2   1
//! ```
//!
//! Every neighbour write saturates to `[0, 255]`. Integer arithmetic is used
//! throughout (`error * weight / denominator`, truncating toward zero) so the
//! output is bit-exact across platforms.
//!
//! ## Text Mode
//!
//! Diffusion smears thin strokes into speckle. In text mode an edge map is
//! built from the source first: an interior pixel whose gray value differs by
//! more than [`EDGE_THRESHOLD`] from any of its 4-neighbours is an edge. Edge
//! pixels are hard-thresholded and push no error, so glyph outlines stay crisp.
//! Border pixels are never edges.
//!
//! ## Usage Example
//!
//! ```
//! use miniprint::render::dither::{self, Bitmap, DitherAlgorithm};
//!
//! let gradient: Vec<u8> = (0..16u32).flat_map(|_| (0..16u32).map(|x| (x * 16) as u8)).collect();
//! let bitmap = Bitmap::new(16, 16, gradient)?;
//!
//! let mono = dither::dither(&bitmap, 127, DitherAlgorithm::Stucki, false);
//! assert!(mono.is_bilevel());
//! # Ok::<(), miniprint::MiniPrintError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GrayImage};
use serde::Deserialize;

use crate::error::MiniPrintError;

/// Default black/white cut-off.
pub const DEFAULT_THRESHOLD: u8 = 127;

/// Minimum neighbour difference that marks a pixel as a stroke edge.
pub const EDGE_THRESHOLD: i32 = 10;

/// `(dx, dy, weight)` triples for Floyd-Steinberg.
const FLOYD_STEINBERG: &[(isize, isize, i32)] = &[(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)];

/// `(dx, dy, weight)` triples for Stucki.
const STUCKI: &[(isize, isize, i32)] = &[
    (1, 0, 8),
    (2, 0, 4),
    (-2, 1, 2),
    (-1, 1, 4),
    (0, 1, 8),
    (1, 1, 4),
    (2, 1, 2),
    (-2, 2, 1),
    (-1, 2, 2),
    (0, 2, 4),
    (1, 2, 2),
    (2, 2, 1),
];

/// Error-diffusion kernel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherAlgorithm {
    #[default]
    FloydSteinberg,
    Stucki,
}

impl DitherAlgorithm {
    fn kernel(&self) -> &'static [(isize, isize, i32)] {
        match self {
            DitherAlgorithm::FloydSteinberg => FLOYD_STEINBERG,
            DitherAlgorithm::Stucki => STUCKI,
        }
    }

    fn denominator(&self) -> i32 {
        match self {
            DitherAlgorithm::FloydSteinberg => 16,
            DitherAlgorithm::Stucki => 42,
        }
    }
}

impl fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DitherAlgorithm::FloydSteinberg => write!(f, "floyd-steinberg"),
            DitherAlgorithm::Stucki => write!(f, "stucki"),
        }
    }
}

impl FromStr for DitherAlgorithm {
    type Err = MiniPrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "floyd-steinberg" | "floyd_steinberg" | "fs" => Ok(DitherAlgorithm::FloydSteinberg),
            "stucki" => Ok(DitherAlgorithm::Stucki),
            other => Err(MiniPrintError::Config(format!(
                "unknown dithering algorithm '{}'",
                other
            ))),
        }
    }
}

/// An 8-bit grayscale bitmap, row-major. 0 = black, 255 = white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Wrap a raw gray buffer.
    ///
    /// ## Errors
    ///
    /// Returns [`MiniPrintError::Image`] if `pixels.len() != width * height`
    /// or the product does not fit in `usize`.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, MiniPrintError> {
        if pixels.len() != area(width, height)? {
            return Err(MiniPrintError::Image(format!(
                "buffer of {} bytes does not match {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A bitmap with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Result<Self, MiniPrintError> {
        Ok(Self {
            width,
            height,
            pixels: vec![value; area(width, height)?],
        })
    }

    /// Reduce any image to single-channel luma.
    pub fn from_image(image: &DynamicImage) -> Self {
        Self::from_gray(image.to_luma8())
    }

    pub fn from_gray(gray: GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        Self {
            width: width as usize,
            height: height as usize,
            pixels: gray.into_raw(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// One row of samples.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// True if every sample is 0 or 255.
    pub fn is_bilevel(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0 || p == 255)
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }
}

fn area(width: usize, height: usize) -> Result<usize, MiniPrintError> {
    width
        .checked_mul(height)
        .ok_or_else(|| MiniPrintError::Image(format!("{}x{} bitmap is too large", width, height)))
}

/// Build the text-mode edge map.
///
/// Returns one flag per pixel; only interior pixels can be set.
pub fn detect_edges(bitmap: &Bitmap) -> Vec<bool> {
    let (width, height) = (bitmap.width, bitmap.height);
    let mut edges = vec![false; width * height];
    if width < 3 || height < 3 {
        return edges;
    }

    let px = &bitmap.pixels;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            let v = px[i] as i32;
            let neighbours = [px[i - 1], px[i + 1], px[i - width], px[i + width]];
            edges[i] = neighbours
                .iter()
                .any(|&n| (v - n as i32).abs() > EDGE_THRESHOLD);
        }
    }
    edges
}

/// Dither a grayscale bitmap to strict black/white.
///
/// ## Parameters
///
/// - `bitmap`: Source samples (not modified)
/// - `threshold`: Samples strictly above this become white
/// - `algorithm`: Diffusion kernel
/// - `text_aware`: Hard-threshold stroke edges instead of diffusing them
///
/// ## Returns
///
/// A new bitmap of the same dimensions where every sample is 0 or 255.
pub fn dither(
    bitmap: &Bitmap,
    threshold: u8,
    algorithm: DitherAlgorithm,
    text_aware: bool,
) -> Bitmap {
    let (width, height) = (bitmap.width, bitmap.height);
    let edges = if text_aware {
        Some(detect_edges(bitmap))
    } else {
        None
    };

    let kernel = algorithm.kernel();
    let denominator = algorithm.denominator();
    let mut px = bitmap.pixels.clone();

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let old = px[i];
            let new = if old > threshold { 255u8 } else { 0u8 };
            px[i] = new;

            if edges.as_ref().is_some_and(|e| e[i]) {
                continue;
            }

            let error = old as i32 - new as i32;
            if error == 0 {
                continue;
            }

            for &(dx, dy, weight) in kernel {
                let tx = x as isize + dx;
                let ty = y as isize + dy;
                if tx < 0 || tx >= width as isize || ty >= height as isize {
                    continue;
                }
                let t = ty as usize * width + tx as usize;
                let adjusted = px[t] as i32 + error * weight / denominator;
                px[t] = adjusted.clamp(0, 255) as u8;
            }
        }
    }

    Bitmap {
        width,
        height,
        pixels: px,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Bitmap {
        let pixels = (0..height)
            .flat_map(|_| (0..width).map(move |x| (x * 255 / (width - 1)) as u8))
            .collect();
        Bitmap::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_bitmap_size_mismatch() {
        assert!(Bitmap::new(8, 2, vec![0; 15]).is_err());
        assert!(Bitmap::new(8, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        assert!(matches!(
            Bitmap::new(usize::MAX, 2, Vec::new()),
            Err(MiniPrintError::Image(_))
        ));
        assert!(Bitmap::filled(2, usize::MAX, 0).is_err());
        assert_eq!(Bitmap::filled(3, 0, 9).unwrap().pixels(), &[] as &[u8]);
    }

    #[test]
    fn test_from_color_image() {
        use image::{Rgb, RgbImage};

        let mut rgb = RgbImage::new(3, 2);
        let colors = [
            Rgb([255, 255, 255]),
            Rgb([0, 0, 0]),
            Rgb([255, 0, 0]),
            Rgb([0, 255, 0]),
            Rgb([0, 0, 255]),
            Rgb([128, 128, 128]),
        ];
        for (pixel, color) in rgb.pixels_mut().zip(colors) {
            *pixel = color;
        }
        let image = DynamicImage::ImageRgb8(rgb);

        let bmp = Bitmap::from_image(&image);
        assert_eq!(bmp.width(), 3);
        assert_eq!(bmp.height(), 2);
        assert_eq!(bmp.pixels(), image.to_luma8().as_raw().as_slice());
        assert_eq!(bmp.get(0, 0), 255);
        assert_eq!(bmp.get(1, 0), 0);
        assert_eq!(bmp.get(2, 1), 128);
        // Green carries most of the luma, blue the least
        let (red, green, blue) = (bmp.get(2, 0), bmp.get(0, 1), bmp.get(1, 1));
        assert!(green > red && red > blue, "r={} g={} b={}", red, green, blue);
    }

    #[test]
    fn test_output_is_bilevel() {
        let src = gradient(64, 32);
        for algorithm in [DitherAlgorithm::FloydSteinberg, DitherAlgorithm::Stucki] {
            for text_aware in [false, true] {
                let out = dither(&src, 127, algorithm, text_aware);
                assert!(out.is_bilevel(), "{} text={} not bilevel", algorithm, text_aware);
                assert_eq!(out.width(), 64);
                assert_eq!(out.height(), 32);
            }
        }
    }

    #[test]
    fn test_solid_images_unchanged() {
        for value in [0u8, 255u8] {
            let src = Bitmap::filled(24, 10, value).unwrap();
            for algorithm in [DitherAlgorithm::FloydSteinberg, DitherAlgorithm::Stucki] {
                assert_eq!(dither(&src, 127, algorithm, false), src);
                assert_eq!(dither(&src, 127, algorithm, true), src);
            }
        }
    }

    #[test]
    fn test_source_not_modified() {
        let src = gradient(16, 4);
        let copy = src.clone();
        let _ = dither(&src, 127, DitherAlgorithm::Stucki, true);
        assert_eq!(src, copy);
    }

    #[test]
    fn test_floyd_steinberg_error_propagation() {
        // 100 -> 0, error 100. Right neighbour gets 100*7/16 = 43.
        // 100 + 43 = 143 > 127 -> white.
        let src = Bitmap::new(2, 1, vec![100, 100]).unwrap();
        let out = dither(&src, 127, DitherAlgorithm::FloydSteinberg, false);
        assert_eq!(out.pixels(), &[0, 255]);
    }

    #[test]
    fn test_stucki_reaches_two_columns_right() {
        // x=0: 100 -> 0, x+1 += 19 (119), x+2 += 9 (109)
        // x=1: 119 -> 0, x+2 += 22 (131) -> white
        let src = Bitmap::new(3, 1, vec![100, 100, 100]).unwrap();
        let out = dither(&src, 127, DitherAlgorithm::Stucki, false);
        assert_eq!(out.pixels(), &[0, 0, 255]);
    }

    #[test]
    fn test_negative_error_saturates() {
        // 200 -> 255, error -55, neighbour 0 + (-55*7/16 = -24) clamps to 0
        let src = Bitmap::new(2, 1, vec![200, 0]).unwrap();
        let out = dither(&src, 127, DitherAlgorithm::FloydSteinberg, false);
        assert_eq!(out.pixels(), &[255, 0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let src = Bitmap::filled(8, 1, 127).unwrap();
        let out = dither(&src, 127, DitherAlgorithm::FloydSteinberg, false);
        // 127 is not above the threshold, so the first pixel goes black
        assert_eq!(out.get(0, 0), 0);
    }

    #[test]
    fn test_edges_skip_border() {
        let mut pixels = vec![255u8; 5 * 5];
        pixels[0] = 0; // corner, should never be an edge
        pixels[2 * 5 + 2] = 0; // center dot
        let bmp = Bitmap::new(5, 5, pixels).unwrap();
        let edges = detect_edges(&bmp);

        assert!(!edges[0]);
        assert!(edges[2 * 5 + 2]);
        // 4-neighbours of the dot differ by 255 from it
        assert!(edges[2 * 5 + 1]);
        assert!(edges[1 * 5 + 2]);
        // diagonal neighbour has no 4-neighbour difference
        assert!(!edges[1 * 5 + 1]);
        for x in 0..5 {
            assert!(!edges[x]);
            assert!(!edges[4 * 5 + x]);
        }
    }

    #[test]
    fn test_edges_ignore_small_differences() {
        let pixels: Vec<u8> = (0..25).map(|i| 100 + (i % 2) as u8 * 10).collect();
        let bmp = Bitmap::new(5, 5, pixels).unwrap();
        assert!(detect_edges(&bmp).iter().all(|&e| !e));
    }

    #[test]
    fn test_text_mode_keeps_stroke_sharp() {
        // A 1-dot stroke just below the threshold. Plain diffusion pushes
        // the stroke's error straight down and breaks it into dashes; text
        // mode cuts the edge pixels cleanly.
        let width = 16;
        let height = 8;
        let mut pixels = vec![255u8; width * height];
        for y in 0..height {
            pixels[y * width + 7] = 120;
        }
        let bmp = Bitmap::new(width, height, pixels).unwrap();

        let plain = dither(&bmp, 127, DitherAlgorithm::FloydSteinberg, false);
        assert!((1..height).any(|y| plain.get(7, y) == 255));

        let text = dither(&bmp, 127, DitherAlgorithm::FloydSteinberg, true);
        for y in 2..height {
            assert_eq!(text.get(7, y), 0, "stroke pixel (7,{})", y);
            assert_eq!(text.get(6, y), 255);
            assert_eq!(text.get(8, y), 255);
        }
    }

    #[test]
    fn test_dither_is_deterministic() {
        let src = gradient(48, 20);
        let a = dither(&src, 100, DitherAlgorithm::Stucki, true);
        let b = dither(&src, 100, DitherAlgorithm::Stucki, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_gradient_density_increases() {
        let src = gradient(64, 64);
        let out = dither(&src, 127, DitherAlgorithm::FloydSteinberg, false);
        let black_in = |x0: usize, x1: usize| {
            (0..64)
                .flat_map(|y| (x0..x1).map(move |x| (x, y)))
                .filter(|&(x, y)| out.get(x, y) == 0)
                .count()
        };
        assert!(black_in(0, 16) > black_in(48, 64));
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(
            "Floyd-Steinberg".parse::<DitherAlgorithm>().unwrap(),
            DitherAlgorithm::FloydSteinberg
        );
        assert_eq!("fs".parse::<DitherAlgorithm>().unwrap(), DitherAlgorithm::FloydSteinberg);
        assert_eq!("stucki".parse::<DitherAlgorithm>().unwrap(), DitherAlgorithm::Stucki);
        assert!("bayer".parse::<DitherAlgorithm>().is_err());
        assert_eq!(DitherAlgorithm::Stucki.to_string(), "stucki");
    }
}
