//! Fixed-size monochrome framebuffer for the 128×64 OLED.
//!
//! Pixels are packed one bit each, row-major, most significant bit
//! first, giving exactly [`FRAMEBUFFER_SIZE`] bytes. The buffer is an
//! `embedded-graphics` draw target so screens can use its primitives
//! and mono fonts directly.

use std::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::error::MintakaError;

// ── Constants ────────────────────────────────────────────────────

/// Display width in pixels.
pub const DISPLAY_WIDTH: usize = 128;

/// Display height in pixels.
pub const DISPLAY_HEIGHT: usize = 64;

/// Packed bitmap size in bytes (1024).
pub const FRAMEBUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT / 8;

// ── Framebuffer ──────────────────────────────────────────────────

/// A 1-bit-per-pixel bitmap of the whole display.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    bits: [u8; FRAMEBUFFER_SIZE],
}

impl Framebuffer {
    /// An all-dark frame.
    pub fn new() -> Self {
        Self {
            bits: [0; FRAMEBUFFER_SIZE],
        }
    }

    /// Build a frame from an already packed bitmap.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MintakaError> {
        let bits: [u8; FRAMEBUFFER_SIZE] =
            data.try_into().map_err(|_| MintakaError::InvalidFrameSize {
                expected: FRAMEBUFFER_SIZE,
                actual: data.len(),
            })?;
        Ok(Self { bits })
    }

    /// The packed bitmap.
    pub fn as_bytes(&self) -> &[u8; FRAMEBUFFER_SIZE] {
        &self.bits
    }

    /// Turn a pixel on or off. Out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return;
        }
        let (byte, mask) = Self::locate(x, y);
        if on {
            self.bits[byte] |= mask;
        } else {
            self.bits[byte] &= !mask;
        }
    }

    /// Read a pixel. Out-of-bounds coordinates read as off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return false;
        }
        let (byte, mask) = Self::locate(x, y);
        self.bits[byte] & mask != 0
    }

    /// Number of lit pixels.
    pub fn lit_pixels(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// Copy a `width`×`height` block of booleans (row-major) into the
    /// frame at `(x, y)`, clipping at the display edges.
    pub fn blit(&mut self, x: usize, y: usize, width: usize, height: usize, pixels: &[bool]) {
        for (row, line) in pixels.chunks(width).take(height).enumerate() {
            for (col, &on) in line.iter().enumerate() {
                self.set_pixel(x + col, y + row, on);
            }
        }
    }

    fn locate(x: usize, y: usize) -> (usize, u8) {
        let index = y * DISPLAY_WIDTH + x;
        (index / 8, 0x80 >> (index % 8))
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("lit_pixels", &self.lit_pixels())
            .finish()
    }
}

// ── embedded-graphics integration ────────────────────────────────

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) {
                self.set_pixel(x, y, color.is_on());
            }
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn size_is_fixed() {
        assert_eq!(FRAMEBUFFER_SIZE, 1024);
        assert_eq!(Framebuffer::new().as_bytes().len(), 1024);
    }

    #[test]
    fn packing_is_row_major_msb_first() {
        let mut fb = Framebuffer::new();
        fb.set_pixel(0, 0, true);
        fb.set_pixel(9, 0, true);
        fb.set_pixel(0, 1, true);
        let bytes = fb.as_bytes();
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[1], 0x40);
        assert_eq!(bytes[16], 0x80);
        assert_eq!(fb.lit_pixels(), 3);
    }

    #[test]
    fn out_of_bounds_is_ignored() {
        let mut fb = Framebuffer::new();
        fb.set_pixel(128, 0, true);
        fb.set_pixel(0, 64, true);
        assert_eq!(fb.lit_pixels(), 0);
        assert!(!fb.pixel(500, 500));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = Framebuffer::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            MintakaError::InvalidFrameSize {
                expected: 1024,
                actual: 100
            }
        ));
        assert!(Framebuffer::from_bytes(&[0xFF; 1024]).is_ok());
    }

    #[test]
    fn draws_embedded_graphics_primitives() {
        let mut fb = Framebuffer::new();
        Rectangle::new(Point::new(-2, -2), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        // Only the on-screen 2×2 corner survives clipping.
        assert_eq!(fb.lit_pixels(), 4);
        assert!(fb.pixel(1, 1));
    }

    #[test]
    fn blit_clips_at_edges() {
        let mut fb = Framebuffer::new();
        fb.blit(126, 62, 4, 4, &[true; 16]);
        assert_eq!(fb.lit_pixels(), 4);
    }
}
