//! Rectangle drawing on top of [`FrameBuffer`] addressing.
//!
//! Filled spans are written a page at a time: for each column the rows
//! `y_from..=y_to` fall into at most `height / 8` bytes, and each byte is
//! updated with one masked read-modify-write instead of eight single-bit
//! writes.

use core::ops::BitOr;

use embedded_graphics::pixelcolor::BinaryColor;

use crate::error::OledError;
use crate::framebuffer::{locate, FrameBuffer, PAGE_HEIGHT};

/// Pixel colour, stored verbatim as the pixel bit.
///
/// `White` clears the bit and `Black` sets it. On an emissive OLED a set
/// bit is a lit pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    /// Bit value 0.
    White = 0,
    /// Bit value 1.
    Black = 1,
}

impl Color {
    /// The bit written to the frame buffer.
    pub const fn bit(self) -> bool {
        matches!(self, Color::Black)
    }
}

impl From<bool> for Color {
    fn from(bit: bool) -> Self {
        if bit {
            Color::Black
        } else {
            Color::White
        }
    }
}

/// Bit-level mapping: `On` sets the pixel bit.
impl From<BinaryColor> for Color {
    fn from(c: BinaryColor) -> Self {
        Color::from(c.is_on())
    }
}

/// Fill and colour options for [`FrameBuffer::put_rectangle`].
///
/// A bitmask: combine a fill flag with a colour, e.g.
/// `DrawParams::FILL | DrawParams::BLACK`. The default (all bits clear) is
/// an outline in [`Color::White`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrawParams(u8);

impl DrawParams {
    /// Colour bit 0.
    pub const WHITE: Self = Self(0x00);
    /// Colour bit 1.
    pub const BLACK: Self = Self(0x01);
    /// Draw only the four edges.
    pub const NO_FILL: Self = Self(0x00);
    /// Paint every pixel inside the rectangle.
    pub const FILL: Self = Self(0x02);

    const COLOR_MASK: u8 = 0x01;
    const FILL_MASK: u8 = 0x02;

    /// Build from raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::COLOR_MASK | Self::FILL_MASK))
    }

    /// Raw bitmask.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if [`FILL`](Self::FILL) is set.
    pub const fn fill(self) -> bool {
        self.0 & Self::FILL_MASK != 0
    }

    /// The colour selected by the colour bit.
    pub const fn color(self) -> Color {
        if self.0 & Self::COLOR_MASK != 0 {
            Color::Black
        } else {
            Color::White
        }
    }
}

impl BitOr for DrawParams {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<Color> for DrawParams {
    fn from(c: Color) -> Self {
        Self(c as u8)
    }
}

/// Byte mask for rows `lo..=hi` within one page (both in `0..8`).
#[inline]
const fn row_mask(lo: u16, hi: u16) -> u8 {
    (0xFFu8 << lo) & (0xFFu8 >> (7 - hi))
}

impl FrameBuffer<'_> {
    /// Draw a rectangle between two corners, inclusive.
    ///
    /// Corners may be given in any order along either axis. With
    /// [`DrawParams::FILL`] every pixel of the rectangle is set to the
    /// colour; without it only the top and bottom rows and the left and
    /// right columns are, leaving the interior as it was so outlines can be
    /// layered over fills. A single row or column draws a line.
    ///
    /// Not internally locked; wrap several calls that must reach the panel
    /// together in one lock scope.
    ///
    /// # Errors
    ///
    /// [`OledError::OutOfBounds`] if any coordinate is off the display.
    /// Nothing is drawn in that case; there is no clipping.
    ///
    /// # Example
    ///
    /// ```
    /// # use mono_oled_rs::{DrawParams, Oled};
    /// # fn draw<I2C: embedded_hal_async::i2c::I2c>(oled: &Oled<'_, I2C>) -> Result<(), mono_oled_rs::OledError> {
    /// let mut frame = oled.lock();
    /// frame.put_rectangle(0, 0, 127, 63, DrawParams::FILL | DrawParams::BLACK)?;
    /// frame.put_rectangle(125, 61, 2, 2, DrawParams::NO_FILL | DrawParams::WHITE)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn put_rectangle(
        &mut self,
        x_from: u16,
        y_from: u16,
        x_to: u16,
        y_to: u16,
        params: DrawParams,
    ) -> Result<(), OledError> {
        if !self.contains(x_from, y_from) || !self.contains(x_to, y_to) {
            return Err(OledError::OutOfBounds);
        }

        let (x0, x1) = if x_from <= x_to { (x_from, x_to) } else { (x_to, x_from) };
        let (y0, y1) = if y_from <= y_to { (y_from, y_to) } else { (y_to, y_from) };

        if params.fill() {
            self.fill_rect_unchecked(x0, y0, x1, y1, params.color());
        } else {
            self.outline_rect_unchecked(x0, y0, x1, y1, params.color());
        }
        Ok(())
    }

    /// Fill a normalised, on-screen rectangle.
    pub(crate) fn fill_rect_unchecked(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: Color) {
        for x in x0..=x1 {
            self.fill_column(x, y0, y1, color);
        }
    }

    fn outline_rect_unchecked(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: Color) {
        let state = color.bit();
        for x in x0..=x1 {
            self.put_pixel_unchecked(x, y0, state);
            self.put_pixel_unchecked(x, y1, state);
        }
        self.fill_column(x0, y0, y1, color);
        self.fill_column(x1, y0, y1, color);
    }

    /// Set rows `y0..=y1` of column `x`, one masked byte write per page.
    fn fill_column(&mut self, x: u16, y0: u16, y1: u16, color: Color) {
        let width = self.width();
        let (first_page, last_page) = (y0 / PAGE_HEIGHT, y1 / PAGE_HEIGHT);

        for page in first_page..=last_page {
            let top = page * PAGE_HEIGHT;
            let lo = if page == first_page { y0 - top } else { 0 };
            let hi = if page == last_page { y1 - top } else { PAGE_HEIGHT - 1 };
            let mask = row_mask(lo, hi);

            let (index, _) = locate(x, top, width);
            let byte = self.byte_mut(index);
            if color.bit() {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::buffer_len;

    const W: u16 = 128;
    const H: u16 = 64;

    fn inside(x: u16, y: u16, x0: u16, y0: u16, x1: u16, y1: u16) -> bool {
        (x0..=x1).contains(&x) && (y0..=y1).contains(&y)
    }

    fn on_edge(x: u16, y: u16, x0: u16, y0: u16, x1: u16, y1: u16) -> bool {
        inside(x, y, x0, y0, x1, y1) && (x == x0 || x == x1 || y == y0 || y == y1)
    }

    #[test]
    fn params_combine_as_bitmask() {
        let p = DrawParams::FILL | DrawParams::BLACK;
        assert_eq!(p.bits(), 0x03);
        assert!(p.fill());
        assert_eq!(p.color(), Color::Black);

        let p = DrawParams::NO_FILL | DrawParams::WHITE;
        assert_eq!(p, DrawParams::default());
        assert!(!p.fill());
        assert_eq!(p.color(), Color::White);

        assert_eq!(DrawParams::from_bits(0xFF).bits(), 0x03);
        assert_eq!(DrawParams::from(Color::Black), DrawParams::BLACK);
    }

    #[test]
    fn row_mask_covers_requested_rows() {
        assert_eq!(row_mask(0, 7), 0xFF);
        assert_eq!(row_mask(0, 0), 0x01);
        assert_eq!(row_mask(7, 7), 0x80);
        assert_eq!(row_mask(2, 5), 0b0011_1100);
    }

    #[test]
    fn filled_rectangle_paints_exactly_its_area() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);
        fb.put_rectangle(3, 5, 40, 20, DrawParams::FILL | DrawParams::BLACK).unwrap();

        for y in 0..H {
            for x in 0..W {
                assert_eq!(fb.get_pixel(x, y), Ok(inside(x, y, 3, 5, 40, 20)), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn white_fill_clears_only_its_area() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);
        fb.clear(Color::Black);
        fb.put_rectangle(10, 7, 12, 9, DrawParams::FILL | DrawParams::WHITE).unwrap();

        for y in 0..H {
            for x in 0..W {
                assert_eq!(fb.get_pixel(x, y), Ok(!inside(x, y, 10, 7, 12, 9)), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn outline_changes_only_the_boundary() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);
        fb.put_rectangle(8, 4, 30, 25, DrawParams::NO_FILL | DrawParams::BLACK).unwrap();

        for y in 0..H {
            for x in 0..W {
                assert_eq!(fb.get_pixel(x, y), Ok(on_edge(x, y, 8, 4, 30, 25)), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);
        fb.put_rectangle(0, 0, 20, 20, DrawParams::FILL | DrawParams::BLACK).unwrap();
        fb.put_rectangle(5, 5, 15, 15, DrawParams::NO_FILL | DrawParams::WHITE).unwrap();

        assert_eq!(fb.get_pixel(10, 10), Ok(true));
        assert_eq!(fb.get_pixel(5, 10), Ok(false));
        assert_eq!(fb.get_pixel(10, 15), Ok(false));
        assert_eq!(fb.get_pixel(4, 4), Ok(true));
    }

    #[test]
    fn reversed_corners_draw_the_same() {
        for params in [
            DrawParams::FILL | DrawParams::BLACK,
            DrawParams::NO_FILL | DrawParams::BLACK,
        ] {
            let mut a = [0u8; buffer_len(W, H)];
            let mut b = [0u8; buffer_len(W, H)];
            let mut c = [0u8; buffer_len(W, H)];
            FrameBuffer::new(&mut a, W, H).put_rectangle(7, 9, 50, 33, params).unwrap();
            FrameBuffer::new(&mut b, W, H).put_rectangle(50, 33, 7, 9, params).unwrap();
            FrameBuffer::new(&mut c, W, H).put_rectangle(50, 9, 7, 33, params).unwrap();
            assert_eq!(a, b);
            assert_eq!(a, c);
        }
    }

    #[test]
    fn degenerate_rectangles_draw_lines() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);

        fb.put_rectangle(10, 47, 117, 47, DrawParams::BLACK).unwrap();
        fb.put_rectangle(3, 0, 3, 63, DrawParams::FILL | DrawParams::BLACK).unwrap();
        fb.put_rectangle(100, 10, 100, 10, DrawParams::BLACK).unwrap();

        let lit: u32 = fb.as_bytes().iter().map(|b| b.count_ones()).sum();
        assert_eq!(lit, 108 + 64 + 1);
        assert_eq!(fb.get_pixel(10, 47), Ok(true));
        assert_eq!(fb.get_pixel(117, 47), Ok(true));
        assert_eq!(fb.get_pixel(3, 63), Ok(true));
        assert_eq!(fb.get_pixel(100, 10), Ok(true));
    }

    #[test]
    fn out_of_bounds_corner_draws_nothing() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);

        let fill = DrawParams::FILL | DrawParams::BLACK;
        assert_eq!(fb.put_rectangle(0, 0, 128, 10, fill), Err(OledError::OutOfBounds));
        assert_eq!(fb.put_rectangle(0, 64, 10, 10, fill), Err(OledError::OutOfBounds));
        assert_eq!(fb.put_rectangle(200, 0, 0, 0, DrawParams::BLACK), Err(OledError::OutOfBounds));
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn nested_ring_scenario() {
        let mut storage = [0u8; buffer_len(W, H)];
        let mut fb = FrameBuffer::new(&mut storage, W, H);

        fb.put_rectangle(0, 0, 127, 63, DrawParams::FILL | DrawParams::WHITE).unwrap();
        fb.put_rectangle(2, 2, 125, 61, DrawParams::FILL | DrawParams::BLACK).unwrap();
        fb.put_rectangle(4, 4, 123, 57, DrawParams::NO_FILL | DrawParams::WHITE).unwrap();

        for y in 0..H {
            for x in 0..W {
                let expected = if !inside(x, y, 2, 2, 125, 61) {
                    false
                } else {
                    !on_edge(x, y, 4, 4, 123, 57)
                };
                assert_eq!(fb.get_pixel(x, y), Ok(expected), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn fill_matches_per_pixel_reference() {
        // Span boundaries crossing pages at every offset.
        for y0 in 0..10 {
            for y1 in y0..20 {
                let mut fast = [0u8; buffer_len(16, 24)];
                let mut slow = [0u8; buffer_len(16, 24)];
                FrameBuffer::new(&mut fast, 16, 24)
                    .put_rectangle(1, y0, 3, y1, DrawParams::FILL | DrawParams::BLACK)
                    .unwrap();
                let mut reference = FrameBuffer::new(&mut slow, 16, 24);
                for x in 1..=3 {
                    for y in y0..=y1 {
                        reference.put_pixel_unchecked(x, y, true);
                    }
                }
                assert_eq!(fast, slow, "rows {}..={}", y0, y1);
            }
        }
    }
}
