//! Packed, page-organised monochrome frame buffer.
//!
//! The SSD1306 GDDRAM is split into pages of 8 rows. Each byte holds one
//! column of one page, least significant bit at the top:
//!
//! ```text
//!            x = 0      x = 1            x = w-1
//! page 0   [byte 0  ] [byte 1  ] ...  [byte w-1  ]   rows 0..=7
//! page 1   [byte w  ] [byte w+1] ...  [byte 2w-1 ]   rows 8..=15
//!   ...
//! ```
//!
//! so pixel `(x, y)` lives in byte `(y / 8) * width + x`, bit `y % 8`.

use core::convert::Infallible;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*, primitives::Rectangle};

use crate::error::OledError;
use crate::geometry::Color;

/// Pixel rows per page.
pub const PAGE_HEIGHT: u16 = 8;

/// Number of bytes a `width` × `height` buffer needs.
pub const fn buffer_len(width: u16, height: u16) -> usize {
    width as usize * (height / PAGE_HEIGHT) as usize
}

/// Map a pixel coordinate to `(byte_index, bit_index)`.
///
/// Pure arithmetic: no bounds checking, no side effects.
#[inline(always)]
pub const fn locate(x: u16, y: u16, width: u16) -> (usize, u8) {
    let byte = (y / PAGE_HEIGHT) as usize * width as usize + x as usize;
    let bit = (y % PAGE_HEIGHT) as u8;
    (byte, bit)
}

/// Frame buffer borrowed from caller-supplied storage.
///
/// Only constructed by [`Oled`](crate::Oled) after its configuration has
/// been validated, so `storage.len() == buffer_len(width, height)` holds
/// for every instance.
pub struct FrameBuffer<'a> {
    storage: &'a mut [u8],
    width: u16,
    height: u16,
}

impl<'a> FrameBuffer<'a> {
    /// Wrap `storage`, which the caller has already checked has exactly
    /// `buffer_len(width, height)` bytes.
    pub(crate) fn new(storage: &'a mut [u8], width: u16, height: u16) -> Self {
        debug_assert_eq!(storage.len(), buffer_len(width, height));
        Self {
            storage,
            width,
            height,
        }
    }

    /// Display width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Display height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of 8-row pages.
    pub fn page_count(&self) -> u8 {
        (self.height / PAGE_HEIGHT) as u8
    }

    /// `true` if `(x, y)` is on the display.
    #[inline]
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    // ── Pixel access ─────────────────────────────────────────────────

    /// Set (`true`) or clear (`false`) one pixel without bounds checks.
    ///
    /// For hot paths whose coordinates are already known to be on screen.
    /// An off-screen `y` silently writes into another column's byte; an
    /// index past the end of the buffer panics.
    #[inline(always)]
    pub fn put_pixel_unchecked(&mut self, x: u16, y: u16, state: bool) {
        let (byte, bit) = locate(x, y, self.width);
        if state {
            self.storage[byte] |= 1 << bit;
        } else {
            self.storage[byte] &= !(1 << bit);
        }
    }

    /// Set or clear one pixel.
    ///
    /// Not atomic with respect to a concurrent refresh; hold the device
    /// lock around any sequence of calls that has to appear at once.
    ///
    /// # Errors
    ///
    /// [`OledError::OutOfBounds`] if `x >= width` or `y >= height`. The
    /// buffer is left unmodified.
    pub fn put_pixel(&mut self, x: u16, y: u16, state: bool) -> Result<(), OledError> {
        if !self.contains(x, y) {
            return Err(OledError::OutOfBounds);
        }
        self.put_pixel_unchecked(x, y, state);
        Ok(())
    }

    /// Read one pixel back from the buffer.
    ///
    /// # Errors
    ///
    /// [`OledError::OutOfBounds`] if the coordinate is off screen.
    pub fn get_pixel(&self, x: u16, y: u16) -> Result<bool, OledError> {
        if !self.contains(x, y) {
            return Err(OledError::OutOfBounds);
        }
        let (byte, bit) = locate(x, y, self.width);
        Ok(self.storage[byte] & (1 << bit) != 0)
    }

    /// Fill the whole buffer with one colour.
    pub fn clear(&mut self, color: Color) {
        let fill = if color.bit() { 0xFF } else { 0x00 };
        self.storage.fill(fill);
    }

    // ── Raw access ───────────────────────────────────────────────────

    /// The `width` bytes making up `page`.
    ///
    /// # Panics
    ///
    /// If `page >= page_count()`.
    pub fn page(&self, page: u8) -> &[u8] {
        let start = page as usize * self.width as usize;
        &self.storage[start..start + self.width as usize]
    }

    /// The whole packed buffer, page 0 first.
    pub fn as_bytes(&self) -> &[u8] {
        self.storage
    }

    /// Mutable access to the packed buffer, e.g. to blit a prepared image.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.storage
    }

    pub(crate) fn byte_mut(&mut self, index: usize) -> &mut u8 {
        &mut self.storage[index]
    }
}

// ── embedded-graphics integration ────────────────────────────────────────

impl OriginDimensions for FrameBuffer<'_> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

/// `BinaryColor::On` sets the pixel bit, `Off` clears it. Pixels that fall
/// off the display are discarded, as `embedded-graphics` expects of a draw
/// target.
impl DrawTarget for FrameBuffer<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width as u32 && y < self.height as u32 {
                self.put_pixel_unchecked(x as u16, y as u16, color.is_on());
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if let Some(bottom_right) = area.bottom_right() {
            self.fill_rect_unchecked(
                area.top_left.x as u16,
                area.top_left.y as u16,
                bottom_right.x as u16,
                bottom_right.y as u16,
                color.into(),
            );
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        FrameBuffer::clear(self, color.into());
        Ok(())
    }
}
