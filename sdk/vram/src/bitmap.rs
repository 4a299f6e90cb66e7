//! # Bitmap Buffers
//!
//! A [`BitmapBuffer`] is a view of one framebuffer page. Pixels are stored
//! row-major from the page base:
//!
//! ```text
//! 16bpp:  offset = (y * width + x) * 2      one BGR555 color per halfword
//!  8bpp:  offset =  y * width + x           palette index, two per halfword
//! ```
//!
//! 8bpp pages have no byte write path, so plotting one pixel reads the
//! halfword, replaces its lane and writes it back. The neighbouring pixel is
//! kept.
//!
//! ## Checked vs Clamped
//!
//! | Call                     | Off the page                        |
//! |--------------------------|-------------------------------------|
//! | `plot_pixel`/`get_pixel` | `Err(VramError::OutOfBounds)`       |
//! | `plot_pixel_unchecked`   | Undefined; caller validates         |
//! | `fill_rect`, `copy_from` | Clamped to the page                 |
//! | lines and circles        | Off-page points are skipped         |

use bit_field::BitField;

use crate::dma::plan::{CopyRect, Rect, extent};
use crate::error::VramError;
use crate::mmio::MemoryBus;
use crate::mode::{PixelDepth, VideoModeConfig};
use crate::region::{MemoryRegion, lane};

pub struct BitmapBuffer<'a, B: MemoryBus + ?Sized> {
    region: MemoryRegion<'a, B>,
    width: usize,
    height: usize,
    depth: PixelDepth,
}

impl<B: MemoryBus + ?Sized> Clone for BitmapBuffer<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: MemoryBus + ?Sized> Copy for BitmapBuffer<'_, B> {}

impl<B: MemoryBus + ?Sized> core::fmt::Debug for BitmapBuffer<'_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitmapBuffer")
            .field("base", &format_args!("{:#010X}", self.region.base()))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .finish()
    }
}

impl<'a, B: MemoryBus + ?Sized> BitmapBuffer<'a, B> {
    /// A buffer over `region`. Fails if the pixels wouldn't fit in it.
    pub fn new(
        region: MemoryRegion<'a, B>,
        width: usize,
        height: usize,
        depth: PixelDepth,
    ) -> Result<Self, VramError> {
        let bytes = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(depth.bytes()))
            .ok_or(VramError::InvalidLength)?;
        if bytes > region.size() {
            return Err(VramError::InvalidLength);
        }
        Ok(Self { region, width, height, depth })
    }

    /// The buffer for `page` of `config`, cut out of `vram`.
    ///
    /// `vram` has to start at or below the page base. Tile modes have no
    /// buffer; a page the mode doesn't have is `InvalidIndex`.
    pub fn for_page(
        vram: MemoryRegion<'a, B>,
        config: &VideoModeConfig,
        page: usize,
    ) -> Result<Self, VramError> {
        let geometry = config.geometry().ok_or(VramError::UnsupportedMode)?;
        let base = config.frame_base(page).ok_or(VramError::InvalidIndex)?;
        let offset = base.checked_sub(vram.base()).ok_or(VramError::OutOfBounds)?;
        let region = vram.sub(offset, geometry.frame_size).ok_or(VramError::OutOfBounds)?;
        Self::new(region, geometry.width, geometry.height, geometry.depth)
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn depth(&self) -> PixelDepth {
        self.depth
    }

    /// Absolute address of pixel (0, 0).
    #[inline(always)]
    pub fn base(&self) -> usize {
        self.region.base()
    }

    #[inline(always)]
    pub fn region(&self) -> MemoryRegion<'a, B> {
        self.region
    }

    /// Bytes of pixel data, which may be less than the region.
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.width * self.height * self.depth.bytes()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline(always)]
    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.depth.bytes()
    }

    fn checked_offset(&self, x: i32, y: i32) -> Result<usize, VramError> {
        if !self.in_bounds(x, y) {
            return Err(VramError::OutOfBounds);
        }
        let offset = self.offset(x as usize, y as usize);
        if !self.region.contains(offset, self.depth.bytes()) {
            return Err(VramError::OutOfBounds);
        }
        Ok(offset)
    }

    #[inline]
    fn put(&self, offset: usize, color: u16) {
        match self.depth {
            PixelDepth::Bpp16 => self.region.write16(offset, color),
            PixelDepth::Bpp8 => self.region.write8(offset, color as u8),
        }
    }

    #[inline]
    fn get(&self, offset: usize) -> u16 {
        match self.depth {
            PixelDepth::Bpp16 => self.region.read16(offset),
            PixelDepth::Bpp8 => self.region.read8(offset) as u16,
        }
    }

    /// Plot one pixel. At 8bpp only the low byte of `color` is used.
    pub fn plot_pixel(&self, x: i32, y: i32, color: u16) -> Result<(), VramError> {
        let offset = self.checked_offset(x, y)?;
        self.put(offset, color);
        Ok(())
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Result<u16, VramError> {
        let offset = self.checked_offset(x, y)?;
        Ok(self.get(offset))
    }

    /// Plot without any checks, straight onto the bus.
    ///
    /// # Safety
    ///
    /// `(x, y)` must be inside the buffer.
    #[inline(always)]
    pub unsafe fn plot_pixel_unchecked(&self, x: usize, y: usize, color: u16) {
        let addr = self.region.base() + self.offset(x, y);
        let bus = self.region.bus();
        unsafe {
            match self.depth {
                PixelDepth::Bpp16 => bus.write16(addr, color),
                PixelDepth::Bpp8 => {
                    let mut half = bus.read16(addr & !1);
                    half.set_bits(lane(addr), color & 0xFF);
                    bus.write16(addr & !1, half);
                }
            }
        }
    }

    #[inline]
    fn plot_clipped(&self, x: i64, y: i64, color: u16) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            if x < self.width && y < self.height {
                self.put(self.offset(x, y), color);
            }
        }
    }

    /// Fill a rectangle, clamped to the buffer.
    pub fn fill_rect(&self, x: i32, y: i32, w: i32, h: i32, color: u16) {
        if let Some(rect) = Rect::clamp(x, y, w, h, self.width, self.height) {
            self.fill_clamped(rect, color);
        }
    }

    pub(crate) fn fill_clamped(&self, rect: Rect, color: u16) {
        for row in rect.y..rect.y + rect.h {
            for col in rect.x..rect.x + rect.w {
                self.put(self.offset(col, row), color);
            }
        }
    }

    pub fn clear(&self, color: u16) {
        self.fill_clamped(
            Rect { x: 0, y: 0, w: self.width, h: self.height },
            color,
        );
    }

    /// Bresenham line from `(x0, y0)` to `(x1, y1)`, both ends included.
    ///
    /// Walks the major axis only where it crosses the buffer, so far-off
    /// endpoints cost nothing.
    pub fn draw_line(&self, x0: i32, y0: i32, x1: i32, y1: i32, color: u16) {
        let (x0, y0, x1, y1) = (i64::from(x0), i64::from(y0), i64::from(x1), i64::from(y1));

        if (x1 - x0).abs() >= (y1 - y0).abs() {
            for (x, y) in line_points(x0, y0, x1, y1, extent(self.width)) {
                self.plot_clipped(x, y, color);
            }
        } else {
            for (y, x) in line_points(y0, x0, y1, x1, extent(self.height)) {
                self.plot_clipped(x, y, color);
            }
        }
    }

    /// Midpoint circle outline.
    pub fn draw_circle(&self, cx: i32, cy: i32, radius: i32, color: u16) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
        if cx + r < 0 || cy + r < 0 || cx - r >= extent(self.width) || cy - r >= extent(self.height) {
            return;
        }
        let (mut x, mut y, mut err) = (r, 0i64, 0i64);

        while x >= y {
            for (px, py) in [
                (cx + x, cy + y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx - x, cy + y),
                (cx - x, cy - y),
                (cx - y, cy - x),
                (cx + y, cy - x),
                (cx + x, cy - y),
            ] {
                self.plot_clipped(px, py, color);
            }

            if err <= 0 {
                y += 1;
                err += 2 * y + 1;
            }
            if err > 0 {
                x -= 1;
                err -= 2 * x + 1;
            }
        }
    }

    /// Every pixel with `dx² + dy² ≤ r²`. Only the part of the bounding box
    /// inside the buffer is visited.
    pub fn fill_circle(&self, cx: i32, cy: i32, radius: i32, color: u16) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
        let r2 = r * r;
        let (left, right) = ((cx - r).max(0), (cx + r).min(extent(self.width) - 1));
        let (top, bottom) = ((cy - r).max(0), (cy + r).min(extent(self.height) - 1));

        for y in top..=bottom {
            let dy = y - cy;
            for x in left..=right {
                let dx = x - cx;
                if dx * dx + dy * dy <= r2 {
                    self.plot_clipped(x, y, color);
                }
            }
        }
    }

    /// Copy a `w × h` block from `src` at `(sx, sy)` to `(dx, dy)` here.
    ///
    /// Clamped against both buffers. Copying a buffer onto an overlapping
    /// part of itself isn't supported.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_from<S: MemoryBus + ?Sized>(
        &self,
        src: &BitmapBuffer<'_, S>,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
    ) {
        let clamped = CopyRect::clamp(
            (src.width, src.height),
            (self.width, self.height),
            sx,
            sy,
            dx,
            dy,
            w,
            h,
        );
        if let Some(rect) = clamped {
            self.copy_clamped(src, rect);
        }
    }

    pub(crate) fn copy_clamped<S: MemoryBus + ?Sized>(&self, src: &BitmapBuffer<'_, S>, rect: CopyRect) {
        for row in 0..rect.h {
            for col in 0..rect.w {
                let pixel = src.get(src.offset(rect.sx + col, rect.sy + row));
                self.put(self.offset(rect.dx + col, rect.dy + row), pixel);
            }
        }
    }
}

/// Points of a line along its major axis `a`, restricted to `0..len` on
/// that axis. The minor coordinate is the exact line rounded half up, which
/// is what Bresenham's error term tracks.
fn line_points(a0: i64, b0: i64, a1: i64, b1: i64, len: i64) -> impl Iterator<Item = (i64, i64)> {
    let da = (a1 - a0).abs();
    let db = (b1 - b0).abs();
    let sa = if a0 < a1 { 1 } else { -1 };
    let sb = if b0 < b1 { 1 } else { -1 };

    // steps k with a0 + sa * k inside 0..len
    let (lo, hi) = if sa > 0 { (-a0, len - 1 - a0) } else { (a0 - (len - 1), a0) };
    let (first, last) = (lo.max(0), hi.min(da));

    (first..=last).map(move |k| {
        let minor = if da == 0 {
            0
        } else {
            ((2 * i128::from(k) * i128::from(db) + i128::from(da)) / (2 * i128::from(da))) as i64
        };
        (a0 + sa * k, b0 + sb * minor)
    })
}
