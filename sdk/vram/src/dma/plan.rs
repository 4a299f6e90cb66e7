//! Pure span arithmetic for the transfer engine.
//!
//! A rectangle inside a bitmap becomes one [`Span`] per row, or a single span
//! when it covers whole rows. Each span then [`splits`](Span::split) into
//! unaligned head bytes, a run of whole words for the channel, and tail bytes:
//!
//! ```text
//!        head        body (words)              tail
//! addr: [01 02 03][04 05 06 07 | 08 .. 0F ...][.. ..]
//!        ^ not 4-aligned        ^ DMA           ^ leftover < 4
//! ```
//!
//! Nothing in here touches memory.

use crate::mode::PixelDepth;

/// A buffer dimension as a signed coordinate, saturating at `i64::MAX`.
#[inline]
pub(crate) fn extent(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// A run of bytes at an absolute address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub addr: usize,
    pub len: usize,
}

/// A span cut at an alignment boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpanSplit {
    /// Bytes before the first aligned address.
    pub head: Span,
    /// Whole aligned units.
    pub body: Span,
    /// Bytes after the last whole unit.
    pub tail: Span,
}

impl Span {
    #[inline]
    pub const fn new(addr: usize, len: usize) -> Self {
        Self { addr, len }
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.addr + self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split into head bytes, 32-bit words, and tail bytes.
    #[inline]
    pub fn split(&self) -> SpanSplit {
        self.split_aligned(4)
    }

    /// Split at `align`, which must be a power of two.
    pub fn split_aligned(&self, align: usize) -> SpanSplit {
        let misalign = self.addr & (align - 1);
        let head_len = if misalign == 0 { 0 } else { (align - misalign).min(self.len) };
        let rest = self.len - head_len;
        let body_len = rest & !(align - 1);

        let head = Span::new(self.addr, head_len);
        let body = Span::new(head.end(), body_len);
        let tail = Span::new(body.end(), rest - body_len);
        SpanSplit { head, body, tail }
    }
}

/// A rectangle already clamped to its bitmap.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    /// Clamp a signed rectangle to `width × height`.
    ///
    /// Negative origins shrink the size by the same amount. `None` if nothing
    /// is left.
    pub fn clamp(x: i32, y: i32, w: i32, h: i32, width: usize, height: usize) -> Option<Rect> {
        let (mut x, mut y, mut w, mut h) = (x as i64, y as i64, w as i64, h as i64);
        let (width, height) = (extent(width), extent(height));

        if x < 0 {
            w += x;
            x = 0;
        }
        if y < 0 {
            h += y;
            y = 0;
        }
        if x + w > width {
            w = width - x;
        }
        if y + h > height {
            h = height - y;
        }
        if w <= 0 || h <= 0 {
            return None;
        }

        Some(Rect {
            x: x as usize,
            y: y as usize,
            w: w as usize,
            h: h as usize,
        })
    }

    #[inline]
    pub const fn pixels(&self) -> usize {
        self.w * self.h
    }
}

/// Source and destination origins plus size for a copy, clamped on all four
/// sides of both bitmaps.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CopyRect {
    pub sx: usize,
    pub sy: usize,
    pub dx: usize,
    pub dy: usize,
    pub w: usize,
    pub h: usize,
}

impl CopyRect {
    #[allow(clippy::too_many_arguments)]
    pub fn clamp(
        src: (usize, usize),
        dst: (usize, usize),
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
    ) -> Option<CopyRect> {
        let (mut sx, mut sy, mut dx, mut dy) = (sx as i64, sy as i64, dx as i64, dy as i64);
        let (mut w, mut h) = (w as i64, h as i64);
        let (sw, sh) = (extent(src.0), extent(src.1));
        let (dw, dh) = (extent(dst.0), extent(dst.1));

        if sx < 0 {
            dx -= sx;
            w += sx;
            sx = 0;
        }
        if sy < 0 {
            dy -= sy;
            h += sy;
            sy = 0;
        }
        if dx < 0 {
            sx -= dx;
            w += dx;
            dx = 0;
        }
        if dy < 0 {
            sy -= dy;
            h += dy;
            dy = 0;
        }
        w = w.min(sw - sx).min(dw - dx);
        h = h.min(sh - sy).min(dh - dy);
        if w <= 0 || h <= 0 {
            return None;
        }

        Some(CopyRect {
            sx: sx as usize,
            sy: sy as usize,
            dx: dx as usize,
            dy: dy as usize,
            w: w as usize,
            h: h as usize,
        })
    }

    #[inline]
    pub const fn pixels(&self) -> usize {
        self.w * self.h
    }
}

/// The rows of a rectangle inside a bitmap at `base`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RectRows {
    base: usize,
    stride: usize,
    bpp: usize,
    rect: Rect,
    full_width: bool,
}

impl RectRows {
    pub fn new(base: usize, width: usize, depth: PixelDepth, rect: Rect) -> Self {
        let bpp = depth.bytes();
        Self {
            base,
            stride: width * bpp,
            bpp,
            rect,
            full_width: rect.x == 0 && rect.w == width,
        }
    }

    /// True when the rectangle spans whole rows, so memory is contiguous.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.full_width
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rect.h
    }

    /// Bytes of row `i` of the rectangle.
    #[inline]
    pub fn row(&self, i: usize) -> Span {
        let addr = self.base + (self.rect.y + i) * self.stride + self.rect.x * self.bpp;
        Span::new(addr, self.rect.w * self.bpp)
    }

    /// The whole rectangle as one span. Only meaningful when contiguous.
    #[inline]
    pub fn whole(&self) -> Span {
        Span::new(self.row(0).addr, self.rect.h * self.stride)
    }

    /// One span if contiguous, otherwise one per row.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        let (count, whole) = if self.full_width { (1, true) } else { (self.rect.h, false) };
        (0..count).map(move |i| if whole { self.whole() } else { self.row(i) })
    }
}
