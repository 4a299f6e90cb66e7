//! The bulk transfer engine: software for small jobs, DMA3 for big ones.
//!
//! Pixel-level calls ([`fill_rect`](BulkTransferEngine::fill_rect),
//! [`copy_rect`](BulkTransferEngine::copy_rect) and friends) clamp first, then
//! pick a path by pixel count:
//!
//! | Operation | Software below | DMA at or above |
//! |-----------|----------------|-----------------|
//! | fill      | 64 px          | 64 px           |
//! | copy      | 128 px         | 128 px          |
//!
//! On the DMA path each span is split into unaligned head bytes, whole words
//! for the channel, and tail bytes. Both paths leave memory byte-identical.

use core::hint::spin_loop;

use log::trace;

use crate::bitmap::BitmapBuffer;
use crate::dma::plan::{CopyRect, Rect, RectRows, Span};
use crate::dma::{
    AddressStep, MAX_TRANSFER_UNITS, TransferChannel, TransferRequest, TransferSource,
    TransferWidth,
};
use crate::error::VramError;
use crate::mmio::MemoryBus;
use crate::region::MemoryRegion;

/// Fills smaller than this many pixels stay in software.
pub const FILL_THRESHOLD: usize = 64;

/// Copies smaller than this many pixels stay in software.
pub const COPY_THRESHOLD: usize = 128;

pub struct BulkTransferEngine<'c, C: TransferChannel + ?Sized> {
    channel: &'c C,
}

impl<'c, C: TransferChannel + ?Sized> BulkTransferEngine<'c, C> {
    pub fn new(channel: &'c C) -> Self {
        Self { channel }
    }

    #[inline(always)]
    pub fn channel(&self) -> &'c C {
        self.channel
    }

    /// Spin until the channel is idle.
    #[inline]
    pub fn wait_idle(&self) {
        while self.channel.is_busy() {
            spin_loop();
        }
    }

    /// Run `request` to completion, splitting it if it's larger than the
    /// channel's count field.
    pub fn submit(&self, request: &TransferRequest) {
        let unit = request.width.bytes();
        let mut chunk = *request;
        let mut remaining = request.count;

        while remaining > 0 {
            chunk.count = remaining.min(MAX_TRANSFER_UNITS);
            self.issue(&chunk);

            let advanced = chunk.count * unit;
            chunk.destination = step(chunk.destination, chunk.dest_step, advanced);
            if let TransferSource::Address(addr) = chunk.source {
                chunk.source = TransferSource::Address(step(addr, chunk.source_step, advanced));
            }
            remaining -= chunk.count;
        }
    }

    fn issue(&self, request: &TransferRequest) {
        trace!(
            "dma3 {:?} -> {:#010X}, {} x {:?}",
            request.source,
            request.destination,
            request.count,
            request.width
        );

        self.wait_idle();
        self.channel.program(request);
        let mut control = request.control();
        control.set_enable(true);
        self.channel.start(control);
        self.wait_idle();
    }

    /// Fill `count` units at `offset` in `region` with `value`, always by DMA.
    ///
    /// The whole range must be inside the region and aligned to `width`.
    /// For pixel fills that pick software or DMA by size, use
    /// [`fill_rect`](Self::fill_rect) or [`clear`](Self::clear).
    pub fn fast_fill<B: MemoryBus + ?Sized>(
        &self,
        region: &MemoryRegion<'_, B>,
        offset: usize,
        value: u32,
        count: usize,
        width: TransferWidth,
    ) -> Result<(), VramError> {
        check_units(region, offset, count, width)?;
        if count > 0 {
            let value = match width {
                TransferWidth::Half => value & 0xFFFF,
                TransferWidth::Word => value,
            };
            self.submit(&TransferRequest::fill(region.address_of(offset), value, count, width));
        }
        Ok(())
    }

    /// Copy `count` units between regions, always by DMA.
    ///
    /// [`copy_rect`](Self::copy_rect) and [`copy_buffer`](Self::copy_buffer)
    /// are the size-thresholded pixel copies.
    pub fn fast_copy<S: MemoryBus + ?Sized, D: MemoryBus + ?Sized>(
        &self,
        src: &MemoryRegion<'_, S>,
        src_offset: usize,
        dst: &MemoryRegion<'_, D>,
        dst_offset: usize,
        count: usize,
        width: TransferWidth,
    ) -> Result<(), VramError> {
        check_units(src, src_offset, count, width)?;
        check_units(dst, dst_offset, count, width)?;
        if count > 0 {
            self.submit(&TransferRequest::copy(
                src.address_of(src_offset),
                dst.address_of(dst_offset),
                count,
                width,
            ));
        }
        Ok(())
    }

    pub fn fill16<B: MemoryBus + ?Sized>(
        &self,
        region: &MemoryRegion<'_, B>,
        offset: usize,
        value: u16,
        count: usize,
    ) -> Result<(), VramError> {
        self.fast_fill(region, offset, value as u32, count, TransferWidth::Half)
    }

    pub fn fill32<B: MemoryBus + ?Sized>(
        &self,
        region: &MemoryRegion<'_, B>,
        offset: usize,
        value: u32,
        count: usize,
    ) -> Result<(), VramError> {
        self.fast_fill(region, offset, value, count, TransferWidth::Word)
    }

    pub fn copy16<S: MemoryBus + ?Sized, D: MemoryBus + ?Sized>(
        &self,
        src: &MemoryRegion<'_, S>,
        src_offset: usize,
        dst: &MemoryRegion<'_, D>,
        dst_offset: usize,
        count: usize,
    ) -> Result<(), VramError> {
        self.fast_copy(src, src_offset, dst, dst_offset, count, TransferWidth::Half)
    }

    pub fn copy32<S: MemoryBus + ?Sized, D: MemoryBus + ?Sized>(
        &self,
        src: &MemoryRegion<'_, S>,
        src_offset: usize,
        dst: &MemoryRegion<'_, D>,
        dst_offset: usize,
        count: usize,
    ) -> Result<(), VramError> {
        self.fast_copy(src, src_offset, dst, dst_offset, count, TransferWidth::Word)
    }

    /// Fill a rectangle of `buffer`, clamped like
    /// [`BitmapBuffer::fill_rect`].
    pub fn fill_rect<B: MemoryBus + ?Sized>(
        &self,
        buffer: &BitmapBuffer<'_, B>,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: u16,
    ) {
        let Some(rect) = Rect::clamp(x, y, w, h, buffer.width(), buffer.height()) else {
            return;
        };
        if rect.pixels() < FILL_THRESHOLD {
            buffer.fill_clamped(rect, color);
            return;
        }

        let pattern = buffer.depth().splat(color);
        let rows = RectRows::new(buffer.base(), buffer.width(), buffer.depth(), rect);
        for span in rows.spans() {
            self.fill_span(&buffer.region(), span, pattern);
        }
    }

    /// Fill the whole buffer.
    pub fn clear<B: MemoryBus + ?Sized>(&self, buffer: &BitmapBuffer<'_, B>, color: u16) {
        self.fill_rect(buffer, 0, 0, buffer.width() as i32, buffer.height() as i32, color);
    }

    /// Copy a block from `src` into `dst`, clamped like
    /// [`BitmapBuffer::copy_from`].
    #[allow(clippy::too_many_arguments)]
    pub fn copy_rect<S: MemoryBus + ?Sized, D: MemoryBus + ?Sized>(
        &self,
        dst: &BitmapBuffer<'_, D>,
        src: &BitmapBuffer<'_, S>,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
    ) {
        let Some(rect) = CopyRect::clamp(
            (src.width(), src.height()),
            (dst.width(), dst.height()),
            sx,
            sy,
            dx,
            dy,
            w,
            h,
        ) else {
            return;
        };

        if src.depth() != dst.depth() || rect.pixels() < COPY_THRESHOLD {
            dst.copy_clamped(src, rect);
            return;
        }

        let src_rows = RectRows::new(
            src.base(),
            src.width(),
            src.depth(),
            Rect { x: rect.sx, y: rect.sy, w: rect.w, h: rect.h },
        );
        let dst_rows = RectRows::new(
            dst.base(),
            dst.width(),
            dst.depth(),
            Rect { x: rect.dx, y: rect.dy, w: rect.w, h: rect.h },
        );

        if src_rows.is_contiguous() && dst_rows.is_contiguous() {
            self.copy_span(&src.region(), src_rows.whole(), &dst.region(), dst_rows.whole());
        } else {
            for i in 0..rect.h {
                self.copy_span(&src.region(), src_rows.row(i), &dst.region(), dst_rows.row(i));
            }
        }
    }

    /// Copy all of `src` onto `dst`. Mismatched buffers fall back to a
    /// clamped pixel copy.
    pub fn copy_buffer<S: MemoryBus + ?Sized, D: MemoryBus + ?Sized>(
        &self,
        dst: &BitmapBuffer<'_, D>,
        src: &BitmapBuffer<'_, S>,
    ) {
        let (w, h) = (src.width() as i32, src.height() as i32);
        if src.depth() != dst.depth() {
            dst.copy_from(src, 0, 0, 0, 0, w, h);
            return;
        }
        self.copy_rect(dst, src, 0, 0, 0, 0, w, h);
    }

    /// Fill one span with a repeating word, DMA for the aligned middle.
    fn fill_span<B: MemoryBus + ?Sized>(&self, region: &MemoryRegion<'_, B>, span: Span, pattern: u32) {
        let split = span.split();
        let bytes = pattern.to_le_bytes();
        let rel = |addr: usize| addr - region.base();

        for addr in split.head.addr..split.head.end() {
            region.write8(rel(addr), bytes[addr % 4]);
        }
        if !split.body.is_empty() {
            self.submit(&TransferRequest::fill(split.body.addr, pattern, split.body.len / 4, TransferWidth::Word));
        }
        for addr in split.tail.addr..split.tail.end() {
            region.write8(rel(addr), bytes[addr % 4]);
        }
    }

    /// Copy one span. Words when both ends share alignment mod 4, halfwords
    /// mod 2, otherwise bytes.
    fn copy_span<S: MemoryBus + ?Sized, D: MemoryBus + ?Sized>(
        &self,
        src: &MemoryRegion<'_, S>,
        from: Span,
        dst: &MemoryRegion<'_, D>,
        to: Span,
    ) {
        let byte_copy = |at: usize, len: usize| {
            for i in at..at + len {
                dst.write8(to.addr - dst.base() + i, src.read8(from.addr - src.base() + i));
            }
        };

        let width = match (from.addr ^ to.addr) % 4 {
            0 => TransferWidth::Word,
            2 => TransferWidth::Half,
            _ => {
                byte_copy(0, to.len);
                return;
            }
        };

        let split = to.split_aligned(width.bytes());
        byte_copy(0, split.head.len);
        if !split.body.is_empty() {
            let skip = split.head.len;
            self.submit(&TransferRequest::copy(
                from.addr + skip,
                split.body.addr,
                split.body.len / width.bytes(),
                width,
            ));
        }
        byte_copy(split.tail.addr - to.addr, split.tail.len);
    }
}

fn step(addr: usize, step: AddressStep, bytes: usize) -> usize {
    match step {
        AddressStep::Increment | AddressStep::IncrementReload => addr + bytes,
        AddressStep::Decrement => addr - bytes,
        AddressStep::Fixed => addr,
    }
}

fn check_units<B: MemoryBus + ?Sized>(
    region: &MemoryRegion<'_, B>,
    offset: usize,
    count: usize,
    width: TransferWidth,
) -> Result<(), VramError> {
    let len = count.checked_mul(width.bytes()).ok_or(VramError::InvalidLength)?;
    if !region.contains(offset, len) || region.address_of(offset) % width.bytes() != 0 {
        return Err(VramError::OutOfBounds);
    }
    Ok(())
}
