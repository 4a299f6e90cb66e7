//! # Memory Regions
//!
//! A [`MemoryRegion`] is a fixed `base..base + size` window onto a
//! [`MemoryBus`]. Every access is checked against the window:
//!
//! - reads outside the window (or misaligned for their width) return `0`
//! - writes outside the window (or misaligned) are dropped
//!
//! There's no fault to raise on the hardware, and a draw loop that wanders off
//! the edge shouldn't take the frame down with it.
//!
//! Regions nest with [`MemoryRegion::sub`], which is how frames, character
//! blocks and screen blocks get their own bounds inside VRAM.

use bit_field::BitField;

use crate::mmio::MemoryBus;

pub struct MemoryRegion<'a, B: MemoryBus + ?Sized> {
    bus: &'a B,
    base: usize,
    size: usize,
}

impl<B: MemoryBus + ?Sized> Clone for MemoryRegion<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: MemoryBus + ?Sized> Copy for MemoryRegion<'_, B> {}

impl<B: MemoryBus + ?Sized> core::fmt::Debug for MemoryRegion<'_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("base", &format_args!("{:#010X}", self.base))
            .field("size", &format_args!("{:#X}", self.size))
            .finish()
    }
}

impl<'a, B: MemoryBus + ?Sized> MemoryRegion<'a, B> {
    /// # Safety
    ///
    /// `base..base + size` must be memory `bus` can access for as long as `'a`.
    pub const unsafe fn new(bus: &'a B, base: usize, size: usize) -> Self {
        Self { bus, base, size }
    }

    #[inline(always)]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn bus(&self) -> &'a B {
        self.bus
    }

    /// Absolute address of `offset`. Not checked.
    #[inline(always)]
    pub fn address_of(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// True if `width` bytes starting at `offset` fit inside the region.
    #[inline]
    pub fn contains(&self, offset: usize, width: usize) -> bool {
        offset.checked_add(width).is_some_and(|end| end <= self.size)
    }

    /// A nested region, or `None` if it wouldn't fit inside this one.
    pub fn sub(&self, offset: usize, size: usize) -> Option<MemoryRegion<'a, B>> {
        if !self.contains(offset, size) {
            return None;
        }
        Some(MemoryRegion {
            bus: self.bus,
            base: self.base + offset,
            size,
        })
    }

    #[inline(always)]
    fn accessible(&self, offset: usize, width: usize) -> bool {
        self.contains(offset, width) && (self.base + offset) % width == 0
    }

    #[inline]
    pub fn read16(&self, offset: usize) -> u16 {
        if !self.accessible(offset, 2) {
            return 0;
        }
        unsafe { self.bus.read16(self.base + offset) }
    }

    #[inline]
    pub fn write16(&self, offset: usize, value: u16) {
        if !self.accessible(offset, 2) {
            return;
        }
        unsafe { self.bus.write16(self.base + offset, value) }
    }

    #[inline]
    pub fn read32(&self, offset: usize) -> u32 {
        if !self.accessible(offset, 4) {
            return 0;
        }
        unsafe { self.bus.read32(self.base + offset) }
    }

    #[inline]
    pub fn write32(&self, offset: usize, value: u32) {
        if !self.accessible(offset, 4) {
            return;
        }
        unsafe { self.bus.write32(self.base + offset, value) }
    }

    /// Read one byte out of its containing halfword.
    #[inline]
    pub fn read8(&self, offset: usize) -> u8 {
        if !self.contains(offset, 1) {
            return 0;
        }
        let half = self.read16(offset & !1);
        half.get_bits(lane(offset)) as u8
    }

    /// Write one byte, preserving the other half of its halfword.
    #[inline]
    pub fn write8(&self, offset: usize, value: u8) {
        if !self.contains(offset, 1) {
            return;
        }
        let mut half = self.read16(offset & !1);
        half.set_bits(lane(offset), value as u16);
        self.write16(offset & !1, half);
    }

    /// Zero the whole region, a word at a time where alignment allows.
    pub fn clear(&self) {
        let mut offset = 0;
        while offset + 1 < self.size {
            if self.accessible(offset, 4) {
                self.write32(offset, 0);
                offset += 4;
            } else {
                self.write16(offset, 0);
                offset += 2;
            }
        }
        if offset < self.size {
            self.write8(offset, 0);
        }
    }

    /// Repeat `value` across every halfword of the region.
    pub fn fill16(&self, value: u16) {
        let mut offset = self.base % 2;
        while offset + 2 <= self.size {
            self.write16(offset, value);
            offset += 2;
        }
    }

    /// Copy `data` in at `offset`. Nothing is written unless all of it fits.
    pub fn load(&self, offset: usize, data: &[u8]) -> bool {
        if !self.contains(offset, data.len()) {
            return false;
        }
        let mut i = 0;
        while i < data.len() {
            let at = offset + i;
            if at % 2 == 0 && i + 1 < data.len() {
                self.write16(at, u16::from_le_bytes([data[i], data[i + 1]]));
                i += 2;
            } else {
                self.write8(at, data[i]);
                i += 1;
            }
        }
        true
    }

    /// Copy `out.len()` bytes starting at `offset` into `out`.
    pub fn dump(&self, offset: usize, out: &mut [u8]) -> bool {
        if !self.contains(offset, out.len()) {
            return false;
        }
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.read8(offset + i);
        }
        true
    }
}

/// Bit range of a byte inside its little-endian halfword.
#[inline(always)]
pub(crate) fn lane(offset: usize) -> core::ops::Range<usize> {
    if offset % 2 == 0 { 0..8 } else { 8..16 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostMemory;

    #[test]
    fn reads_back_what_was_written() {
        let mem = HostMemory::new(0x0600_0000, 64);
        let region = mem.region();

        region.write16(2, 0xBEEF);
        region.write32(8, 0xDEAD_CAFE);

        assert_eq!(region.read16(2), 0xBEEF);
        assert_eq!(region.read32(8), 0xDEAD_CAFE);
        assert_eq!(region.read16(8), 0xCAFE);
        assert_eq!(region.read16(10), 0xDEAD);
    }

    #[test]
    fn out_of_bounds_is_zero_and_no_op() {
        let mem = HostMemory::new(0x0600_0000, 16);
        let region = mem.region();
        region.fill16(0x1111);
        let before = mem.snapshot();

        region.write16(16, 0xFFFF);
        region.write32(14, 0xFFFF_FFFF);
        region.write16(usize::MAX - 1, 0xFFFF);

        assert_eq!(region.read16(16), 0);
        assert_eq!(region.read32(14), 0);
        assert_eq!(region.read32(usize::MAX - 2), 0);
        assert_eq!(mem.snapshot(), before);
    }

    #[test]
    fn misaligned_access_is_rejected() {
        let mem = HostMemory::new(0x0600_0000, 16);
        let region = mem.region();

        region.write16(1, 0xFFFF);
        region.write32(2, 0xFFFF_FFFF);

        assert!(mem.snapshot().iter().all(|&b| b == 0));
        assert_eq!(region.read32(2), 0);
    }

    #[test]
    fn byte_writes_keep_their_neighbour() {
        let mem = HostMemory::new(0x0600_0000, 4);
        let region = mem.region();
        region.write16(0, 0xAABB);

        region.write8(1, 0x12);
        assert_eq!(region.read16(0), 0x12BB);

        region.write8(0, 0x34);
        assert_eq!(region.read16(0), 0x1234);
        assert_eq!(region.read8(0), 0x34);
        assert_eq!(region.read8(1), 0x12);
    }

    #[test]
    fn clear_and_fill_cover_the_whole_region() {
        let mem = HostMemory::new(0x0600_0000, 22);
        let region = mem.region();

        region.fill16(0xA5A5);
        assert!(mem.snapshot().iter().all(|&b| b == 0xA5));

        region.clear();
        assert!(mem.snapshot().iter().all(|&b| b == 0));
    }

    #[test]
    fn sub_regions_are_bounded_by_their_parent() {
        let mem = HostMemory::new(0x0600_0000, 0x100);
        let region = mem.region();

        let sub = region.sub(0x40, 0x10).unwrap();
        assert_eq!(sub.base(), 0x0600_0040);
        assert!(region.sub(0xF8, 0x10).is_none());

        sub.fill16(0xFFFF);
        sub.write16(0x10, 0x1234);

        let snap = mem.snapshot();
        assert!(snap[..0x40].iter().all(|&b| b == 0));
        assert!(snap[0x40..0x50].iter().all(|&b| b == 0xFF));
        assert!(snap[0x50..].iter().all(|&b| b == 0));
    }

    #[test]
    fn load_and_dump_are_all_or_nothing() {
        let mem = HostMemory::new(0x0600_0000, 8);
        let region = mem.region();

        assert!(region.load(1, &[1, 2, 3, 4, 5]));
        let mut out = [0u8; 7];
        assert!(region.dump(0, &mut out));
        assert_eq!(out, [0, 1, 2, 3, 4, 5, 0]);

        assert!(!region.load(6, &[9, 9, 9]));
        assert!(!region.dump(4, &mut [0u8; 5]));
        assert_eq!(region.read8(6), 0);
    }
}
