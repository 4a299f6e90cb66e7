//! # Memory Buses
//!
//! Video memory is reached through a [`MemoryBus`]. On hardware that's
//! [`VolatileBus`], which turns every access into a volatile load or store at
//! the absolute address. Off target, [`host::HostMemory`](crate::host::HostMemory)
//! backs the same trait with plain bytes.
//!
//! Accesses take `&self`: like real MMIO, several views may point at the same
//! memory at once (a copy reads one page while writing the other).
//!
//! ## No Byte Stores
//!
//! Frame memory ignores 8-bit writes on the GBA (they get smeared across the
//! halfword), so the bus only exposes 16 and 32-bit accesses. Byte-sized
//! writes are built on top as read-modify-write in
//! [`MemoryRegion::write8`](crate::region::MemoryRegion::write8).

/// Raw 16/32-bit access to an address space.
///
/// Implementors perform no bounds checks; [`MemoryRegion`](crate::region::MemoryRegion)
/// is the checked layer on top.
pub trait MemoryBus {
    /// # Safety
    ///
    /// `addr` must be 2-aligned and inside memory this bus backs.
    unsafe fn read16(&self, addr: usize) -> u16;

    /// # Safety
    ///
    /// `addr` must be 2-aligned and inside memory this bus backs.
    unsafe fn write16(&self, addr: usize, value: u16);

    /// # Safety
    ///
    /// `addr` must be 4-aligned and `addr..addr + 4` inside memory this bus backs.
    #[inline(always)]
    unsafe fn read32(&self, addr: usize) -> u32 {
        unsafe {
            let lo = self.read16(addr) as u32;
            let hi = self.read16(addr + 2) as u32;
            lo | (hi << 16)
        }
    }

    /// # Safety
    ///
    /// `addr` must be 4-aligned and `addr..addr + 4` inside memory this bus backs.
    #[inline(always)]
    unsafe fn write32(&self, addr: usize, value: u32) {
        unsafe {
            self.write16(addr, value as u16);
            self.write16(addr + 2, (value >> 16) as u16);
        }
    }
}

impl<T: MemoryBus + ?Sized> MemoryBus for &T {
    #[inline(always)]
    unsafe fn read16(&self, addr: usize) -> u16 {
        unsafe { (**self).read16(addr) }
    }

    #[inline(always)]
    unsafe fn write16(&self, addr: usize, value: u16) {
        unsafe { (**self).write16(addr, value) }
    }

    #[inline(always)]
    unsafe fn read32(&self, addr: usize) -> u32 {
        unsafe { (**self).read32(addr) }
    }

    #[inline(always)]
    unsafe fn write32(&self, addr: usize, value: u32) {
        unsafe { (**self).write32(addr, value) }
    }
}

/// The real thing: volatile accesses at absolute addresses.
#[derive(Debug)]
pub struct VolatileBus {
    _private: (),
}

impl VolatileBus {
    /// # Safety
    ///
    /// Only one bus should exist per address space, and only on hardware
    /// where the addresses it's used with are mapped.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl MemoryBus for VolatileBus {
    #[inline(always)]
    unsafe fn read16(&self, addr: usize) -> u16 {
        unsafe { core::ptr::read_volatile(addr as *const u16) }
    }

    #[inline(always)]
    unsafe fn write16(&self, addr: usize, value: u16) {
        unsafe { core::ptr::write_volatile(addr as *mut u16, value) }
    }

    #[inline(always)]
    unsafe fn read32(&self, addr: usize) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    unsafe fn write32(&self, addr: usize, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}
