//! # Display Control Registers
//!
//! The LCD I/O block at `$0400_0000`:
//!
//! | Address      | Name     | Used for                                  |
//! |--------------|----------|-------------------------------------------|
//! | `$0400_0000` | DISPCNT  | Mode, page select, background enables     |
//! | `$0400_0004` | DISPSTAT | Blank status and interrupt enables        |
//! | `$0400_0006` | VCOUNT   | Line currently being drawn (0-227)        |
//!
//! ## DISPCNT
//!
//! | Bits  | Flag          | Effect                                      |
//! |-------|---------------|---------------------------------------------|
//! | 0-2   | mode          | Video mode number                           |
//! | 4     | `PAGE_SELECT` | Show page 1 instead of page 0 (modes 4, 5)  |
//! | 10    | `BG2_ENABLE`  | Background 2 on, which is the bitmap layer  |
//!
//! This crate always writes DISPCNT as one whole value built from those bits.
//! Anything else living in the register (window or sprite enables) has to be
//! coordinated by the caller.

use volatile_register::{RO, RW};

use crate::mode::VideoMode;

/// First line of the vertical blank period.
pub const VBLANK_LINE: u16 = 160;

bitflags::bitflags! {
    /// Display control flags at `$0400_0000`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct DisplayFlags: u16 {
        /// Video mode number, bits 0-2.
        const MODE_MASK   = 0b0000_0000_0000_0111;
        /// Select which bitmap page is displayed. Toggle for double buffering.
        const PAGE_SELECT = 0b0000_0000_0001_0000;
        /// Enable background 2 (the bitmap layer in modes 3-5).
        const BG2_ENABLE  = 0b0000_0100_0000_0000;
    }
}

impl DisplayFlags {
    /// The full DISPCNT value for `mode` showing `page`.
    ///
    /// This is what gets written on a flip: mode, BG2 and page together, so
    /// the register never holds a half-updated value.
    #[inline]
    pub fn compose(mode: VideoMode, page: usize) -> Self {
        let mut flags = DisplayFlags::from_bits_retain(mode.bits()) | DisplayFlags::BG2_ENABLE;
        flags.set(DisplayFlags::PAGE_SELECT, page == 1);
        flags
    }

    #[inline]
    pub fn mode_bits(self) -> u16 {
        self.bits() & DisplayFlags::MODE_MASK.bits()
    }

    #[inline]
    pub fn page(self) -> usize {
        self.contains(DisplayFlags::PAGE_SELECT) as usize
    }
}

/// Write access to the display control register.
pub trait DisplayRegister {
    fn read(&self) -> DisplayFlags;
    fn write(&self, flags: DisplayFlags);
}

/// Something that can block until the next vertical blank starts.
pub trait VBlankWait {
    fn wait_for_vblank(&self);
}

impl<T: DisplayRegister + ?Sized> DisplayRegister for &T {
    #[inline(always)]
    fn read(&self) -> DisplayFlags {
        (**self).read()
    }

    #[inline(always)]
    fn write(&self, flags: DisplayFlags) {
        (**self).write(flags)
    }
}

impl<T: VBlankWait + ?Sized> VBlankWait for &T {
    #[inline(always)]
    fn wait_for_vblank(&self) {
        (**self).wait_for_vblank()
    }
}

/// LCD register block at `$0400_0000`.
#[repr(C)]
pub struct Lcd {
    /// DISPCNT
    pub dispcnt: RW<u16>,
    /// Undocumented green swap.
    pub greenswap: RW<u16>,
    /// DISPSTAT
    pub dispstat: RW<u16>,
    /// VCOUNT
    pub vcount: RO<u16>,
}

impl Lcd {
    /// Get a reference to the LCD registers at `$0400_0000`.
    ///
    /// # Safety
    ///
    /// Hardware only. The display register is written as a whole value, so
    /// only one owner should be changing it.
    #[inline(always)]
    pub unsafe fn new() -> &'static Lcd {
        unsafe { &*(0x0400_0000 as *const Lcd) }
    }

    #[inline(always)]
    pub fn in_vblank(&self) -> bool {
        self.vcount.read() >= VBLANK_LINE
    }
}

impl DisplayRegister for Lcd {
    #[inline(always)]
    fn read(&self) -> DisplayFlags {
        DisplayFlags::from_bits_retain(self.dispcnt.read())
    }

    #[inline(always)]
    fn write(&self, flags: DisplayFlags) {
        unsafe { self.dispcnt.write(flags.bits()) }
    }
}

impl VBlankWait for Lcd {
    /// Spin until VCOUNT enters the blank period. If we're already in one,
    /// wait it out first so a whole blank is ahead of the caller.
    fn wait_for_vblank(&self) {
        while self.in_vblank() {
            core::hint::spin_loop();
        }
        while !self.in_vblank() {
            core::hint::spin_loop();
        }
    }
}
