//! # Bulk Transfers (DMA3)
//!
//! DMA channel 3 copies or fills memory without the CPU touching each
//! halfword. It has a fixed setup cost, so it only pays off above a size
//! threshold; the [`engine`] decides when.
//!
//! ## Register Layout
//!
//! | Address      | Name   | Description                                  |
//! |--------------|--------|----------------------------------------------|
//! | `$0400_00D4` | SAD    | Source address                               |
//! | `$0400_00D8` | DAD    | Destination address                          |
//! | `$0400_00DC` | CNT_L  | Unit count (0 means `$10000`)                |
//! | `$0400_00DE` | CNT_H  | Control, see [`DmaControl`]                  |
//!
//! ## Protocol
//!
//! 1. Wait until the channel isn't busy
//! 2. Program source, destination and count
//! 3. Write the control word with the enable bit set
//! 4. Wait until the channel isn't busy again
//!
//! Step 4 makes every transfer synchronous from the caller's point of view.
//! There's one channel and no queue: a second caller just spins in step 1.

pub mod engine;
pub mod plan;

use core::cell::Cell;

use bitfield::bitfield;
use volatile_register::{RW, WO};

/// Largest unit count one request can carry.
pub const MAX_TRANSFER_UNITS: usize = 0x1_0000;

bitfield! {
    /// DMA control word (CNT_H).
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct DmaControl(u16);
    impl Debug;
    /// Destination address step, see [`AddressStep`].
    pub u8, dest_step, set_dest_step: 6, 5;
    /// Source address step, see [`AddressStep`].
    pub u8, source_step, set_source_step: 8, 7;
    pub repeat, set_repeat: 9;
    /// Set for 32-bit units, clear for 16-bit.
    pub word_units, set_word_units: 10;
    /// Start timing; 0 starts immediately.
    pub u8, timing, set_timing: 13, 12;
    pub irq, set_irq: 14;
    /// Starts the transfer. Reads back set while it's running.
    pub enable, set_enable: 15;
}

impl DmaControl {
    #[inline(always)]
    pub fn bits(&self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn from_bits(bits: u16) -> Self {
        DmaControl(bits)
    }

    #[inline]
    pub fn width(&self) -> TransferWidth {
        if self.word_units() { TransferWidth::Word } else { TransferWidth::Half }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressStep {
    Increment = 0,
    Decrement = 1,
    Fixed = 2,
    /// Increment, and reload the destination on repeat. Destination only.
    IncrementReload = 3,
}

impl AddressStep {
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => AddressStep::Increment,
            1 => AddressStep::Decrement,
            2 => AddressStep::Fixed,
            _ => AddressStep::IncrementReload,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferWidth {
    Half,
    Word,
}

impl TransferWidth {
    #[inline(always)]
    pub const fn bytes(self) -> usize {
        match self {
            TransferWidth::Half => 2,
            TransferWidth::Word => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferSource {
    /// Read from memory starting here.
    Address(usize),
    /// Repeat this value. For 16-bit transfers only the low half is used.
    Fill(u32),
}

/// One transfer, as handed to a [`TransferChannel`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: TransferSource,
    pub destination: usize,
    /// Units (not bytes) to move, `1..=MAX_TRANSFER_UNITS`.
    pub count: usize,
    pub width: TransferWidth,
    pub source_step: AddressStep,
    pub dest_step: AddressStep,
}

impl TransferRequest {
    pub fn fill(destination: usize, value: u32, count: usize, width: TransferWidth) -> Self {
        Self {
            source: TransferSource::Fill(value),
            destination,
            count,
            width,
            source_step: AddressStep::Fixed,
            dest_step: AddressStep::Increment,
        }
    }

    pub fn copy(source: usize, destination: usize, count: usize, width: TransferWidth) -> Self {
        Self {
            source: TransferSource::Address(source),
            destination,
            count,
            width,
            source_step: AddressStep::Increment,
            dest_step: AddressStep::Increment,
        }
    }

    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.count * self.width.bytes()
    }

    /// Control word for this request, start-immediately, enable bit clear.
    pub fn control(&self) -> DmaControl {
        let mut control = DmaControl(0);
        control.set_dest_step(self.dest_step as u8);
        control.set_source_step(self.source_step as u8);
        control.set_word_units(self.width == TransferWidth::Word);
        control.set_timing(0);
        control
    }

    /// The value CNT_L takes for this count.
    #[inline]
    pub fn count_register(&self) -> u16 {
        // MAX_TRANSFER_UNITS wraps to 0, which the hardware reads as $10000
        self.count as u16
    }
}

/// A hardware transfer channel.
///
/// The [`engine`](engine::BulkTransferEngine) drives the protocol; this trait
/// is only the register-level surface.
pub trait TransferChannel {
    /// True while a transfer is in flight.
    fn is_busy(&self) -> bool;

    /// Latch source, destination and count. Doesn't start anything.
    fn program(&self, request: &TransferRequest);

    /// Write the control word. Starts the transfer if `enable` is set.
    fn start(&self, control: DmaControl);
}

/// DMA3 register block at `$0400_00D4`.
#[repr(C)]
pub struct Dma3Registers {
    pub sad: WO<u32>,
    pub dad: WO<u32>,
    pub cnt_l: WO<u16>,
    pub cnt_h: RW<u16>,
}

/// DMA channel 3 on hardware.
pub struct Dma3 {
    regs: &'static Dma3Registers,
    /// Source cell for fills. SAD points here with a fixed source step.
    fill_word: Cell<u32>,
}

impl Dma3 {
    /// # Safety
    ///
    /// Hardware only, and only one `Dma3` should exist: nothing else may
    /// program channel 3 while this handle is in use.
    pub unsafe fn new() -> Dma3 {
        Dma3 {
            regs: unsafe { &*(0x0400_00D4 as *const Dma3Registers) },
            fill_word: Cell::new(0),
        }
    }
}

impl TransferChannel for Dma3 {
    #[inline(always)]
    fn is_busy(&self) -> bool {
        DmaControl(self.regs.cnt_h.read()).enable()
    }

    #[inline(always)]
    fn program(&self, request: &TransferRequest) {
        let source = match request.source {
            TransferSource::Address(addr) => addr,
            TransferSource::Fill(value) => {
                self.fill_word.set(value);
                self.fill_word.as_ptr() as usize
            }
        };
        unsafe {
            self.regs.sad.write(source as u32);
            self.regs.dad.write(request.destination as u32);
            self.regs.cnt_l.write(request.count_register());
        }
    }

    #[inline(always)]
    fn start(&self, control: DmaControl) {
        unsafe { self.regs.cnt_h.write(control.bits()) }
    }
}
