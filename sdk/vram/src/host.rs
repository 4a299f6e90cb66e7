//! # Host Doubles
//!
//! In-memory stand-ins for the hardware traits, so everything above the
//! register layer runs (and gets tested) off target.
//!
//! | Hardware           | Double          | Behaviour                              |
//! |--------------------|-----------------|----------------------------------------|
//! | [`VolatileBus`]    | [`HostMemory`]  | Little-endian bytes at a fixed base    |
//! | [`Dma3`]           | [`HostChannel`] | Runs the transfer on `HostMemory`      |
//! | [`Lcd`]            | [`HostLcd`]     | Holds DISPCNT, records every event     |
//!
//! [`VolatileBus`]: crate::mmio::VolatileBus
//! [`Dma3`]: crate::dma::Dma3
//! [`Lcd`]: crate::scr::Lcd

use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::dma::{
    AddressStep, DmaControl, TransferChannel, TransferRequest, TransferSource, TransferWidth,
};
use crate::mmio::MemoryBus;
use crate::mode::{VRAM_BASE, VRAM_SIZE};
use crate::region::MemoryRegion;
use crate::scr::{DisplayFlags, DisplayRegister, VBlankWait};

/// A block of plain memory answering at `base..base + len`.
///
/// Accesses outside it read 0 and drop writes, the same as open bus.
pub struct HostMemory {
    base: usize,
    bytes: Vec<Cell<u8>>,
}

impl HostMemory {
    pub fn new(base: usize, size: usize) -> Self {
        Self {
            base,
            bytes: (0..size).map(|_| Cell::new(0)).collect(),
        }
    }

    /// A zeroed 96KB VRAM at `$0600_0000`.
    pub fn vram() -> Self {
        Self::new(VRAM_BASE, VRAM_SIZE)
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The whole block as a region.
    pub fn region(&self) -> MemoryRegion<'_, Self> {
        // SAFETY: every address in the range is backed by `bytes`
        unsafe { MemoryRegion::new(self, self.base, self.bytes.len()) }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.iter().map(Cell::get).collect()
    }

    pub fn peek8(&self, addr: usize) -> u8 {
        self.index(addr, 1).map_or(0, |i| self.bytes[i].get())
    }

    pub fn poke8(&self, addr: usize, value: u8) {
        if let Some(i) = self.index(addr, 1) {
            self.bytes[i].set(value);
        }
    }

    fn index(&self, addr: usize, width: usize) -> Option<usize> {
        let offset = addr.checked_sub(self.base)?;
        let end = offset.checked_add(width)?;
        (end <= self.bytes.len()).then_some(offset)
    }
}

impl MemoryBus for HostMemory {
    unsafe fn read16(&self, addr: usize) -> u16 {
        match self.index(addr, 2) {
            Some(i) => u16::from_le_bytes([self.bytes[i].get(), self.bytes[i + 1].get()]),
            None => 0,
        }
    }

    unsafe fn write16(&self, addr: usize, value: u16) {
        if let Some(i) = self.index(addr, 2) {
            let [lo, hi] = value.to_le_bytes();
            self.bytes[i].set(lo);
            self.bytes[i + 1].set(hi);
        }
    }
}

/// Source, destination and count latched by `program`.
#[derive(Debug, Copy, Clone)]
struct Latch {
    source: TransferSource,
    destination: usize,
    count: u16,
}

/// A DMA channel that performs its transfers against a [`HostMemory`].
///
/// The transfer itself happens at once when the enable bit is written. The
/// channel then reports busy for `latency` polls, so callers that skip the
/// completion wait are caught by [`HostChannel::busy_polls`].
pub struct HostChannel<'m> {
    memory: &'m HostMemory,
    latency: usize,
    busy_for: Cell<usize>,
    latch: Cell<Option<Latch>>,
    requests: RefCell<Vec<TransferRequest>>,
    controls: RefCell<Vec<DmaControl>>,
    busy_polls: Cell<usize>,
    programmed_while_busy: Cell<bool>,
}

impl<'m> HostChannel<'m> {
    pub fn new(memory: &'m HostMemory) -> Self {
        Self::with_latency(memory, 0)
    }

    pub fn with_latency(memory: &'m HostMemory, latency: usize) -> Self {
        Self {
            memory,
            latency,
            busy_for: Cell::new(0),
            latch: Cell::new(None),
            requests: RefCell::new(Vec::new()),
            controls: RefCell::new(Vec::new()),
            busy_polls: Cell::new(0),
            programmed_while_busy: Cell::new(false),
        }
    }

    /// Pretend a transfer someone else started is still running.
    pub fn hold_busy(&self, polls: usize) {
        self.busy_for.set(polls);
    }

    /// Every request programmed so far, in order.
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.borrow().clone()
    }

    /// Every control word written so far, in order.
    pub fn controls(&self) -> Vec<DmaControl> {
        self.controls.borrow().clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.controls.borrow().iter().filter(|c| c.enable()).count()
    }

    pub fn busy_polls(&self) -> usize {
        self.busy_polls.get()
    }

    /// True if anything was programmed while a transfer was still running.
    pub fn programmed_while_busy(&self) -> bool {
        self.programmed_while_busy.get()
    }

    /// True if the channel is idle right now, without counting a poll.
    pub fn is_idle(&self) -> bool {
        self.busy_for.get() == 0
    }

    fn run(&self, latch: Latch, control: DmaControl) {
        let width = control.width();
        let unit = width.bytes() as isize;
        let count = match latch.count {
            0 => 0x1_0000,
            n => n as usize,
        };
        let step = |bits: u8| match AddressStep::from_bits(bits) {
            AddressStep::Increment | AddressStep::IncrementReload => unit,
            AddressStep::Decrement => -unit,
            AddressStep::Fixed => 0,
        };
        let src_step = step(control.source_step());
        let dst_step = step(control.dest_step());

        let mut dst = latch.destination as isize;
        let mut src = match latch.source {
            TransferSource::Address(addr) => addr as isize,
            TransferSource::Fill(_) => 0,
        };

        for _ in 0..count {
            let value = match latch.source {
                TransferSource::Fill(value) => value,
                TransferSource::Address(_) => match width {
                    TransferWidth::Half => unsafe { self.memory.read16(src as usize) as u32 },
                    TransferWidth::Word => unsafe { self.memory.read32(src as usize) },
                },
            };
            match width {
                TransferWidth::Half => unsafe { self.memory.write16(dst as usize, value as u16) },
                TransferWidth::Word => unsafe { self.memory.write32(dst as usize, value) },
            }
            src += src_step;
            dst += dst_step;
        }
    }
}

impl TransferChannel for HostChannel<'_> {
    fn is_busy(&self) -> bool {
        let left = self.busy_for.get();
        if left == 0 {
            return false;
        }
        self.busy_for.set(left - 1);
        self.busy_polls.set(self.busy_polls.get() + 1);
        true
    }

    fn program(&self, request: &TransferRequest) {
        if !self.is_idle() {
            self.programmed_while_busy.set(true);
        }
        self.requests.borrow_mut().push(*request);
        self.latch.set(Some(Latch {
            source: request.source,
            destination: request.destination,
            count: request.count_register(),
        }));
    }

    fn start(&self, control: DmaControl) {
        self.controls.borrow_mut().push(control);
        if !control.enable() {
            return;
        }
        if let Some(latch) = self.latch.get() {
            self.run(latch, control);
        }
        self.busy_for.set(self.latency);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LcdEvent {
    VBlank,
    Write(DisplayFlags),
}

/// A display register that remembers what happened to it.
#[derive(Default)]
pub struct HostLcd {
    dispcnt: Cell<u16>,
    events: RefCell<Vec<LcdEvent>>,
}

impl HostLcd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LcdEvent> {
        self.events.borrow().clone()
    }

    pub fn writes(&self) -> Vec<DisplayFlags> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                LcdEvent::Write(flags) => Some(*flags),
                LcdEvent::VBlank => None,
            })
            .collect()
    }

    pub fn vblank_waits(&self) -> usize {
        self.events.borrow().iter().filter(|e| **e == LcdEvent::VBlank).count()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }
}

impl DisplayRegister for HostLcd {
    fn read(&self) -> DisplayFlags {
        DisplayFlags::from_bits_retain(self.dispcnt.get())
    }

    fn write(&self, flags: DisplayFlags) {
        self.dispcnt.set(flags.bits());
        self.events.borrow_mut().push(LcdEvent::Write(flags));
    }
}

impl VBlankWait for HostLcd {
    fn wait_for_vblank(&self) {
        self.events.borrow_mut().push(LcdEvent::VBlank);
    }
}
