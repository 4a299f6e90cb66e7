//! # Page Flipping
//!
//! Modes 4 and 5 have two bitmap pages. One is shown (front) while the other
//! is drawn (back); a swap exchanges them by toggling DISPCNT's page bit.
//!
//! ```text
//!            page = 0                      page = 1
//! $0600_0000 [ front: shown  ]   ->   [ back: drawn   ]
//! $0600_A000 [ back:  drawn  ]   ->   [ front: shown  ]
//! ```
//!
//! ## Present
//!
//! 1. Wait for vblank (unless vsync is off)
//! 2. Flip the page index
//! 3. Re-point the front/back views
//! 4. Write DISPCNT once with mode, BG2 and page select together
//!
//! Waiting first means the switch lands between frames, so there's no tear.

use log::debug;

use crate::bitmap::BitmapBuffer;
use crate::dma::TransferChannel;
use crate::dma::engine::BulkTransferEngine;
use crate::error::VramError;
use crate::mmio::MemoryBus;
use crate::mode::{VideoMode, VideoModeConfig};
use crate::region::MemoryRegion;
use crate::scr::{DisplayFlags, DisplayRegister, VBlankWait};

pub struct DoubleBuffer<'a, B, D, V>
where
    B: MemoryBus + ?Sized,
    D: DisplayRegister + ?Sized,
    V: VBlankWait + ?Sized,
{
    config: VideoModeConfig,
    pages: [BitmapBuffer<'a, B>; 2],
    display: &'a D,
    vblank: &'a V,
    /// The page currently shown.
    page: usize,
    vsync: bool,
}

impl<'a, B, D, V> DoubleBuffer<'a, B, D, V>
where
    B: MemoryBus + ?Sized,
    D: DisplayRegister + ?Sized,
    V: VBlankWait + ?Sized,
{
    /// Page 0 starts as the front. Vsync starts on.
    ///
    /// Mode 3 and the tile modes only have one page (or none), so they're
    /// `UnsupportedMode`.
    pub fn new(
        vram: MemoryRegion<'a, B>,
        display: &'a D,
        vblank: &'a V,
        mode: VideoMode,
    ) -> Result<Self, VramError> {
        let config = VideoModeConfig::new(mode);
        if !config.supports_double_buffering() {
            return Err(VramError::UnsupportedMode);
        }
        let pages = [
            BitmapBuffer::for_page(vram, &config, 0)?,
            BitmapBuffer::for_page(vram, &config, 1)?,
        ];
        Ok(Self {
            config,
            pages,
            display,
            vblank,
            page: 0,
            vsync: true,
        })
    }

    #[inline(always)]
    pub fn config(&self) -> &VideoModeConfig {
        &self.config
    }

    /// The page being shown.
    #[inline(always)]
    pub fn front(&self) -> BitmapBuffer<'a, B> {
        self.pages[self.page]
    }

    /// The page to draw into.
    #[inline(always)]
    pub fn back(&self) -> BitmapBuffer<'a, B> {
        self.pages[1 - self.page]
    }

    #[inline(always)]
    pub fn page(&self) -> usize {
        self.page
    }

    #[inline(always)]
    pub fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }

    #[inline(always)]
    pub fn vsync_enabled(&self) -> bool {
        self.vsync
    }

    /// The DISPCNT value for the current state.
    #[inline]
    pub fn display_flags(&self) -> DisplayFlags {
        DisplayFlags::compose(self.config.mode(), self.page)
    }

    /// Show the back page. Same as [`present`](Self::present).
    pub fn swap(&mut self) {
        if self.vsync {
            self.vblank.wait_for_vblank();
        }
        self.page = 1 - self.page;
        let flags = self.display_flags();
        debug!("present page {} ({:#06X})", self.page, flags.bits());
        self.display.write(flags);
    }

    #[inline]
    pub fn present(&mut self) {
        self.swap();
    }

    /// Swap right now, whatever the vsync setting.
    pub fn swap_without_vsync(&mut self) {
        let was = self.vsync;
        self.vsync = false;
        self.swap();
        self.vsync = was;
    }

    pub fn clear_back(&self, color: u16) {
        self.back().clear(color);
    }

    pub fn fast_clear_back<C: TransferChannel + ?Sized>(
        &self,
        engine: &BulkTransferEngine<'_, C>,
        color: u16,
    ) {
        engine.clear(&self.back(), color);
    }

    /// Copy the front page into the back, for drawing on top of the last
    /// frame instead of from scratch.
    pub fn sync_buffers<C: TransferChannel + ?Sized>(&self, engine: &BulkTransferEngine<'_, C>) {
        engine.copy_buffer(&self.back(), &self.front());
    }
}

/// Double buffering with deferred swaps.
///
/// The producer calls [`request_swap`](Self::request_swap) when a frame is
/// ready; the frame driver calls [`update`](Self::update) once per display
/// frame, which performs at most one pending swap.
pub struct TripleBuffer<'a, B, D, V>
where
    B: MemoryBus + ?Sized,
    D: DisplayRegister + ?Sized,
    V: VBlankWait + ?Sized,
{
    pages: DoubleBuffer<'a, B, D, V>,
    pending: bool,
}

impl<'a, B, D, V> TripleBuffer<'a, B, D, V>
where
    B: MemoryBus + ?Sized,
    D: DisplayRegister + ?Sized,
    V: VBlankWait + ?Sized,
{
    pub fn new(
        vram: MemoryRegion<'a, B>,
        display: &'a D,
        vblank: &'a V,
        mode: VideoMode,
    ) -> Result<Self, VramError> {
        Ok(Self {
            pages: DoubleBuffer::new(vram, display, vblank, mode)?,
            pending: false,
        })
    }

    #[inline(always)]
    pub fn back(&self) -> BitmapBuffer<'a, B> {
        self.pages.back()
    }

    /// The page on screen.
    #[inline(always)]
    pub fn display(&self) -> BitmapBuffer<'a, B> {
        self.pages.front()
    }

    #[inline(always)]
    pub fn page(&self) -> usize {
        self.pages.page()
    }

    #[inline(always)]
    pub fn request_swap(&mut self) {
        self.pending = true;
    }

    #[inline(always)]
    pub fn is_swap_pending(&self) -> bool {
        self.pending
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.pages.set_vsync(enabled);
    }

    pub fn vsync_enabled(&self) -> bool {
        self.pages.vsync_enabled()
    }

    /// Perform the pending swap, if there is one. Returns whether it did.
    pub fn update(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pages.swap();
        self.pending = false;
        true
    }
}

/// Counts frames and says when an every-N-frames job is due.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameCounter {
    frames: u32,
    last_sync: u32,
}

impl FrameCounter {
    pub const fn new() -> Self {
        Self { frames: 0, last_sync: 0 }
    }

    /// Call once per frame.
    #[inline]
    pub fn update(&mut self) {
        self.frames = self.frames.wrapping_add(1);
    }

    #[inline(always)]
    pub fn frame_count(&self) -> u32 {
        self.frames
    }

    /// True if `interval` frames have passed since the last time this
    /// returned true.
    pub fn should_sync(&mut self, interval: u32) -> bool {
        if self.frames.wrapping_sub(self.last_sync) >= interval {
            self.last_sync = self.frames;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostChannel, HostLcd, HostMemory, LcdEvent};

    #[test]
    fn single_page_modes_are_rejected() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        for mode in [VideoMode::Mode0, VideoMode::Mode2, VideoMode::Mode3] {
            assert!(matches!(
                DoubleBuffer::new(mem.region(), &lcd, &lcd, mode),
                Err(VramError::UnsupportedMode)
            ));
        }
    }

    #[test]
    fn swap_twice_restores_everything() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        let mut pages = DoubleBuffer::new(mem.region(), &lcd, &lcd, VideoMode::Mode5).unwrap();

        let (front, back, flags) = (pages.front().base(), pages.back().base(), pages.display_flags());
        assert_eq!((front, back), (0x0600_0000, 0x0600_A000));

        pages.swap();
        assert_eq!(pages.page(), 1);
        assert_eq!(pages.front().base(), back);
        assert_eq!(pages.back().base(), front);
        assert_eq!(lcd.read().page(), 1);

        pages.swap();
        assert_eq!(pages.page(), 0);
        assert_eq!(pages.front().base(), front);
        assert_eq!(pages.back().base(), back);
        assert_eq!(pages.display_flags(), flags);
        assert_eq!(lcd.read(), flags);
    }

    #[test]
    fn present_waits_then_writes_one_combined_value() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        let mut pages = DoubleBuffer::new(mem.region(), &lcd, &lcd, VideoMode::Mode4).unwrap();

        pages.present();
        pages.present();

        let page1 = DisplayFlags::from_bits_retain(0x0414);
        let page0 = DisplayFlags::from_bits_retain(0x0404);
        assert_eq!(
            lcd.events(),
            [
                LcdEvent::VBlank,
                LcdEvent::Write(page1),
                LcdEvent::VBlank,
                LcdEvent::Write(page0),
            ]
        );
    }

    #[test]
    fn vsync_can_be_skipped() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        let mut pages = DoubleBuffer::new(mem.region(), &lcd, &lcd, VideoMode::Mode4).unwrap();

        pages.swap_without_vsync();
        assert!(pages.vsync_enabled());
        assert_eq!(lcd.vblank_waits(), 0);

        pages.set_vsync(false);
        pages.present();
        assert_eq!(lcd.vblank_waits(), 0);
        assert_eq!(lcd.writes().len(), 2);
    }

    #[test]
    fn drawing_on_back_shows_after_swap() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        let mut pages = DoubleBuffer::new(mem.region(), &lcd, &lcd, VideoMode::Mode4).unwrap();

        let untouched = pages.front().get_pixel(10, 10).unwrap();
        pages.back().plot_pixel(10, 10, 5).unwrap();
        pages.swap();

        assert_eq!(pages.front().get_pixel(10, 10), Ok(5));
        assert_eq!(pages.back().get_pixel(10, 10), Ok(untouched));
    }

    #[test]
    fn clears_and_sync_touch_only_the_back() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        let channel = HostChannel::new(&mem);
        let engine = BulkTransferEngine::new(&channel);
        let pages = DoubleBuffer::new(mem.region(), &lcd, &lcd, VideoMode::Mode4).unwrap();

        pages.front().fill_rect(0, 0, 240, 160, 1);
        pages.clear_back(2);
        assert_eq!(pages.back().get_pixel(239, 159), Ok(2));
        assert_eq!(pages.front().get_pixel(239, 159), Ok(1));

        pages.fast_clear_back(&engine, 3);
        assert_eq!(pages.back().get_pixel(0, 0), Ok(3));
        assert_eq!(pages.front().get_pixel(0, 0), Ok(1));

        pages.sync_buffers(&engine);
        assert_eq!(pages.back().get_pixel(120, 80), Ok(1));
        assert_eq!(channel.transfer_count(), 2);
    }

    #[test]
    fn triple_buffer_drains_one_request_per_update() {
        let mem = HostMemory::vram();
        let lcd = HostLcd::new();
        let mut pages = TripleBuffer::new(mem.region(), &lcd, &lcd, VideoMode::Mode5).unwrap();

        assert!(!pages.update());
        assert_eq!(lcd.writes().len(), 0);

        pages.request_swap();
        pages.request_swap();
        assert!(pages.is_swap_pending());
        assert_eq!(pages.page(), 0);

        assert!(pages.update());
        assert!(!pages.update());
        assert_eq!(pages.page(), 1);
        assert_eq!(pages.display().base(), 0x0600_A000);
        assert_eq!(
            lcd.events(),
            [LcdEvent::VBlank, LcdEvent::Write(DisplayFlags::from_bits_retain(0x0415))]
        );
    }

    #[test]
    fn frame_counter_schedules_by_interval() {
        let mut counter = FrameCounter::new();
        assert!(counter.should_sync(0));
        assert!(!counter.should_sync(3));

        for _ in 0..3 {
            counter.update();
        }
        assert_eq!(counter.frame_count(), 3);
        assert!(counter.should_sync(3));
        assert!(!counter.should_sync(3));

        counter.reset();
        assert_eq!(counter.frame_count(), 0);
    }
}
