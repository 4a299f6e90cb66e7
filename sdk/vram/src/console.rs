use log::debug;

use crate::bitmap::BitmapBuffer;
use crate::buffering::{DoubleBuffer, TripleBuffer};
use crate::dma::engine::BulkTransferEngine;
use crate::dma::{Dma3, TransferChannel};
use crate::error::VramError;
use crate::mmio::{MemoryBus, VolatileBus};
use crate::mode::{VRAM_BASE, VRAM_SIZE, VideoMode, VideoModeConfig};
use crate::region::MemoryRegion;
use crate::scr::{DisplayFlags, DisplayRegister, Lcd, VBlankWait};

/// The video hardware: VRAM, the LCD registers, and DMA channel 3.
///
/// Everything else in this crate borrows from here.
pub struct Console<B = VolatileBus, L = &'static Lcd, C = Dma3> {
    bus: B,
    lcd: L,
    dma: C,
}

impl Console {
    /// Grab the hardware.
    ///
    /// # Safety
    ///
    /// Hardware only, once. Two consoles would fight over DISPCNT and DMA3.
    pub unsafe fn init() -> Console {
        unsafe {
            Console {
                bus: VolatileBus::new(),
                lcd: Lcd::new(),
                dma: Dma3::new(),
            }
        }
    }
}

impl<B, L, C> Console<B, L, C>
where
    B: MemoryBus,
    L: DisplayRegister + VBlankWait,
    C: TransferChannel,
{
    /// A console over other implementations of the hardware traits.
    ///
    /// # Safety
    ///
    /// `bus` must back all of `$0600_0000..$0601_8000`, and `dma` must move
    /// data within the same memory.
    pub unsafe fn from_parts(bus: B, lcd: L, dma: C) -> Self {
        Self { bus, lcd, dma }
    }

    /// All 96KB of VRAM.
    #[inline]
    pub fn vram(&self) -> MemoryRegion<'_, B> {
        // SAFETY: construction guarantees the bus maps VRAM
        unsafe { MemoryRegion::new(&self.bus, VRAM_BASE, VRAM_SIZE) }
    }

    #[inline(always)]
    pub fn display(&self) -> &L {
        &self.lcd
    }

    #[inline]
    pub fn transfer_engine(&self) -> BulkTransferEngine<'_, C> {
        BulkTransferEngine::new(&self.dma)
    }

    /// Switch the display to `mode`, page 0, BG2 on.
    pub fn set_mode(&self, mode: VideoMode) -> VideoModeConfig {
        let flags = DisplayFlags::compose(mode, 0);
        debug!("video mode {:?} ({:#06X})", mode, flags.bits());
        self.lcd.write(flags);
        VideoModeConfig::new(mode)
    }

    /// Switch to `mode` and return its first page. For mode 3, the only one.
    pub fn bitmap(&self, mode: VideoMode) -> Result<BitmapBuffer<'_, B>, VramError> {
        let config = VideoModeConfig::new(mode);
        let buffer = BitmapBuffer::for_page(self.vram(), &config, 0)?;
        self.set_mode(mode);
        Ok(buffer)
    }

    /// Switch to `mode` and flip between its two pages.
    pub fn double_buffer(&self, mode: VideoMode) -> Result<DoubleBuffer<'_, B, L, L>, VramError> {
        let pages = DoubleBuffer::new(self.vram(), &self.lcd, &self.lcd, mode)?;
        self.set_mode(mode);
        Ok(pages)
    }

    pub fn triple_buffer(&self, mode: VideoMode) -> Result<TripleBuffer<'_, B, L, L>, VramError> {
        let pages = TripleBuffer::new(self.vram(), &self.lcd, &self.lcd, mode)?;
        self.set_mode(mode);
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostChannel, HostLcd, HostMemory};
    use crate::tiles::{CharacterBlock, ScreenBlock, ScreenEntry, TileDepth};

    #[test]
    fn mode4_frame_end_to_end() {
        let mem = HostMemory::vram();
        let console = unsafe { Console::from_parts(&mem, HostLcd::new(), HostChannel::new(&mem)) };
        let engine = console.transfer_engine();
        let mut pages = console.double_buffer(VideoMode::Mode4).unwrap();
        assert_eq!(console.display().read().bits(), 0x0404);

        let back = pages.back();
        engine.clear(&back, 0);
        back.fill_circle(180, 40, 20, 3);
        back.draw_line(0, 0, 239, 159, 7);
        pages.present();

        let front = pages.front();
        assert_eq!(front.base(), 0x0600_A000);
        assert_eq!(front.get_pixel(180, 40), Ok(3));
        assert_eq!(front.get_pixel(0, 0), Ok(7));
        assert_eq!(console.display().read().bits(), 0x0414);
        assert_eq!(console.display().vblank_waits(), 1);
    }

    #[test]
    fn single_page_modes() {
        let mem = HostMemory::vram();
        let console = unsafe { Console::from_parts(&mem, HostLcd::new(), HostChannel::new(&mem)) };

        assert!(matches!(console.double_buffer(VideoMode::Mode3), Err(VramError::UnsupportedMode)));
        assert!(console.display().writes().is_empty());

        let screen = console.bitmap(VideoMode::Mode3).unwrap();
        screen.plot_pixel(239, 159, 0x7FFF).unwrap();
        assert_eq!(console.display().read().bits(), 0x0403);
        assert_eq!(mem.peek8(0x0600_0000 + 76_798), 0xFF);
    }

    #[test]
    fn tiles_through_the_console() {
        let mem = HostMemory::vram();
        let console = unsafe { Console::from_parts(&mem, HostLcd::new(), HostChannel::new(&mem)) };

        let chars = CharacterBlock::new(console.vram(), 0, TileDepth::Bpp4).unwrap();
        chars.load_tile(1, &[0x11; 32]).unwrap();

        let map = ScreenBlock::new(console.vram(), 28, 32, 32).unwrap();
        map.set_tile(5, 5, 1, ScreenEntry::default().with_palette(3)).unwrap();

        assert_eq!(mem.peek8(0x0600_0020), 0x11);
        assert_eq!(map.get_tile(5, 5).unwrap().bits(), 0x3001);
        assert_eq!(map.base(), 0x0600_E000);
    }
}
