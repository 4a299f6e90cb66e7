//! Debug helpers: what a mode uses, and what an address means.

use crate::mode::{
    CHAR_BLOCK_SIZE, MAX_CHAR_BLOCKS, SCREEN_BLOCK_SIZE, VRAM_BASE, VRAM_SIZE, VideoMode,
    VideoModeConfig,
};
use crate::tiles::TileDepth;

/// Background tile area. Char and screen blocks both live in here.
const TILE_AREA: usize = MAX_CHAR_BLOCKS * CHAR_BLOCK_SIZE;

/// VRAM bytes a mode claims for backgrounds.
///
/// Char and screen blocks overlap, so in tile modes `char_bytes` and
/// `screen_bytes` are the same 64KB and `used` counts it once.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct VramUsage {
    pub bitmap_bytes: usize,
    pub char_bytes: usize,
    pub screen_bytes: usize,
    pub used: usize,
    pub free: usize,
}

impl VramUsage {
    pub fn for_mode(mode: VideoMode) -> Self {
        let config = VideoModeConfig::new(mode);
        let mut usage = VramUsage::default();

        if mode.is_bitmap() {
            usage.bitmap_bytes = config.frame_size() * config.frame_bases().len();
            usage.used = usage.bitmap_bytes;
        } else {
            usage.char_bytes = TILE_AREA;
            usage.screen_bytes = TILE_AREA;
            usage.used = TILE_AREA;
        }
        usage.free = VRAM_SIZE.saturating_sub(usage.used);
        usage
    }
}

/// Everything an address decodes to under a given mode.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    /// Offset from VRAM base, if the address is in VRAM at all.
    pub offset: Option<usize>,
    /// Bitmap page holding the address.
    pub page: Option<usize>,
    /// `(x, y)` of the pixel on that page.
    pub pixel: Option<(usize, usize)>,
    pub char_block: Option<usize>,
    pub screen_block: Option<usize>,
    /// Tile slot inside `char_block`, counted in 4bpp tiles.
    pub tile_index: Option<usize>,
}

impl AddressInfo {
    pub fn analyze(addr: usize, mode: VideoMode) -> Self {
        let mut info = AddressInfo::default();
        if !(VRAM_BASE..VRAM_BASE + VRAM_SIZE).contains(&addr) {
            return info;
        }
        let offset = addr - VRAM_BASE;
        info.offset = Some(offset);

        let config = VideoModeConfig::new(mode);
        match config.geometry() {
            Some(geometry) => {
                let hit = config
                    .frame_bases()
                    .iter()
                    .position(|&base| (base..base + geometry.frame_size).contains(&addr));
                if let Some(page) = hit {
                    let index = (addr - config.frame_bases()[page]) / geometry.depth.bytes();
                    info.page = Some(page);
                    info.pixel = Some((index % geometry.width, index / geometry.width));
                }
            }
            None if offset < TILE_AREA => {
                info.char_block = Some(offset / CHAR_BLOCK_SIZE);
                info.screen_block = Some(offset / SCREEN_BLOCK_SIZE);
                info.tile_index = Some((offset % CHAR_BLOCK_SIZE) / TileDepth::Bpp4.tile_size());
            }
            None => {}
        }
        info
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.offset.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_per_mode() {
        let m3 = VramUsage::for_mode(VideoMode::Mode3);
        assert_eq!(m3.bitmap_bytes, 76_800);
        assert_eq!(m3.free, VRAM_SIZE - 76_800);

        let m4 = VramUsage::for_mode(VideoMode::Mode4);
        assert_eq!(m4.used, 2 * 38_400);

        let m0 = VramUsage::for_mode(VideoMode::Mode0);
        assert_eq!(m0.char_bytes, 0x10000);
        assert_eq!(m0.used, 0x10000);
        assert_eq!(m0.free, 0x8000);
    }

    #[test]
    fn bitmap_addresses_decode_to_pixels() {
        let info = AddressInfo::analyze(VRAM_BASE + (10 * 240 + 7) * 2, VideoMode::Mode3);
        assert_eq!(info.page, Some(0));
        assert_eq!(info.pixel, Some((7, 10)));

        let info = AddressInfo::analyze(VRAM_BASE + 0xA000 + 241, VideoMode::Mode4);
        assert_eq!(info.page, Some(1));
        assert_eq!(info.pixel, Some((1, 1)));

        // the gap between mode 4 pages
        let info = AddressInfo::analyze(VRAM_BASE + 38_400, VideoMode::Mode4);
        assert!(info.is_valid());
        assert_eq!(info.pixel, None);
    }

    #[test]
    fn tile_addresses_decode_to_blocks() {
        let info = AddressInfo::analyze(0x0600_4840, VideoMode::Mode0);
        assert_eq!(info.char_block, Some(1));
        assert_eq!(info.screen_block, Some(9));
        assert_eq!(info.tile_index, Some(0x840 / 32));
        assert_eq!(info.pixel, None);

        let sprites = AddressInfo::analyze(0x0601_0000, VideoMode::Mode1);
        assert!(sprites.is_valid());
        assert_eq!(sprites.char_block, None);
    }

    #[test]
    fn outside_vram_is_invalid() {
        assert!(!AddressInfo::analyze(0x0601_8000, VideoMode::Mode3).is_valid());
        assert!(!AddressInfo::analyze(0x0500_0000, VideoMode::Mode0).is_valid());
    }
}
