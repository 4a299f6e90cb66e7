//! # Tile Memory
//!
//! In modes 0-2 VRAM holds tiles instead of pixels. The same 64KB is viewed
//! two ways:
//!
//! ```text
//! $0600_0000 +------------------+  char block 0   screen blocks  0-7
//!            |                  |
//! $0600_4000 +------------------+  char block 1   screen blocks  8-15
//!            |                  |
//! $0600_8000 +------------------+  char block 2   screen blocks 16-23
//!            |                  |
//! $0600_C000 +------------------+  char block 3   screen blocks 24-31
//!            |                  |
//! $0601_0000 +------------------+
//! ```
//!
//! A [`CharacterBlock`] (16KB) stores 8×8 tile bitmaps: 32 bytes each at
//! 4bpp, 64 at 8bpp. A [`ScreenBlock`] (2KB) is a map of 1024
//! [`ScreenEntry`] halfwords, each naming a tile. The two overlap; keeping
//! maps out of the char blocks in use is up to the caller.

use bitfield::bitfield;
use heapless::Vec;

use crate::dma::plan::Rect;
use crate::error::VramError;
use crate::mmio::MemoryBus;
use crate::mode::{CHAR_BLOCK_SIZE, MAX_CHAR_BLOCKS, MAX_SCREEN_BLOCKS, SCREEN_BLOCK_SIZE};
use crate::region::MemoryRegion;

/// Largest tile, in bytes.
pub const MAX_TILE_SIZE: usize = 64;

/// Entries in one screen block.
pub const SCREEN_ENTRIES: usize = SCREEN_BLOCK_SIZE / 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileDepth {
    /// 16 colors, 32 bytes per tile.
    Bpp4,
    /// 256 colors, 64 bytes per tile.
    Bpp8,
}

impl TileDepth {
    #[inline(always)]
    pub const fn tile_size(self) -> usize {
        match self {
            TileDepth::Bpp4 => 32,
            TileDepth::Bpp8 => 64,
        }
    }

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        match self {
            TileDepth::Bpp4 => 4,
            TileDepth::Bpp8 => 8,
        }
    }
}

impl TryFrom<u8> for TileDepth {
    type Error = VramError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            4 => Ok(TileDepth::Bpp4),
            8 => Ok(TileDepth::Bpp8),
            _ => Err(VramError::UnsupportedMode),
        }
    }
}

/// One 16KB block of tile bitmaps.
pub struct CharacterBlock<'a, B: MemoryBus + ?Sized> {
    region: MemoryRegion<'a, B>,
    id: usize,
    depth: TileDepth,
}

impl<'a, B: MemoryBus + ?Sized> CharacterBlock<'a, B> {
    /// Block `id` (0-3) of `vram`, which should start at VRAM base.
    pub fn new(vram: MemoryRegion<'a, B>, id: usize, depth: TileDepth) -> Result<Self, VramError> {
        if id >= MAX_CHAR_BLOCKS {
            return Err(VramError::InvalidIndex);
        }
        let region = vram
            .sub(id * CHAR_BLOCK_SIZE, CHAR_BLOCK_SIZE)
            .ok_or(VramError::OutOfBounds)?;
        Ok(Self { region, id, depth })
    }

    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline(always)]
    pub fn depth(&self) -> TileDepth {
        self.depth
    }

    #[inline(always)]
    pub fn base(&self) -> usize {
        self.region.base()
    }

    #[inline(always)]
    pub fn tile_size(&self) -> usize {
        self.depth.tile_size()
    }

    /// 512 at 4bpp, 256 at 8bpp.
    #[inline(always)]
    pub fn max_tiles(&self) -> usize {
        CHAR_BLOCK_SIZE / self.tile_size()
    }

    fn tile_offset(&self, index: usize) -> Result<usize, VramError> {
        if index >= self.max_tiles() {
            return Err(VramError::InvalidIndex);
        }
        Ok(index * self.tile_size())
    }

    /// Write one whole tile. `data` must be exactly one tile long.
    pub fn load_tile(&self, index: usize, data: &[u8]) -> Result<(), VramError> {
        let offset = self.tile_offset(index)?;
        if data.len() != self.tile_size() {
            return Err(VramError::InvalidLength);
        }
        for (i, pair) in data.chunks_exact(2).enumerate() {
            self.region.write16(offset + i * 2, u16::from_le_bytes([pair[0], pair[1]]));
        }
        Ok(())
    }

    pub fn get_tile(&self, index: usize) -> Result<Vec<u8, MAX_TILE_SIZE>, VramError> {
        let offset = self.tile_offset(index)?;
        let mut tile = Vec::new();
        for i in (0..self.tile_size()).step_by(2) {
            let [lo, hi] = self.region.read16(offset + i).to_le_bytes();
            tile.extend_from_slice(&[lo, hi]).map_err(|_| VramError::InvalidLength)?;
        }
        Ok(tile)
    }

    pub fn clear_tile(&self, index: usize) -> Result<(), VramError> {
        let offset = self.tile_offset(index)?;
        for i in (0..self.tile_size()).step_by(2) {
            self.region.write16(offset + i, 0);
        }
        Ok(())
    }
}

bitfield! {
    /// One tile map entry.
    ///
    /// ```text
    /// 15   12 11  10  9                 0
    /// [ pal  ][vf][hf][      tile        ]
    /// ```
    #[derive(Copy, Clone, PartialEq, Eq, Default)]
    pub struct ScreenEntry(u16);
    impl Debug;
    pub u16, tile, set_tile: 9, 0;
    pub hflip, set_hflip: 10;
    pub vflip, set_vflip: 11;
    /// Palette bank, 4bpp tiles only.
    pub u8, palette, set_palette: 15, 12;
}

impl ScreenEntry {
    /// Everything but the tile number.
    pub const ATTRIBUTE_MASK: u16 = 0xFC00;
    pub const TILE_MASK: u16 = 0x03FF;

    #[inline]
    pub fn new(tile: u16) -> Self {
        ScreenEntry(tile & Self::TILE_MASK)
    }

    #[inline(always)]
    pub fn from_bits(bits: u16) -> Self {
        ScreenEntry(bits)
    }

    #[inline(always)]
    pub fn bits(&self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub fn attributes(&self) -> u16 {
        self.0 & Self::ATTRIBUTE_MASK
    }

    #[inline]
    pub fn with_hflip(mut self, flip: bool) -> Self {
        self.set_hflip(flip);
        self
    }

    #[inline]
    pub fn with_vflip(mut self, flip: bool) -> Self {
        self.set_vflip(flip);
        self
    }

    /// Palette banks wrap at 16.
    #[inline]
    pub fn with_palette(mut self, palette: u8) -> Self {
        self.set_palette(palette & 0xF);
        self
    }

    /// `tile` with this entry's flip and palette bits.
    #[inline]
    pub fn merge(tile: u16, attrs: ScreenEntry) -> Self {
        ScreenEntry((tile & Self::TILE_MASK) | attrs.attributes())
    }
}

/// One 2KB tile map, read as `width × height` tiles.
pub struct ScreenBlock<'a, B: MemoryBus + ?Sized> {
    region: MemoryRegion<'a, B>,
    id: usize,
    width: usize,
    height: usize,
}

impl<'a, B: MemoryBus + ?Sized> ScreenBlock<'a, B> {
    /// Block `id` (0-31) of `vram`, which should start at VRAM base.
    ///
    /// A map wider or taller than the block is fine, entries past the
    /// 1024th just don't exist. `width × height` has to fit a `usize`.
    pub fn new(
        vram: MemoryRegion<'a, B>,
        id: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, VramError> {
        if id >= MAX_SCREEN_BLOCKS {
            return Err(VramError::InvalidIndex);
        }
        width.checked_mul(height).ok_or(VramError::InvalidLength)?;
        let region = vram
            .sub(id * SCREEN_BLOCK_SIZE, SCREEN_BLOCK_SIZE)
            .ok_or(VramError::OutOfBounds)?;
        Ok(Self { region, id, width, height })
    }

    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline(always)]
    pub fn base(&self) -> usize {
        self.region.base()
    }

    #[inline(always)]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    fn entry_offset(&self, x: usize, y: usize) -> Result<usize, VramError> {
        if !self.in_bounds(x, y) {
            return Err(VramError::OutOfBounds);
        }
        let index = y * self.width + x;
        if index >= SCREEN_ENTRIES {
            return Err(VramError::InvalidIndex);
        }
        Ok(index * 2)
    }

    /// Put `tile` at `(x, y)` with the flip and palette bits of `attrs`.
    /// The tile bits of `attrs` are ignored.
    pub fn set_tile(&self, x: usize, y: usize, tile: u16, attrs: ScreenEntry) -> Result<(), VramError> {
        let offset = self.entry_offset(x, y)?;
        self.region.write16(offset, ScreenEntry::merge(tile, attrs).bits());
        Ok(())
    }

    pub fn get_tile(&self, x: usize, y: usize) -> Result<ScreenEntry, VramError> {
        let offset = self.entry_offset(x, y)?;
        Ok(ScreenEntry::from_bits(self.region.read16(offset)))
    }

    /// Zero every entry in the block.
    pub fn clear(&self) {
        self.region.clear();
    }

    /// Set every mapped entry (up to the block's 1024) to the same tile.
    pub fn fill(&self, tile: u16, attrs: ScreenEntry) {
        let entry = ScreenEntry::merge(tile, attrs).bits();
        let count = (self.width * self.height).min(SCREEN_ENTRIES);
        for i in 0..count {
            self.region.write16(i * 2, entry);
        }
    }

    /// Set a rectangle of entries, clamped to the map.
    pub fn fill_rect(&self, x: i32, y: i32, w: i32, h: i32, tile: u16, attrs: ScreenEntry) {
        let Some(rect) = Rect::clamp(x, y, w, h, self.width, self.height) else {
            return;
        };
        let entry = ScreenEntry::merge(tile, attrs).bits();
        for row in rect.y..rect.y + rect.h {
            for col in rect.x..rect.x + rect.w {
                let index = row * self.width + col;
                if index < SCREEN_ENTRIES {
                    self.region.write16(index * 2, entry);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostMemory;

    #[test]
    fn loaded_zero_tile_reads_back_as_zeros() {
        let mem = HostMemory::vram();
        mem.region().fill16(0xFFFF);
        let chars = CharacterBlock::new(mem.region(), 0, TileDepth::Bpp4).unwrap();

        chars.load_tile(0, &[0u8; 32]).unwrap();
        let tile = chars.get_tile(0).unwrap();
        assert_eq!(tile.len(), 32);
        assert!(tile.iter().all(|&b| b == 0));
        assert_eq!(chars.get_tile(1).unwrap()[0], 0xFF);
    }

    #[test]
    fn tile_slots_follow_depth() {
        let mem = HostMemory::vram();
        let c4 = CharacterBlock::new(mem.region(), 1, TileDepth::Bpp4).unwrap();
        let c8 = CharacterBlock::new(mem.region(), 3, TileDepth::Bpp8).unwrap();
        assert_eq!(c4.base(), 0x0600_4000);
        assert_eq!(c4.max_tiles(), 512);
        assert_eq!(c8.base(), 0x0600_C000);
        assert_eq!(c8.max_tiles(), 256);

        let data: [u8; 64] = core::array::from_fn(|i| i as u8);
        c8.load_tile(255, &data).unwrap();
        assert_eq!(c8.get_tile(255).unwrap().as_slice(), &data[..]);
        assert_eq!(mem.peek8(0x0600_C000 + 255 * 64 + 63), 63);

        c8.clear_tile(255).unwrap();
        assert!(c8.get_tile(255).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn char_block_errors() {
        let mem = HostMemory::vram();
        assert!(matches!(
            CharacterBlock::new(mem.region(), 4, TileDepth::Bpp4),
            Err(VramError::InvalidIndex)
        ));

        let chars = CharacterBlock::new(mem.region(), 0, TileDepth::Bpp4).unwrap();
        assert_eq!(chars.load_tile(512, &[0; 32]), Err(VramError::InvalidIndex));
        assert_eq!(chars.load_tile(0, &[0; 31]), Err(VramError::InvalidLength));
        assert_eq!(chars.load_tile(0, &[0; 64]), Err(VramError::InvalidLength));
        assert_eq!(chars.clear_tile(600), Err(VramError::InvalidIndex));
        assert!(chars.get_tile(512).is_err());
        assert_eq!(TileDepth::try_from(2), Err(VramError::UnsupportedMode));
        assert_eq!(TileDepth::try_from(8), Ok(TileDepth::Bpp8));
    }

    #[test]
    fn set_tile_packs_tile_and_palette() {
        let mem = HostMemory::vram();
        let map = ScreenBlock::new(mem.region(), 0, 32, 32).unwrap();

        map.set_tile(5, 5, 7, ScreenEntry::default().with_palette(3)).unwrap();

        let entry = map.get_tile(5, 5).unwrap();
        assert_eq!(entry.tile(), 7);
        assert_eq!(entry.palette(), 3);
        assert!(!entry.hflip() && !entry.vflip());
        assert_eq!(mem.region().read16((5 * 32 + 5) * 2), 0x3007);
    }

    #[test]
    fn entry_layout_is_fixed() {
        let entry = ScreenEntry::new(0x3FF).with_hflip(true).with_vflip(true).with_palette(0xF);
        assert_eq!(entry.bits(), 0xFFFF);
        assert_eq!(ScreenEntry::new(0x7FF).bits(), 0x3FF);
        assert_eq!(ScreenEntry::default().with_hflip(true).bits(), 1 << 10);
        assert_eq!(ScreenEntry::default().with_vflip(true).bits(), 1 << 11);

        // attribute tile bits never leak into the merged entry
        let merged = ScreenEntry::merge(5, ScreenEntry::new(0x3FF).with_palette(1));
        assert_eq!(merged.bits(), 0x1005);
    }

    #[test]
    fn screen_block_bounds() {
        let mem = HostMemory::vram();
        assert!(matches!(
            ScreenBlock::new(mem.region(), 32, 32, 32),
            Err(VramError::InvalidIndex)
        ));

        let map = ScreenBlock::new(mem.region(), 31, 64, 32).unwrap();
        assert_eq!(map.base(), 0x0600_F800);
        let attrs = ScreenEntry::default();
        assert_eq!(map.set_tile(64, 0, 1, attrs), Err(VramError::OutOfBounds));
        // 64 × 16 = 1024, one past the block
        assert_eq!(map.set_tile(0, 16, 1, attrs), Err(VramError::InvalidIndex));
        assert_eq!(map.set_tile(63, 15, 1, attrs), Ok(()));
    }

    #[test]
    fn overflowing_map_dimensions_are_rejected() {
        let mem = HostMemory::vram();
        assert!(matches!(
            ScreenBlock::new(mem.region(), 0, usize::MAX, 4),
            Err(VramError::InvalidLength)
        ));

        // a single very wide row is still addressable
        let row = ScreenBlock::new(mem.region(), 0, usize::MAX, 1).unwrap();
        assert_eq!(row.set_tile(1023, 0, 2, ScreenEntry::default()), Ok(()));
        assert_eq!(row.get_tile(1024, 0).map(|e| e.bits()), Err(VramError::InvalidIndex));
        row.fill_rect(1020, 0, i32::MAX, 1, 6, ScreenEntry::default());
        assert_eq!(row.get_tile(1023, 0).unwrap().tile(), 6);
    }

    #[test]
    fn fills_stay_inside_the_map() {
        let mem = HostMemory::vram();
        let map = ScreenBlock::new(mem.region(), 8, 32, 32).unwrap();
        let pal2 = ScreenEntry::default().with_palette(2);

        map.fill(3, pal2);
        assert_eq!(map.get_tile(31, 31).unwrap().bits(), 0x2003);
        assert_eq!(mem.region().read16(0x4000 + 0x800), 0);

        map.clear();
        assert_eq!(map.get_tile(31, 31).unwrap().bits(), 0);

        map.fill_rect(-2, 30, 4, 8, 9, pal2);
        assert_eq!(map.get_tile(0, 30).unwrap().tile(), 9);
        assert_eq!(map.get_tile(1, 31).unwrap().tile(), 9);
        assert_eq!(map.get_tile(2, 30).unwrap().tile(), 0);
        assert_eq!(map.get_tile(0, 29).unwrap().tile(), 0);
    }
}
