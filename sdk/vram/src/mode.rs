//! # Video Modes & VRAM Layout
//!
//! The display controller has six modes. Three are tile modes (0-2), which
//! read character and screen blocks; three are bitmap modes (3-5), which read
//! a linear framebuffer:
//!
//! ```text
//! VRAM $0600_0000 - $0601_7FFF (96KB)
//!
//! Mode 3:  [ page 0: 240×160×16bpp = 76,800 B                 ]
//! Mode 4:  [ page 0: 38,400 B ][pad][ page 1 @ +$A000         ]
//! Mode 5:  [ page 0: 40,960 B      ][ page 1 @ +$A000         ]
//! ```
//!
//! The page 1 offset is fixed by the hardware at `$A000`, whatever the
//! mode's real frame size.

use log::warn;

use crate::error::VramError;

pub const VRAM_BASE: usize = 0x0600_0000;
pub const VRAM_SIZE: usize = 0x18000;

/// Offset of the second bitmap page in modes 4 and 5.
pub const PAGE_FLIP_OFFSET: usize = 0xA000;

pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;

pub const MODE3_FRAME_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 2;
pub const MODE4_FRAME_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;
pub const MODE5_FRAME_SIZE: usize = 160 * 128 * 2;

pub const CHAR_BLOCK_SIZE: usize = 0x4000;
pub const SCREEN_BLOCK_SIZE: usize = 0x800;
pub const MAX_CHAR_BLOCKS: usize = 4;
pub const MAX_SCREEN_BLOCKS: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum VideoMode {
    /// Tiles: four regular backgrounds.
    Mode0 = 0,
    /// Tiles: two regular backgrounds and one affine.
    Mode1 = 1,
    /// Tiles: two affine backgrounds.
    Mode2 = 2,
    /// Bitmap: 240×160, 16bpp, one page.
    Mode3 = 3,
    /// Bitmap: 240×160, 8bpp palette indices, two pages.
    Mode4 = 4,
    /// Bitmap: 160×128, 16bpp, two pages.
    Mode5 = 5,
}

impl VideoMode {
    /// The mode number as it appears in DISPCNT bits 0-2.
    #[inline(always)]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    #[inline]
    pub const fn is_bitmap(self) -> bool {
        matches!(self, VideoMode::Mode3 | VideoMode::Mode4 | VideoMode::Mode5)
    }

    #[inline]
    pub const fn supports_double_buffering(self) -> bool {
        matches!(self, VideoMode::Mode4 | VideoMode::Mode5)
    }
}

impl TryFrom<u16> for VideoMode {
    type Error = VramError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VideoMode::Mode0),
            1 => Ok(VideoMode::Mode1),
            2 => Ok(VideoMode::Mode2),
            3 => Ok(VideoMode::Mode3),
            4 => Ok(VideoMode::Mode4),
            5 => Ok(VideoMode::Mode5),
            _ => {
                warn!("rejecting unknown video mode {}", value);
                Err(VramError::UnsupportedMode)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelDepth {
    /// One palette index per byte, two pixels per halfword.
    Bpp8,
    /// One BGR555 color per halfword.
    Bpp16,
}

impl PixelDepth {
    #[inline(always)]
    pub const fn bits(self) -> usize {
        match self {
            PixelDepth::Bpp8 => 8,
            PixelDepth::Bpp16 => 16,
        }
    }

    #[inline(always)]
    pub const fn bytes(self) -> usize {
        self.bits() / 8
    }

    /// Repeat a pixel value across a 32-bit word, the unit DMA fills work in.
    #[inline]
    pub const fn splat(self, color: u16) -> u32 {
        match self {
            PixelDepth::Bpp8 => (color as u8 as u32) * 0x0101_0101,
            PixelDepth::Bpp16 => (color as u32) * 0x0001_0001,
        }
    }
}

/// Size and layout of a bitmap mode's framebuffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BitmapGeometry {
    pub width: usize,
    pub height: usize,
    pub depth: PixelDepth,
    pub frame_size: usize,
}

/// Everything derived from a mode selector. Rebuild it on mode change.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoModeConfig {
    mode: VideoMode,
    geometry: Option<BitmapGeometry>,
    frame_bases: [usize; 2],
    pages: usize,
}

impl VideoModeConfig {
    pub const fn new(mode: VideoMode) -> Self {
        let (geometry, pages) = match mode {
            VideoMode::Mode0 | VideoMode::Mode1 | VideoMode::Mode2 => (None, 0),
            VideoMode::Mode3 => (
                Some(BitmapGeometry {
                    width: SCREEN_WIDTH,
                    height: SCREEN_HEIGHT,
                    depth: PixelDepth::Bpp16,
                    frame_size: MODE3_FRAME_SIZE,
                }),
                1,
            ),
            VideoMode::Mode4 => (
                Some(BitmapGeometry {
                    width: SCREEN_WIDTH,
                    height: SCREEN_HEIGHT,
                    depth: PixelDepth::Bpp8,
                    frame_size: MODE4_FRAME_SIZE,
                }),
                2,
            ),
            VideoMode::Mode5 => (
                Some(BitmapGeometry {
                    width: 160,
                    height: 128,
                    depth: PixelDepth::Bpp16,
                    frame_size: MODE5_FRAME_SIZE,
                }),
                2,
            ),
        };

        Self {
            mode,
            geometry,
            frame_bases: [VRAM_BASE, VRAM_BASE + PAGE_FLIP_OFFSET],
            pages,
        }
    }

    /// Parse a raw DISPCNT mode number. Unknown numbers are an error, never
    /// a silent fallback to mode 3.
    pub fn from_raw(mode: u16) -> Result<Self, VramError> {
        Ok(Self::new(VideoMode::try_from(mode)?))
    }

    #[inline(always)]
    pub const fn mode(&self) -> VideoMode {
        self.mode
    }

    /// Bitmap geometry, or `None` for tile modes.
    #[inline(always)]
    pub const fn geometry(&self) -> Option<BitmapGeometry> {
        self.geometry
    }

    #[inline]
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.geometry.map(|g| (g.width, g.height))
    }

    #[inline]
    pub fn bits_per_pixel(&self) -> Option<usize> {
        self.geometry.map(|g| g.depth.bits())
    }

    /// Bytes in one page; zero for tile modes.
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.geometry.map_or(0, |g| g.frame_size)
    }

    /// Absolute addresses of this mode's pages: one, two, or none for tiles.
    #[inline]
    pub fn frame_bases(&self) -> &[usize] {
        &self.frame_bases[..self.pages]
    }

    /// Absolute address of `page`, if the mode has it.
    #[inline]
    pub fn frame_base(&self, page: usize) -> Option<usize> {
        self.frame_bases().get(page).copied()
    }

    #[inline(always)]
    pub const fn supports_double_buffering(&self) -> bool {
        self.mode.supports_double_buffering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_geometries_match_hardware() {
        let m3 = VideoModeConfig::new(VideoMode::Mode3);
        assert_eq!(m3.dimensions(), Some((240, 160)));
        assert_eq!(m3.bits_per_pixel(), Some(16));
        assert_eq!(m3.frame_size(), 76_800);
        assert_eq!(m3.frame_bases(), &[0x0600_0000]);
        assert!(!m3.supports_double_buffering());

        let m4 = VideoModeConfig::new(VideoMode::Mode4);
        assert_eq!(m4.dimensions(), Some((240, 160)));
        assert_eq!(m4.bits_per_pixel(), Some(8));
        assert_eq!(m4.frame_size(), 38_400);
        assert_eq!(m4.frame_bases(), &[0x0600_0000, 0x0600_A000]);
        assert!(m4.supports_double_buffering());

        let m5 = VideoModeConfig::new(VideoMode::Mode5);
        assert_eq!(m5.dimensions(), Some((160, 128)));
        assert_eq!(m5.bits_per_pixel(), Some(16));
        assert_eq!(m5.frame_size(), 40_960);
        assert_eq!(m5.frame_bases(), &[0x0600_0000, 0x0600_A000]);
        assert!(m5.supports_double_buffering());
    }

    #[test]
    fn tile_modes_have_no_bitmap() {
        for mode in [VideoMode::Mode0, VideoMode::Mode1, VideoMode::Mode2] {
            let config = VideoModeConfig::new(mode);
            assert_eq!(config.geometry(), None);
            assert!(config.frame_bases().is_empty());
            assert_eq!(config.frame_size(), 0);
            assert!(!config.supports_double_buffering());
        }
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert_eq!(VideoModeConfig::from_raw(6), Err(VramError::UnsupportedMode));
        assert_eq!(VideoModeConfig::from_raw(0xFFFF), Err(VramError::UnsupportedMode));
        assert_eq!(VideoModeConfig::from_raw(4).map(|c| c.mode()), Ok(VideoMode::Mode4));
    }

    #[test]
    fn splat_repeats_pixels_across_a_word() {
        assert_eq!(PixelDepth::Bpp8.splat(0x1234), 0x3434_3434);
        assert_eq!(PixelDepth::Bpp16.splat(0x7C1F), 0x7C1F_7C1F);
    }

    #[test]
    fn every_page_fits_in_vram() {
        for mode in [VideoMode::Mode3, VideoMode::Mode4, VideoMode::Mode5] {
            let config = VideoModeConfig::new(mode);
            for &base in config.frame_bases() {
                assert!(base + config.frame_size() <= VRAM_BASE + VRAM_SIZE);
            }
        }
    }
}
