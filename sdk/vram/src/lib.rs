//! # gba-vram
//!
//! Frame memory, page flipping and DMA-backed fills for the GBA's video hardware.
//!
//! ## Quick Start
//!
//! Everything starts from a [`Console`](console::Console), which owns the
//! hardware handles and hands out views over them:
//!
//! ```ignore
//! use gba_vram::{console::Console, mode::VideoMode};
//!
//! let console = unsafe { Console::init() };
//! let engine = console.transfer_engine();
//! let mut pages = console.double_buffer(VideoMode::Mode4).unwrap();
//!
//! loop {
//!     let back = pages.back();
//!     engine.clear(&back, 0);
//!     back.fill_circle(180, 40, 20, 3);
//!     back.draw_line(0, 0, 239, 159, 7);
//!
//!     // waits for vblank, flips, and rewrites DISPCNT in one go
//!     pages.present();
//! }
//! ```
//!
//! ## Video Modes
//!
//! | Mode | Size    | Depth  | Frame     | Pages |
//! |------|---------|--------|-----------|-------|
//! | 0-2  | tiles   | 4/8bpp | -         | -     |
//! | 3    | 240×160 | 16bpp  | 76,800 B  | 1     |
//! | 4    | 240×160 | 8bpp   | 38,400 B  | 2     |
//! | 5    | 160×128 | 16bpp  | 40,960 B  | 2     |
//!
//! The second page of modes 4 and 5 always lives at `VRAM + 0xA000`.
//!
//! ## Drawing
//!
//! [`BitmapBuffer`](bitmap::BitmapBuffer) does pixel work on one page. Checked
//! calls return [`VramError`](error::VramError); shape drawing clamps to the page
//! instead, so a half-offscreen circle is fine:
//!
//! ```ignore
//! back.plot_pixel(10, 10, 5)?;
//! back.fill_rect(-8, -8, 32, 32, 2); // becomes (0, 0, 24, 24)
//! ```
//!
//! Large fills and copies go through the
//! [`BulkTransferEngine`](dma::engine::BulkTransferEngine), which uses DMA3
//! above a size threshold and plain writes below it.
//!
//! ## Tiles
//!
//! Tile modes address VRAM as character blocks (tile pixels) and screen blocks
//! (tile maps):
//!
//! ```ignore
//! let chars = CharacterBlock::new(console.vram(), 0, TileDepth::Bpp4)?;
//! chars.load_tile(1, &SOLID_TILE)?;
//!
//! let map = ScreenBlock::new(console.vram(), 28, 32, 32)?;
//! map.set_tile(5, 5, 1, ScreenEntry::default().with_palette(3))?;
//! ```
//!
//! ## Testing Off Target
//!
//! Every component is generic over the hardware traits in [`mmio`],
//! [`scr`] and [`dma`]. The `host` feature (always on for this crate's own
//! tests) provides in-memory stand-ins in [`host`].

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "host"))]
extern crate alloc;

pub mod bitmap;
pub mod buffering;
pub mod console;
pub mod dma;
pub mod error;
pub mod inspect;
pub mod mmio;
pub mod mode;
pub mod pattern;
pub mod region;
pub mod scr;
pub mod tiles;

#[cfg(any(test, feature = "host"))]
pub mod host;

pub use error::VramError;
