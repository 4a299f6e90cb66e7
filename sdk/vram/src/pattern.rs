//! Test patterns, for checking a mode and page setup by eye.

use crate::bitmap::BitmapBuffer;
use crate::mmio::MemoryBus;
use crate::mode::PixelDepth;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FillPattern {
    Solid,
    /// 8×8 squares.
    Checkerboard,
    GradientH,
    GradientV,
    /// 4px bands.
    StripesH,
    StripesV,
    Rainbow,
    Noise,
}

/// Gray with all three channels at `level` (0-31).
#[inline]
fn gray15(level: usize) -> u16 {
    let level = level as u16 & 0x1F;
    level | (level << 5) | (level << 10)
}

/// Fill all of `buffer`. The two-color patterns use `c1` and `c2`; gradients,
/// rainbow and noise pick their own colors (grays or palette ramps at 8bpp).
pub fn fill_pattern<B: MemoryBus + ?Sized>(
    buffer: &BitmapBuffer<'_, B>,
    pattern: FillPattern,
    c1: u16,
    c2: u16,
) {
    let (w, h) = (buffer.width(), buffer.height());
    let wide = buffer.depth() == PixelDepth::Bpp16;
    let mut seed: u32 = 0x1234_5678;

    if pattern == FillPattern::Solid {
        buffer.clear(c1);
        return;
    }

    for y in 0..h {
        for x in 0..w {
            let color = match pattern {
                FillPattern::Solid => c1,
                FillPattern::Checkerboard => {
                    if (x / 8 + y / 8) % 2 == 0 { c1 } else { c2 }
                }
                FillPattern::GradientH | FillPattern::GradientV => {
                    let level = match pattern {
                        FillPattern::GradientH => x * 31 / w,
                        _ => y * 31 / h,
                    };
                    if wide { gray15(level) } else { (level * 255 / 31) as u16 }
                }
                FillPattern::StripesH => {
                    if (y / 4) % 2 == 0 { c1 } else { c2 }
                }
                FillPattern::StripesV => {
                    if (x / 4) % 2 == 0 { c1 } else { c2 }
                }
                FillPattern::Rainbow => {
                    if wide {
                        let r = (x * 31 / w) as u16;
                        let g = (y * 31 / h) as u16;
                        let b = ((x + y) * 31 / (w + h)) as u16;
                        r | (g << 5) | (b << 10)
                    } else {
                        ((x + y) * 255 / (w + h)) as u16
                    }
                }
                FillPattern::Noise => {
                    seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    if wide { (seed & 0x7FFF) as u16 } else { (seed & 0xFF) as u16 }
                }
            };
            // SAFETY: x < width, y < height
            unsafe { buffer.plot_pixel_unchecked(x, y, color) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostMemory;
    use crate::mode::{VideoMode, VideoModeConfig};

    fn page(mem: &HostMemory, mode: VideoMode) -> BitmapBuffer<'_, HostMemory> {
        BitmapBuffer::for_page(mem.region(), &VideoModeConfig::new(mode), 0).unwrap()
    }

    #[test]
    fn checkerboard_alternates_every_eight() {
        let mem = HostMemory::vram();
        let buf = page(&mem, VideoMode::Mode4);
        fill_pattern(&buf, FillPattern::Checkerboard, 1, 2);

        assert_eq!(buf.get_pixel(0, 0), Ok(1));
        assert_eq!(buf.get_pixel(7, 7), Ok(1));
        assert_eq!(buf.get_pixel(8, 0), Ok(2));
        assert_eq!(buf.get_pixel(8, 8), Ok(1));
    }

    #[test]
    fn stripes_and_solid() {
        let mem = HostMemory::vram();
        let buf = page(&mem, VideoMode::Mode3);

        fill_pattern(&buf, FillPattern::StripesH, 0x001F, 0x7C00);
        assert_eq!(buf.get_pixel(100, 3), Ok(0x001F));
        assert_eq!(buf.get_pixel(100, 4), Ok(0x7C00));

        fill_pattern(&buf, FillPattern::StripesV, 0x001F, 0x7C00);
        assert_eq!(buf.get_pixel(4, 100), Ok(0x7C00));

        fill_pattern(&buf, FillPattern::Solid, 0x03E0, 0);
        assert_eq!(buf.get_pixel(239, 159), Ok(0x03E0));
    }

    #[test]
    fn gradients_ramp_across_the_page() {
        let mem = HostMemory::vram();
        let buf = page(&mem, VideoMode::Mode5);
        fill_pattern(&buf, FillPattern::GradientH, 0, 0);

        assert_eq!(buf.get_pixel(0, 50), Ok(0));
        assert_eq!(buf.get_pixel(159, 50), Ok(gray15(159 * 31 / 160)));

        let buf = page(&mem, VideoMode::Mode4);
        fill_pattern(&buf, FillPattern::GradientV, 0, 0);
        assert_eq!(buf.get_pixel(5, 159), Ok((159 * 31 / 160 * 255 / 31) as u16));
    }

    #[test]
    fn noise_is_deterministic_and_in_range() {
        let a = HostMemory::vram();
        let b = HostMemory::vram();
        fill_pattern(&page(&a, VideoMode::Mode3), FillPattern::Noise, 0, 0);
        fill_pattern(&page(&b, VideoMode::Mode3), FillPattern::Noise, 0, 0);
        assert_eq!(a.snapshot(), b.snapshot());

        let buf = page(&a, VideoMode::Mode3);
        assert!((0..240).all(|x| buf.get_pixel(x, 0).unwrap() <= 0x7FFF));
        fill_pattern(&buf, FillPattern::Rainbow, 0, 0);
        assert_eq!(buf.get_pixel(0, 0), Ok(0));
    }
}
