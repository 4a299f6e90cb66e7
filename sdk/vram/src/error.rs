use core::fmt;

/// Failures surfaced by checked video memory operations.
///
/// Hardware busy states never show up here; the transfer engine always waits
/// them out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VramError {
    /// A coordinate or offset fell outside the addressed buffer or region.
    OutOfBounds,
    /// A block, tile or page index outside its valid range.
    InvalidIndex,
    /// Caller-supplied data has the wrong length for the target (e.g. tile data).
    InvalidLength,
    /// The requested video mode doesn't exist or can't do what was asked of it.
    UnsupportedMode,
}

impl fmt::Display for VramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VramError::OutOfBounds => write!(f, "coordinates out of bounds"),
            VramError::InvalidIndex => write!(f, "index out of range"),
            VramError::InvalidLength => write!(f, "data length does not match target"),
            VramError::UnsupportedMode => write!(f, "unsupported video mode"),
        }
    }
}

impl core::error::Error for VramError {}
