use crate::error::{Result, ThumbError};
use std::fmt;
use std::str::FromStr;

/// Target thumbnail dimensions, parsed once at startup from a "WxH" string.
///
/// The rendered form ("400x500") doubles as the leading path segment of every
/// destination key, so `Display` must stay in sync with the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeSpec {
    pub width: u32,
    pub height: u32,
}

impl SizeSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for SizeSpec {
    type Err = ThumbError;

    /// Accepts an ASCII "x" or a Unicode "×" separator, tolerates whitespace
    /// around the string and around each side, and requires both sides to be
    /// positive base-10 integers.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('×', "x");
        let invalid = || ThumbError::InvalidSize(s.to_string());

        let (w_str, h_str) = normalized.split_once('x').ok_or_else(&invalid)?;
        let width: u32 = w_str.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h_str.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(SizeSpec { width, height })
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
