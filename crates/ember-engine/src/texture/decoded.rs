use crate::error::{EngineError, Result};

/// Tightly packed 8-bit pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// 1 (R), 2 (RG), 3 (RGB) or 4 (RGBA).
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// RGBA checkerboard of `cells` × `cells` squares, `cell_size` pixels each.
    ///
    /// Sizes whose pixel count does not fit in memory addressing are rejected.
    pub fn checkerboard(cells: u32, cell_size: u32, a: [u8; 4], b: [u8; 4]) -> Result<Self> {
        let side = cells.checked_mul(cell_size);
        let len = side.and_then(|side| {
            let side = usize::try_from(side).ok()?;
            side.checked_mul(side)?.checked_mul(4)
        });
        let (Some(side), Some(len)) = (side, len) else {
            return Err(EngineError::resource(
                "texture",
                format!("{cells}x{cells} checkerboard of {cell_size}px cells is too large"),
            ));
        };

        let mut pixels = Vec::with_capacity(len);
        for y in 0..side {
            for x in 0..side {
                let even = (x / cell_size + y / cell_size) % 2 == 0;
                pixels.extend_from_slice(if even { &a } else { &b });
            }
        }
        Ok(Self::new(side, side, 4, pixels))
    }

    /// Bytes the pixel buffer must hold for the declared size.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    /// Checks dimensions, channel count and buffer length.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::resource(
                "texture",
                format!("image is {}x{}", self.width, self.height),
            ));
        }
        if !(1..=4).contains(&self.channels) {
            return Err(EngineError::resource(
                "texture",
                format!("unsupported channel count {}", self.channels),
            ));
        }
        if self.pixels.len() != self.expected_len() {
            return Err(EngineError::resource(
                "texture",
                format!(
                    "{}x{}x{} image needs {} bytes, got {}",
                    self.width,
                    self.height,
                    self.channels,
                    self.expected_len(),
                    self.pixels.len()
                ),
            ));
        }
        Ok(())
    }
}
