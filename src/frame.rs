//! Captured image frames.
//!
//! A [`Frame`] is an 8-bit, 3-channel, row-major pixel buffer. Cameras
//! usually hand out BGR; the landmark detector wants RGB, so
//! [`Frame::to_rgb`] converts on demand while the classifier keeps the
//! native order.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{GestureError, Result};

/// Channel order of a frame's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Blue, green, red (camera native).
    Bgr8,
    /// Red, green, blue.
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        3
    }
}

/// One captured image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Bytes,
}

impl Frame {
    /// Create a frame, checking that `data` matches the dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Bytes>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            format,
            data: data.into(),
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Create a frame filled with a single colour.
    pub fn filled(width: u32, height: u32, format: PixelFormat, pixel: [u8; 3]) -> Result<Self> {
        let count = width as usize * height as usize;
        let data: Vec<u8> = pixel.iter().copied().cycle().take(count * 3).collect();
        Self::new(width, height, format, data)
    }

    /// Check dimensions and buffer length.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GestureError::InvalidFrame(format!(
                "zero dimension {}x{}",
                self.width, self.height
            )));
        }

        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.format.channels()))
            .ok_or_else(|| GestureError::InvalidFrame("dimensions overflow".to_string()))?;

        if self.data.len() != expected {
            return Err(GestureError::InvalidFrame(format!(
                "{}x{} {:?} needs {} bytes, got {}",
                self.width,
                self.height,
                self.format,
                expected,
                self.data.len()
            )));
        }

        Ok(())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)` in the frame's own channel order.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// RGB view of this frame. Cheap when the frame is already RGB.
    pub fn to_rgb(&self) -> Frame {
        match self.format {
            PixelFormat::Rgb8 => self.clone(),
            PixelFormat::Bgr8 => {
                let mut data = self.data.to_vec();
                for px in data.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                Frame {
                    width: self.width,
                    height: self.height,
                    format: PixelFormat::Rgb8,
                    data: Bytes::from(data),
                }
            }
        }
    }
}
