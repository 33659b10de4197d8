//! Classifier capability, input preprocessing and the label table.
//!
//! The classifier sees the frame in its native channel order, resized to
//! its input size (bilinear) and scaled to `0.0..=1.0`, laid out HWC.

use fast_image_resize as fr;
use fr::images::Image;

use crate::error::{GestureError, Result};
use crate::frame::Frame;

/// Default classifier input edge length.
pub const DEFAULT_INPUT_SIZE: u32 = 100;

/// Class index to label.
pub const LABELS: [&str; 63] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", //
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", //
    "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", //
    " ", //
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", //
    "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z",
];

/// Look up the label for a class index.
#[inline]
pub fn label_for(index: usize) -> Option<&'static str> {
    LABELS.get(index).copied()
}

/// Index of the highest probability.
///
/// `None` for an empty vector or one containing NaN.
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    if probabilities.iter().any(|p| p.is_nan()) {
        return None;
    }
    probabilities
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

/// Normalized classifier input: one HWC image, values in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<f32>,
}

impl InputTensor {
    /// Resize `frame` to `width` x `height` and normalize.
    pub fn from_frame(frame: &Frame, width: u32, height: u32) -> Result<Self> {
        let pixels = if frame.width() == width && frame.height() == height {
            frame.data().to_vec()
        } else {
            resize_rgb8(frame, width, height)?
        };

        Ok(Self {
            width,
            height,
            channels: 3,
            data: pixels.iter().map(|&b| f32::from(b) / 255.0).collect(),
        })
    }

    /// Number of scalar inputs.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn resize_rgb8(frame: &Frame, width: u32, height: u32) -> Result<Vec<u8>> {
    let src = Image::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.data().to_vec(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| GestureError::InvalidFrame(format!("resize source: {}", e)))?;

    let mut dst = Image::new(width, height, fr::PixelType::U8x3);

    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
    fr::Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| GestureError::InvalidFrame(format!("resize: {}", e)))?;

    Ok(dst.into_vec())
}

/// Maps a normalized image to a probability vector over [`LABELS`].
///
/// Implementations must be deterministic and safe to call from several
/// sessions at once.
pub trait Classifier: Send + Sync {
    /// Input size expected by [`predict`](Classifier::predict).
    fn input_size(&self) -> (u32, u32) {
        (DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
    }

    fn predict(&self, input: &InputTensor) -> Vec<f32>;
}
