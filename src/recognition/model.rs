//! Concrete capabilities loaded from the model bundle at `model_path`.
//!
//! The bundle is JSON:
//!
//! ```json
//! {
//!   "classifier": { "input_width": 100, "input_height": 100,
//!                   "weights": [[...], ...], "bias": [...] },
//!   "detector":   { "wrist": [0, 0, 255], "thumb_tip": [255, 0, 0],
//!                   "index_tip": [0, 255, 0], "tolerance": 40, "min_pixels": 4 }
//! }
//! ```
//!
//! `detector` is optional and defaults to the colours shown.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classifier::{Classifier, InputTensor, DEFAULT_INPUT_SIZE, LABELS};
use super::landmarks::{HandLandmark, HandLandmarks, LandmarkDetector, Point2};
use super::Recognizer;
use crate::error::{GestureError, Result};
use crate::frame::Frame;

/// Single-layer softmax classifier over the flattened input tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    #[serde(default = "default_input_size")]
    pub input_width: u32,
    #[serde(default = "default_input_size")]
    pub input_height: u32,
    /// One row per label, one column per tensor element.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}

impl LinearClassifier {
    /// Check shapes against the label table and input size.
    pub fn validate(&self) -> Result<()> {
        if self.weights.len() != LABELS.len() || self.bias.len() != LABELS.len() {
            return Err(GestureError::Model(format!(
                "expected {} classes, got {} weight rows and {} biases",
                LABELS.len(),
                self.weights.len(),
                self.bias.len()
            )));
        }

        let inputs = self.input_width as usize * self.input_height as usize * 3;
        if let Some(row) = self.weights.iter().position(|w| w.len() != inputs) {
            return Err(GestureError::Model(format!(
                "weight row {} has {} columns, expected {}",
                row,
                self.weights[row].len(),
                inputs
            )));
        }

        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    fn predict(&self, input: &InputTensor) -> Vec<f32> {
        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                if row.len() != input.len() {
                    return f32::NAN;
                }
                row.iter().zip(&input.data).map(|(w, x)| w * x).sum::<f32>() + bias
            })
            .collect();

        softmax(&logits)
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Finds a hand by three coloured markers (wrist, thumb tip, index tip).
///
/// Each marker's position is the centroid of the pixels within `tolerance`
/// of its colour on every channel. All three must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerDetector {
    pub wrist: [u8; 3],
    pub thumb_tip: [u8; 3],
    pub index_tip: [u8; 3],
    pub tolerance: u8,
    pub min_pixels: u32,
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self {
            wrist: [0, 0, 255],
            thumb_tip: [255, 0, 0],
            index_tip: [0, 255, 0],
            tolerance: 40,
            min_pixels: 4,
        }
    }
}

#[derive(Default, Clone, Copy)]
struct Centroid {
    sum_x: u64,
    sum_y: u64,
    count: u32,
}

impl Centroid {
    fn add(&mut self, x: u32, y: u32) {
        self.sum_x += u64::from(x);
        self.sum_y += u64::from(y);
        self.count += 1;
    }

    fn point(&self, width: u32, height: u32, min_pixels: u32) -> Option<Point2> {
        if self.count == 0 || self.count < min_pixels {
            return None;
        }
        let n = self.count as f64;
        Some(Point2::new(
            ((self.sum_x as f64 / n + 0.5) / f64::from(width)) as f32,
            ((self.sum_y as f64 / n + 0.5) / f64::from(height)) as f32,
        ))
    }
}

impl MarkerDetector {
    fn matches(&self, pixel: [u8; 3], target: [u8; 3]) -> bool {
        pixel
            .iter()
            .zip(target)
            .all(|(&p, t)| p.abs_diff(t) <= self.tolerance)
    }
}

impl LandmarkDetector for MarkerDetector {
    fn detect(&self, image: &Frame) -> Option<HandLandmarks> {
        let (width, height) = (image.width(), image.height());
        let targets = [self.wrist, self.thumb_tip, self.index_tip];
        let mut centroids = [Centroid::default(); 3];

        for (i, px) in image.data().chunks_exact(3).enumerate() {
            let pixel = [px[0], px[1], px[2]];
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            for (target, centroid) in targets.iter().zip(centroids.iter_mut()) {
                if self.matches(pixel, *target) {
                    centroid.add(x, y);
                }
            }
        }

        let [wrist, thumb, index] = centroids;
        Some(
            HandLandmarks::new()
                .with(HandLandmark::Wrist, wrist.point(width, height, self.min_pixels)?)
                .with(HandLandmark::ThumbTip, thumb.point(width, height, self.min_pixels)?)
                .with(
                    HandLandmark::IndexFingerTip,
                    index.point(width, height, self.min_pixels)?,
                ),
        )
    }
}

/// Contents of the model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub classifier: LinearClassifier,
    #[serde(default)]
    pub detector: MarkerDetector,
}

impl ModelBundle {
    /// Read and validate a bundle.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GestureError::Model(format!("cannot read {}: {}", path.display(), e))
        })?;
        let bundle: ModelBundle = serde_json::from_str(&text)?;
        bundle.classifier.validate()?;
        Ok(bundle)
    }

    /// Wrap both capabilities for sharing across sessions.
    pub fn into_recognizer(self) -> Recognizer {
        Recognizer::new(Arc::new(self.detector), Arc::new(self.classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use crate::recognition::argmax;

    fn tiny_classifier(hot: usize) -> LinearClassifier {
        // 1x1 input: three inputs per row.
        let mut weights = vec![vec![0.0; 3]; LABELS.len()];
        weights[hot] = vec![1.0, 1.0, 1.0];
        LinearClassifier {
            input_width: 1,
            input_height: 1,
            weights,
            bias: vec![0.0; LABELS.len()],
        }
    }

    #[test]
    fn test_linear_classifier_picks_hot_row() {
        let classifier = tiny_classifier(12);
        classifier.validate().unwrap();

        let frame = Frame::filled(1, 1, PixelFormat::Bgr8, [200, 200, 200]).unwrap();
        let input = InputTensor::from_frame(&frame, 1, 1).unwrap();
        let probs = classifier.predict(&input);

        assert_eq!(probs.len(), LABELS.len());
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert_eq!(argmax(&probs), Some(12));
    }

    #[test]
    fn test_linear_classifier_shape_mismatch() {
        let classifier = tiny_classifier(0);
        let frame = Frame::filled(2, 2, PixelFormat::Bgr8, [1, 1, 1]).unwrap();
        let input = InputTensor::from_frame(&frame, 2, 2).unwrap();
        assert_eq!(argmax(&classifier.predict(&input)), None);
    }

    #[test]
    fn test_validate_rejects_wrong_class_count() {
        let mut classifier = tiny_classifier(0);
        classifier.bias.pop();
        assert!(matches!(classifier.validate(), Err(GestureError::Model(_))));
    }

    fn marker_frame(thumb_x: u32, index_x: u32) -> Frame {
        let (w, h) = (200u32, 200u32);
        let mut data = vec![128u8; (w * h * 3) as usize];
        let mut paint = |cx: u32, cy: u32, rgb: [u8; 3]| {
            for y in cy..cy + 2 {
                for x in cx..cx + 2 {
                    let off = ((y * w + x) * 3) as usize;
                    data[off..off + 3].copy_from_slice(&rgb);
                }
            }
        };
        paint(50, 90, [0, 0, 255]);
        paint(thumb_x, 40, [255, 0, 0]);
        paint(index_x, 40, [0, 255, 0]);
        Frame::new(w, h, PixelFormat::Rgb8, data).unwrap()
    }

    #[test]
    fn test_marker_detector_finds_centroids() {
        let detector = MarkerDetector::default();
        let hand = detector.detect(&marker_frame(20, 70)).unwrap();

        let wrist = hand.get(HandLandmark::Wrist).unwrap();
        assert!((wrist.x - 0.255).abs() < 1e-4);
        assert!((wrist.y - 0.455).abs() < 1e-4);
        assert!(!hand.is_closed());
    }

    #[test]
    fn test_marker_detector_touching_tips_is_closed() {
        let detector = MarkerDetector::default();
        let hand = detector.detect(&marker_frame(40, 42)).unwrap();
        assert!(hand.is_closed());
    }

    #[test]
    fn test_marker_detector_missing_marker() {
        let detector = MarkerDetector::default();
        let plain = Frame::filled(10, 10, PixelFormat::Rgb8, [128, 128, 128]).unwrap();
        assert!(detector.detect(&plain).is_none());
    }

    #[test]
    fn test_bundle_from_file() {
        use std::io::Write;

        let bundle = ModelBundle {
            classifier: tiny_classifier(3),
            detector: MarkerDetector::default(),
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&bundle).unwrap().as_bytes())
            .unwrap();

        let loaded = ModelBundle::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn test_bundle_missing_file() {
        let err = ModelBundle::from_json_file("/nonexistent/model.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
