//! Hand keypoints and the detector capability.

use crate::frame::Frame;

/// Thumb-tip to index-tip distance below which the hand counts as closed.
pub const CLOSED_HAND_THRESHOLD: f32 = 0.02;

/// Number of named hand keypoints.
pub const LANDMARK_COUNT: usize = 21;

/// Named hand keypoints, in the conventional 21-point hand model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandLandmark {
    /// Slot of this keypoint in [`HandLandmarks`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A 2D keypoint in normalized image coordinates (0.0..=1.0 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Keypoints of one detected hand. Detectors may fill only some slots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandLandmarks {
    points: [Option<Point2>; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, landmark: HandLandmark, point: Point2) -> Self {
        self.set(landmark, point);
        self
    }

    pub fn set(&mut self, landmark: HandLandmark, point: Point2) {
        self.points[landmark.index()] = Some(point);
    }

    pub fn get(&self, landmark: HandLandmark) -> Option<Point2> {
        self.points[landmark.index()]
    }

    /// Number of keypoints present.
    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance between thumb tip and index fingertip, if both are present.
    pub fn pinch_distance(&self) -> Option<f32> {
        let thumb = self.get(HandLandmark::ThumbTip)?;
        let index = self.get(HandLandmark::IndexFingerTip)?;
        Some(thumb.distance(index))
    }

    /// Closed-hand fast path: thumb tip and index tip nearly touching.
    pub fn is_closed(&self) -> bool {
        self.pinch_distance()
            .is_some_and(|d| d < CLOSED_HAND_THRESHOLD)
    }
}

/// Finds a hand in an RGB image.
///
/// Implementations must be deterministic and safe to call from several
/// sessions at once. Only the first hand found is reported.
pub trait LandmarkDetector: Send + Sync {
    fn detect(&self, image: &Frame) -> Option<HandLandmarks>;
}
