//! Recognition outcomes.

use std::fmt;

use crate::protocol::{NO_GESTURE_RECOGNIZED, NO_HAND_DETECTED};

/// Label returned by the closed-hand fast path.
pub const CLOSED_LABEL: &str = "closed";

/// How a label was decided for a frame with a visible hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Thumb and index tips touching; classifier not consulted.
    FastPathClosed,
    /// Arg-max of the classifier output.
    Classified(&'static str),
}

impl Decision {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FastPathClosed => CLOSED_LABEL,
            Self::Classified(label) => label,
        }
    }
}

/// Per-frame answer sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionResult {
    Gesture(Decision),
    NoHandDetected,
    NoGestureRecognized,
}

impl RecognitionResult {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gesture(decision) => decision.label(),
            Self::NoHandDetected => NO_HAND_DETECTED,
            Self::NoGestureRecognized => NO_GESTURE_RECOGNIZED,
        }
    }

    pub fn decision(&self) -> Option<Decision> {
        match self {
            Self::Gesture(decision) => Some(*decision),
            _ => None,
        }
    }
}

impl fmt::Display for RecognitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
