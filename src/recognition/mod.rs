//! Hand detection, classification and per-session smoothing.
//!
//! Detection and classification are capabilities behind traits
//! ([`LandmarkDetector`], [`Classifier`]) so the server can be driven by
//! the bundled [`model`] implementations or by test doubles.

mod buffer;
mod classifier;
mod landmarks;
pub mod model;
mod result;

pub use buffer::{GestureBuffer, Recognizer};
pub use classifier::{argmax, label_for, Classifier, InputTensor, DEFAULT_INPUT_SIZE, LABELS};
pub use landmarks::{
    HandLandmark, HandLandmarks, LandmarkDetector, Point2, CLOSED_HAND_THRESHOLD, LANDMARK_COUNT,
};
pub use model::{LinearClassifier, MarkerDetector, ModelBundle};
pub use result::{Decision, RecognitionResult, CLOSED_LABEL};
