//! Per-session temporal smoothing.
//!
//! A [`GestureBuffer`] keeps the last few frames of one session. When the
//! current frame has no visible hand (occlusion, motion blur) it falls back
//! to the most recent buffered frame that still has one, re-running
//! detection on at most every `skip_frames`-th buffered frame.
//!
//! State lives in two counters rather than named states:
//! - `history.len()` grows to `capacity`, evicting the oldest frame
//! - `frames_since_last_detection` counts consecutive misses; reaching
//!   `timeout_duration` discards the history
//!
//! Only a detection on the current frame resets the miss counter, so a
//! stale buffered hand cannot keep the history alive forever.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::classifier::{argmax, label_for, Classifier, InputTensor};
use super::landmarks::{HandLandmarks, LandmarkDetector};
use super::result::{Decision, RecognitionResult};
use crate::config::BufferConfig;
use crate::frame::Frame;

/// Shared, stateless recognition capabilities.
///
/// Cheap to clone; every session holds one.
#[derive(Clone)]
pub struct Recognizer {
    detector: Arc<dyn LandmarkDetector>,
    classifier: Arc<dyn Classifier>,
}

impl Recognizer {
    pub fn new(detector: Arc<dyn LandmarkDetector>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Run the detector on the RGB view of `frame`.
    pub fn detect(&self, frame: &Frame) -> Option<HandLandmarks> {
        self.detector.detect(&frame.to_rgb())
    }

    /// Decide a label for a frame known to contain `landmarks`.
    ///
    /// `None` when the classifier output maps to no label.
    pub fn decide(&self, frame: &Frame, landmarks: &HandLandmarks) -> Option<Decision> {
        if landmarks.is_closed() {
            return Some(Decision::FastPathClosed);
        }

        let (width, height) = self.classifier.input_size();
        let input = match InputTensor::from_frame(frame, width, height) {
            Ok(input) => input,
            Err(e) => {
                warn!("Preprocessing failed: {}", e);
                return None;
            }
        };

        let probabilities = self.classifier.predict(&input);
        let index = argmax(&probabilities)?;
        match label_for(index) {
            Some(label) => Some(Decision::Classified(label)),
            None => {
                debug!(index, "Classifier index outside label table");
                None
            }
        }
    }

    fn resolve(&self, frame: &Frame, landmarks: &HandLandmarks) -> RecognitionResult {
        match self.decide(frame, landmarks) {
            Some(decision) => RecognitionResult::Gesture(decision),
            None => RecognitionResult::NoGestureRecognized,
        }
    }
}

impl std::fmt::Debug for Recognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recognizer").finish_non_exhaustive()
    }
}

/// Smoothing state for one session. Never shared between sessions.
#[derive(Debug)]
pub struct GestureBuffer {
    config: BufferConfig,
    recognizer: Recognizer,
    /// Oldest at the front, newest at the back.
    history: VecDeque<Frame>,
    frames_since_last_detection: u32,
}

impl GestureBuffer {
    pub fn new(config: BufferConfig, recognizer: Recognizer) -> Self {
        Self {
            history: VecDeque::with_capacity(config.capacity),
            config,
            recognizer,
            frames_since_last_detection: 0,
        }
    }

    /// Decide the result for the next frame of the session.
    pub fn observe(&mut self, frame: Frame) -> RecognitionResult {
        self.push(frame.clone());

        if let Some(landmarks) = self.recognizer.detect(&frame) {
            self.frames_since_last_detection = 0;
            return self.recognizer.resolve(&frame, &landmarks);
        }

        self.frames_since_last_detection = self.frames_since_last_detection.saturating_add(1);
        if self.frames_since_last_detection >= self.config.timeout_duration {
            if !self.history.is_empty() {
                debug!(
                    misses = self.frames_since_last_detection,
                    discarded = self.history.len(),
                    "Hand absent too long, clearing history"
                );
            }
            self.history.clear();
        }

        match self.scan_history() {
            Some((buffered, landmarks)) => {
                trace!("Falling back to buffered frame");
                self.recognizer.resolve(&buffered, &landmarks)
            }
            None => RecognitionResult::NoHandDetected,
        }
    }

    /// Newest-first scan of older frames, skipping the frame just pushed.
    fn scan_history(&self) -> Option<(Frame, HandLandmarks)> {
        let step = self.config.skip_frames.max(1);

        self.history
            .iter()
            .rev()
            .skip(1)
            .step_by(step)
            .find_map(|buffered| {
                self.recognizer
                    .detect(buffered)
                    .map(|landmarks| (buffered.clone(), landmarks))
            })
    }

    fn push(&mut self, frame: Frame) {
        while self.history.len() >= self.config.capacity.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(frame);
    }

    /// Frames currently buffered.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn frames_since_last_detection(&self) -> u32 {
        self.frames_since_last_detection
    }

    /// Buffered frames, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Frame> {
        self.history.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use crate::recognition::landmarks::{HandLandmark, Point2};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Test frames are 8x8 RGB. Red channel selects the hand the detector
    // reports, green channel selects the class the classifier picks.
    const NO_HAND: u8 = 0;
    const OPEN_HAND: u8 = 1;
    const CLOSED_HAND: u8 = 2;

    fn frame(hand: u8, class: u8) -> Frame {
        Frame::filled(8, 8, PixelFormat::Rgb8, [hand, class * 4, 0]).unwrap()
    }

    #[derive(Default)]
    struct ScriptedDetector {
        calls: AtomicUsize,
    }

    impl LandmarkDetector for ScriptedDetector {
        fn detect(&self, image: &Frame) -> Option<HandLandmarks> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let [hand, _, _] = image.pixel(0, 0)?;
            let index_x = match hand {
                OPEN_HAND => 0.7,
                CLOSED_HAND => 0.51,
                _ => return None,
            };
            Some(
                HandLandmarks::new()
                    .with(HandLandmark::Wrist, Point2::new(0.5, 0.9))
                    .with(HandLandmark::ThumbTip, Point2::new(0.5, 0.5))
                    .with(HandLandmark::IndexFingerTip, Point2::new(index_x, 0.5)),
            )
        }
    }

    #[derive(Default)]
    struct GreenClassifier {
        calls: AtomicUsize,
    }

    impl Classifier for GreenClassifier {
        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }

        fn predict(&self, input: &InputTensor) -> Vec<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let class = (input.data[1] * 255.0 / 4.0).round() as usize;
            let mut probs = vec![0.0; 70];
            probs[class] = 1.0;
            probs
        }
    }

    fn buffer_with(
        config: BufferConfig,
    ) -> (GestureBuffer, Arc<ScriptedDetector>, Arc<GreenClassifier>) {
        let detector = Arc::new(ScriptedDetector::default());
        let classifier = Arc::new(GreenClassifier::default());
        let recognizer = Recognizer::new(detector.clone(), classifier.clone());
        (GestureBuffer::new(config, recognizer), detector, classifier)
    }

    fn buffer() -> (GestureBuffer, Arc<ScriptedDetector>, Arc<GreenClassifier>) {
        buffer_with(BufferConfig::default())
    }

    #[test]
    fn test_detected_hand_is_classified() {
        let (mut buf, _, _) = buffer();
        let result = buf.observe(frame(OPEN_HAND, 10));
        assert_eq!(result, RecognitionResult::Gesture(Decision::Classified("A")));
    }

    #[test]
    fn test_closed_hand_bypasses_classifier() {
        let (mut buf, _, classifier) = buffer();
        let result = buf.observe(frame(CLOSED_HAND, 10));

        assert_eq!(result, RecognitionResult::Gesture(Decision::FastPathClosed));
        assert_eq!(result.as_str(), "closed");
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_index_outside_table_is_no_gesture() {
        let (mut buf, _, _) = buffer();
        // Class 63 exists in the probability vector but not in the label table.
        let result = buf.observe(frame(OPEN_HAND, 63));
        assert_eq!(result, RecognitionResult::NoGestureRecognized);
    }

    #[test]
    fn test_history_capped_with_fifo_eviction() {
        let (mut buf, _, _) = buffer();
        for class in 0..15u8 {
            buf.observe(frame(OPEN_HAND, class));
        }

        assert_eq!(buf.len(), 10);
        let greens: Vec<u8> = buf.history().map(|f| f.pixel(0, 0).unwrap()[1] / 4).collect();
        assert_eq!(greens, (5..15).collect::<Vec<u8>>());
    }

    #[test]
    fn test_counter_resets_on_detection() {
        let (mut buf, _, _) = buffer();
        buf.observe(frame(NO_HAND, 0));
        buf.observe(frame(NO_HAND, 0));
        assert_eq!(buf.frames_since_last_detection(), 2);

        buf.observe(frame(OPEN_HAND, 1));
        assert_eq!(buf.frames_since_last_detection(), 0);
    }

    #[test]
    fn test_history_cleared_at_timeout() {
        let (mut buf, _, _) = buffer();
        for _ in 0..4 {
            assert_eq!(buf.observe(frame(NO_HAND, 0)), RecognitionResult::NoHandDetected);
        }
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.frames_since_last_detection(), 4);

        buf.observe(frame(NO_HAND, 0));
        assert_eq!(buf.frames_since_last_detection(), 5);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_fallback_uses_most_recent_detectable_frame() {
        let (mut buf, _, _) = buffer();
        buf.observe(frame(OPEN_HAND, 11)); // "B", older
        buf.observe(frame(OPEN_HAND, 12)); // "C", newer
        buf.observe(frame(NO_HAND, 0));

        let result = buf.observe(frame(NO_HAND, 0));
        assert_eq!(result, RecognitionResult::Gesture(Decision::Classified("C")));
        // Fallback hits do not count as detections.
        assert_eq!(buf.frames_since_last_detection(), 2);
    }

    #[test]
    fn test_fallback_applies_closed_fast_path() {
        let (mut buf, _, classifier) = buffer();
        buf.observe(frame(CLOSED_HAND, 0));
        let result = buf.observe(frame(NO_HAND, 0));

        assert_eq!(result, RecognitionResult::Gesture(Decision::FastPathClosed));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_stops_after_timeout() {
        let (mut buf, _, _) = buffer_with(BufferConfig {
            capacity: 10,
            timeout_duration: 3,
            skip_frames: 1,
        });
        buf.observe(frame(OPEN_HAND, 20));

        assert!(buf.observe(frame(NO_HAND, 0)).decision().is_some());
        assert!(buf.observe(frame(NO_HAND, 0)).decision().is_some());
        // Third miss reaches the timeout: history gone, no fallback.
        assert_eq!(buf.observe(frame(NO_HAND, 0)), RecognitionResult::NoHandDetected);
        assert_eq!(buf.observe(frame(NO_HAND, 0)), RecognitionResult::NoHandDetected);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_skip_frames_decimates_scan() {
        let (mut buf, detector, _) = buffer_with(BufferConfig {
            capacity: 10,
            timeout_duration: 100,
            skip_frames: 2,
        });
        for _ in 0..6 {
            buf.observe(frame(NO_HAND, 0));
        }

        detector.calls.store(0, Ordering::SeqCst);
        buf.observe(frame(NO_HAND, 0));
        // 1 for the current frame, then 6 older frames scanned at positions 0, 2, 4.
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1 + 3);
    }

    #[test]
    fn test_skip_frames_can_miss_odd_positions() {
        let (mut buf, _, _) = buffer_with(BufferConfig {
            capacity: 10,
            timeout_duration: 100,
            skip_frames: 2,
        });
        buf.observe(frame(OPEN_HAND, 13)); // scan position 1 below: skipped
        buf.observe(frame(NO_HAND, 0)); // scan position 0
        let result = buf.observe(frame(NO_HAND, 0));
        assert_eq!(result, RecognitionResult::NoHandDetected);
    }
}
