//! Capture and display surfaces used by [`ClientLink`](super::ClientLink).

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::frame::{Frame, PixelFormat};

/// Produces frames on demand.
///
/// Called from both client loops on every tick, so it should hand back the
/// latest available frame rather than block for a new one. `None` means
/// nothing usable this tick.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Option<Frame>;
}

/// Presents the current label, typically over the latest frame.
pub trait LabelDisplay: Send {
    fn render(&mut self, frame: Option<&Frame>, label: &str, connected: bool);
}

const BACKGROUND: [u8; 3] = [96, 96, 96];
// RGB; stored reversed since frames are BGR.
const WRIST: [u8; 3] = [0, 0, 255];
const THUMB_TIP: [u8; 3] = [255, 0, 0];
const INDEX_TIP: [u8; 3] = [0, 255, 0];

/// Test pattern standing in for a camera.
///
/// Draws three coloured markers (wrist, thumb tip, index tip) on a grey
/// background. Over the first three quarters of `period` captures the
/// index marker slides from an open-hand position onto the thumb; it stays
/// there for the last quarter, then jumps back.
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    period: u64,
    dropout_every: Option<u64>,
    tick: AtomicU64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(8),
            height: height.max(8),
            period: 90,
            dropout_every: None,
            tick: AtomicU64::new(0),
        }
    }

    /// Captures per open-to-pinched cycle.
    pub fn with_period(mut self, period: u64) -> Self {
        self.period = period.max(1);
        self
    }

    /// Fail every `n`th capture, like a camera dropping frames.
    pub fn with_dropout_every(mut self, n: u64) -> Self {
        self.dropout_every = (n > 0).then_some(n);
        self
    }

    /// Captures attempted so far.
    pub fn captures(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    fn render(&self, tick: u64) -> Option<Frame> {
        let (w, h) = (self.width, self.height);
        let mut data = Vec::with_capacity(w as usize * h as usize * 3);
        for _ in 0..w * h {
            data.extend_from_slice(&bgr(BACKGROUND));
        }

        let side = (w / 80).max(2);
        let phase = (tick % self.period) as f32 / self.period as f32;
        let closing = (phase / 0.75).min(1.0);
        let thumb_x = w * 35 / 100;
        let open_gap = (w * 40 / 100) as f32;
        let index_x = thumb_x + (open_gap * (1.0 - closing)) as u32;
        let tips_y = h * 40 / 100;

        let mut paint = |cx: u32, cy: u32, rgb: [u8; 3]| {
            for y in cy..(cy + side).min(h) {
                for x in cx..(cx + side).min(w) {
                    let off = (y as usize * w as usize + x as usize) * 3;
                    data[off..off + 3].copy_from_slice(&bgr(rgb));
                }
            }
        };
        paint(w / 2, h * 85 / 100, WRIST);
        paint(thumb_x, tips_y, THUMB_TIP);
        // Pinched: share the row, sit one marker-width to the right.
        paint(index_x.max(thumb_x + side), tips_y, INDEX_TIP);

        Frame::new(w, h, PixelFormat::Bgr8, data).ok()
    }
}

fn bgr([r, g, b]: [u8; 3]) -> [u8; 3] {
    [b, g, r]
}

impl FrameSource for SyntheticSource {
    fn capture(&self) -> Option<Frame> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        if let Some(n) = self.dropout_every {
            if (tick + 1) % n == 0 {
                return None;
            }
        }
        self.render(tick)
    }
}

/// Logs label and connection changes.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    last_label: Option<String>,
    last_connected: Option<bool>,
    frames: u64,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl LabelDisplay for ConsoleDisplay {
    fn render(&mut self, frame: Option<&Frame>, label: &str, connected: bool) {
        self.frames += 1;

        if self.last_connected != Some(connected) {
            info!(connected, "Link state changed");
            self.last_connected = Some(connected);
        }

        if self.last_label.as_deref() != Some(label) {
            let size = frame.map(|f| (f.width(), f.height()));
            info!(label, ?size, "Gesture");
            self.last_label = Some(label.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::{HandLandmark, LandmarkDetector, MarkerDetector};

    #[test]
    fn test_synthetic_frame_shape() {
        let source = SyntheticSource::new(64, 48);
        let frame = source.capture().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.format(), PixelFormat::Bgr8);
        assert_eq!(frame.pixel(0, 0), Some(BACKGROUND));
        assert_eq!(source.captures(), 1);
    }

    #[test]
    fn test_synthetic_markers_are_detectable() {
        let source = SyntheticSource::new(200, 200).with_period(10);
        let detector = MarkerDetector::default();

        let open = detector.detect(&source.capture().unwrap().to_rgb()).unwrap();
        assert!(!open.is_closed());
        assert!(open.get(HandLandmark::Wrist).is_some());

        for _ in 0..8 {
            source.capture();
        }
        let pinched = detector.detect(&source.capture().unwrap().to_rgb()).unwrap();
        assert!(pinched.is_closed());
    }

    #[test]
    fn test_dropout() {
        let source = SyntheticSource::new(16, 16).with_dropout_every(3);
        let captured: Vec<bool> = (0..6).map(|_| source.capture().is_some()).collect();
        assert_eq!(captured, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_console_display_counts_frames() {
        let mut display = ConsoleDisplay::new();
        display.render(None, "", false);
        display.render(None, "A", true);
        display.render(None, "A", true);
        assert_eq!(display.frames(), 3);
        assert_eq!(display.last_label.as_deref(), Some("A"));
    }
}
