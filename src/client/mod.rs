//! Streaming client: capture frames, send them, show the labels.

mod link;
mod source;

pub use link::{ClientLink, LinkHandle};
pub use source::{ConsoleDisplay, FrameSource, LabelDisplay, SyntheticSource};
