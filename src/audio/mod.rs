//! Audio pipelines: PCM wire codec, microphone capture, and ordered playback.

pub mod capture;
pub mod pcm;
pub mod playback;

pub use capture::{list_input_devices, CaptureStream, FrameChunker};
pub use playback::{PlaybackQueue, PlaybackSink};
