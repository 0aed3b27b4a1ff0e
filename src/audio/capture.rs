//! Microphone acquisition and the capture-side encode pipeline.
//!
//! The device callback regroups whatever block size the OS delivers into
//! fixed 20 ms frames, converts each frame to the PCM16 wire encoding, and
//! hands it to a non-blocking sink. Frames are dropped, never queued, when
//! the sink cannot take them — latency wins over completeness here.

use crate::audio::pcm;
use crate::error::CallError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::env;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Regroups arbitrary device blocks into fixed-size frames.
///
/// Keeps at most one partial frame of state, so capture never buffers more
/// than a single block behind the device.
pub struct FrameChunker {
    buf: Vec<f32>,
    frame_len: usize,
}

impl FrameChunker {
    pub fn new(frame_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(frame_len),
            frame_len: frame_len.max(1),
        }
    }

    /// Push a device block, invoking `emit` once per completed frame.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(&[f32])) {
        for &sample in samples {
            self.buf.push(sample);
            if self.buf.len() == self.frame_len {
                emit(&self.buf);
                self.buf.clear();
            }
        }
    }

    /// Discard any partial frame, used when streaming is gated off.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Live microphone stream feeding encoded frames to a sink.
///
/// The stream captures continuously once acquired; the `live` gate decides
/// whether frames reach the sink, so enabling streaming on call activation is
/// a single atomic store with no device round-trip.
pub struct CaptureStream {
    stream: cpal::Stream,
    live: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    device_name: String,
}

impl CaptureStream {
    /// Acquire the microphone and start the capture callback.
    ///
    /// Requests mono at the given sample rate. The sink returns `false` when
    /// it could not take a frame (transport not open or backpressured); such
    /// frames are counted and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::MicUnavailable`] when no device matches, the
    /// device cannot be opened, or it rejects the requested stream shape.
    /// This failure is fatal to the `idle -> connecting` transition.
    pub fn open(
        device_name: Option<&str>,
        sample_rate: u32,
        mut sink: impl FnMut(String) -> bool + Send + 'static,
    ) -> Result<Self, CallError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| CallError::MicUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| {
                    CallError::MicUnavailable(format!("no input device named {wanted:?}"))
                })?,
            None => host
                .default_input_device()
                .ok_or_else(|| CallError::MicUnavailable("no default input device".into()))?,
        };
        let resolved_name = device.name().unwrap_or_else(|_| "unknown device".into());

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let live = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));
        let callback_live = Arc::clone(&live);
        let callback_dropped = Arc::clone(&dropped);
        let mut chunker = FrameChunker::new(pcm::FRAME_SAMPLES);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _| {
                    if !callback_live.load(Ordering::Relaxed) {
                        chunker.reset();
                        return;
                    }
                    chunker.push(data, |frame| {
                        if !sink(pcm::encode_frame(frame)) {
                            callback_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                },
                |err| tracing::warn!(error = %err, "capture stream error"),
                None,
            )
            .map_err(|e| CallError::MicUnavailable(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CallError::MicUnavailable(e.to_string()))?;

        tracing::debug!(device = %resolved_name, sample_rate, "capture stream opened");
        Ok(Self {
            stream,
            live,
            dropped,
            device_name: resolved_name,
        })
    }

    /// Gate frame delivery; frames captured while gated off never leave the
    /// callback.
    pub fn set_streaming(&self, on: bool) {
        self.live.store(on, Ordering::Relaxed);
    }

    /// Best-effort stop; pause failures are swallowed because dropping the
    /// stream releases the device regardless.
    pub fn stop(&self) {
        self.live.store(false, Ordering::Relaxed);
        if let Err(err) = self.stream.pause() {
            tracing::debug!(error = %err, "capture stream pause failed (already stopped?)");
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Frames discarded because the sink was closed or backpressured.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Enumerate input device names for diagnostics.
///
/// `VOICECALL_TEST_DEVICES` (comma-separated) overrides enumeration so CI can
/// exercise the listing path without audio hardware.
pub fn list_input_devices() -> Vec<String> {
    if let Ok(forced) = env::var("VOICECALL_TEST_DEVICES") {
        return forced
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
    }
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "input device enumeration failed");
            Vec::new()
        }
    }
}
