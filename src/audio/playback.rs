//! Ordered, interruptible playback of inbound audio payloads.
//!
//! Split into a pure queue (`PlaybackQueue`) and a device layer
//! (`PlaybackSink`). The queue holds decoded float payloads in strict arrival
//! order with a single "now playing" cursor; the sink is a cpal output stream
//! whose callback pulls samples from the shared queue. All queue mutation
//! (`enqueue`, advance, `clear`) happens under one mutex, so a barge-in
//! `clear` always completes before the device callback can start the next
//! payload — a stale advance on cleared audio is impossible.

use crate::audio::pcm;
use crate::error::CallError;
use crate::lock_or_recover;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct NowPlaying {
    samples: Vec<f32>,
    cursor: usize,
}

/// FIFO of decoded payloads plus the in-flight render cursor.
#[derive(Default)]
pub struct PlaybackQueue {
    pending: VecDeque<Vec<f32>>,
    playing: Option<NowPlaying>,
    /// Bumped on every `clear` so observers can detect interruptions.
    generation: u64,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one decoded payload; starts it immediately when nothing is
    /// rendering. Empty payloads are dropped so they cannot wedge the cursor.
    pub fn enqueue(&mut self, samples: Vec<f32>) {
        if samples.is_empty() {
            return;
        }
        if self.playing.is_none() {
            self.playing = Some(NowPlaying { samples, cursor: 0 });
        } else {
            self.pending.push_back(samples);
        }
    }

    /// Drop the in-flight payload and everything queued behind it.
    ///
    /// Leaves the queue immediately ready for new payloads. Callable at any
    /// time, including mid-render.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.playing = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Copy the next `out.len()` samples into the device buffer, chaining
    /// payloads strictly in arrival order and zero-filling once idle.
    pub fn fill(&mut self, out: &mut [f32]) {
        let mut written = 0;
        while written < out.len() {
            let Some(current) = self.playing.as_mut() else {
                break;
            };
            let remaining = &current.samples[current.cursor..];
            let take = remaining.len().min(out.len() - written);
            out[written..written + take].copy_from_slice(&remaining[..take]);
            written += take;
            current.cursor += take;
            if current.cursor >= current.samples.len() {
                // Natural completion: advance to the queue head, or go idle.
                self.playing = self.pending.pop_front().map(|samples| NowPlaying {
                    samples,
                    cursor: 0,
                });
            }
        }
        out[written..].fill(0.0);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// cpal output stream rendering the shared queue.
pub struct PlaybackSink {
    queue: Arc<Mutex<PlaybackQueue>>,
    stream: cpal::Stream,
}

impl PlaybackSink {
    /// Acquire the output device and start the render stream.
    ///
    /// The stream renders silence until payloads arrive, so opening it during
    /// dial keeps the active path allocation-free.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::SpeakerUnavailable`] when no device matches or the
    /// device rejects the mono stream at the requested rate.
    pub fn open(device_name: Option<&str>, sample_rate: u32) -> Result<Self, CallError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(wanted) => host
                .output_devices()
                .map_err(|e| CallError::SpeakerUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| {
                    CallError::SpeakerUnavailable(format!("no output device named {wanted:?}"))
                })?,
            None => host.default_output_device().ok_or_else(|| {
                CallError::SpeakerUnavailable("no default output device".into())
            })?,
        };

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let queue = Arc::new(Mutex::new(PlaybackQueue::new()));
        let callback_queue = Arc::clone(&queue);
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _| {
                    lock_or_recover(&callback_queue, "playback queue").fill(out);
                },
                |err| tracing::warn!(error = %err, "playback stream error"),
                None,
            )
            .map_err(|e| CallError::SpeakerUnavailable(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CallError::SpeakerUnavailable(e.to_string()))?;

        Ok(Self { queue, stream })
    }

    /// Decode one inbound payload and queue it for rendering.
    ///
    /// A payload that fails to decode is logged and skipped; the queue keeps
    /// draining the rest.
    pub fn enqueue_encoded(&self, payload: &str) {
        match pcm::decode_frame(payload) {
            Ok(samples) => lock_or_recover(&self.queue, "playback queue").enqueue(samples),
            Err(err) => tracing::warn!(error = %err, "skipping undecodable audio payload"),
        }
    }

    /// Barge-in: drop the in-flight render and the whole queue.
    pub fn clear(&self) {
        lock_or_recover(&self.queue, "playback queue").clear();
    }

    /// Best-effort stop of the device stream; a failure to pause is swallowed
    /// because the stream may already be stopped.
    pub fn stop(&self) {
        self.clear();
        if let Err(err) = self.stream.pause() {
            tracing::debug!(error = %err, "playback stream pause failed (already stopped?)");
        }
    }
}
