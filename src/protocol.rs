//! Typed JSON envelopes exchanged with the call bridge over the WebSocket.
//!
//! One envelope per WebSocket text message, discriminated by a `"type"` tag.
//! The same enum covers both directions: `config`, `audio` (as capture), and
//! `text` flow outbound; `audio` (as playback), `transcript`, `clear_audio`,
//! and `error` flow inbound. `stop` is the graceful hangup notice.

use serde::{Deserialize, Serialize};

/// One self-contained message unit on the call channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Capture parameters, sent once per session right after the channel opens.
    #[serde(rename = "config")]
    Config {
        /// Capture sample rate in Hz.
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
        /// Input mode the remote agent should accept (`"both"` = voice + text).
        #[serde(rename = "inputMode")]
        input_mode: String,
    },

    /// One base64-encoded block of mono PCM16 samples.
    #[serde(rename = "audio")]
    Audio {
        /// Base64 text encoding of little-endian signed 16-bit samples.
        audio: String,
    },

    /// User-typed message; valid in any call state.
    #[serde(rename = "text")]
    Text {
        /// Message body.
        text: String,
    },

    /// Transcript fragment produced by the remote agent. The payload shape is
    /// owned by downstream consumers; the call core forwards it untouched.
    #[serde(rename = "transcript")]
    Transcript {
        /// Opaque transcript record.
        data: serde_json::Value,
    },

    /// Barge-in signal: drop all pending playback immediately.
    #[serde(rename = "clear_audio")]
    ClearAudio,

    /// Remote failure notice; does not close the channel by itself.
    #[serde(rename = "error")]
    Error {
        /// Human-readable error description.
        message: String,
    },

    /// Graceful hangup notice sent before closing the channel.
    #[serde(rename = "stop")]
    Stop,
}

/// Parse one inbound text frame into an envelope.
///
/// Malformed frames are dropped with a logged diagnostic; they must never
/// tear down the channel.
pub fn parse_envelope(raw: &str) -> Option<Envelope> {
    match serde_json::from_str(raw) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            tracing::warn!(error = %err, len = raw.len(), "dropping malformed envelope");
            None
        }
    }
}
