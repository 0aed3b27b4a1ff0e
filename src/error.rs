//! Call failure kinds so callers can tell fatal acquisition errors from the rest.

use thiserror::Error;

/// Failures that abort a call before it becomes active.
///
/// Frame-level problems (malformed envelopes, undecodable payloads) never
/// surface here; they are logged and dropped where they occur.
#[derive(Debug, Error)]
pub enum CallError {
    /// Microphone could not be acquired (no device, permission denied, or
    /// the device rejected the requested mono/48 kHz shape).
    #[error("microphone unavailable: {0}")]
    MicUnavailable(String),

    /// Audio output device could not be acquired.
    #[error("audio output unavailable: {0}")]
    SpeakerUnavailable(String),

    /// The call channel could not be prepared.
    #[error("failed to open call channel: {0}")]
    Connect(String),
}
