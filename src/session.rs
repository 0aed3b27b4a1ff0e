//! Call-session lifecycle: the idle/connecting/active machine and its wiring.
//!
//! `CallSession` owns exactly one [`CallDriver`] — the seam bundling the
//! microphone pipeline, the playback queue, and the WebSocket wire — and
//! converts external events (gesture fire, transport lifecycle, inbound
//! envelopes, user hangup) into state transitions. All observable output for
//! the UI flows through one `SessionUpdate` channel.

use crate::audio::{CaptureStream, PlaybackSink};
use crate::error::CallError;
use crate::protocol::Envelope;
use crate::transport::{self, TransportEvent, WsHandle};
use std::time::{Duration, Instant};

/// Call lifecycle states. `Idle` is both initial and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Connecting,
    Active,
}

/// UI-facing notifications emitted by the session.
#[derive(Debug)]
pub enum SessionUpdate {
    StateChanged(CallState),
    /// The call could not start or open; the user must re-trigger to retry.
    CallFailed(String),
    /// Remote `error` envelope; surfaced without ending the call.
    AgentError(String),
    /// Transcript record forwarded untouched to downstream consumers.
    Transcript(serde_json::Value),
    /// Plain text from the remote agent.
    AgentText(String),
}

/// Hardware-and-network seam owned by one session.
///
/// The production implementation is [`LiveCallDriver`]; tests substitute a
/// scripted driver so session flows run without devices or sockets.
pub trait CallDriver {
    /// Acquire the microphone and output device, then open the call channel.
    /// Transport lifecycle is reported asynchronously as [`TransportEvent`]s;
    /// only acquisition failures surface here, and they must leave the driver
    /// fully released.
    fn dial(&mut self) -> Result<(), CallError>;

    /// Gate capture frames into the wire. Off outside `Active`.
    fn set_streaming(&mut self, live: bool);

    /// Non-blocking envelope send. `false` means the frame was dropped.
    fn send(&mut self, envelope: Envelope) -> bool;

    /// Queue one inbound base64 payload for playback (decode failures skip).
    fn enqueue_audio(&mut self, payload: &str);

    /// Barge-in: drop in-flight and queued playback.
    fn clear_audio(&mut self);

    /// Release every held resource. Must be idempotent: callable from the
    /// user path, the close path, and the error path, in any combination.
    fn hangup(&mut self);
}

/// The call-session state machine.
pub struct CallSession<D: CallDriver> {
    driver: D,
    state: CallState,
    started_at: Option<Instant>,
    sample_rate: u32,
    input_mode: String,
    updates: crossbeam_channel::Sender<SessionUpdate>,
}

impl<D: CallDriver> CallSession<D> {
    pub fn new(
        driver: D,
        sample_rate: u32,
        input_mode: String,
        updates: crossbeam_channel::Sender<SessionUpdate>,
    ) -> Self {
        Self {
            driver,
            state: CallState::Idle,
            started_at: None,
            sample_rate,
            input_mode,
            updates,
        }
    }

    /// Start a call. Valid only from `Idle`; a no-op otherwise.
    ///
    /// Acquisition failure keeps the session in `Idle` and surfaces a
    /// `CallFailed` update; there is no automatic retry.
    pub fn request_start(&mut self) {
        if self.state != CallState::Idle {
            return;
        }
        match self.driver.dial() {
            Ok(()) => self.set_state(CallState::Connecting),
            Err(err) => {
                tracing::warn!(error = %err, "call start failed");
                self.driver.hangup();
                self.emit(SessionUpdate::CallFailed(err.to_string()));
            }
        }
    }

    /// Hang up. Valid from `Connecting` and `Active`; a no-op from `Idle`.
    pub fn request_end(&mut self) {
        if self.state == CallState::Idle {
            return;
        }
        // Graceful notice first; the release below closes the wire anyway.
        let _ = self.driver.send(Envelope::Stop);
        self.release();
    }

    /// Send a user-typed message. Valid in any state: when no channel is
    /// open the message is acknowledged locally so UI behavior stays uniform.
    pub fn send_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.driver.send(Envelope::Text { text: text.into() }) {
            tracing::debug!(len = text.len(), "text accepted with no open channel");
        }
    }

    /// Feed one transport event into the machine.
    pub fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Ready => self.on_ready(),
            TransportEvent::Inbound(envelope) => self.dispatch(envelope),
            TransportEvent::Closed => self.on_closed(),
        }
    }

    fn on_ready(&mut self) {
        if self.state != CallState::Connecting {
            // A late Ready after hangup; the driver already released the wire.
            tracing::debug!(state = ?self.state, "ignoring stale transport ready");
            return;
        }
        self.started_at = Some(Instant::now());
        let _ = self.driver.send(Envelope::Config {
            sample_rate: self.sample_rate,
            input_mode: self.input_mode.clone(),
        });
        self.driver.set_streaming(true);
        self.set_state(CallState::Active);
    }

    fn on_closed(&mut self) {
        let was = self.state;
        self.release();
        if was == CallState::Connecting {
            let err = CallError::Connect("channel closed before ready".into());
            self.emit(SessionUpdate::CallFailed(err.to_string()));
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        if self.state == CallState::Idle {
            // Events raced a hangup; playback is already released.
            return;
        }
        match envelope {
            Envelope::Audio { audio } => self.driver.enqueue_audio(&audio),
            Envelope::ClearAudio => self.driver.clear_audio(),
            Envelope::Error { message } => self.emit(SessionUpdate::AgentError(message)),
            Envelope::Transcript { data } => self.emit(SessionUpdate::Transcript(data)),
            Envelope::Text { text } => self.emit(SessionUpdate::AgentText(text)),
            other => tracing::debug!(?other, "ignoring unexpected inbound envelope"),
        }
    }

    /// Unconditional, idempotent resource release; the only path to `Idle`.
    pub fn release(&mut self) {
        self.driver.set_streaming(false);
        self.driver.clear_audio();
        self.driver.hangup();
        self.started_at = None;
        if self.state != CallState::Idle {
            self.set_state(CallState::Idle);
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Time since the call became active. `None` outside `Active`.
    pub fn elapsed(&self) -> Option<Duration> {
        match self.state {
            CallState::Active => self.started_at.map(|t| t.elapsed()),
            _ => None,
        }
    }

    fn set_state(&mut self, state: CallState) {
        self.state = state;
        self.emit(SessionUpdate::StateChanged(state));
    }

    fn emit(&self, update: SessionUpdate) {
        // A departed UI must not wedge the session.
        let _ = self.updates.send(update);
    }
}

/// Render a call duration as `MM:SS`, saturating at `99:59`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs().min(99 * 60 + 59);
    format!("{:02}:{:02}", total / 60, total % 60)
}

// ============================================================================
// Production driver: cpal pipelines + WebSocket wire.
// ============================================================================

/// Everything `LiveCallDriver` needs to dial one call.
#[derive(Debug, Clone)]
pub struct DialParams {
    pub url: String,
    pub sample_rate: u32,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

/// [`CallDriver`] backed by real devices and a real socket.
pub struct LiveCallDriver {
    runtime: tokio::runtime::Handle,
    params: DialParams,
    events: crossbeam_channel::Sender<TransportEvent>,
    wire: Option<WsHandle>,
    capture: Option<CaptureStream>,
    playback: Option<PlaybackSink>,
}

impl LiveCallDriver {
    pub fn new(
        runtime: tokio::runtime::Handle,
        params: DialParams,
        events: crossbeam_channel::Sender<TransportEvent>,
    ) -> Self {
        Self {
            runtime,
            params,
            events,
            wire: None,
            capture: None,
            playback: None,
        }
    }
}

impl CallDriver for LiveCallDriver {
    fn dial(&mut self) -> Result<(), CallError> {
        // Wire handle exists before the socket so the capture callback can be
        // bound to it; the actual dial is the last step, after both devices
        // are held, so a device failure never produces transport events.
        let (wire, connector) = transport::channel(self.params.url.clone(), self.events.clone());

        let frame_wire = wire.clone();
        let capture = CaptureStream::open(
            self.params.input_device.as_deref(),
            self.params.sample_rate,
            move |frame| frame_wire.send(Envelope::Audio { audio: frame }),
        )
        .inspect_err(|err| tracing::warn!(error = %err, "microphone acquisition failed"))?;

        let playback = PlaybackSink::open(
            self.params.output_device.as_deref(),
            self.params.sample_rate,
        )
        .inspect_err(|err| tracing::warn!(error = %err, "output acquisition failed"))?;

        connector.spawn(&self.runtime);
        self.wire = Some(wire);
        self.capture = Some(capture);
        self.playback = Some(playback);
        Ok(())
    }

    fn set_streaming(&mut self, live: bool) {
        if let Some(capture) = &self.capture {
            capture.set_streaming(live);
        }
    }

    fn send(&mut self, envelope: Envelope) -> bool {
        self.wire
            .as_ref()
            .map(|wire| wire.send(envelope))
            .unwrap_or(false)
    }

    fn enqueue_audio(&mut self, payload: &str) {
        if let Some(playback) = &self.playback {
            playback.enqueue_encoded(payload);
        }
    }

    fn clear_audio(&mut self) {
        if let Some(playback) = &self.playback {
            playback.clear();
        }
    }

    fn hangup(&mut self) {
        // Every release is a take(), so a second hangup finds nothing to do.
        if let Some(capture) = self.capture.take() {
            let dropped = capture.dropped_frames();
            if dropped > 0 {
                tracing::debug!(
                    dropped,
                    device = capture.device_name(),
                    "capture frames dropped under backpressure"
                );
            }
            capture.stop();
        }
        if let Some(playback) = self.playback.take() {
            playback.stop();
        }
        // Dropping the last handle closes the outbound channel; the socket
        // task then sends a close frame and emits `Closed`.
        self.wire = None;
    }
}
