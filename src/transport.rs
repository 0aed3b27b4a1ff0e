//! WebSocket duplex channel carrying call envelopes.
//!
//! `channel` prepares a handle/connector pair so the capture pipeline can be
//! wired to the outbound side before the socket exists; `Connector::spawn`
//! then dials on the runtime. Subscribers observe exactly three effects:
//! `Ready` once on open, `Inbound` per parsed envelope in arrival order, and
//! `Closed` exactly once regardless of how the connection ends.

use crate::protocol::{parse_envelope, Envelope};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tungstenite::Message;

/// Outbound frames buffered between caller and writer task. Small on purpose:
/// audio frames are dropped under backpressure, never queued deep.
const OUTBOUND_CAPACITY: usize = 32;

/// Lifecycle and traffic notifications delivered to the session loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// Channel is open; drives `connecting -> active`.
    Ready,
    /// One parsed inbound envelope, delivered in arrival order.
    Inbound(Envelope),
    /// Channel is gone (graceful close, network error, or failed open).
    /// Emitted exactly once; drives `* -> idle`.
    Closed,
}

/// Cloneable sender half of the call channel.
#[derive(Clone)]
pub struct WsHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WsHandle {
    /// Non-blocking send. Returns `false` when the frame was dropped because
    /// the channel is closed or backpressured — callers treat that as a
    /// tolerable gap, not an error.
    pub fn send(&self, envelope: Envelope) -> bool {
        self.tx.try_send(envelope).is_ok()
    }
}

/// Deferred dial: holds everything needed to run the socket task.
pub struct Connector {
    url: String,
    outbound: mpsc::Receiver<Envelope>,
    events: crossbeam_channel::Sender<TransportEvent>,
}

impl Connector {
    /// Dial and run the socket on the given runtime. Always emits `Closed`
    /// exactly once, including when the dial itself fails.
    pub fn spawn(self, runtime: &tokio::runtime::Handle) {
        runtime.spawn(run_socket(self.url, self.outbound, self.events));
    }
}

/// Build the handle/connector pair for one call.
pub fn channel(
    url: String,
    events: crossbeam_channel::Sender<TransportEvent>,
) -> (WsHandle, Connector) {
    let (tx, outbound) = mpsc::channel(OUTBOUND_CAPACITY);
    (
        WsHandle { tx },
        Connector {
            url,
            outbound,
            events,
        },
    )
}

async fn run_socket(
    url: String,
    mut outbound: mpsc::Receiver<Envelope>,
    events: crossbeam_channel::Sender<TransportEvent>,
) {
    let ws = match connect_async(&url).await {
        Ok((ws, _response)) => ws,
        Err(err) => {
            tracing::warn!(error = %err, url = %url, "call channel failed to open");
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };
    tracing::debug!(url = %url, "call channel open");
    let _ = events.send(TransportEvent::Ready);

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(raw))) => {
                    if let Some(envelope) = parse_envelope(&raw) {
                        if events.send(TransportEvent::Inbound(envelope)).is_err() {
                            break; // session loop is gone
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // ping/pong handled by tungstenite; binary ignored
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "call channel read failed");
                    break;
                }
            },
            frame = outbound.recv() => match frame {
                Some(envelope) => match serde_json::to_string(&envelope) {
                    Ok(json) => {
                        if let Err(err) = write.send(Message::Text(json)).await {
                            tracing::warn!(error = %err, "call channel write failed");
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "envelope serialization failed"),
                },
                // All handles dropped: the session hung up.
                None => break,
            },
        }
    }

    let _ = write.send(Message::Close(None)).await;
    let _ = events.send(TransportEvent::Closed);
    tracing::debug!("call channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reports_dropped_frames_after_connector_is_gone() {
        let (events_tx, _events_rx) = crossbeam_channel::unbounded();
        let (handle, connector) = channel("ws://127.0.0.1:1/ws".into(), events_tx);
        drop(connector);
        assert!(!handle.send(Envelope::Stop), "send into closed channel must report a drop");
    }

    #[test]
    fn handle_buffers_up_to_capacity_before_spawn() {
        let (events_tx, _events_rx) = crossbeam_channel::unbounded();
        let (handle, _connector) = channel("ws://127.0.0.1:1/ws".into(), events_tx);
        for _ in 0..OUTBOUND_CAPACITY {
            assert!(handle.send(Envelope::ClearAudio));
        }
        // Capacity reached: further frames drop instead of blocking.
        assert!(!handle.send(Envelope::ClearAudio));
    }

    #[test]
    fn failed_dial_emits_closed_exactly_once() {
        // Worker-threaded so the spawned socket task runs without block_on.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        // Unroutable port: the dial fails fast.
        let (_handle, connector) = channel("ws://127.0.0.1:9/ws".into(), events_tx);
        connector.spawn(runtime.handle());

        let event = events_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("closed event");
        assert!(matches!(event, TransportEvent::Closed));
        assert!(
            events_rx
                .recv_timeout(std::time::Duration::from_millis(200))
                .is_err(),
            "no second lifecycle event may follow Closed"
        );
    }
}
