//! Voice-call client library backing the `voicecall` terminal binary.

pub mod audio;
pub mod config;
pub mod error;
pub mod gesture;
mod lock;
pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use error::CallError;
pub use gesture::{DragOutcome, SlideToCall};
pub(crate) use lock::lock_or_recover;
pub use protocol::Envelope;
pub use session::{
    format_elapsed, CallDriver, CallSession, CallState, DialParams, LiveCallDriver, SessionUpdate,
};
pub use transport::{TransportEvent, WsHandle};
