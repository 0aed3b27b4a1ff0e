//! CLI flag schema so call-client behavior is explicit and discoverable.

use clap::Parser;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws/web-call";
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_INPUT_MODE: &str = "both";
/// Delay between gesture completion and the actual session start, so the
/// slide animation settles before the microphone goes hot.
pub const DEFAULT_SETTLE_MS: u64 = 350;

/// Runtime configuration assembled from CLI flags and environment overrides.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "voicecall",
    about = "Voice-call client for a remote conversational agent",
    version
)]
pub struct AppConfig {
    /// WebSocket endpoint of the call bridge.
    #[arg(long, env = "VOICECALL_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Agent identity forwarded to the bridge as a query parameter.
    #[arg(long, env = "VOICECALL_AGENT_ID")]
    pub agent_id: Option<String>,

    /// Capture device name; the system default when omitted.
    #[arg(long)]
    pub input_device: Option<String>,

    /// Playback device name; the system default when omitted.
    #[arg(long)]
    pub output_device: Option<String>,

    /// Capture and playback sample rate in Hz.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Input mode announced in the config envelope.
    #[arg(long, default_value = DEFAULT_INPUT_MODE)]
    pub input_mode: String,

    /// Gesture settle delay in milliseconds (0 starts the call immediately
    /// on slide completion).
    #[arg(long, default_value_t = DEFAULT_SETTLE_MS)]
    pub settle_ms: u64,

    /// Write a JSONL trace log (see VOICECALL_TRACE_LOG for the path).
    #[arg(long)]
    pub logs: bool,

    /// Suppress all trace logging, overriding --logs.
    #[arg(long)]
    pub no_logs: bool,

    /// List available audio input devices and exit.
    #[arg(long)]
    pub list_input_devices: bool,
}

impl AppConfig {
    /// Resolved dial URL, with the agent query parameter when configured.
    pub fn endpoint(&self) -> String {
        match &self.agent_id {
            Some(agent_id) => format!("{}?agent_id={agent_id}", self.server_url),
            None => self.server_url.clone(),
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let mut full = vec!["voicecall"];
        full.extend_from_slice(args);
        AppConfig::parse_from(full)
    }

    #[test]
    fn defaults_match_the_bridge_contract() {
        let cfg = parse(&[]);
        assert_eq!(cfg.server_url, DEFAULT_SERVER_URL);
        assert_eq!(cfg.sample_rate, 48_000);
        assert_eq!(cfg.input_mode, "both");
        assert_eq!(cfg.settle_ms, DEFAULT_SETTLE_MS);
        assert!(!cfg.logs);
    }

    #[test]
    fn endpoint_appends_agent_query_only_when_set() {
        let plain = parse(&["--server-url", "ws://example.test/ws/web-call"]);
        assert_eq!(plain.endpoint(), "ws://example.test/ws/web-call");

        let with_agent = parse(&[
            "--server-url",
            "ws://example.test/ws/web-call",
            "--agent-id",
            "agent-7",
        ]);
        assert_eq!(
            with_agent.endpoint(),
            "ws://example.test/ws/web-call?agent_id=agent-7"
        );
    }

    #[test]
    fn settle_converts_milliseconds() {
        let cfg = parse(&["--settle-ms", "125"]);
        assert_eq!(cfg.settle(), Duration::from_millis(125));
    }
}
