//! Optional JSONL trace logging for call debugging and latency triage.
//!
//! The terminal owns stdout/stderr, so traces go to a file. Disabled unless
//! requested, and initialized at most once per process.

use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

pub(crate) fn trace_log_path() -> PathBuf {
    env::var("VOICECALL_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("voicecall_trace.jsonl"))
}

#[inline]
fn telemetry_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

fn init_once(config: &AppConfig, once: &OnceLock<()>) {
    if !telemetry_enabled(config) {
        return;
    }
    let _ = once.get_or_init(|| {
        let path = trace_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn init_telemetry(config: &AppConfig) {
    init_once(config, &TELEMETRY_INIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn test_config() -> AppConfig {
        AppConfig::parse_from(["telemetry-test"])
    }

    fn unique_trace_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        env::temp_dir().join(format!("voicecall-trace-{suffix}-{nanos}.jsonl"))
    }

    #[test]
    fn trace_log_path_prefers_env_override() {
        let _guard = env_lock().lock().expect("env lock");
        let path = unique_trace_path("env");
        env::set_var("VOICECALL_TRACE_LOG", &path);
        assert_eq!(trace_log_path(), path);
        env::remove_var("VOICECALL_TRACE_LOG");
    }

    #[test]
    fn trace_log_path_defaults_to_temp_dir() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var("VOICECALL_TRACE_LOG");
        assert_eq!(trace_log_path(), env::temp_dir().join("voicecall_trace.jsonl"));
    }

    #[test]
    fn telemetry_enabled_requires_logs_without_no_logs() {
        let mut cfg = test_config();
        assert!(!telemetry_enabled(&cfg));
        cfg.logs = true;
        assert!(telemetry_enabled(&cfg));
        cfg.no_logs = true;
        assert!(!telemetry_enabled(&cfg));
    }

    #[test]
    fn init_once_creates_file_only_when_enabled() {
        let _guard = env_lock().lock().expect("env lock");

        let enabled_path = unique_trace_path("enabled");
        env::set_var("VOICECALL_TRACE_LOG", &enabled_path);
        let mut enabled_cfg = test_config();
        enabled_cfg.logs = true;
        init_once(&enabled_cfg, &OnceLock::new());
        assert!(enabled_path.exists(), "enabled config should create trace file");

        let disabled_path = unique_trace_path("disabled");
        env::set_var("VOICECALL_TRACE_LOG", &disabled_path);
        init_once(&test_config(), &OnceLock::new());
        assert!(!disabled_path.exists(), "disabled config should not create trace file");

        env::remove_var("VOICECALL_TRACE_LOG");
        let _ = fs::remove_file(enabled_path);
        let _ = fs::remove_file(disabled_path);
    }
}
