//! One-line status rendering: call state, elapsed time, slide bar, compose box.

use std::time::Duration;
use voicecall::{format_elapsed, CallState, SlideToCall};

/// Slide track width in cells; doubles as the gesture `max_distance`.
pub(crate) const BAR_WIDTH: u16 = 24;

fn state_label(state: CallState) -> &'static str {
    match state {
        CallState::Idle => "idle",
        CallState::Connecting => "connecting",
        CallState::Active => "active",
    }
}

fn slide_bar(slide: &SlideToCall) -> String {
    let filled = ((slide.ratio() * f32::from(BAR_WIDTH)) as u16).min(BAR_WIDTH) as usize;
    let width = BAR_WIDTH as usize;
    if slide.is_complete() {
        format!("[{}]", "=".repeat(width))
    } else if filled == 0 {
        format!("[>{}]", " ".repeat(width.saturating_sub(1)))
    } else {
        format!(
            "[{}>{}]",
            "=".repeat(filled.saturating_sub(1)),
            " ".repeat(width - filled)
        )
    }
}

/// Render the whole status line. Pure so it can be asserted on directly.
pub(crate) fn render(
    state: CallState,
    elapsed: Option<Duration>,
    slide: &SlideToCall,
    compose: &str,
    notice: Option<&str>,
) -> String {
    let mut line = String::new();
    match state {
        CallState::Idle => {
            line.push_str(&slide_bar(slide));
            line.push_str(" slide to call");
        }
        CallState::Connecting => line.push_str("connecting..."),
        CallState::Active => {
            line.push_str("on call ");
            line.push_str(&format_elapsed(elapsed.unwrap_or(Duration::ZERO)));
        }
    }
    line.push_str("  [");
    line.push_str(state_label(state));
    line.push(']');
    if !compose.is_empty() {
        line.push_str("  > ");
        line.push_str(compose);
    }
    if let Some(notice) = notice {
        line.push_str("  | ");
        line.push_str(notice);
    }
    line
}
