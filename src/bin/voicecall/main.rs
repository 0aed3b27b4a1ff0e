//! Terminal voice-call client: slide to dial, talk, type, hang up.
//!
//! Single cooperative event loop. Crossterm input, transport notifications,
//! and session updates are all drained here; nothing blocks, so audio
//! callbacks and the socket task never wait on the UI.

mod status_line;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use voicecall::config::AppConfig;
use voicecall::{
    audio, telemetry, CallSession, CallState, DialParams, LiveCallDriver, SessionUpdate,
    SlideToCall,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let config = AppConfig::parse();
    telemetry::init_telemetry(&config);

    if config.list_input_devices {
        print_input_devices();
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let (transport_tx, transport_rx) = crossbeam_channel::unbounded();
    let (updates_tx, updates_rx) = crossbeam_channel::unbounded();

    let driver = LiveCallDriver::new(
        runtime.handle().clone(),
        DialParams {
            url: config.endpoint(),
            sample_rate: config.sample_rate,
            input_device: config.input_device.clone(),
            output_device: config.output_device.clone(),
        },
        transport_tx,
    );
    let mut session = CallSession::new(
        driver,
        config.sample_rate,
        config.input_mode.clone(),
        updates_tx,
    );
    let mut slide = SlideToCall::new(f32::from(status_line::BAR_WIDTH), config.settle());

    let _guard = terminal::TerminalGuard::enter().context("failed to prepare terminal")?;
    let mut ui = UiState::default();

    loop {
        if event::poll(POLL_INTERVAL).context("terminal poll failed")? {
            match event::read().context("terminal read failed")? {
                Event::Key(key) => {
                    if handle_key(&key, &mut session, &mut ui) == LoopControl::Quit {
                        break;
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mouse, &mut slide, &mut ui),
                _ => {}
            }
        }

        for transport_event in transport_rx.try_iter() {
            session.handle_transport(transport_event);
        }
        for update in updates_rx.try_iter() {
            apply_update(update, &mut slide, &mut ui);
        }
        if slide.poll_fire(Instant::now()) {
            session.request_start();
        }

        redraw(&session, &slide, &ui)?;
    }

    session.release();
    Ok(())
}

#[derive(Default)]
struct UiState {
    compose: String,
    notice: Option<String>,
    drag_origin: Option<u16>,
}

#[derive(PartialEq)]
enum LoopControl {
    Continue,
    Quit,
}

fn handle_key(
    key: &KeyEvent,
    session: &mut CallSession<LiveCallDriver>,
    ui: &mut UiState,
) -> LoopControl {
    if key.kind == KeyEventKind::Release {
        return LoopControl::Continue;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return LoopControl::Quit;
        }
        KeyCode::Esc => {
            // Hang up; a no-op when idle. The gesture resets on the
            // resulting idle transition.
            session.request_end();
            ui.notice = None;
        }
        KeyCode::Enter => {
            session.send_text(&ui.compose);
            ui.compose.clear();
        }
        KeyCode::Backspace => {
            ui.compose.pop();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            ui.compose.push(c);
        }
        _ => {}
    }
    LoopControl::Continue
}

fn handle_mouse(mouse: &MouseEvent, slide: &mut SlideToCall, ui: &mut UiState) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if slide.begin() {
                // Offsets are relative to the press column, so completion
                // always takes a full-width drag wherever the press lands.
                ui.drag_origin = Some(mouse.column);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(origin) = ui.drag_origin {
                let offset = f32::from(mouse.column.saturating_sub(origin));
                slide.update(offset, Instant::now());
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            slide.release();
            ui.drag_origin = None;
        }
        _ => {}
    }
}

fn apply_update(update: SessionUpdate, slide: &mut SlideToCall, ui: &mut UiState) {
    match update {
        SessionUpdate::StateChanged(CallState::Idle) => {
            // New session creation is the external gesture reset point.
            slide.reset();
        }
        SessionUpdate::StateChanged(_) => {}
        SessionUpdate::CallFailed(message) => {
            // A failed start never leaves idle, so the idle transition that
            // normally re-arms the gesture does not happen; re-arm here or
            // the user can never redial.
            slide.reset();
            ui.notice = Some(message);
        }
        SessionUpdate::AgentError(message) => {
            ui.notice = Some(message);
        }
        SessionUpdate::AgentText(text) => {
            ui.notice = Some(text);
        }
        SessionUpdate::Transcript(data) => {
            // Transcripts belong to downstream consumers; trace and move on.
            tracing::debug!(%data, "transcript received");
        }
    }
}

fn redraw(
    session: &CallSession<LiveCallDriver>,
    slide: &SlideToCall,
    ui: &UiState,
) -> Result<()> {
    let line = status_line::render(
        session.state(),
        session.elapsed(),
        slide,
        &ui.compose,
        ui.notice.as_deref(),
    );
    let mut stdout = io::stdout().lock();
    // Carriage return plus erase-to-end keeps the single-line UI flicker-free.
    write!(stdout, "\r\x1b[2K{line}").context("status render failed")?;
    stdout.flush().context("status flush failed")?;
    Ok(())
}

fn print_input_devices() {
    let devices = audio::list_input_devices();
    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  {name}");
        }
    }
}
