//! Event handling for the CWMON dashboard.
//!
//! Maps terminal input (keys, mouse wheel, focus changes) to app events.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};

/// Application-level events that can trigger state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Request application quit
    Quit,
    /// Force quit (Ctrl+C)
    ForceQuit,
    /// Switch between the verbose log and the compact summary
    ToggleDetails,
    /// Switch between formatted and raw lines
    ToggleDebug,
    /// Scroll the log view by one line
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    GoToTop,
    /// Jump to the newest line and re-pin
    GoToBottom,
    /// Scrub the log view to a percentage
    Scrub(u8),
    /// Reconnect the active feed now
    Reconnect,
    /// Clear the log view
    Clear,
    /// Terminal gained (`true`) or lost focus
    FocusChanged(bool),
    /// Terminal was resized
    Resize,
    /// No action needed
    None,
}

/// Converts terminal events to app events.
#[derive(Debug, Default)]
pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Translate any terminal event.
    pub fn handle_event(&mut self, event: &Event) -> AppEvent {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => AppEvent::ScrollUp,
                MouseEventKind::ScrollDown => AppEvent::ScrollDown,
                _ => AppEvent::None,
            },
            Event::FocusGained => AppEvent::FocusChanged(true),
            Event::FocusLost => AppEvent::FocusChanged(false),
            Event::Resize(_, _) => AppEvent::Resize,
            _ => AppEvent::None,
        }
    }

    /// Handle a key event and return the corresponding app event.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppEvent {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppEvent::ForceQuit;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
            return AppEvent::Clear;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => AppEvent::Quit,

            KeyCode::Char('d') | KeyCode::Char('D') => AppEvent::ToggleDetails,
            KeyCode::Char('b') | KeyCode::Char('B') => AppEvent::ToggleDebug,
            KeyCode::Char('r') | KeyCode::Char('R') => AppEvent::Reconnect,
            KeyCode::Char('c') | KeyCode::Char('C') => AppEvent::Clear,

            KeyCode::Up | KeyCode::Char('k') => AppEvent::ScrollUp,
            KeyCode::Down | KeyCode::Char('j') => AppEvent::ScrollDown,
            KeyCode::PageUp => AppEvent::PageUp,
            KeyCode::PageDown => AppEvent::PageDown,
            KeyCode::Home | KeyCode::Char('g') => AppEvent::GoToTop,
            KeyCode::End | KeyCode::Char('G') => AppEvent::GoToBottom,

            KeyCode::Char(c @ '0'..='9') => {
                let digit = c.to_digit(10).unwrap_or(0) as u8;
                AppEvent::Scrub(digit * 10)
            }

            _ => AppEvent::None,
        }
    }
}
