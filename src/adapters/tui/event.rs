use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// Raw input, interpreted by the app according to its current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    CloseModal,

    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Tab,
    BackTab,
    Enter,

    Character(char),
    Backspace,
    Delete,

    Tick,
}

pub struct EventHandler {
    poll_interval: Duration,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn next_event(&mut self) -> Result<AppEvent> {
        if event::poll(self.poll_interval)? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    Ok(map_key_event(key_event))
                }
                _ => Ok(AppEvent::Tick),
            }
        } else {
            Ok(AppEvent::Tick)
        }
    }
}

pub fn map_key_event(key_event: KeyEvent) -> AppEvent {
    match key_event {
        // Global quit with Ctrl+C
        KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            ..
        } => AppEvent::Quit,

        KeyEvent {
            code: KeyCode::Esc, ..
        } => AppEvent::CloseModal,

        KeyEvent {
            code: KeyCode::Enter,
            ..
        } => AppEvent::Enter,

        KeyEvent {
            code: KeyCode::BackTab,
            ..
        }
        | KeyEvent {
            code: KeyCode::Tab,
            modifiers: KeyModifiers::SHIFT,
            ..
        } => AppEvent::BackTab,

        KeyEvent {
            code: KeyCode::Tab, ..
        } => AppEvent::Tab,

        KeyEvent { code: KeyCode::Up, .. } => AppEvent::Up,
        KeyEvent {
            code: KeyCode::Down,
            ..
        } => AppEvent::Down,
        KeyEvent {
            code: KeyCode::Left,
            ..
        } => AppEvent::Left,
        KeyEvent {
            code: KeyCode::Right,
            ..
        } => AppEvent::Right,
        KeyEvent {
            code: KeyCode::Home,
            ..
        } => AppEvent::Home,
        KeyEvent {
            code: KeyCode::End, ..
        } => AppEvent::End,

        KeyEvent {
            code: KeyCode::Backspace,
            ..
        } => AppEvent::Backspace,
        KeyEvent {
            code: KeyCode::Delete,
            ..
        } => AppEvent::Delete,

        // Plain and shifted characters; other chords are ignored
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers,
            ..
        } if modifiers.difference(KeyModifiers::SHIFT).is_empty() => AppEvent::Character(c),

        _ => AppEvent::Tick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn maps_control_keys() {
        assert_eq!(
            map_key_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            AppEvent::Quit
        );
        assert_eq!(
            map_key_event(key(KeyCode::Esc, KeyModifiers::NONE)),
            AppEvent::CloseModal
        );
        assert_eq!(
            map_key_event(key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            AppEvent::BackTab
        );
    }

    #[test]
    fn maps_typed_characters() {
        assert_eq!(
            map_key_event(key(KeyCode::Char('c'), KeyModifiers::NONE)),
            AppEvent::Character('c')
        );
        assert_eq!(
            map_key_event(key(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            AppEvent::Character('G')
        );
        assert_eq!(
            map_key_event(key(KeyCode::Char('x'), KeyModifiers::ALT)),
            AppEvent::Tick
        );
    }
}
