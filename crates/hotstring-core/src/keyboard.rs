use crate::error::{HotstringError, Result};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use rdev::{self, EventType, Key as RdevKey};
use std::thread;
use std::time::Duration;

/// What a key-down means for the keystroke buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStroke {
    /// Drop the last buffered character
    Backspace,
    /// Word boundary: Enter, Tab, Escape or Space
    Reset,
    /// A printable character as the OS produced it
    Char(char),
    /// Modifiers, navigation and anything else that types nothing
    Ignored,
}

/// Classify a raw hook event. Returns `None` for anything but a key-down.
pub fn classify_event(event: &rdev::Event) -> Option<KeyStroke> {
    match event.event_type {
        EventType::KeyPress(key) => Some(classify_key(key, event.name.as_deref())),
        _ => None,
    }
}

/// Classify a key-down from its key code and the text the OS resolved for it
pub fn classify_key(key: RdevKey, name: Option<&str>) -> KeyStroke {
    match key {
        RdevKey::Backspace => KeyStroke::Backspace,
        RdevKey::Return | RdevKey::KpReturn | RdevKey::Tab | RdevKey::Escape | RdevKey::Space => {
            KeyStroke::Reset
        }
        _ => match resolve_char(key, name) {
            Some(c) => KeyStroke::Char(c),
            None => KeyStroke::Ignored,
        },
    }
}

/// Convert a key press to the character it typed.
///
/// The OS has already applied Shift, Caps Lock, AltGr and dead-key
/// composition when it filled in the event name; a pending dead key has no
/// name yet. Anything that is not exactly one printable character yields
/// `None`.
pub fn resolve_char(key: RdevKey, name: Option<&str>) -> Option<char> {
    if is_modifier(key) {
        return None;
    }

    let mut chars = name?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(c),
        _ => None,
    }
}

fn is_modifier(key: RdevKey) -> bool {
    matches!(
        key,
        RdevKey::ShiftLeft
            | RdevKey::ShiftRight
            | RdevKey::ControlLeft
            | RdevKey::ControlRight
            | RdevKey::Alt
            | RdevKey::AltGr
            | RdevKey::MetaLeft
            | RdevKey::MetaRight
            | RdevKey::CapsLock
            | RdevKey::NumLock
            | RdevKey::Function
    )
}

/// Synthesized keyboard input
pub trait KeySynth {
    /// One backspace press and release
    fn backspace(&mut self) -> Result<()>;
    /// The platform paste shortcut: modifier down, V down, V up, modifier up
    fn paste_shortcut(&mut self) -> Result<()>;
    /// Type text directly, used when the clipboard cannot be written
    fn type_text(&mut self, text: &str) -> Result<()>;
}

/// Keyboard synthesis through enigo
pub struct EnigoKeySynth {
    enigo: Enigo,
}

impl EnigoKeySynth {
    pub fn new() -> Result<Self> {
        Ok(Self {
            enigo: create_keyboard_controller()?,
        })
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<()> {
        self.enigo
            .key(key, direction)
            .map_err(|err| HotstringError::Enigo(format!("Failed to send {:?}: {}", key, err)))
    }
}

impl KeySynth for EnigoKeySynth {
    fn backspace(&mut self) -> Result<()> {
        self.key(Key::Backspace, Direction::Click)
    }

    fn paste_shortcut(&mut self) -> Result<()> {
        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        self.key(modifier, Direction::Press)?;
        let pasted = self
            .key(Key::Unicode('v'), Direction::Press)
            .and_then(|_| self.key(Key::Unicode('v'), Direction::Release));
        // Never leave the modifier held down
        let released = self.key(modifier, Direction::Release);
        pasted.and(released)
    }

    fn type_text(&mut self, text: &str) -> Result<()> {
        type_text_with_formatting(&mut self.enigo, text)
    }
}

/// Create a keyboard controller
pub fn create_keyboard_controller() -> Result<Enigo> {
    Enigo::new(&Settings::default()).map_err(|err| {
        HotstringError::Enigo(format!("Failed to create keyboard controller: {}", err))
    })
}

pub fn type_text_with_formatting(keyboard: &mut impl Keyboard, text: &str) -> Result<()> {
    // Set a reasonable chunk size to avoid overwhelming the keyboard buffer
    const CHUNK_SIZE: usize = 512;

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            keyboard
                .key(Key::Return, Direction::Click)
                .map_err(|err| HotstringError::Enigo(format!("Failed to type newline: {}", err)))?;

            // Small delay after newline to ensure it registers properly
            thread::sleep(Duration::from_millis(15));
        }

        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(CHUNK_SIZE) {
            let chunk: String = chunk.iter().collect();
            keyboard
                .text(&chunk)
                .map_err(|err| HotstringError::Enigo(format!("Failed to type text: {}", err)))?;
            thread::sleep(Duration::from_millis(10));
        }
    }

    Ok(())
}
