use crate::clipboard::ClipboardService;
use crate::config::Settings;
use crate::error::Result;
use crate::keyboard::KeySynth;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed waits used while replacing a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Lets the final trigger character reach the target application
    pub settle: Duration,
    /// Between synthesized backspaces
    pub key_interval: Duration,
    /// After the last backspace, before the expansion is pasted
    pub after_delete: Duration,
    /// After the clipboard is set, before the paste shortcut
    pub before_paste: Duration,
    /// Time the target application gets to consume the paste
    pub restore_delay: Duration,
    /// Before the engine starts observing input again
    pub cooldown: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
            key_interval: Duration::from_millis(10),
            after_delete: Duration::from_millis(20),
            before_paste: Duration::from_millis(30),
            restore_delay: Duration::from_millis(100),
            cooldown: Duration::from_millis(30),
        }
    }
}

impl Timing {
    /// Default timing with the backspace rate taken from the trigger speed
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            key_interval: settings.key_delay(),
            ..Self::default()
        }
    }

    /// No waiting at all
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            key_interval: Duration::ZERO,
            after_delete: Duration::ZERO,
            before_paste: Duration::ZERO,
            restore_delay: Duration::ZERO,
            cooldown: Duration::ZERO,
        }
    }
}

pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

/// Deletes typed text and inserts replacements in the focused application
pub trait Injector {
    fn delete_characters(&mut self, count: usize) -> Result<()>;
    fn paste_text(&mut self, text: &str) -> Result<()>;
}

/// Clipboard text held while a paste is in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub previous_text: Option<String>,
}

impl ClipboardSnapshot {
    pub fn capture(clipboard: &dyn ClipboardService) -> Self {
        Self {
            previous_text: clipboard.get_text(),
        }
    }

    /// Put the saved text back. Does nothing when there was none.
    pub fn restore(self, clipboard: &dyn ClipboardService) {
        if let Some(text) = self.previous_text {
            if let Err(e) = clipboard.set_text(&text) {
                warn!(error = %e, "Failed to restore clipboard");
            }
        }
    }
}

/// Injector that deletes with backspaces and inserts through a clipboard paste
pub struct InputInjector<K> {
    keys: K,
    clipboard: Arc<dyn ClipboardService>,
    timing: Timing,
}

impl<K: KeySynth> InputInjector<K> {
    pub fn new(keys: K, clipboard: Arc<dyn ClipboardService>, timing: Timing) -> Self {
        Self {
            keys,
            clipboard,
            timing,
        }
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }
}

impl<K: KeySynth> Injector for InputInjector<K> {
    fn delete_characters(&mut self, count: usize) -> Result<()> {
        for i in 0..count {
            if i > 0 {
                pause(self.timing.key_interval);
            }
            self.keys.backspace()?;
        }
        Ok(())
    }

    fn paste_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let snapshot = ClipboardSnapshot::capture(self.clipboard.as_ref());

        if let Err(e) = self.clipboard.set_text(text) {
            warn!(error = %e, "Clipboard unavailable, typing replacement instead");
            return self.keys.type_text(text);
        }

        pause(self.timing.before_paste);
        let pasted = self.keys.paste_shortcut();

        pause(self.timing.restore_delay);
        snapshot.restore(self.clipboard.as_ref());
        debug!(chars = text.chars().count(), "Pasted replacement");

        pasted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::error::HotstringError;

    #[derive(Default)]
    struct RecordingKeys {
        log: Vec<String>,
        fail_paste: bool,
    }

    impl KeySynth for RecordingKeys {
        fn backspace(&mut self) -> Result<()> {
            self.log.push("backspace".to_string());
            Ok(())
        }

        fn paste_shortcut(&mut self) -> Result<()> {
            if self.fail_paste {
                return Err(HotstringError::Enigo("no display".to_string()));
            }
            self.log.push("paste".to_string());
            Ok(())
        }

        fn type_text(&mut self, text: &str) -> Result<()> {
            self.log.push(format!("type:{}", text));
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl ClipboardService for BrokenClipboard {
        fn get_text(&self) -> Option<String> {
            None
        }

        fn set_text(&self, _text: &str) -> Result<()> {
            Err(HotstringError::Clipboard("locked".to_string()))
        }
    }

    fn injector(
        clipboard: Arc<dyn ClipboardService>,
        keys: RecordingKeys,
    ) -> InputInjector<RecordingKeys> {
        InputInjector::new(keys, clipboard, Timing::immediate())
    }

    #[test]
    fn deletes_requested_number_of_characters() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let mut injector = injector(clipboard, RecordingKeys::default());
        injector.delete_characters(3).unwrap();
        assert_eq!(injector.keys().log, vec!["backspace"; 3]);
    }

    #[test]
    fn paste_restores_previous_clipboard() {
        let clipboard = Arc::new(MemoryClipboard::new(Some("X")));
        let mut injector = injector(clipboard.clone(), RecordingKeys::default());

        injector.paste_text("hello world").unwrap();

        assert_eq!(injector.keys().log, vec!["paste"]);
        assert_eq!(clipboard.writes(), vec!["hello world", "X"]);
        assert_eq!(clipboard.get_text().as_deref(), Some("X"));
    }

    #[test]
    fn paste_skips_restore_when_clipboard_was_empty() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let mut injector = injector(clipboard.clone(), RecordingKeys::default());

        injector.paste_text("hello").unwrap();
        assert_eq!(clipboard.writes(), vec!["hello"]);
    }

    #[test]
    fn restore_happens_even_if_paste_shortcut_fails() {
        let clipboard = Arc::new(MemoryClipboard::new(Some("X")));
        let keys = RecordingKeys {
            fail_paste: true,
            ..Default::default()
        };
        let mut injector = injector(clipboard.clone(), keys);

        assert!(injector.paste_text("hello").is_err());
        assert_eq!(clipboard.get_text().as_deref(), Some("X"));
    }

    #[test]
    fn falls_back_to_typing_when_clipboard_is_unwritable() {
        let mut injector = injector(Arc::new(BrokenClipboard), RecordingKeys::default());
        injector.paste_text("hi there").unwrap();
        assert_eq!(injector.keys().log, vec!["type:hi there"]);
    }

    #[test]
    fn empty_text_touches_nothing() {
        let clipboard = Arc::new(MemoryClipboard::new(Some("X")));
        let mut injector = injector(clipboard.clone(), RecordingKeys::default());
        injector.paste_text("").unwrap();
        assert!(injector.keys().log.is_empty());
        assert!(clipboard.writes().is_empty());
    }
}
