//! Core of the hotstring text expander: trigger storage and matching,
//! placeholder expansion, synthesized input and the keystroke engine.

pub mod buffer;
pub mod clipboard;
pub mod config;
pub mod engine;
pub mod error;
pub mod injector;
pub mod keyboard;
pub mod matcher;
pub mod models;
pub mod placeholders;
pub mod storage;

// Re-export common items for convenience
pub use clipboard::{ClipboardService, MemoryClipboard, SystemClipboard};
pub use config::{get_config_dir, is_daemon_running, Settings};
pub use engine::{
    EngineControl, HookEngine, HookState, KeyOutcome, ReplacementJob, ReplacementWorker,
};
pub use error::{HotstringError, Result};
pub use injector::{Injector, InputInjector, Timing};
pub use keyboard::{EnigoKeySynth, KeyStroke, KeySynth};
pub use matcher::{TriggerMatch, TriggerMatcher};
pub use models::Trigger;
pub use placeholders::{PlaceholderExpander, PLACEHOLDERS};
pub use storage::{ImportMode, JsonTriggerStore, MemoryTriggerStore, TriggerDatabase, TriggerStore};
