use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HotstringError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keyboard controller error: {0}")]
    Enigo(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Failed to install keyboard hook: {0}")]
    HookInstall(String),

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Trigger '{0}' already exists")]
    DuplicateTrigger(String),

    #[error("Trigger '{0}' not found")]
    TriggerNotFound(String),

    #[error("Invalid import file: {0}")]
    InvalidImport(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Daemon already running with PID {0}")]
    DaemonAlreadyRunning(u32),

    #[error("Daemon is not running")]
    DaemonNotRunning,

    #[error("Replacement failed: {0}")]
    Replacement(String),

    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HotstringError>;
