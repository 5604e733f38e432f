use crate::error::{HotstringError, Result};
use serde::{Deserialize, Serialize};

/// Longest trigger input accepted, in characters
pub const MAX_TRIGGER_LEN: usize = 62;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub input: String,
    pub output: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Trigger {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            category: default_category(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Number of characters the engine deletes when this trigger fires
    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    /// Check the input against the rules the hook relies on.
    ///
    /// Whitespace is rejected because Space, Tab and Enter reset the
    /// keystroke buffer, so such a trigger could never be typed.
    pub fn validate(&self) -> Result<()> {
        validate_input(&self.input)
    }
}

pub fn validate_input(input: &str) -> Result<()> {
    if input.is_empty() {
        return Err(HotstringError::InvalidTrigger(
            "trigger input cannot be empty".to_string(),
        ));
    }

    let len = input.chars().count();
    if len > MAX_TRIGGER_LEN {
        return Err(HotstringError::InvalidTrigger(format!(
            "trigger input is {} characters, the limit is {}",
            len, MAX_TRIGGER_LEN
        )));
    }

    if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(HotstringError::InvalidTrigger(format!(
            "trigger input '{}' contains whitespace or control characters",
            input.escape_debug()
        )));
    }

    Ok(())
}
