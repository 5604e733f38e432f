use crate::storage::TriggerStore;
use std::sync::Arc;

/// A trigger found at the end of the keystroke buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub trigger: String,
    pub template: String,
}

impl TriggerMatch {
    /// Characters to erase before injecting the expansion
    pub fn delete_count(&self) -> usize {
        self.trigger.chars().count()
    }
}

/// Finds the trigger that the typed buffer currently ends with.
///
/// When several triggers are suffixes of the buffer at once, the longest
/// one wins. Equal lengths are resolved by lexical order of the input.
#[derive(Clone)]
pub struct TriggerMatcher {
    store: Arc<dyn TriggerStore>,
}

impl TriggerMatcher {
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self { store }
    }

    pub fn find_match(&self, buffer: &str) -> Option<TriggerMatch> {
        if buffer.is_empty() {
            return None;
        }

        self.store
            .triggers()
            .into_iter()
            .filter(|t| !t.input.is_empty() && buffer.ends_with(t.input.as_str()))
            .min_by(|a, b| {
                b.input
                    .chars()
                    .count()
                    .cmp(&a.input.chars().count())
                    .then_with(|| a.input.cmp(&b.input))
            })
            .map(|t| TriggerMatch {
                trigger: t.input,
                template: t.output,
            })
    }
}
