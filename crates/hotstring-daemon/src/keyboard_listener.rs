use hotstring_core::{HookEngine, HotstringError, KeyOutcome, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Install the global keyboard hook and feed every event to `engine`.
///
/// Blocks for as long as the hook is installed. Failure to install is
/// returned to the caller; nothing is retried.
pub fn start_keyboard_listener(engine: Arc<HookEngine>) -> Result<()> {
    info!("Installing keyboard hook");

    rdev::listen(move |event| {
        // Events are observed only, never swallowed
        if let KeyOutcome::Matched(found) = engine.handle_event(&event) {
            debug!(trigger = %found.trigger, "Queued replacement");
        }
    })
    .map_err(|e| HotstringError::HookInstall(format!("{:?}", e)))
}
