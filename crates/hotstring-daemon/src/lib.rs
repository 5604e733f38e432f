pub mod daemon_manager;
pub mod keyboard_listener;
pub mod process;

pub use daemon_manager::{
    apply_settings, daemon_status, run_daemon_worker, start_daemon, stop_daemon, Expander,
};
pub use keyboard_listener::start_keyboard_listener;
