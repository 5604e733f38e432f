use crate::keyboard_listener::start_keyboard_listener;
use crate::process::{terminate_process, verify_process_running};
use hotstring_core::config::{ensure_config_dir, get_pid_file_path};
use hotstring_core::{
    is_daemon_running, ClipboardService, EngineControl, EnigoKeySynth, HookEngine,
    HotstringError, InputInjector, JsonTriggerStore, ReplacementWorker, Result, Settings,
    SystemClipboard, Timing, TriggerDatabase, TriggerMatcher,
};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LOG_FILENAME: &str = "daemon.log";

/// How often a running daemon re-reads its settings
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Everything needed to run the hook, wired together
pub struct Expander {
    pub engine: Arc<HookEngine>,
    pub worker: ReplacementWorker,
}

impl Expander {
    /// Build the engine over the trigger database, the system clipboard and
    /// enigo keyboard synthesis.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let control = EngineControl::new(settings.enabled);
        let timing = Timing::from_settings(settings);
        let clipboard: Arc<dyn ClipboardService> = Arc::new(SystemClipboard::new()?);

        let injector_clipboard = clipboard.clone();
        let worker = ReplacementWorker::spawn(control.clone(), clipboard, timing, move || {
            let keys = EnigoKeySynth::new()?;
            Ok(InputInjector::new(keys, injector_clipboard.clone(), timing))
        })?;

        let database = TriggerDatabase::open_default();
        info!(path = %database.path().display(), "Using trigger database");
        let store = Arc::new(JsonTriggerStore::new(database));
        let engine = HookEngine::new(control, TriggerMatcher::new(store), worker.sender());

        Ok(Self {
            engine: Arc::new(engine),
            worker,
        })
    }

    /// Run the hook in the current thread until it fails
    pub fn run(self) -> Result<()> {
        watch_settings(self.engine.control().clone());
        // The worker thread lives as long as the hook holds its sender
        let _worker = self.worker;
        start_keyboard_listener(self.engine)
    }
}

/// Apply persisted settings to a live engine, returning true if anything changed
pub fn apply_settings(control: &EngineControl, settings: &Settings) -> bool {
    if control.is_enabled() == settings.enabled {
        return false;
    }
    control.set_enabled(settings.enabled);
    info!(enabled = settings.enabled, "Expansion toggled");
    true
}

fn watch_settings(control: EngineControl) {
    let spawned = thread::Builder::new()
        .name("hotstring-settings".to_string())
        .spawn(move || loop {
            thread::sleep(SETTINGS_POLL_INTERVAL);
            apply_settings(&control, &Settings::load());
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Settings will not be reloaded while running");
    }
}

/// Removes the PID file when the daemon exits
struct PidFile(PathBuf);

impl PidFile {
    fn create() -> Result<Self> {
        let path = get_pid_file_path();
        fs::write(&path, process::id().to_string())?;
        Ok(Self(path))
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            debug!(error = %e, "Error removing PID file");
        }
    }
}

/// Fail if another live daemon owns the PID file; clean up a stale one
fn check_not_running() -> Result<()> {
    if let Some(pid) = is_daemon_running()? {
        if verify_process_running(pid) {
            return Err(HotstringError::DaemonAlreadyRunning(pid));
        }
        info!(pid, "Found stale PID file, cleaning up");
        let _ = fs::remove_file(get_pid_file_path());
    }
    Ok(())
}

/// Run the expander in the foreground
pub fn run_daemon_worker() -> Result<()> {
    ensure_config_dir()?;
    check_not_running()?;

    let _pid_file = PidFile::create()?;
    let settings = Settings::load();
    info!(
        pid = process::id(),
        enabled = settings.enabled,
        speed = settings.trigger_speed,
        "hotstring daemon starting"
    );

    Expander::from_settings(&settings)?.run()
}

/// Start the daemon process
pub fn start_daemon() -> Result<()> {
    let config_dir = ensure_config_dir()?;
    check_not_running()?;

    // Fork to background on Unix systems
    #[cfg(unix)]
    {
        use daemonize::Daemonize;
        use std::fs::OpenOptions;

        let log_path = config_dir.join(LOG_FILENAME);
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        println!("Starting hotstring daemon in the background");
        println!("Logs: {}", log_path.display());

        let daemonize = Daemonize::new()
            .pid_file(get_pid_file_path())
            .working_directory(&config_dir)
            .stdout(log.try_clone()?)
            .stderr(log);

        match daemonize.start() {
            Ok(_) => {
                // We're now in the daemon process; daemonize wrote the PID file
                let _pid_file = PidFile(get_pid_file_path());
                Expander::from_settings(&Settings::load())?.run()
            }
            Err(e) => Err(HotstringError::Other(format!(
                "Error starting daemon: {}",
                e
            ))),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = config_dir;
        println!("Starting hotstring daemon in the foreground (background not supported on this OS)");
        run_daemon_worker()
    }
}

/// Stop the daemon if it's running
pub fn stop_daemon() -> Result<()> {
    let pid_file = get_pid_file_path();
    let pid = is_daemon_running()?.ok_or(HotstringError::DaemonNotRunning)?;

    if !verify_process_running(pid) {
        println!("Process with PID {} is not running.", pid);
        let _ = fs::remove_file(&pid_file);
        return Ok(());
    }

    terminate_process(pid, false);
    thread::sleep(Duration::from_millis(500));

    if verify_process_running(pid) {
        println!("Daemon didn't terminate gracefully, using force kill...");
        if !terminate_process(pid, true) {
            return Err(HotstringError::Other(format!(
                "Failed to stop daemon with PID {}",
                pid
            )));
        }
    }

    let _ = fs::remove_file(&pid_file);
    println!("Stopped hotstring daemon with PID {}", pid);
    Ok(())
}

/// Check daemon status
pub fn daemon_status() -> Result<()> {
    let settings = Settings::load();
    let state = if settings.enabled { "enabled" } else { "disabled" };

    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("hotstring daemon is running with PID {} ({})", pid, state);
        }
        Some(pid) => {
            println!("PID file exists but process {} is not running", pid);
            println!("Run 'hotstring stop' followed by 'hotstring start'");
        }
        None => println!("hotstring daemon is not running ({})", state),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_toggle_the_engine() {
        let control = EngineControl::new(true);
        let mut settings = Settings::default();

        assert!(!apply_settings(&control, &settings));

        settings.enabled = false;
        assert!(apply_settings(&control, &settings));
        assert!(!control.is_enabled());

        assert!(!apply_settings(&control, &settings));
    }
}
