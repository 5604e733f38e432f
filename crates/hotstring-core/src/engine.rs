//! Keystroke state machine and the background replacement worker.
//!
//! The hook callback only touches the buffer and the state flags. Once a
//! trigger matches it flips the engine to `Replacing` with a
//! compare-and-swap and queues a [`ReplacementJob`]; the worker thread does
//! the slow part (sleeps, synthesized keys, clipboard) and always flips the
//! state back to `Idle`, even if the job fails or panics.

use crate::buffer::KeystrokeBuffer;
use crate::clipboard::ClipboardService;
use crate::error::{HotstringError, Result};
use crate::injector::{pause, Injector, Timing};
use crate::keyboard::{classify_event, KeyStroke};
use crate::matcher::{TriggerMatch, TriggerMatcher};
use crate::placeholders::PlaceholderExpander;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Idle,
    Replacing,
}

#[derive(Debug)]
struct Flags {
    enabled: AtomicBool,
    replacing: AtomicBool,
}

/// Enable switch and replacement state shared by the hook and the worker
#[derive(Debug, Clone)]
pub struct EngineControl {
    flags: Arc<Flags>,
}

impl Default for EngineControl {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EngineControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            flags: Arc::new(Flags {
                enabled: AtomicBool::new(enabled),
                replacing: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.enabled.load(Ordering::Acquire)
    }

    pub fn state(&self) -> HookState {
        if self.flags.replacing.load(Ordering::Acquire) {
            HookState::Replacing
        } else {
            HookState::Idle
        }
    }

    /// Idle -> Replacing. Returns false if a replacement is already running.
    fn begin_replacing(&self) -> bool {
        self.flags
            .replacing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish_replacing(&self) {
        self.flags.replacing.store(false, Ordering::Release);
    }
}

/// Work handed from the hook callback to the replacement worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementJob {
    /// Characters of trigger text to erase
    pub delete_count: usize,
    /// Output template, expanded when the job runs
    pub template: String,
}

impl From<&TriggerMatch> for ReplacementJob {
    fn from(found: &TriggerMatch) -> Self {
        Self {
            delete_count: found.delete_count(),
            template: found.template.clone(),
        }
    }
}

/// What the engine did with a key event. The event itself always reaches
/// the focused application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Disabled, mid-replacement, or not a character
    Ignored,
    Buffered,
    Erased,
    Cleared,
    Matched(TriggerMatch),
}

pub struct HookEngine {
    control: EngineControl,
    buffer: Mutex<KeystrokeBuffer>,
    matcher: TriggerMatcher,
    jobs: Sender<ReplacementJob>,
}

impl HookEngine {
    pub fn new(
        control: EngineControl,
        matcher: TriggerMatcher,
        jobs: Sender<ReplacementJob>,
    ) -> Self {
        Self {
            control,
            buffer: Mutex::new(KeystrokeBuffer::new()),
            matcher,
            jobs,
        }
    }

    pub fn control(&self) -> &EngineControl {
        &self.control
    }

    /// Current buffer contents
    pub fn buffer(&self) -> String {
        self.lock_buffer().as_string()
    }

    /// Entry point for raw hook events
    pub fn handle_event(&self, event: &rdev::Event) -> KeyOutcome {
        match classify_event(event) {
            Some(stroke) => self.on_key_down(stroke),
            None => KeyOutcome::Ignored,
        }
    }

    pub fn on_key_down(&self, stroke: KeyStroke) -> KeyOutcome {
        if !self.control.is_enabled() || self.control.state() == HookState::Replacing {
            return KeyOutcome::Ignored;
        }

        let mut buffer = self.lock_buffer();

        match stroke {
            KeyStroke::Ignored => KeyOutcome::Ignored,
            KeyStroke::Backspace => {
                buffer.pop();
                KeyOutcome::Erased
            }
            KeyStroke::Reset => {
                buffer.clear();
                KeyOutcome::Cleared
            }
            KeyStroke::Char(c) => {
                buffer.push(c);
                trace!(len = buffer.len(), "Buffered keystroke");

                let Some(found) = self.matcher.find_match(&buffer.as_string()) else {
                    return KeyOutcome::Buffered;
                };

                if !self.control.begin_replacing() {
                    return KeyOutcome::Ignored;
                }
                buffer.clear();

                debug!(trigger = %found.trigger, "Trigger matched");
                if self.jobs.send(ReplacementJob::from(&found)).is_err() {
                    error!("Replacement worker has stopped, dropping expansion");
                    self.control.finish_replacing();
                    return KeyOutcome::Cleared;
                }
                KeyOutcome::Matched(found)
            }
        }
    }

    fn lock_buffer(&self) -> std::sync::MutexGuard<'_, KeystrokeBuffer> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Erase the trigger, expand the template and paste the result
pub fn run_replacement(
    job: &ReplacementJob,
    injector: &mut dyn Injector,
    clipboard: &dyn ClipboardService,
    timing: &Timing,
) -> Result<()> {
    pause(timing.settle);
    injector.delete_characters(job.delete_count)?;
    pause(timing.after_delete);

    let text = PlaceholderExpander::new(clipboard).expand(&job.template);
    injector.paste_text(&text)?;

    pause(timing.cooldown);
    Ok(())
}

/// Puts the engine back to `Idle` however the job ends
struct IdleGuard(EngineControl);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        self.0.finish_replacing();
    }
}

/// Handle on the replacement worker thread
pub struct ReplacementWorker {
    jobs: Sender<ReplacementJob>,
}

impl ReplacementWorker {
    /// Start the worker. `make_injector` runs on the worker thread, so the
    /// injector need not be `Send`; it is retried on the next job if it fails.
    pub fn spawn<F, I>(
        control: EngineControl,
        clipboard: Arc<dyn ClipboardService>,
        timing: Timing,
        make_injector: F,
    ) -> Result<Self>
    where
        F: FnMut() -> Result<I> + Send + 'static,
        I: Injector + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("hotstring-replacer".to_string())
            .spawn(move || work(rx, control, clipboard, timing, make_injector))?;

        Ok(Self { jobs: tx })
    }

    /// Sender for the hook engine
    pub fn sender(&self) -> Sender<ReplacementJob> {
        self.jobs.clone()
    }
}

fn work<F, I>(
    jobs: Receiver<ReplacementJob>,
    control: EngineControl,
    clipboard: Arc<dyn ClipboardService>,
    timing: Timing,
    mut make_injector: F,
) where
    F: FnMut() -> Result<I>,
    I: Injector,
{
    let mut injector: Option<I> = None;

    for job in jobs {
        let _idle = IdleGuard(control.clone());

        if injector.is_none() {
            match make_injector() {
                Ok(created) => injector = Some(created),
                Err(e) => {
                    error!(error = %e, "Cannot synthesize input, skipping replacement");
                    continue;
                }
            }
        }
        let Some(active) = injector.as_mut() else {
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_replacement(&job, active, clipboard.as_ref(), &timing)
        }));

        match outcome {
            Ok(Ok(())) => debug!(deleted = job.delete_count, "Replacement finished"),
            Ok(Err(e)) => warn!(error = %e, "Replacement failed"),
            Err(_) => {
                let fault = HotstringError::Replacement("replacement panicked".to_string());
                error!(error = %fault, "Replacement aborted");
                // The injector may be in a bad state; build a fresh one next time
                injector = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trigger;
    use crate::storage::MemoryTriggerStore;

    fn engine(triggers: Vec<Trigger>) -> (HookEngine, Receiver<ReplacementJob>) {
        let (tx, rx) = mpsc::channel();
        let matcher = TriggerMatcher::new(Arc::new(MemoryTriggerStore::new(triggers)));
        (HookEngine::new(EngineControl::default(), matcher, tx), rx)
    }

    fn type_str(engine: &HookEngine, text: &str) -> Vec<KeyOutcome> {
        text.chars()
            .map(|c| engine.on_key_down(KeyStroke::Char(c)))
            .collect()
    }

    #[test]
    fn typing_a_trigger_queues_replacement() {
        let (engine, rx) = engine(vec![Trigger::new(":hi", "hello world")]);

        let outcomes = type_str(&engine, ":hi");
        assert!(matches!(outcomes.last(), Some(KeyOutcome::Matched(_))));
        assert_eq!(engine.control().state(), HookState::Replacing);
        assert_eq!(engine.buffer(), "");

        let job = rx.try_recv().unwrap();
        assert_eq!(
            job,
            ReplacementJob {
                delete_count: 3,
                template: "hello world".to_string()
            }
        );
    }

    #[test]
    fn events_are_ignored_while_replacing() {
        let (engine, rx) = engine(vec![Trigger::new(":hi", "hello")]);
        type_str(&engine, ":hi");
        rx.try_recv().unwrap();

        // Synthesized backspaces and typed keys alike
        assert_eq!(engine.on_key_down(KeyStroke::Backspace), KeyOutcome::Ignored);
        assert!(type_str(&engine, ":hi")
            .iter()
            .all(|o| *o == KeyOutcome::Ignored));
        assert_eq!(engine.buffer(), "");
        assert!(rx.try_recv().is_err());

        engine.control().finish_replacing();
        assert_eq!(engine.on_key_down(KeyStroke::Char('x')), KeyOutcome::Buffered);
    }

    #[test]
    fn disabled_engine_observes_nothing() {
        let (engine, rx) = engine(vec![Trigger::new(":hi", "hello")]);
        engine.control().set_enabled(false);

        assert!(type_str(&engine, ":hi")
            .iter()
            .all(|o| *o == KeyOutcome::Ignored));
        assert_eq!(engine.buffer(), "");
        assert!(rx.try_recv().is_err());

        engine.control().set_enabled(true);
        type_str(&engine, ":hi");
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn reset_keys_always_clear_the_buffer() {
        let (engine, _rx) = engine(vec![]);
        type_str(&engine, "abc");
        assert_eq!(engine.on_key_down(KeyStroke::Reset), KeyOutcome::Cleared);
        assert_eq!(engine.buffer(), "");
        assert_eq!(engine.on_key_down(KeyStroke::Reset), KeyOutcome::Cleared);
        assert_eq!(engine.buffer(), "");
    }

    #[test]
    fn backspace_edits_before_matching() {
        let (engine, rx) = engine(vec![Trigger::new(":hi", "hello")]);
        type_str(&engine, ":hx");
        engine.on_key_down(KeyStroke::Backspace);
        assert_eq!(engine.buffer(), ":h");

        type_str(&engine, "i");
        assert_eq!(rx.try_recv().unwrap().delete_count, 3);
    }

    #[test]
    fn backspace_on_empty_buffer_is_harmless() {
        let (engine, _rx) = engine(vec![]);
        assert_eq!(engine.on_key_down(KeyStroke::Backspace), KeyOutcome::Erased);
        assert_eq!(engine.buffer(), "");
    }

    #[test]
    fn space_splits_words() {
        let (engine, rx) = engine(vec![Trigger::new(":hi", "hello")]);
        type_str(&engine, ":h");
        engine.on_key_down(KeyStroke::Reset);
        type_str(&engine, "i");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn non_character_keys_leave_buffer_alone() {
        let (engine, _rx) = engine(vec![]);
        type_str(&engine, "ab");
        assert_eq!(engine.on_key_down(KeyStroke::Ignored), KeyOutcome::Ignored);
        assert_eq!(engine.buffer(), "ab");
    }

    #[test]
    fn dead_worker_does_not_wedge_the_engine() {
        let (engine, rx) = engine(vec![Trigger::new(":hi", "hello")]);
        drop(rx);
        type_str(&engine, ":hi");
        assert_eq!(engine.control().state(), HookState::Idle);
    }

    #[test]
    fn only_one_replacement_can_begin() {
        let control = EngineControl::default();
        assert!(control.begin_replacing());
        assert!(!control.begin_replacing());
        control.finish_replacing();
        assert!(control.begin_replacing());
    }
}
