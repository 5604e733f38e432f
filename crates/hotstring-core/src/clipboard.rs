use crate::error::{HotstringError, Result};
use arboard::Clipboard;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Upper bound on any single clipboard operation
pub const CLIPBOARD_TIMEOUT: Duration = Duration::from_millis(500);

/// Text access to the system clipboard.
///
/// Both calls must be safe from any thread. `get_text` returns `None` for an
/// empty, non-text or unavailable clipboard instead of failing.
pub trait ClipboardService: Send + Sync {
    fn get_text(&self) -> Option<String>;
    fn set_text(&self, text: &str) -> Result<()>;
}

enum Request {
    Get(Sender<Option<String>>, Instant),
    Set(String, Sender<Result<()>>, Instant),
}

/// Clipboard owned by the serving thread
trait Backend {
    fn get(&mut self) -> Option<String>;
    fn set(&mut self, text: String) -> Result<()>;
}

impl Backend for Clipboard {
    fn get(&mut self) -> Option<String> {
        self.get_text().ok()
    }

    fn set(&mut self, text: String) -> Result<()> {
        self.set_text(text)
            .map_err(|e| HotstringError::Clipboard(e.to_string()))
    }
}

/// System clipboard served from one dedicated thread.
///
/// The thread owns the `arboard::Clipboard` for the life of the service so
/// that contents we set stay available after the call returns. Callers wait
/// at most `timeout` for a reply.
pub struct SystemClipboard {
    requests: Mutex<Sender<Request>>,
    timeout: Duration,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        Self::with_timeout(CLIPBOARD_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("hotstring-clipboard".to_string())
            .spawn(move || serve(rx, open_system_clipboard))?;

        Ok(Self {
            requests: Mutex::new(tx),
            timeout,
        })
    }

    fn send(&self, request: Request) -> bool {
        let sender = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sender.send(request).is_ok()
    }
}

impl ClipboardService for SystemClipboard {
    fn get_text(&self) -> Option<String> {
        let (tx, rx) = mpsc::channel();
        if !self.send(Request::Get(tx, Instant::now() + self.timeout)) {
            return None;
        }
        match rx.recv_timeout(self.timeout) {
            Ok(text) => text,
            Err(_) => {
                warn!("Timed out reading clipboard");
                None
            }
        }
    }

    fn set_text(&self, text: &str) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let deadline = Instant::now() + self.timeout;
        if !self.send(Request::Set(text.to_string(), tx, deadline)) {
            return Err(HotstringError::Clipboard(
                "clipboard thread has stopped".to_string(),
            ));
        }
        rx.recv_timeout(self.timeout)
            .map_err(|_| HotstringError::Clipboard("timed out writing clipboard".to_string()))?
    }
}

fn open_system_clipboard() -> Option<Clipboard> {
    match Clipboard::new() {
        Ok(clipboard) => Some(clipboard),
        Err(e) => {
            debug!(error = %e, "Clipboard unavailable");
            None
        }
    }
}

/// Answer requests until every sender is gone.
///
/// A request whose caller has already given up is dropped unanswered, so a
/// late write never replaces text the caller meant to restore.
fn serve<B, F>(requests: Receiver<Request>, mut open: F)
where
    B: Backend,
    F: FnMut() -> Option<B>,
{
    let mut clipboard: Option<B> = None;

    for request in requests {
        if clipboard.is_none() {
            clipboard = open();
        }

        match request {
            Request::Get(_, deadline) | Request::Set(_, _, deadline)
                if Instant::now() >= deadline =>
            {
                debug!("Dropping expired clipboard request");
            }
            Request::Get(reply, _) => {
                let text = clipboard.as_mut().and_then(|c| c.get());
                let _ = reply.send(text);
            }
            Request::Set(text, reply, _) => {
                let result = match clipboard.as_mut() {
                    Some(c) => c.set(text),
                    None => Err(HotstringError::Clipboard(
                        "clipboard unavailable".to_string(),
                    )),
                };
                let _ = reply.send(result);
            }
        }
    }
}

/// In-process clipboard, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryClipboard {
    pub fn new(text: Option<&str>) -> Self {
        Self {
            text: Mutex::new(text.map(str::to_string)),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Every value passed to `set_text`, oldest first
    pub fn writes(&self) -> Vec<String> {
        match self.writes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ClipboardService for MemoryClipboard {
    fn get_text(&self) -> Option<String> {
        match self.text.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_text(&self, text: &str) -> Result<()> {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(text.to_string());
        }
        match self.text.lock() {
            Ok(mut guard) => *guard = Some(text.to_string()),
            Err(poisoned) => *poisoned.into_inner() = Some(text.to_string()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn memory_clipboard_tracks_writes() {
        let clipboard = MemoryClipboard::new(Some("X"));
        assert_eq!(clipboard.get_text().as_deref(), Some("X"));

        clipboard.set_text("Y").unwrap();
        clipboard.set_text("X").unwrap();
        assert_eq!(clipboard.get_text().as_deref(), Some("X"));
        assert_eq!(clipboard.writes(), vec!["Y", "X"]);
    }

    #[derive(Clone, Default)]
    struct RecordingBackend {
        writes: Arc<Mutex<Vec<String>>>,
    }

    impl Backend for RecordingBackend {
        fn get(&mut self) -> Option<String> {
            self.writes.lock().unwrap().last().cloned()
        }

        fn set(&mut self, text: String) -> Result<()> {
            self.writes.lock().unwrap().push(text);
            Ok(())
        }
    }

    #[test]
    fn writes_past_their_deadline_are_dropped() {
        let backend = RecordingBackend::default();
        let (tx, rx) = mpsc::channel();
        let (stale_tx, stale_rx) = mpsc::channel();
        let (live_tx, live_rx) = mpsc::channel();

        let expired = Instant::now() - Duration::from_millis(1);
        tx.send(Request::Set("expansion".to_string(), stale_tx, expired))
            .unwrap();
        let later = Instant::now() + Duration::from_secs(60);
        tx.send(Request::Set("restored".to_string(), live_tx, later))
            .unwrap();
        drop(tx);

        let opened = backend.clone();
        serve(rx, move || Some(opened.clone()));

        assert_eq!(*backend.writes.lock().unwrap(), vec!["restored"]);
        assert!(stale_rx.recv().is_err());
        assert!(live_rx.recv().unwrap().is_ok());
    }

    #[test]
    fn empty_memory_clipboard_reads_none() {
        assert_eq!(MemoryClipboard::default().get_text(), None);
    }
}
