use crate::config::get_db_file_path;
use crate::error::{HotstringError, Result};
use crate::models::{validate_input, Trigger, DEFAULT_CATEGORY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Read access to the configured triggers.
///
/// Called once per keystroke by the matcher, so implementations must be
/// cheap and must hand back a consistent snapshot.
pub trait TriggerStore: Send + Sync {
    fn triggers(&self) -> Vec<Trigger>;
}

/// Trigger store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryTriggerStore {
    triggers: RwLock<Vec<Trigger>>,
}

impl MemoryTriggerStore {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        Self {
            triggers: RwLock::new(triggers),
        }
    }

    /// Swap in a new trigger set
    pub fn replace(&self, triggers: Vec<Trigger>) {
        match self.triggers.write() {
            Ok(mut guard) => *guard = triggers,
            Err(poisoned) => *poisoned.into_inner() = triggers,
        }
    }
}

impl TriggerStore for MemoryTriggerStore {
    fn triggers(&self) -> Vec<Trigger> {
        match self.triggers.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// On-disk layout of the trigger database
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct TriggerFile {
    pub triggers: Vec<Trigger>,
}

/// How imported triggers combine with the existing set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Keep existing triggers, add only new inputs
    Merge,
    /// Discard existing triggers
    Replace,
}

/// Handle on the JSON trigger database file
#[derive(Debug, Clone)]
pub struct TriggerDatabase {
    path: PathBuf,
}

impl TriggerDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database at the configured location
    pub fn open_default() -> Self {
        Self::new(get_db_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all triggers, seeding the database on first use
    pub fn load(&self) -> Result<Vec<Trigger>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "Creating trigger database");
            let seed = vec![Trigger::new(":hi", "hello world")];
            self.save(&seed)?;
            return Ok(seed);
        }
        self.read()
    }

    /// Load without touching the file. A missing database holds no triggers.
    pub fn read(&self) -> Result<Vec<Trigger>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        // Handle empty database file
        if content.trim().is_empty() {
            return Ok(vec![]);
        }

        let file: TriggerFile = serde_json::from_str(&content)?;
        Ok(file.triggers)
    }

    pub fn save(&self, triggers: &[Trigger]) -> Result<()> {
        write_trigger_file(&self.path, triggers)
    }

    pub fn find(&self, input: &str) -> Result<Option<Trigger>> {
        Ok(self.load()?.into_iter().find(|t| t.input == input))
    }

    pub fn add(&self, trigger: Trigger) -> Result<()> {
        trigger.validate()?;

        let mut triggers = self.load()?;
        if triggers.iter().any(|t| t.input == trigger.input) {
            return Err(HotstringError::DuplicateTrigger(trigger.input));
        }

        debug!(input = %trigger.input, "Adding trigger");
        triggers.push(trigger);
        self.save(&triggers)
    }

    /// Replace the output (and optionally the category) of an existing trigger
    pub fn update(&self, input: &str, output: String, category: Option<String>) -> Result<()> {
        let mut triggers = self.load()?;
        let entry = triggers
            .iter_mut()
            .find(|t| t.input == input)
            .ok_or_else(|| HotstringError::TriggerNotFound(input.to_string()))?;

        entry.output = output;
        if let Some(category) = category {
            entry.category = category;
        }
        self.save(&triggers)
    }

    pub fn delete(&self, input: &str) -> Result<()> {
        let mut triggers = self.load()?;
        let before = triggers.len();
        triggers.retain(|t| t.input != input);

        if triggers.len() == before {
            return Err(HotstringError::TriggerNotFound(input.to_string()));
        }
        self.save(&triggers)
    }

    pub fn export(&self, dest: &Path) -> Result<usize> {
        let triggers = self.load()?;
        write_trigger_file(dest, &triggers)?;
        Ok(triggers.len())
    }

    /// Import triggers from `src`, returning how many were added.
    ///
    /// The whole file is validated before anything is written.
    pub fn import(&self, src: &Path, mode: ImportMode) -> Result<usize> {
        let content = fs::read_to_string(src)?;
        let incoming = parse_import(&content)?;

        let (triggers, added) = match mode {
            ImportMode::Replace => {
                let added = incoming.len();
                (incoming, added)
            }
            ImportMode::Merge => {
                let mut triggers = self.load()?;
                let mut added = 0;
                for trigger in incoming {
                    if !triggers.iter().any(|t| t.input == trigger.input) {
                        triggers.push(trigger);
                        added += 1;
                    }
                }
                (triggers, added)
            }
        };

        info!(src = %src.display(), added, ?mode, "Imported triggers");
        self.save(&triggers)?;
        Ok(added)
    }
}

fn write_trigger_file(path: &Path, triggers: &[Trigger]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let file = TriggerFile {
        triggers: triggers.to_vec(),
    };
    let serialized = serde_json::to_string_pretty(&file)?;
    fs::write(path, serialized)?;
    Ok(())
}

#[derive(Deserialize)]
struct RawImport {
    triggers: Option<Vec<RawTrigger>>,
}

#[derive(Deserialize)]
struct RawTrigger {
    input: Option<String>,
    output: Option<String>,
    category: Option<String>,
}

fn parse_import(content: &str) -> Result<Vec<Trigger>> {
    let raw: RawImport = serde_json::from_str(content)
        .map_err(|e| HotstringError::InvalidImport(format!("invalid JSON format: {}", e)))?;

    let entries = raw.triggers.ok_or_else(|| {
        HotstringError::InvalidImport("missing 'triggers' array".to_string())
    })?;

    let mut seen = HashSet::new();
    let mut triggers = Vec::with_capacity(entries.len());
    for entry in entries {
        let input = match entry.input {
            Some(input) if !input.is_empty() => input,
            _ => {
                return Err(HotstringError::InvalidImport(
                    "trigger missing 'input' field".to_string(),
                ))
            }
        };
        let output = entry.output.ok_or_else(|| {
            HotstringError::InvalidImport(format!("trigger '{}' missing 'output' field", input))
        })?;
        validate_input(&input).map_err(|e| HotstringError::InvalidImport(e.to_string()))?;
        if !seen.insert(input.clone()) {
            return Err(HotstringError::InvalidImport(format!(
                "trigger '{}' appears more than once",
                input
            )));
        }

        triggers.push(Trigger {
            input,
            output,
            category: entry
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        });
    }
    Ok(triggers)
}

#[derive(Debug, Default)]
struct Cached {
    stamp: Option<(SystemTime, u64)>,
    triggers: Vec<Trigger>,
}

/// File-backed store that re-reads the database only when it changes on disk
#[derive(Debug)]
pub struct JsonTriggerStore {
    database: TriggerDatabase,
    cache: Mutex<Cached>,
}

impl JsonTriggerStore {
    pub fn new(database: TriggerDatabase) -> Self {
        Self {
            database,
            cache: Mutex::new(Cached::default()),
        }
    }

    fn file_stamp(&self) -> Option<(SystemTime, u64)> {
        let meta = fs::metadata(self.database.path()).ok()?;
        Some((meta.modified().ok()?, meta.len()))
    }
}

impl TriggerStore for JsonTriggerStore {
    fn triggers(&self) -> Vec<Trigger> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let stamp = self.file_stamp();
        if stamp.is_some() && stamp == cache.stamp {
            return cache.triggers.clone();
        }

        // Recorded on failure too, so a broken file is retried once per change
        cache.stamp = stamp;
        match self.database.read() {
            Ok(triggers) => {
                debug!(count = triggers.len(), "Reloaded trigger database");
                cache.triggers = triggers;
            }
            Err(e) => {
                warn!(error = %e, "Failed to reload triggers, keeping previous set");
            }
        }
        cache.triggers.clone()
    }
}
