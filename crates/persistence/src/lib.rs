#![deny(warnings)]

//! Persistence layer for the meta-progression record.
//!
//! The record is stored as pretty JSON inside a small versioned envelope.
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a crash mid-save never leaves a truncated file behind.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use deadline_core::MetaRecord;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

pub use anyhow::{Error, Result};

/// Version of the on-disk envelope. Bump when the layout changes.
pub const SAVE_VERSION: u32 = 1;

/// Returns the default location of the meta save.
pub fn default_save_path() -> PathBuf {
    PathBuf::from("./saves/meta.json")
}

/// Storage backend for the meta record.
///
/// `load` returns `Ok(None)` when nothing has been saved yet; any `Err` is a
/// damaged or unreadable save.
pub trait MetaStore {
    fn load(&self) -> Result<Option<MetaRecord>>;
    fn save(&mut self, record: &MetaRecord) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct SaveEnvelope {
    version: u32,
    saved_at: DateTime<Utc>,
    meta: MetaRecord,
}

/// Accepts the current envelope or a bare record written by older builds.
fn decode(text: &str) -> Result<MetaRecord> {
    if let Ok(envelope) = serde_json::from_str::<SaveEnvelope>(text) {
        if envelope.version > SAVE_VERSION {
            bail!(
                "save version {} is newer than supported version {}",
                envelope.version,
                SAVE_VERSION
            );
        }
        return Ok(envelope.meta);
    }
    serde_json::from_str::<MetaRecord>(text).context("parse meta record")
}

fn encode(record: &MetaRecord) -> Result<String> {
    let envelope = SaveEnvelope {
        version: SAVE_VERSION,
        saved_at: Utc::now(),
        meta: record.clone(),
    };
    serde_json::to_string_pretty(&envelope).context("serialize meta record")
}

/// JSON file store.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetaStore for JsonFileStore {
    fn load(&self) -> Result<Option<MetaRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        let record = decode(&text).with_context(|| format!("decode {}", self.path.display()))?;
        debug!(path = %self.path.display(), currency = record.currency, "meta loaded");
        Ok(Some(record))
    }

    fn save(&mut self, record: &MetaRecord) -> Result<()> {
        let text = encode(record)?;
        write_atomic(&self.path, text.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "meta saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "meta save removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path_for(path);
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("meta.json");
    path.with_file_name(format!("{name}.tmp"))
}

/// In-memory store. Clones share the same slot, so a test can keep a handle
/// and inspect what the game wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<MetaRecord>>>,
    saves: Rc<RefCell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: MetaRecord) -> Self {
        let store = Self::default();
        *store.slot.borrow_mut() = Some(record);
        store
    }

    /// Last saved record.
    pub fn snapshot(&self) -> Option<MetaRecord> {
        self.slot.borrow().clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl MetaStore for MemoryStore {
    fn load(&self) -> Result<Option<MetaRecord>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&mut self, record: &MetaRecord) -> Result<()> {
        *self.slot.borrow_mut() = Some(record.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.slot.borrow_mut().take();
        Ok(())
    }
}

/// Store that discards writes; used with `--no-save`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

impl MetaStore for NullStore {
    fn load(&self) -> Result<Option<MetaRecord>> {
        Ok(None)
    }

    fn save(&mut self, _record: &MetaRecord) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadline_core::UnlockId;

    fn sample() -> MetaRecord {
        let mut record = MetaRecord {
            currency: 120,
            tutorial_completed: true,
            ..MetaRecord::default()
        };
        record.unlocks.insert(UnlockId::TempSuToken);
        record.stats.total_runs = 3;
        record.stats.fastest_escape_seconds = Some(211);
        record.achievements.insert("first_escape".into());
        record
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("meta.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_in_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves").join("meta.json");
        let mut store = JsonFileStore::new(&path);
        store.save(&sample()).unwrap();
        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());
        assert_eq!(store.load().unwrap(), Some(sample()));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"version\": 1"));
        assert!(text.contains("\"fastestEscapeSeconds\": 211"));
    }

    #[test]
    fn bare_record_from_older_builds_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(
            &path,
            r#"{"currency":40,"unlocks":["shortcut_chance"],"stats":{"totalRuns":2,"totalEscapes":1,"totalDeaths":1,"fastestEscapeSeconds":90}}"#,
        )
        .unwrap();
        let record = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(record.currency, 40);
        assert!(record.unlocks.contains(&UnlockId::ShortcutChance));
        assert_eq!(record.stats.hides, 0);
    }

    #[test]
    fn corrupt_and_future_saves_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(&path, "{not json").unwrap();
        assert!(JsonFileStore::new(&path).load().is_err());

        fs::write(
            &path,
            r#"{"version":99,"saved_at":"2026-01-01T00:00:00Z","meta":{"currency":0,"unlocks":[],"stats":{"totalRuns":0,"totalEscapes":0,"totalDeaths":0,"fastestEscapeSeconds":null}}}"#,
        )
        .unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("newer"));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("meta.json"));
        store.save(&sample()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_clones_share_state() {
        let handle = MemoryStore::new();
        let mut store = handle.clone();
        store.save(&sample()).unwrap();
        assert_eq!(handle.snapshot(), Some(sample()));
        assert_eq!(handle.save_count(), 1);
        store.clear().unwrap();
        assert!(handle.snapshot().is_none());
    }
}
