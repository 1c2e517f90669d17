//! Checkpoint Store: per-parameter results persisted as the sweep progresses.
//!
//! One JSON document holds everything needed to resume:
//! - the sweep fingerprint (parameter ids, level, statistic, interpolation)
//! - the reference statistic and the cursor into the parameter list
//! - the ledger of finished `ErrorResult`s and their raw profiles
//!
//! Every write goes to `<path>.tmp` first and is then renamed over the target,
//! so a crash leaves either the previous or the new checkpoint on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ErrorResult, Fingerprint, ParameterProfile};
use crate::error::AppError;
use crate::io::{ledger, remove_if_exists, write_atomically};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub tool: String,
    pub updated: DateTime<Utc>,
    pub fingerprint: Fingerprint,
    pub reference_statistic: f64,
    /// Index of the next parameter (in `fingerprint.parameters`) to process.
    pub cursor: usize,
    pub ledger: Vec<ErrorResult>,
    pub profiles: Vec<ParameterProfile>,
}

impl Checkpoint {
    pub fn new(fingerprint: Fingerprint, reference_statistic: f64) -> Self {
        Self {
            tool: "steppar".to_string(),
            updated: Utc::now(),
            fingerprint,
            reference_statistic,
            cursor: 0,
            ledger: Vec::new(),
            profiles: Vec::new(),
        }
    }

    /// Every parameter of the fingerprint has been processed.
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.fingerprint.parameters.len()
    }

    fn validate(&self) -> Result<(), String> {
        if self.ledger.len() != self.profiles.len() {
            return Err(format!(
                "{} results but {} profiles",
                self.ledger.len(),
                self.profiles.len()
            ));
        }
        if self.ledger.len() > self.cursor || self.cursor > self.fingerprint.parameters.len() {
            return Err(format!(
                "cursor {} inconsistent with {} results over {} parameters",
                self.cursor,
                self.ledger.len(),
                self.fingerprint.parameters.len()
            ));
        }
        if let Some(stray) = self
            .ledger
            .iter()
            .find(|r| !self.fingerprint.parameters.contains(&r.id))
        {
            return Err(format!("result for parameter {} outside the sweep", stray.id));
        }
        Ok(())
    }
}

/// One finished parameter, as handed to `CheckpointStore::append`.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointEntry<'a> {
    pub fingerprint: &'a Fingerprint,
    pub reference_statistic: f64,
    /// Cursor after this parameter.
    pub cursor: usize,
    pub result: &'a ErrorResult,
    pub profile: &'a ParameterProfile,
}

pub trait CheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, AppError>;

    /// Record one finished parameter. A stored checkpoint with another
    /// fingerprint is replaced.
    fn append(&mut self, entry: CheckpointEntry<'_>) -> Result<(), AppError>;

    /// Forget everything (new optimum or stale fingerprint).
    fn clear(&mut self) -> Result<(), AppError>;
}

fn appended(existing: Option<Checkpoint>, entry: CheckpointEntry<'_>) -> Checkpoint {
    let mut checkpoint = match existing {
        Some(cp) if cp.fingerprint.matches(entry.fingerprint) => cp,
        _ => Checkpoint::new(entry.fingerprint.clone(), entry.reference_statistic),
    };
    checkpoint.updated = Utc::now();
    checkpoint.reference_statistic = entry.reference_statistic;
    checkpoint.cursor = entry.cursor;
    checkpoint.ledger.push(entry.result.clone());
    checkpoint.profiles.push(entry.profile.clone());
    checkpoint
}

/// File-backed store, optionally mirroring the ledger as a text table.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
    ledger_table: Option<PathBuf>,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ledger_table: None,
        }
    }

    /// Also keep `path` (the `<model>_list.txt` table) in sync with the ledger.
    pub fn with_ledger_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_table = Some(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), AppError> {
        write_atomically(&self.path, |w| {
            serde_json::to_writer_pretty(&mut *w, checkpoint)?;
            Ok(())
        })
        .map_err(|e| AppError::new(2, format!("Failed to write checkpoint '{}': {e}", self.path.display())))?;

        if let Some(table) = &self.ledger_table {
            ledger::write_ledger_table(table, checkpoint)?;
        }
        Ok(())
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, AppError> {
        read_checkpoint(&self.path)
    }

    fn append(&mut self, entry: CheckpointEntry<'_>) -> Result<(), AppError> {
        let checkpoint = appended(self.load()?, entry);
        self.save(&checkpoint)
    }

    fn clear(&mut self) -> Result<(), AppError> {
        remove_if_exists(&self.path)?;
        if let Some(table) = &self.ledger_table {
            remove_if_exists(table)?;
        }
        Ok(())
    }
}

/// Read a checkpoint file; `Ok(None)` when it does not exist.
pub fn read_checkpoint(path: &Path) -> Result<Option<Checkpoint>, AppError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppError::new(
                2,
                format!("Failed to read checkpoint '{}': {e}", path.display()),
            ));
        }
    };
    let checkpoint: Checkpoint = serde_json::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Invalid checkpoint '{}': {e}", path.display())))?;
    checkpoint
        .validate()
        .map_err(|e| AppError::new(2, format!("Corrupt checkpoint '{}': {e}", path.display())))?;
    Ok(Some(checkpoint))
}

/// Checkpoint kept in memory only, for embedding the sweep without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    checkpoint: Option<Checkpoint>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, AppError> {
        Ok(self.checkpoint.clone())
    }

    fn append(&mut self, entry: CheckpointEntry<'_>) -> Result<(), AppError> {
        self.checkpoint = Some(appended(self.checkpoint.take(), entry));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), AppError> {
        self.checkpoint = None;
        Ok(())
    }
}
