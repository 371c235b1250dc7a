//! Checkpoint store
//!
//! Persists frontier snapshots as a JSON document so an interrupted crawl can
//! resume. Writes go to a temporary sibling file that is synced and then
//! renamed over the previous checkpoint, so a crash mid-write never leaves a
//! partial artifact behind.

mod writer;

pub use writer::CheckpointWriter;

use crate::frontier::FrontierState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current checkpoint layout version
///
/// Bumped whenever the document layout changes incompatibly. Checkpoints
/// with any other version are treated as unreadable.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Errors that can occur while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error on checkpoint {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Corrupt checkpoint {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// A durable frontier snapshot plus the metadata needed to trust it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub saved_at: DateTime<Utc>,

    /// Hash of the configuration the crawl was running with
    #[serde(default)]
    pub config_hash: Option<String>,

    #[serde(flatten)]
    pub frontier: FrontierState,
}

impl Checkpoint {
    /// Wraps a frontier snapshot taken now
    pub fn new(frontier: FrontierState, config_hash: Option<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            config_hash,
            frontier,
        }
    }
}

/// File-backed checkpoint store
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Atomically replaces the stored checkpoint
    pub fn save(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        let json = serde_json::to_vec(checkpoint).map_err(CheckpointError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let tmp_path = self.tmp_path();
        {
            let mut file = File::create(&tmp_path).map_err(|e| self.io_error(e))?;
            file.write_all(&json).map_err(|e| self.io_error(e))?;
            file.sync_all().map_err(|e| self.io_error(e))?;
        }

        #[cfg(target_os = "windows")]
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| self.io_error(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        tracing::trace!(
            "Saved checkpoint to {} ({} bytes)",
            self.path.display(),
            json.len()
        );
        Ok(())
    }

    /// Reads the stored checkpoint, distinguishing "absent" from "unreadable"
    pub fn try_load(&self) -> CheckpointResult<Option<Checkpoint>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let checkpoint: Checkpoint =
            serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }

        Ok(Some(checkpoint))
    }

    /// Reads the stored checkpoint for resuming
    ///
    /// An unreadable checkpoint is reported and discarded: the crawl then
    /// starts fresh instead of aborting.
    pub fn load(&self) -> Option<Checkpoint> {
        match self.try_load() {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!("Ignoring unreadable checkpoint, starting fresh: {}", e);
                None
            }
        }
    }

    /// Deletes the stored checkpoint, if any
    pub fn clear(&self) -> CheckpointResult<()> {
        for path in [self.path.clone(), self.tmp_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(self.io_error(e)),
            }
        }
        Ok(())
    }
}
