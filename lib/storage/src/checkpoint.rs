// Batch progress checkpoints, written atomically so a crash never leaves a torn file
use atomicwrites::{AtomicFile, OverwriteBehavior};
use reach_core::{Error, RecordId, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where a store-wide scan got to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Identifies the computation, e.g. `reach:5:w2v`
    pub job: String,
    /// Settings that change results without changing the job id
    /// (inclusion rule, topic model, vocabulary)
    #[serde(default)]
    pub fingerprint: String,
    /// Last root of the last completed batch
    pub last_id: RecordId,
    pub processed: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default)]
    pub missing: usize,
    #[serde(default)]
    pub failed: usize,
    pub updated_at: u64,
}

impl Checkpoint {
    pub fn new(job: &str, fingerprint: &str, last_id: RecordId) -> Self {
        Self {
            job: job.to_string(),
            fingerprint: fingerprint.to_string(),
            last_id,
            processed: 0,
            updated: 0,
            missing: 0,
            failed: 0,
            updated_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Outcome counts of every root up to `last_id`
    #[must_use]
    pub fn with_counts(mut self, processed: usize, updated: usize, missing: usize, failed: usize) -> Self {
        self.processed = processed;
        self.updated = updated;
        self.missing = missing;
        self.failed = failed;
        self
    }

    pub fn matches(&self, job: &str, fingerprint: &str) -> bool {
        self.job == job && self.fingerprint == fingerprint
    }
}

pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored checkpoint, if any
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Stored checkpoint if it was written by `job` under the same settings
    pub fn load_for(&self, job: &str, fingerprint: &str) -> Result<Option<Checkpoint>> {
        Ok(self.load()?.filter(|c| c.matches(job, fingerprint)))
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .map_err(|e| Error::Storage(format!("writing checkpoint {}: {}", self.path.display(), e)))
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
