//! Persisted detector model handle
//!
//! One model artifact lives at a fixed filesystem location with a
//! load-else-train-and-save lifecycle. The artifact is the single
//! source of truth: every call reads it from disk, so deleting the
//! file is all it takes to force a retrain. The load-or-train-or-save
//! sequence runs under an exclusive async lock and writes go through
//! a temp file plus rename, so concurrent cold starts cannot observe
//! a half-written artifact. A corrupt or missing artifact is treated
//! as absent and triggers retraining, never a fatal error.

use super::forest::{ForestConfig, IsolationForest};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Handle to the persisted detector model
pub struct ModelStore {
    path: PathBuf,
    config: ForestConfig,
    guard: Mutex<()>,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>, config: ForestConfig) -> Self {
        Self {
            path: path.into(),
            config,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the current model, loading it from disk or training a
    /// fresh detector on the given batch as a cold-start fallback.
    /// Disk is consulted on every call; deleting the artifact forces
    /// a retrain on the next call.
    ///
    /// Returns `None` when no model exists and the batch is empty.
    pub async fn load_or_train(&self, rows: &[Vec<f64>]) -> Option<IsolationForest> {
        let _guard = self.guard.lock().await;

        if let Some(forest) = self.load_from_disk() {
            return Some(forest);
        }

        let forest = IsolationForest::fit(rows, self.config.clone())?;
        info!(
            rows = rows.len(),
            trees = forest.config.num_trees,
            "Trained fresh detector on current batch"
        );
        if let Err(e) = self.persist(&forest) {
            // A failed save degrades durability, not this request
            warn!(path = %self.path.display(), error = %e, "Failed to persist detector model");
        }
        Some(forest)
    }

    fn load_from_disk(&self) -> Option<IsolationForest> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return None,
        };
        match serde_json::from_slice(&bytes) {
            Ok(forest) => {
                debug!(path = %self.path.display(), "Loaded persisted detector model");
                Some(forest)
            }
            Err(e) => {
                // Corrupt artifact: treat as absent, retrain
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Detector model unreadable, retraining"
                );
                None
            }
        }
    }

    /// Write the artifact atomically: temp file, sync, rename
    fn persist(&self, forest: &IsolationForest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create model dir {:?}", parent))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .with_context(|| format!("Failed to create temp model file {:?}", temp_path))?;

        let bytes = serde_json::to_vec(forest).context("Failed to serialize detector model")?;
        file.write_all(&bytes).context("Failed to write detector model")?;
        file.sync_all().context("Failed to sync detector model")?;

        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, self.path))?;

        Ok(())
    }
}
