//! Idempotent file writer with staging-mode support (spec §4.3).
//!
//! A [`Plan`] is one logical generation unit (`orm`, `graphql`, `migrations`)
//! with an expected file set. [`ArtifactTracker::run_plan`] only rewrites a
//! file when its content differs from what's already on disk, and records
//! nothing for a plan that errors partway through — per the idempotence law,
//! two consecutive runs with identical inputs must produce zero file changes
//! on the second run.

use erm_core::ErmError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One file this run intends to (re)write, relative to the tracker's root.
pub struct PlannedFile {
    pub relative_path: PathBuf,
    pub content: String,
}

impl PlannedFile {
    pub fn new(relative_path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        PlannedFile { relative_path: relative_path.into(), content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub relative_path: PathBuf,
    /// `false` when the file already matched on disk and was left untouched.
    pub written: bool,
}

pub struct PlanSummary {
    pub plan_name: String,
    pub outcomes: Vec<WriteOutcome>,
}

impl PlanSummary {
    pub fn changed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.written).count()
    }
}

/// On-disk manifest of `{path -> content hash}` for every file a plan has
/// ever written, read back on the next run so a skipped/failed plan never
/// contaminates the next diff (grounded on the teacher's flat journal-file
/// ledger in `migrations/src/journal.rs`, adapted from a migration-tag list
/// to a content-hash map).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ErmError> {
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| ErmError::generator_write(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&raw).map_err(ErmError::from)
    }

    pub fn save(&self, path: &Path) -> Result<(), ErmError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ErmError::generator_write(path.display().to_string(), e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, format!("{json}\n"))
            .map_err(|e| ErmError::generator_write(path.display().to_string(), e.to_string()))
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Tracks writes for one generation run, across one or more [`Plan`]s.
pub struct ArtifactTracker {
    live_root: PathBuf,
    write_root: PathBuf,
    manifest_path: PathBuf,
    manifest: Manifest,
    force: bool,
}

impl ArtifactTracker {
    /// Writes land directly in `live_root`.
    pub fn new(live_root: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>, force: bool) -> Result<Self, ErmError> {
        let manifest_path = manifest_path.into();
        let manifest = Manifest::load(&manifest_path)?;
        let live_root = live_root.into();
        Ok(ArtifactTracker { write_root: live_root.clone(), live_root, manifest_path, manifest, force })
    }

    /// Staging mode: writes are redirected to `staging_root`; comparisons
    /// still read from `live_root` so the summary reflects what a live run
    /// would change. The manifest on disk is never updated in this mode.
    pub fn staging(
        live_root: impl Into<PathBuf>,
        staging_root: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        force: bool,
    ) -> Result<Self, ErmError> {
        let manifest_path = manifest_path.into();
        let manifest = Manifest::load(&manifest_path)?;
        Ok(ArtifactTracker { live_root: live_root.into(), write_root: staging_root.into(), manifest_path, manifest, force })
    }

    pub fn is_staging(&self) -> bool {
        self.live_root != self.write_root
    }

    /// Run one plan: write every file whose content differs from what's on
    /// disk (or always, if `force`). On error, no outcome for this plan is
    /// recorded and the manifest is left as it was before the call.
    pub fn run_plan(&mut self, plan_name: &str, files: Vec<PlannedFile>) -> Result<PlanSummary, ErmError> {
        let mut outcomes = Vec::with_capacity(files.len());
        let mut staged_manifest_entries = Vec::with_capacity(files.len());

        for file in &files {
            let live_path = self.live_root.join(&file.relative_path);
            let hash = content_hash(&file.content);
            let unchanged = !self.force && existing_matches(&live_path, &hash);

            if !unchanged {
                let write_path = self.write_root.join(&file.relative_path);
                if let Some(parent) = write_path.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| ErmError::generator_write(write_path.display().to_string(), e.to_string()))?;
                }
                fs::write(&write_path, &file.content)
                    .map_err(|e| ErmError::generator_write(write_path.display().to_string(), e.to_string()))?;
            }

            staged_manifest_entries.push((file.relative_path.to_string_lossy().into_owned(), hash));
            outcomes.push(WriteOutcome { relative_path: file.relative_path.clone(), written: !unchanged });
        }

        if !self.is_staging() {
            for (path, hash) in staged_manifest_entries {
                self.manifest.files.insert(path, hash);
            }
        }

        Ok(PlanSummary { plan_name: plan_name.to_string(), outcomes })
    }

    /// Persist the manifest. A no-op in staging mode: staging "finishes
    /// without touching the live tree" (spec §4.3), and the manifest lives
    /// alongside the live tree.
    pub fn save_manifest(&self) -> Result<(), ErmError> {
        if self.is_staging() {
            return Ok(());
        }
        self.manifest.save(&self.manifest_path)
    }
}

fn existing_matches(live_path: &Path, hash: &str) -> bool {
    match fs::read_to_string(live_path) {
        Ok(existing) => content_hash(&existing) == hash,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_run_with_identical_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        let mut tracker = ArtifactTracker::new(dir.path(), &manifest_path, false).unwrap();

        let files = vec![PlannedFile::new("orm/user.rs", "pub struct User;")];
        let first = tracker.run_plan("orm", files.clone()).unwrap();
        assert_eq!(first.changed_count(), 1);

        let second = tracker.run_plan("orm", files).unwrap();
        assert_eq!(second.changed_count(), 0);
    }

    #[test]
    fn force_rewrites_even_when_unchanged() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        let mut tracker = ArtifactTracker::new(dir.path(), &manifest_path, true).unwrap();

        let files = vec![PlannedFile::new("orm/user.rs", "pub struct User;")];
        tracker.run_plan("orm", files.clone()).unwrap();
        let second = tracker.run_plan("orm", files).unwrap();
        assert_eq!(second.changed_count(), 1);
    }

    #[test]
    fn staging_mode_never_touches_live_tree() {
        let live = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let manifest_path = live.path().join("manifest.json");
        let mut tracker =
            ArtifactTracker::staging(live.path(), staging.path(), &manifest_path, false).unwrap();

        let files = vec![PlannedFile::new("orm/user.rs", "pub struct User;")];
        let summary = tracker.run_plan("orm", files).unwrap();
        assert_eq!(summary.changed_count(), 1);
        assert!(staging.path().join("orm/user.rs").exists());
        assert!(!live.path().join("orm/user.rs").exists());

        tracker.save_manifest().unwrap();
        assert!(!manifest_path.exists());
    }
}
